//! Gross-to-net wage conversion.
//!
//! The model is calibrated on two sample payslips and interpolates linearly
//! between them, extrapolating proportionally outside the sampled range. A
//! fixed adjustment factor is applied to the result. It approximates Dutch
//! payroll tax for display purposes and is not a real tax computation.

use serde::{Deserialize, Serialize};

/// A sampled (gross, net) hourly wage pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub gross: f64,
    pub net: f64,
}

impl CalibrationPoint {
    pub const fn new(gross: f64, net: f64) -> Self {
        Self { gross, net }
    }

    fn ratio(&self) -> f64 {
        self.net / self.gross
    }
}

/// Two-point interpolation model with a final adjustment factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxModel {
    pub low: CalibrationPoint,
    pub high: CalibrationPoint,
    pub adjustment: f64,
}

impl TaxModel {
    /// €16.01 gross → €13.44 net and €35.00 gross → €22.81 net, plus 5%.
    pub const DUTCH_2025: TaxModel = TaxModel {
        low: CalibrationPoint::new(16.01, 13.44),
        high: CalibrationPoint::new(35.00, 22.81),
        adjustment: 1.05,
    };

    /// Net hourly wage for a gross hourly wage.
    ///
    /// `age` is accepted for interface stability but does not influence the
    /// result. Non-positive input yields non-positive output; callers reject
    /// it before getting here.
    pub fn net_hourly_wage(&self, gross_hourly_wage: f64, _age: u32) -> f64 {
        let net = if gross_hourly_wage <= self.low.gross {
            gross_hourly_wage * self.low.ratio()
        } else if gross_hourly_wage >= self.high.gross {
            gross_hourly_wage * self.high.ratio()
        } else {
            let gross_range = self.high.gross - self.low.gross;
            let net_range = self.high.net - self.low.net;
            let position = (gross_hourly_wage - self.low.gross) / gross_range;
            self.low.net + position * net_range
        };
        net * self.adjustment
    }
}

impl Default for TaxModel {
    fn default() -> Self {
        Self::DUTCH_2025
    }
}

/// Net hourly wage under the default calibration.
pub fn net_hourly_wage(gross_hourly_wage: f64, age: u32) -> f64 {
    TaxModel::DUTCH_2025.net_hourly_wage(gross_hourly_wage, age)
}

const HOURS_PER_DAY: f64 = 8.0;
const WAGE_TAX_RATE: f64 = 0.1134;
const GENERAL_CREDIT_RATE: f64 = 0.083;
const LABOUR_CREDIT_RATE: f64 = 0.1615;

/// Illustrative daily breakdown shown next to the net wage.
///
/// Uses a flat wage-tax percentage on an 8-hour day. The credits are
/// informational and already folded into the flat rate. Accrual never uses
/// these numbers; see [`TaxModel`] for the authoritative conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub gross_daily: f64,
    pub gross_hourly: f64,
    pub net_daily: f64,
    pub net_hourly: f64,
    /// Loonheffing.
    pub wage_tax: f64,
    /// Algemene heffingskorting.
    pub general_tax_credit: f64,
    /// Arbeidskorting.
    pub labour_tax_credit: f64,
}

impl TaxBreakdown {
    pub fn for_hourly(gross_hourly_wage: f64) -> Self {
        let gross_daily = gross_hourly_wage * HOURS_PER_DAY;
        let wage_tax = gross_daily * WAGE_TAX_RATE;
        let net_daily = gross_daily - wage_tax;
        Self {
            gross_daily,
            gross_hourly: gross_hourly_wage,
            net_daily,
            net_hourly: net_daily / HOURS_PER_DAY,
            wage_tax,
            general_tax_credit: gross_daily * GENERAL_CREDIT_RATE,
            labour_tax_credit: gross_daily * LABOUR_CREDIT_RATE,
        }
    }
}

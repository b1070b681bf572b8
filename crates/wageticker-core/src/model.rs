//! Wage settings, history snapshots and the persisted record shape.
//!
//! Field names serialize in camelCase so records exported from the browser
//! version of the app load unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accrual::{self, EarningsCheckpoint};
use crate::error::ValidationError;
use crate::tax::TaxModel;

pub const DEFAULT_HOURS_PER_WEEK: u32 = 40;
pub const DEFAULT_AGE: u32 = 30;
pub const MAX_HOURS_PER_WEEK: u32 = 168;
pub const MIN_AGE: u32 = 15;
pub const MAX_AGE: u32 = 100;

/// Settings as entered by the user, before any derived values exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettingsInput {
    pub gross_wage: f64,
    pub hours_per_week: u32,
    pub age: u32,
}

impl SettingsInput {
    pub fn new(gross_wage: f64, hours_per_week: u32, age: u32) -> Self {
        Self {
            gross_wage,
            hours_per_week,
            age,
        }
    }

    /// Check the ranges accepted by the settings form.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.gross_wage.is_finite() || self.gross_wage <= 0.0 {
            return Err(ValidationError::InvalidGrossWage {
                value: self.gross_wage,
            });
        }
        if self.hours_per_week == 0 || self.hours_per_week > MAX_HOURS_PER_WEEK {
            return Err(ValidationError::HoursOutOfRange {
                value: self.hours_per_week,
            });
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(ValidationError::AgeOutOfRange { value: self.age });
        }
        Ok(())
    }

    /// Net wage and per-second rate these inputs produce.
    pub fn rates(&self, model: &TaxModel) -> Rates {
        Rates::derive(model, self.gross_wage, self.hours_per_week, self.age)
    }

    /// Validate, then derive rates, rejecting a wage whose rates overflow.
    pub fn checked_rates(&self, model: &TaxModel) -> Result<Rates, ValidationError> {
        self.validate()?;
        let rates = self.rates(model);
        if !(rates.net_wage.is_finite() && rates.second_rate.is_finite()) {
            return Err(ValidationError::InvalidGrossWage {
                value: self.gross_wage,
            });
        }
        Ok(rates)
    }
}

/// Values derived from gross wage, hours and age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub net_wage: f64,
    pub second_rate: f64,
}

impl Rates {
    pub fn derive(model: &TaxModel, gross_wage: f64, hours_per_week: u32, age: u32) -> Self {
        let net_wage = model.net_hourly_wage(gross_wage, age);
        Self {
            net_wage,
            second_rate: accrual::earnings_per_second(net_wage, f64::from(hours_per_week)),
        }
    }
}

/// The active wage configuration together with its checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WageSettings {
    #[serde(default, deserialize_with = "lenient::number")]
    pub gross_wage: f64,
    #[serde(default = "default_age", deserialize_with = "lenient::count")]
    pub age: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    pub net_wage: f64,
    #[serde(default = "default_hours_per_week", deserialize_with = "lenient::count")]
    pub hours_per_week: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    pub second_rate: f64,
    #[serde(default, with = "timestamp::optional")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub last_saved_earnings: f64,
    #[serde(default, with = "timestamp::optional")]
    pub last_saved_timestamp: Option<DateTime<Utc>>,
}

fn default_age() -> u32 {
    DEFAULT_AGE
}

fn default_hours_per_week() -> u32 {
    DEFAULT_HOURS_PER_WEEK
}

impl Default for WageSettings {
    fn default() -> Self {
        Self {
            gross_wage: 0.0,
            age: DEFAULT_AGE,
            net_wage: 0.0,
            hours_per_week: DEFAULT_HOURS_PER_WEEK,
            second_rate: 0.0,
            start_date: None,
            last_saved_earnings: 0.0,
            last_saved_timestamp: None,
        }
    }
}

impl WageSettings {
    /// Fresh settings starting at `now` with an empty checkpoint.
    pub fn start(input: SettingsInput, rates: Rates, now: DateTime<Utc>) -> Self {
        Self {
            gross_wage: input.gross_wage,
            age: input.age,
            net_wage: rates.net_wage,
            hours_per_week: input.hours_per_week,
            second_rate: rates.second_rate,
            start_date: Some(now),
            last_saved_earnings: 0.0,
            last_saved_timestamp: Some(now),
        }
    }

    /// True once the user has saved a wage.
    pub fn is_configured(&self) -> bool {
        self.gross_wage > 0.0 && self.start_date.is_some()
    }

    pub fn rates(&self) -> Rates {
        Rates {
            net_wage: self.net_wage,
            second_rate: self.second_rate,
        }
    }

    /// The resumption point, if one with a positive total was recorded.
    pub fn checkpoint(&self) -> Option<EarningsCheckpoint> {
        self.last_saved_timestamp
            .filter(|_| self.last_saved_earnings > 0.0)
            .map(|ts| EarningsCheckpoint::new(self.last_saved_earnings, ts))
    }

    /// Accumulated earnings at `now` under these settings.
    pub fn accumulated_at(&self, now: DateTime<Utc>) -> f64 {
        if !self.is_configured() || self.second_rate <= 0.0 {
            return self.last_saved_earnings.max(0.0);
        }
        accrual::accumulated_earnings(
            self.start_date,
            self.second_rate,
            self.last_saved_earnings,
            self.last_saved_timestamp,
            now,
        )
    }

    /// Make `checkpoint` the new resumption point.
    pub fn stamp(&mut self, checkpoint: EarningsCheckpoint) {
        self.last_saved_earnings = checkpoint.accumulated;
        self.last_saved_timestamp = Some(checkpoint.timestamp);
    }

    /// Freeze these settings into a history entry ending at `end`.
    pub fn close(&self, earned: f64, end: DateTime<Utc>) -> Option<HistoryEntry> {
        let start_date = self.start_date?;
        Some(HistoryEntry {
            start_date,
            end_date: end,
            gross_wage: self.gross_wage,
            net_wage: self.net_wage,
            hours_per_week: self.hours_per_week,
            age: self.age,
            last_saved_earnings: earned,
            last_saved_timestamp: Some(end),
        })
    }
}

/// A past wage period. Never modified after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(with = "timestamp::required")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "timestamp::required")]
    pub end_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub gross_wage: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub net_wage: f64,
    #[serde(default = "default_hours_per_week", deserialize_with = "lenient::count")]
    pub hours_per_week: u32,
    #[serde(default = "default_age", deserialize_with = "lenient::count")]
    pub age: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    pub last_saved_earnings: f64,
    #[serde(default, with = "timestamp::optional")]
    pub last_saved_timestamp: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    /// Earnings recorded when the period closed.
    pub fn earned(&self) -> f64 {
        self.last_saved_earnings
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_date - self.start_date
    }
}

/// Everything stored under the application key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub settings: WageSettings,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

fn legacy_schema_version() -> u32 {
    1
}

/// Forgiving number decoding for stored records.
///
/// A `null`, a string or any other non-number decodes as NaN (or 0 for
/// counts) instead of failing the whole object, so the repair pass can
/// default the one bad field.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw.as_f64().unwrap_or(f64::NAN))
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0))
    }
}

/// Timestamp (de)serialization.
///
/// Writes RFC 3339 with millisecond precision, the shape `Date.toJSON()`
/// produces. Reads RFC 3339, naive ISO 8601 (taken as UTC) and epoch
/// milliseconds. Unreadable optional timestamps decode as `None`.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| naive.and_utc())
                }),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        }
    }

    /// Drop precision below what [`format`] writes.
    pub fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
        ts.trunc_subsecs(3)
    }

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub mod optional {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(ts) => serializer.serialize_str(&format(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<Value>::deserialize(deserializer)?;
            Ok(raw.as_ref().and_then(parse))
        }
    }

    pub mod required {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &DateTime<Utc>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&format(value))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<DateTime<Utc>, D::Error> {
            let raw = Value::deserialize(deserializer)?;
            parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    #[test]
    fn validate_rejects_each_bad_field() {
        assert!(matches!(
            SettingsInput::new(0.0, 40, 30).validate(),
            Err(ValidationError::InvalidGrossWage { .. })
        ));
        assert!(matches!(
            SettingsInput::new(f64::NAN, 40, 30).validate(),
            Err(ValidationError::InvalidGrossWage { .. })
        ));
        assert_eq!(
            SettingsInput::new(20.0, 0, 30).validate(),
            Err(ValidationError::HoursOutOfRange { value: 0 })
        );
        assert_eq!(
            SettingsInput::new(20.0, 169, 30).validate(),
            Err(ValidationError::HoursOutOfRange { value: 169 })
        );
        assert_eq!(
            SettingsInput::new(20.0, 40, 14).validate(),
            Err(ValidationError::AgeOutOfRange { value: 14 })
        );
        assert_eq!(
            SettingsInput::new(20.0, 40, 101).validate(),
            Err(ValidationError::AgeOutOfRange { value: 101 })
        );
    }

    #[test]
    fn validate_accepts_range_bounds() {
        assert!(SettingsInput::new(0.01, 1, 15).validate().is_ok());
        assert!(SettingsInput::new(99.0, 168, 100).validate().is_ok());
    }

    #[test]
    fn started_settings_have_empty_checkpoint() {
        let input = SettingsInput::new(20.0, 40, 30);
        let settings = WageSettings::start(input, input.rates(&TaxModel::default()), t0());
        assert!(settings.is_configured());
        assert_eq!(settings.last_saved_earnings, 0.0);
        assert_eq!(settings.last_saved_timestamp, Some(t0()));
        assert!(settings.checkpoint().is_none());
        assert_eq!(settings.accumulated_at(t0()), 0.0);
    }

    #[test]
    fn unconfigured_settings_accrue_nothing() {
        let settings = WageSettings::default();
        assert_eq!(settings.accumulated_at(t0() + Duration::days(3)), 0.0);
    }

    #[test]
    fn close_snapshots_the_period() {
        let input = SettingsInput::new(20.0, 32, 41);
        let settings = WageSettings::start(input, input.rates(&TaxModel::default()), t0());
        let end = t0() + Duration::hours(2);
        let entry = settings.close(12.5, end).unwrap();
        assert_eq!(entry.start_date, t0());
        assert_eq!(entry.end_date, end);
        assert_eq!(entry.hours_per_week, 32);
        assert_eq!(entry.age, 41);
        assert_eq!(entry.earned(), 12.5);
        assert_eq!(entry.duration(), Duration::hours(2));
    }

    #[test]
    fn timestamps_serialize_like_date_to_json() {
        let input = SettingsInput::new(20.0, 40, 30);
        let settings = WageSettings::start(input, input.rates(&TaxModel::default()), t0());
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["startDate"], "2025-03-03T09:00:00.000Z");
        assert_eq!(json["lastSavedTimestamp"], "2025-03-03T09:00:00.000Z");
        assert!(json.get("hoursPerWeek").is_some());
    }

    #[test]
    fn timestamp_parse_accepts_several_shapes() {
        use serde_json::json;
        assert_eq!(timestamp::parse(&json!("2025-03-03T09:00:00.000Z")), Some(t0()));
        assert_eq!(timestamp::parse(&json!("2025-03-03T10:00:00+01:00")), Some(t0()));
        assert_eq!(timestamp::parse(&json!("2025-03-03T09:00:00")), Some(t0()));
        assert_eq!(timestamp::parse(&json!(t0().timestamp_millis())), Some(t0()));
        assert_eq!(timestamp::parse(&json!("yesterday")), None);
        assert_eq!(timestamp::parse(&json!(null)), None);
    }

    #[test]
    fn garbage_optional_timestamp_decodes_as_none() {
        let settings: WageSettings = serde_json::from_str(
            r#"{"grossWage": 20, "startDate": "2025-03-03T09:00:00.000Z",
                "lastSavedTimestamp": "soon"}"#,
        )
        .unwrap();
        assert_eq!(settings.start_date, Some(t0()));
        assert_eq!(settings.last_saved_timestamp, None);
    }

    #[test]
    fn null_numbers_decode_without_losing_the_wage() {
        let settings: WageSettings = serde_json::from_str(
            r#"{"grossWage": 20, "age": null, "hoursPerWeek": "forty",
                "lastSavedEarnings": null, "startDate": "2025-03-03T09:00:00.000Z"}"#,
        )
        .unwrap();
        assert_eq!(settings.gross_wage, 20.0);
        assert_eq!(settings.start_date, Some(t0()));
        assert_eq!(settings.age, 0);
        assert_eq!(settings.hours_per_week, 0);
        assert!(settings.last_saved_earnings.is_nan());
    }

    #[test]
    fn checked_rates_rejects_overflow() {
        let model = TaxModel::default();
        let rates = SettingsInput::new(20.0, 40, 30).checked_rates(&model).unwrap();
        assert!((rates.net_wage - 16.179_172_985_781_99).abs() < 1e-9);
        assert!(matches!(
            SettingsInput::new(1.7e308, 168, 30).checked_rates(&model),
            Err(ValidationError::InvalidGrossWage { .. })
        ));
        assert!(SettingsInput::new(20.0, 0, 30).checked_rates(&model).is_err());
    }
}

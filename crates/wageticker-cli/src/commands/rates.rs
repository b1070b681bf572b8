use clap::Args;
use serde::Serialize;
use wageticker_core::money::format_currency;
use wageticker_core::{Config, SettingsInput, TaxBreakdown, TaxModel};

use super::parse_gross;

#[derive(Args)]
pub struct RatesArgs {
    /// Gross hourly wage (e.g. "20.00" or "20,00")
    #[arg(long)]
    gross: String,
    /// Contract hours per week
    #[arg(long)]
    hours: Option<u32>,
    /// Age in years
    #[arg(long)]
    age: Option<u32>,
    /// Include the illustrative daily tax breakdown
    #[arg(long)]
    breakdown: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RatesOutput {
    gross_wage: f64,
    net_wage: f64,
    second_rate: f64,
    hours_per_week: u32,
    net_wage_display: String,
    second_rate_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<TaxBreakdown>,
}

pub fn run(args: RatesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let input = SettingsInput::new(
        parse_gross(&args.gross)?,
        args.hours.unwrap_or(config.defaults.hours_per_week),
        args.age.unwrap_or(config.defaults.age),
    );
    let rates = input.checked_rates(&TaxModel::default())?;

    let symbol = &config.display.currency_symbol;
    let output = RatesOutput {
        gross_wage: input.gross_wage,
        net_wage: rates.net_wage,
        second_rate: rates.second_rate,
        hours_per_week: input.hours_per_week,
        net_wage_display: format_currency(
            rates.net_wage,
            symbol,
            config.display.earnings_decimals,
        ),
        second_rate_display: format_currency(
            rates.second_rate,
            symbol,
            config.display.rate_decimals,
        ),
        breakdown: args
            .breakdown
            .then(|| TaxBreakdown::for_hourly(input.gross_wage)),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

use chrono::Utc;
use clap::Subcommand;
use tracing::warn;
use wageticker_core::{Config, SettingsInput};

use super::{open_tracker, parse_gross};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Apply a new wage; the running period moves to history
    Apply {
        /// Gross hourly wage (e.g. "20.00" or "20,00")
        #[arg(long)]
        gross: String,
        /// Contract hours per week
        #[arg(long)]
        hours: Option<u32>,
        /// Age in years
        #[arg(long)]
        age: Option<u32>,
    },
    /// Print the active settings as JSON
    Show,
}

pub fn run(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut tracker = open_tracker(&config)?;

    match action {
        SettingsAction::Apply { gross, hours, age } => {
            let input = SettingsInput::new(
                parse_gross(&gross)?,
                hours.unwrap_or(config.defaults.hours_per_week),
                age.unwrap_or(config.defaults.age),
            );
            let applied = tracker.apply_settings(input, Utc::now())?;
            if let Some(message) = &applied.save_error {
                warn!(error = %message, "settings active but not saved");
            }
            println!("{}", serde_json::to_string_pretty(&applied.event)?);
        }
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(tracker.settings())?);
        }
    }
    Ok(())
}

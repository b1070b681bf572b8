pub mod config;
pub mod history;
pub mod rates;
pub mod settings;
pub mod status;
pub mod watch;

use wageticker_core::error::Result;
use wageticker_core::money::parse_localized;
use wageticker_core::{Config, Database, PersistenceStore, ValidationError, WageTracker};

/// Open the tracker on the on-disk database under the configured key.
pub fn open_tracker(config: &Config) -> Result<WageTracker<Database>> {
    let db = Database::open()?;
    let store = PersistenceStore::with_key(db, config.storage.record_key.clone());
    Ok(WageTracker::open(store))
}

/// Gross wage as typed, with either decimal separator.
pub fn parse_gross(input: &str) -> Result<f64, ValidationError> {
    parse_localized(input).ok_or_else(|| ValidationError::InvalidValue {
        field: "grossWage".to_string(),
        message: format!("'{input}' is not a number"),
    })
}

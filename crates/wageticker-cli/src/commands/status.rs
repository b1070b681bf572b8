use chrono::Utc;
use wageticker_core::Config;

use super::open_tracker;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let tracker = open_tracker(&config)?;
    let snapshot = tracker.snapshot(Utc::now());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

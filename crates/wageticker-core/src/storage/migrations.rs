//! Schema migrations.
//!
//! Two schemas evolve independently:
//! - the SQLite schema, versioned in the `schema_version` table and applied
//!   when the database is opened;
//! - the JSON record, versioned by its `schemaVersion` field and upgraded in
//!   memory on every read. Records from the browser app carry no version and
//!   are treated as version 1.

use rusqlite::{Connection, Result as SqliteResult};
use serde_json::Value;
use tracing::warn;

use crate::error::PersistenceError;
use crate::model::{
    HistoryEntry, PersistedRecord, Rates, WageSettings, DEFAULT_AGE, DEFAULT_HOURS_PER_WEEK,
    MAX_HOURS_PER_WEEK,
};
use crate::tax::TaxModel;

/// Version written into every record this crate saves.
pub const RECORD_SCHEMA_VERSION: u32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the key-value table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: track when each key was last written.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_updated_at: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('kv') WHERE name = 'updated_at'",
            [],
            |row| row.get::<_, i32>(0),
        )
        .unwrap_or(0)
        > 0;

    if !has_updated_at {
        tx.execute_batch("ALTER TABLE kv ADD COLUMN updated_at TEXT NOT NULL DEFAULT '';")?;
    }

    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// A record read from storage and brought up to the current shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpgrade {
    pub record: PersistedRecord,
    pub from_version: u32,
    /// Human-readable notes about fields that had to be defaulted or dropped.
    pub repairs: Vec<String>,
}

/// Decode a stored record, upgrading legacy shapes.
///
/// Only an undecodable document is an error. Missing or invalid fields are
/// defaulted, derived rates are recomputed when absent, and history entries
/// that cannot be read are skipped; each such repair is listed in the result.
///
/// # Errors
/// Returns [`PersistenceError::Corrupt`] if `raw` is not a JSON object.
pub fn upgrade_record(
    key: &str,
    raw: &str,
    tax: &TaxModel,
) -> Result<RecordUpgrade, PersistenceError> {
    let corrupt = |message: String| PersistenceError::Corrupt {
        key: key.to_string(),
        message,
    };

    let value: Value = serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| corrupt("expected a JSON object".to_string()))?;

    let from_version = obj
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(1);

    let mut repairs = Vec::new();

    let mut settings = match obj.get("settings") {
        None | Some(Value::Null) => WageSettings::default(),
        Some(raw_settings) => match serde_json::from_value::<WageSettings>(raw_settings.clone()) {
            Ok(settings) => settings,
            Err(e) => {
                repairs.push(format!("settings unreadable ({e}); using defaults"));
                WageSettings::default()
            }
        },
    };
    repair_settings(&mut settings, tax, &mut repairs);

    let history = match obj.get("history") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                match serde_json::from_value::<HistoryEntry>(item.clone()) {
                    Ok(mut entry) => {
                        repair_history_entry(index, &mut entry, &mut repairs);
                        Some(entry)
                    }
                    Err(e) => {
                        repairs.push(format!("history entry {index} skipped ({e})"));
                        None
                    }
                }
            })
            .collect(),
        Some(_) => {
            repairs.push("history is not a list; dropped".to_string());
            Vec::new()
        }
    };

    Ok(RecordUpgrade {
        record: PersistedRecord {
            schema_version: RECORD_SCHEMA_VERSION,
            settings,
            history,
        },
        from_version,
        repairs,
    })
}

fn repair_history_entry(index: usize, entry: &mut HistoryEntry, repairs: &mut Vec<String>) {
    if entry.hours_per_week == 0 {
        entry.hours_per_week = DEFAULT_HOURS_PER_WEEK;
    }
    if entry.age == 0 {
        entry.age = DEFAULT_AGE;
    }
    for (name, value) in [
        ("grossWage", &mut entry.gross_wage),
        ("netWage", &mut entry.net_wage),
        ("lastSavedEarnings", &mut entry.last_saved_earnings),
    ] {
        if !value.is_finite() {
            repairs.push(format!("history entry {index}: {name} invalid; using 0"));
            *value = 0.0;
        }
    }
}

fn repair_settings(settings: &mut WageSettings, tax: &TaxModel, repairs: &mut Vec<String>) {
    if settings.hours_per_week == 0 || settings.hours_per_week > MAX_HOURS_PER_WEEK {
        repairs.push(format!(
            "hoursPerWeek {} out of range; using {DEFAULT_HOURS_PER_WEEK}",
            settings.hours_per_week
        ));
        settings.hours_per_week = DEFAULT_HOURS_PER_WEEK;
    }
    if settings.age == 0 {
        settings.age = DEFAULT_AGE;
    }
    if !settings.gross_wage.is_finite() || settings.gross_wage < 0.0 {
        repairs.push("grossWage invalid; settings reset".to_string());
        *settings = WageSettings::default();
        return;
    }

    if settings.gross_wage > 0.0 {
        let fresh = Rates::derive(tax, settings.gross_wage, settings.hours_per_week, settings.age);
        if !(settings.net_wage.is_finite() && settings.net_wage > 0.0) {
            repairs.push("netWage missing; recomputed".to_string());
            settings.net_wage = fresh.net_wage;
        }
        if !(settings.second_rate.is_finite() && settings.second_rate > 0.0) {
            repairs.push("secondRate missing; recomputed".to_string());
            settings.second_rate = crate::accrual::earnings_per_second(
                settings.net_wage,
                f64::from(settings.hours_per_week),
            );
        }
    } else {
        if !settings.net_wage.is_finite() {
            settings.net_wage = 0.0;
        }
        if !settings.second_rate.is_finite() {
            settings.second_rate = 0.0;
        }
    }

    if !(settings.last_saved_earnings.is_finite() && settings.last_saved_earnings >= 0.0) {
        repairs.push("lastSavedEarnings invalid; checkpoint dropped".to_string());
        settings.last_saved_earnings = 0.0;
        settings.last_saved_timestamp = None;
    }
    if let (Some(start), Some(saved)) = (settings.start_date, settings.last_saved_timestamp) {
        if saved < start {
            repairs.push("checkpoint predates startDate; checkpoint dropped".to_string());
            settings.last_saved_earnings = 0.0;
            settings.last_saved_timestamp = None;
        }
    }
}

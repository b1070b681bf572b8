//! Checkpointing persistence for settings and history.
//!
//! Loading never fails: a missing record yields defaults, and an unreadable
//! one is logged and replaced by defaults. Saving always stamps a fresh
//! checkpoint first, so every successful save is a valid resumption point.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::migrations::{self, RECORD_SCHEMA_VERSION};
use super::StateBackend;
use crate::accrual::EarningsCheckpoint;
use crate::error::PersistenceError;
use crate::model::{timestamp, HistoryEntry, WageSettings};
use crate::tax::TaxModel;

/// Key the browser app stored its state under.
pub const DEFAULT_RECORD_KEY: &str = "earningsAppData";

/// How a load went.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// Nothing stored yet.
    Fresh,
    /// Record read; `repairs` lists fields that had to be defaulted.
    Restored { from_version: u32, repairs: Vec<String> },
    /// Storage failed or the record was unreadable; defaults in use.
    Recovered { reason: String },
}

/// Result of [`PersistenceStore::load_with_status`].
#[derive(Debug, Clone)]
pub struct Loaded {
    pub settings: WageSettings,
    pub history: Vec<HistoryEntry>,
    pub status: LoadStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordRef<'a> {
    schema_version: u32,
    settings: &'a WageSettings,
    history: &'a [HistoryEntry],
}

/// Reads and writes the single persisted record through a [`StateBackend`].
pub struct PersistenceStore<B: StateBackend> {
    backend: B,
    key: String,
    tax: TaxModel,
}

impl<B: StateBackend> PersistenceStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_key(backend, DEFAULT_RECORD_KEY)
    }

    pub fn with_key(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            tax: TaxModel::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Model used to recompute rates missing from a loaded record.
    pub fn tax_model(&self) -> &TaxModel {
        &self.tax
    }

    /// Settings and history, falling back to defaults on any problem.
    pub fn load(&self) -> (WageSettings, Vec<HistoryEntry>) {
        let loaded = self.load_with_status();
        (loaded.settings, loaded.history)
    }

    /// Like [`load`](Self::load), also reporting what happened.
    pub fn load_with_status(&self) -> Loaded {
        let raw = match self.backend.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no stored record; starting fresh");
                return Loaded {
                    settings: WageSettings::default(),
                    history: Vec::new(),
                    status: LoadStatus::Fresh,
                };
            }
            Err(e) => return self.recovered(e),
        };

        match migrations::upgrade_record(&self.key, &raw, &self.tax) {
            Ok(upgrade) => {
                for repair in &upgrade.repairs {
                    warn!(key = %self.key, repair = %repair, "stored record repaired");
                }
                info!(
                    key = %self.key,
                    from_version = upgrade.from_version,
                    history = upgrade.record.history.len(),
                    "record loaded"
                );
                Loaded {
                    settings: upgrade.record.settings,
                    history: upgrade.record.history,
                    status: LoadStatus::Restored {
                        from_version: upgrade.from_version,
                        repairs: upgrade.repairs,
                    },
                }
            }
            Err(e) => self.recovered(e),
        }
    }

    fn recovered(&self, err: PersistenceError) -> Loaded {
        error!(key = %self.key, error = %err, "error loading saved data; using defaults");
        Loaded {
            settings: WageSettings::default(),
            history: Vec::new(),
            status: LoadStatus::Recovered {
                reason: err.to_string(),
            },
        }
    }

    /// Stamp a checkpoint at `now` into `settings`, then write everything.
    ///
    /// `now` is truncated to whole milliseconds, the precision the record
    /// stores, so a reload resumes from exactly the stamped instant. The
    /// checkpoint timestamp never moves backwards: if `now` is earlier than
    /// the previous checkpoint, the previous timestamp is reused. The stamp
    /// is kept even when the write fails; it is still correct.
    ///
    /// # Errors
    /// Returns an error if the record cannot be encoded or written, or if
    /// the total is not a finite number.
    pub fn save(
        &self,
        settings: &mut WageSettings,
        history: &[HistoryEntry],
        now: DateTime<Utc>,
    ) -> Result<EarningsCheckpoint, PersistenceError> {
        let now = timestamp::truncate(now);
        let at = match settings.last_saved_timestamp {
            Some(previous) if previous > now => {
                warn!(%previous, %now, "clock moved backwards; keeping previous checkpoint time");
                previous
            }
            _ => now,
        };
        let checkpoint = EarningsCheckpoint::new(settings.accumulated_at(at), at);
        if !checkpoint.accumulated.is_finite() {
            return Err(PersistenceError::Encode(format!(
                "accumulated earnings are not finite ({})",
                checkpoint.accumulated
            )));
        }
        settings.stamp(checkpoint);

        let record = RecordRef {
            schema_version: RECORD_SCHEMA_VERSION,
            settings,
            history,
        };
        let json =
            serde_json::to_string(&record).map_err(|e| PersistenceError::Encode(e.to_string()))?;
        self.backend.write(&self.key, &json)?;

        debug!(
            key = %self.key,
            accumulated = checkpoint.accumulated,
            at = %checkpoint.timestamp,
            "checkpoint saved"
        );
        Ok(checkpoint)
    }

    /// Remove the stored record entirely.
    ///
    /// # Errors
    /// Returns an error if the backend refuses the delete.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.backend.remove(&self.key)
    }
}

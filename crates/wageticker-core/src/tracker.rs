//! Application state: the active wage, its history and the live total.
//!
//! A [`WageTracker`] is owned by whoever drives the UI and lent to the
//! scheduler for each operation. It holds the only copy of the settings and
//! checkpoint, so a settings change and a scheduler flush can never run at
//! the same time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::accrual::EarningsCheckpoint;
use crate::error::{PersistenceError, ValidationError};
use crate::events::Event;
use crate::model::{timestamp, HistoryEntry, Rates, SettingsInput, WageSettings};
use crate::storage::{LoadStatus, PersistenceStore, StateBackend};
use crate::tax::TaxModel;

/// Outcome of [`WageTracker::apply_settings`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedSettings {
    pub rates: Rates,
    /// Set when the new settings are active but could not be written.
    pub save_error: Option<String>,
    pub event: Event,
}

/// Serializable view of the tracker at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub configured: bool,
    pub accumulated: f64,
    pub gross_wage: f64,
    pub net_wage: f64,
    pub second_rate: f64,
    pub hours_per_week: u32,
    pub age: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub checkpoint: Option<EarningsCheckpoint>,
    pub history_len: usize,
    pub at: DateTime<Utc>,
}

pub struct WageTracker<B: StateBackend> {
    store: PersistenceStore<B>,
    tax: TaxModel,
    settings: WageSettings,
    history: Vec<HistoryEntry>,
    current: f64,
    load_status: LoadStatus,
}

impl<B: StateBackend> WageTracker<B> {
    /// Load state from `store`. Never fails; see [`LoadStatus`].
    pub fn open(store: PersistenceStore<B>) -> Self {
        let loaded = store.load_with_status();
        Self {
            current: loaded.settings.last_saved_earnings,
            settings: loaded.settings,
            history: loaded.history,
            load_status: loaded.status,
            tax: *store.tax_model(),
            store,
        }
    }

    pub fn settings(&self) -> &WageSettings {
        &self.settings
    }

    /// Most recent first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Total as of the last refresh, tick or checkpoint.
    pub fn current_earnings(&self) -> f64 {
        self.current
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn store(&self) -> &PersistenceStore<B> {
        &self.store
    }

    /// Replace the active settings, archiving the previous period.
    ///
    /// Invalid input leaves every piece of state untouched. A failed write
    /// does not undo the change; it is reported in
    /// [`AppliedSettings::save_error`].
    pub fn apply_settings(
        &mut self,
        input: SettingsInput,
        now: DateTime<Utc>,
    ) -> Result<AppliedSettings, ValidationError> {
        let rates = input.checked_rates(&self.tax)?;
        let now = self.not_before_checkpoint(timestamp::truncate(now));

        if self.settings.gross_wage > 0.0 {
            let earned = self.settings.accumulated_at(now);
            if let Some(entry) = self.settings.close(earned, now) {
                self.history.insert(0, entry);
            }
        }

        self.settings = WageSettings::start(input, rates, now);
        self.current = 0.0;

        let save_error = match self.store.save(&mut self.settings, &self.history, now) {
            Ok(_) => None,
            Err(e) => {
                error!(error = %e, "error saving settings");
                Some(e.to_string())
            }
        };

        info!(
            gross_wage = input.gross_wage,
            net_wage = rates.net_wage,
            second_rate = rates.second_rate,
            hours_per_week = input.hours_per_week,
            "settings applied"
        );

        Ok(AppliedSettings {
            rates,
            save_error,
            event: Event::SettingsApplied {
                gross_wage: input.gross_wage,
                net_wage: rates.net_wage,
                second_rate: rates.second_rate,
                hours_per_week: input.hours_per_week,
                at: now,
            },
        })
    }

    /// Recompute the live total at `now`.
    ///
    /// The returned total never drops below the previous one for the same
    /// settings, even if the clock steps back.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> f64 {
        self.current = self.settings.accumulated_at(now).max(self.current);
        self.current
    }

    /// Recompute at `now` and write a checkpoint.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written. The in-memory
    /// checkpoint is updated regardless.
    pub fn checkpoint(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<EarningsCheckpoint, PersistenceError> {
        let result = self.store.save(&mut self.settings, &self.history, now);
        self.current = self.current.max(self.settings.last_saved_earnings);
        result
    }

    /// Delete every history entry and save.
    ///
    /// # Errors
    /// Returns an error if the save fails; the in-memory history stays empty.
    pub fn reset_history(&mut self, now: DateTime<Utc>) -> Result<Event, PersistenceError> {
        let removed = self.history.len();
        self.history.clear();
        self.checkpoint(now)?;
        info!(removed, "history reset");
        Ok(Event::HistoryReset { removed, at: now })
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TrackerSnapshot {
        TrackerSnapshot {
            configured: self.settings.is_configured(),
            accumulated: self.settings.accumulated_at(now),
            gross_wage: self.settings.gross_wage,
            net_wage: self.settings.net_wage,
            second_rate: self.settings.second_rate,
            hours_per_week: self.settings.hours_per_week,
            age: self.settings.age,
            start_date: self.settings.start_date,
            checkpoint: self.settings.checkpoint(),
            history_len: self.history.len(),
            at: now,
        }
    }

    fn not_before_checkpoint(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.settings.last_saved_timestamp {
            Some(previous) if previous > now => previous,
            _ => now,
        }
    }
}

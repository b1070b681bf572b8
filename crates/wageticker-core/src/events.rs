use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every state change in the tracker produces an Event.
/// The UI renders them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Scheduler went from Stopped to Running.
    AccrualStarted {
        accumulated: f64,
        second_rate: f64,
        at: DateTime<Utc>,
    },
    /// Periodic display update.
    AccrualTick {
        accumulated: f64,
        at: DateTime<Utc>,
    },
    /// A checkpoint reached storage.
    CheckpointSaved {
        accumulated: f64,
        at: DateTime<Utc>,
    },
    /// A checkpoint could not be written; accrual continues.
    CheckpointFailed {
        message: String,
        at: DateTime<Utc>,
    },
    /// Scheduler went from Running to Stopped.
    AccrualStopped {
        accumulated: f64,
        at: DateTime<Utc>,
    },
    /// New wage settings took effect.
    SettingsApplied {
        gross_wage: f64,
        net_wage: f64,
        second_rate: f64,
        hours_per_week: u32,
        at: DateTime<Utc>,
    },
    /// All history entries were deleted.
    HistoryReset {
        removed: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::AccrualStarted { at, .. }
            | Event::AccrualTick { at, .. }
            | Event::CheckpointSaved { at, .. }
            | Event::CheckpointFailed { at, .. }
            | Event::AccrualStopped { at, .. }
            | Event::SettingsApplied { at, .. }
            | Event::HistoryReset { at, .. } => *at,
        }
    }
}

//! # Wageticker Core Library
//!
//! Business logic for a live wage-earnings ticker. Given an hourly gross
//! wage and a weekly hours commitment, it derives a net hourly wage and a
//! per-second earnings rate, accrues earnings from a start date, and keeps
//! the running total durable through periodic checkpoints. The CLI binary is
//! a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Tax model**: Calibrated linear approximation of Dutch wage tax
//! - **Accrual**: Pure functions from rate, start and checkpoint to a total
//! - **Storage**: One JSON record behind a key-value backend (SQLite or
//!   memory) plus TOML-based configuration
//! - **Scheduler**: Wall-clock state machine that ticks the display and
//!   flushes checkpoints; [`run_accrual_loop`] drives it on tokio
//!
//! ## Key Components
//!
//! - [`WageTracker`]: Active settings, history and live total
//! - [`AccrualScheduler`]: Tick and checkpoint state machine
//! - [`PersistenceStore`]: Load and save the persisted record
//! - [`Config`]: Application configuration management

pub mod accrual;
pub mod error;
pub mod events;
pub mod model;
pub mod money;
pub mod scheduler;
pub mod storage;
pub mod tax;
pub mod tracker;

pub use accrual::{accumulated_earnings, earnings_per_second, EarningsCheckpoint};
pub use error::{ConfigError, CoreError, PersistenceError, ValidationError};
pub use events::Event;
pub use model::{HistoryEntry, PersistedRecord, Rates, SettingsInput, WageSettings};
pub use scheduler::{
    run_accrual_loop, AccrualScheduler, AnchoredClock, Clock, EarningsDisplay, Lifecycle,
    SchedulerConfig, SchedulerState, SystemClock,
};
pub use storage::{
    Config, Database, LoadStatus, MemoryBackend, PersistenceStore, StateBackend,
    DEFAULT_RECORD_KEY,
};
pub use tax::{net_hourly_wage, TaxBreakdown, TaxModel};
pub use tracker::{AppliedSettings, TrackerSnapshot, WageTracker};

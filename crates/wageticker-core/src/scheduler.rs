//! Accrual scheduler.
//!
//! The scheduler is a wall-clock state machine. It does not own a thread;
//! [`AccrualScheduler::tick`] must be called periodically, which
//! [`run_accrual_loop`] does on a single tokio task.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Running -> Stopped
//! ```
//!
//! Every transition to Stopped writes a checkpoint. While Running, each tick
//! pushes the live total to the display and a checkpoint is written once the
//! checkpoint interval has elapsed since the last one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::accrual::elapsed_secs;
use crate::error::PersistenceError;
use crate::events::Event;
use crate::storage::{AccrualConfig, StateBackend};
use crate::tracker::WageTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Receives scheduler output.
pub trait EarningsDisplay {
    /// Called with the live total on every tick.
    fn on_tick(&mut self, accumulated: f64);

    /// Called when a checkpoint could not be written.
    fn on_save_failed(&mut self, _error: &PersistenceError) {}

    /// Called with every event the async loop produces.
    fn on_event(&mut self, _event: &Event) {}
}

/// Source of wall-clock time for the async loop.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock time derived from the tokio clock, anchored at creation.
///
/// Follows paused and advanced time in tokio tests.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
    base: DateTime<Utc>,
    anchor: Instant,
}

impl AnchoredClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            anchor: Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.anchor.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.base + elapsed
    }
}

/// Lifecycle signals from the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Became visible, or the user authenticated.
    Visible,
    /// Went to the background.
    Hidden,
    /// Shutting down; the loop exits after the final checkpoint.
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub checkpoint_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            checkpoint_interval: Duration::from_secs(60),
        }
    }
}

impl From<&AccrualConfig> for SchedulerConfig {
    fn from(config: &AccrualConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            checkpoint_interval: config.checkpoint_interval(),
        }
    }
}

/// Bookkeeping for the one active run.
#[derive(Debug, Clone, Copy)]
struct RunWindow {
    started_at: DateTime<Utc>,
    last_flush_at: DateTime<Utc>,
    ticks: u64,
}

#[derive(Debug, Clone)]
pub struct AccrualScheduler {
    config: SchedulerConfig,
    run: Option<RunWindow>,
}

impl AccrualScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config, run: None }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn state(&self) -> SchedulerState {
        if self.run.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Ticks in the current run.
    pub fn ticks(&self) -> u64 {
        self.run.map(|r| r.ticks).unwrap_or(0)
    }

    /// Begin a run. An active run is stopped first, checkpoint included.
    pub fn start<B: StateBackend>(
        &mut self,
        tracker: &mut WageTracker<B>,
        display: &mut dyn EarningsDisplay,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = self.stop(tracker, display, now);

        let accumulated = tracker.refresh(now);
        display.on_tick(accumulated);
        self.run = Some(RunWindow {
            started_at: now,
            last_flush_at: now,
            ticks: 0,
        });

        info!(accumulated, "accrual started");
        events.push(Event::AccrualStarted {
            accumulated,
            second_rate: tracker.settings().second_rate,
            at: now,
        });
        events
    }

    /// One period. No-op while stopped.
    pub fn tick<B: StateBackend>(
        &mut self,
        tracker: &mut WageTracker<B>,
        display: &mut dyn EarningsDisplay,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let Some(run) = self.run.as_mut() else {
            return Vec::new();
        };

        let accumulated = tracker.refresh(now);
        run.ticks += 1;
        display.on_tick(accumulated);

        let mut events = vec![Event::AccrualTick {
            accumulated,
            at: now,
        }];

        if elapsed_secs(run.last_flush_at, now) >= self.config.checkpoint_interval.as_secs_f64() {
            run.last_flush_at = now;
            events.push(flush(tracker, display, now));
        }
        events
    }

    /// End the run with a final checkpoint. Stopping twice is a no-op.
    pub fn stop<B: StateBackend>(
        &mut self,
        tracker: &mut WageTracker<B>,
        display: &mut dyn EarningsDisplay,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let Some(run) = self.run.take() else {
            return Vec::new();
        };

        let saved = flush(tracker, display, now);
        info!(
            ticks = run.ticks,
            ran_for_secs = elapsed_secs(run.started_at, now),
            "accrual stopped"
        );
        vec![
            saved,
            Event::AccrualStopped {
                accumulated: tracker.current_earnings(),
                at: now,
            },
        ]
    }
}

impl Default for AccrualScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

fn flush<B: StateBackend>(
    tracker: &mut WageTracker<B>,
    display: &mut dyn EarningsDisplay,
    now: DateTime<Utc>,
) -> Event {
    match tracker.checkpoint(now) {
        Ok(checkpoint) => Event::CheckpointSaved {
            accumulated: checkpoint.accumulated,
            at: checkpoint.timestamp,
        },
        Err(e) => {
            warn!(error = %e, "checkpoint failed; accrual continues");
            display.on_save_failed(&e);
            Event::CheckpointFailed {
                message: e.to_string(),
                at: now,
            }
        }
    }
}

fn new_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Drive `scheduler` until [`Lifecycle::Teardown`] arrives or every sender
/// is dropped.
///
/// The scheduler is started on entry. The loop owns the only interval; a
/// `Visible` signal replaces it and `Hidden` drops it. Every produced event
/// is forwarded to `display`.
pub async fn run_accrual_loop<B: StateBackend, C: Clock>(
    scheduler: &mut AccrualScheduler,
    tracker: &mut WageTracker<B>,
    display: &mut dyn EarningsDisplay,
    clock: &C,
    mut lifecycle: mpsc::Receiver<Lifecycle>,
) {
    let period = scheduler.config().tick_interval;

    let events = scheduler.start(tracker, display, clock.now());
    forward(display, &events);
    let mut interval = Some(new_interval(period));

    loop {
        tokio::select! {
            biased;

            signal = lifecycle.recv() => {
                let signal = signal.unwrap_or(Lifecycle::Teardown);
                debug!(?signal, "lifecycle signal");
                match signal {
                    Lifecycle::Visible => {
                        let events = scheduler.start(tracker, display, clock.now());
                        forward(display, &events);
                        interval = Some(new_interval(period));
                    }
                    Lifecycle::Hidden => {
                        interval = None;
                        let events = scheduler.stop(tracker, display, clock.now());
                        forward(display, &events);
                    }
                    Lifecycle::Teardown => {
                        let events = scheduler.stop(tracker, display, clock.now());
                        forward(display, &events);
                        break;
                    }
                }
            }
            _ = next_tick(&mut interval) => {
                let events = scheduler.tick(tracker, display, clock.now());
                forward(display, &events);
            }
        }
    }
}

fn forward(display: &mut dyn EarningsDisplay, events: &[Event]) {
    for event in events {
        display.on_event(event);
    }
}

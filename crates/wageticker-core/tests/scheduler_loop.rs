//! Async accrual loop tests on paused tokio time.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;
use tokio::time::sleep;

use wageticker_core::{
    run_accrual_loop, AccrualScheduler, AnchoredClock, EarningsDisplay, Event, Lifecycle,
    MemoryBackend, PersistenceStore, SettingsInput, WageTracker,
};

#[derive(Default)]
struct Recorder {
    shown: Vec<f64>,
    events: Vec<Event>,
}

impl EarningsDisplay for Recorder {
    fn on_tick(&mut self, accumulated: f64) {
        self.shown.push(accumulated);
    }

    fn on_event(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}

impl Recorder {
    fn ticks(&self) -> Vec<DateTime<Utc>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::AccrualTick { at, .. } => Some(*at),
                _ => None,
            })
            .collect()
    }

    fn last_stopped(&self) -> Option<f64> {
        self.events.iter().rev().find_map(|e| match e {
            Event::AccrualStopped { accumulated, .. } => Some(*accumulated),
            _ => None,
        })
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
}

fn configured() -> WageTracker<MemoryBackend> {
    let mut tracker = WageTracker::open(PersistenceStore::new(MemoryBackend::new()));
    tracker
        .apply_settings(SettingsInput::new(20.0, 40, 30), t0())
        .unwrap();
    tracker
}

#[tokio::test(start_paused = true)]
async fn test_loop_ticks_and_flushes_until_teardown() {
    let mut tracker = configured();
    let baseline = tracker.store().backend().write_count();
    let rate = tracker.settings().second_rate;

    let clock = AnchoredClock::new(t0());
    let mut scheduler = AccrualScheduler::default();
    let mut display = Recorder::default();
    let (tx, rx) = mpsc::channel(4);

    let driver = async move {
        sleep(Duration::from_millis(125_500)).await;
        tx.send(Lifecycle::Teardown).await.unwrap();
    };
    tokio::join!(
        run_accrual_loop(&mut scheduler, &mut tracker, &mut display, &clock, rx),
        driver
    );

    assert!(!scheduler.is_running());
    // Flushes at 60s and 120s plus the final one.
    assert_eq!(tracker.store().backend().write_count(), baseline + 3);

    let ticks = display.ticks().len();
    assert!((124..=126).contains(&ticks), "ticks = {ticks}");
    assert!(display.shown.windows(2).all(|w| w[1] >= w[0]));

    let stopped = display.last_stopped().unwrap();
    assert!((stopped - rate * 125.5).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_pauses_ticks_but_not_accrual() {
    let mut tracker = configured();
    let baseline = tracker.store().backend().write_count();
    let rate = tracker.settings().second_rate;

    let clock = AnchoredClock::new(t0());
    let mut scheduler = AccrualScheduler::default();
    let mut display = Recorder::default();
    let (tx, rx) = mpsc::channel(4);

    let driver = async move {
        sleep(Duration::from_millis(10_500)).await;
        tx.send(Lifecycle::Hidden).await.unwrap();
        sleep(Duration::from_secs(10)).await;
        tx.send(Lifecycle::Visible).await.unwrap();
        sleep(Duration::from_millis(9_700)).await;
        tx.send(Lifecycle::Teardown).await.unwrap();
    };
    tokio::join!(
        run_accrual_loop(&mut scheduler, &mut tracker, &mut display, &clock, rx),
        driver
    );

    // One flush when hidden, one on teardown.
    assert_eq!(tracker.store().backend().write_count(), baseline + 2);

    let hidden_from = t0() + chrono::Duration::milliseconds(10_500);
    let hidden_until = t0() + chrono::Duration::milliseconds(20_500);
    let ticks = display.ticks();
    assert!(ticks.iter().all(|at| *at <= hidden_from || *at >= hidden_until));
    assert!((18..=20).contains(&ticks.len()), "ticks = {}", ticks.len());

    let stopped = display.last_stopped().unwrap();
    assert!((stopped - rate * 30.2).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_sender_stops_with_final_checkpoint() {
    let mut tracker = configured();
    let baseline = tracker.store().backend().write_count();

    let clock = AnchoredClock::new(t0());
    let mut scheduler = AccrualScheduler::default();
    let mut display = Recorder::default();
    let (tx, rx) = mpsc::channel(1);

    let driver = async move {
        sleep(Duration::from_millis(3_500)).await;
        drop(tx);
    };
    tokio::join!(
        run_accrual_loop(&mut scheduler, &mut tracker, &mut display, &clock, rx),
        driver
    );

    assert_eq!(tracker.store().backend().write_count(), baseline + 1);
    assert!(matches!(
        display.events.last(),
        Some(Event::AccrualStopped { .. })
    ));
}

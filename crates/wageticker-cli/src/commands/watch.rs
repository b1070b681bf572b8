use std::io::Write;

use tokio::sync::mpsc;
use tracing::warn;
use wageticker_core::money::format_currency;
use wageticker_core::{
    run_accrual_loop, AccrualScheduler, Config, EarningsDisplay, Event, Lifecycle,
    PersistenceError, SchedulerConfig, SystemClock,
};

use super::open_tracker;

/// Prints one formatted total per tick and asks the loop to stop once the
/// tick budget is spent.
struct CliDisplay {
    symbol: String,
    decimals: usize,
    ticks_left: Option<u64>,
    lifecycle: mpsc::Sender<Lifecycle>,
}

impl EarningsDisplay for CliDisplay {
    fn on_tick(&mut self, accumulated: f64) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", format_currency(accumulated, &self.symbol, self.decimals));
        let _ = out.flush();
    }

    fn on_save_failed(&mut self, error: &PersistenceError) {
        warn!(error = %error, "earnings could not be saved");
    }

    fn on_event(&mut self, event: &Event) {
        match event {
            Event::AccrualTick { .. } => {
                if let Some(left) = self.ticks_left.as_mut() {
                    *left = left.saturating_sub(1);
                    if *left == 0 {
                        let _ = self.lifecycle.try_send(Lifecycle::Teardown);
                    }
                }
            }
            Event::AccrualStopped { accumulated, .. } => {
                eprintln!(
                    "stopped at {}",
                    format_currency(*accumulated, &self.symbol, self.decimals)
                );
            }
            _ => {}
        }
    }
}

pub fn run(ticks: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut tracker = open_tracker(&config)?;
    if !tracker.settings().is_configured() {
        return Err("no wage configured; run `settings apply --gross <wage>` first".into());
    }
    if ticks == Some(0) {
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let (tx, rx) = mpsc::channel(4);

        let interrupt = tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = interrupt.send(Lifecycle::Teardown).await;
            }
        });

        let mut display = CliDisplay {
            symbol: config.display.currency_symbol.clone(),
            decimals: config.display.earnings_decimals,
            ticks_left: ticks,
            lifecycle: tx,
        };
        let mut scheduler = AccrualScheduler::new(SchedulerConfig::from(&config.accrual));
        run_accrual_loop(&mut scheduler, &mut tracker, &mut display, &SystemClock, rx).await;
    });
    Ok(())
}

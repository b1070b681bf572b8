use std::io::{self, BufRead, Write};

use chrono::Utc;
use clap::Subcommand;
use wageticker_core::Config;

use super::open_tracker;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List past wage periods, most recent first
    List,
    /// Delete all past wage periods
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Ask on stderr and run `on_confirm` only if the answer is yes.
fn confirm<F>(prompt: &str, assume_yes: bool, on_confirm: F) -> CmdResult
where
    F: FnOnce() -> CmdResult,
{
    if !assume_yes {
        eprint!("{prompt} [y/N] ");
        io::stderr().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes" | "Yes") {
            eprintln!("cancelled");
            return Ok(());
        }
    }
    on_confirm()
}

pub fn run(action: HistoryAction) -> CmdResult {
    let config = Config::load_or_default();
    let mut tracker = open_tracker(&config)?;

    match action {
        HistoryAction::List => {
            println!("{}", serde_json::to_string_pretty(tracker.history())?);
        }
        HistoryAction::Reset { yes } => {
            let count = tracker.history().len();
            confirm(
                &format!("Delete {count} history entries?"),
                yes,
                || {
                    let event = tracker.reset_history(Utc::now())?;
                    println!("{}", serde_json::to_string_pretty(&event)?);
                    Ok(())
                },
            )?;
        }
    }
    Ok(())
}

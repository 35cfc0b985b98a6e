//! State tree CLI commands.

use clap::Subcommand;
use serde_json::Value;

use seatplan::state::StateStore;

use crate::error::CliError;
use crate::runner::{CliRunner, ConfigSource};

/// State subcommands.
#[derive(Debug, Subcommand)]
pub enum StateAction {
    /// Print the persisted state tree, or one value by dotted path
    Show {
        /// Dotted path (e.g., processing.status)
        path: Option<String>,

        /// Print the status summary instead of the whole tree
        #[arg(long, conflicts_with = "path")]
        summary: bool,
    },

    /// Reset the state tree to its defaults
    Reset {
        /// Only return the per-run keys to idle; keep sessions and hardware
        #[arg(long)]
        run_only: bool,
    },
}

/// Run a state subcommand.
pub fn run(action: StateAction, source: &ConfigSource, debug: bool) -> Result<(), CliError> {
    match action {
        StateAction::Show { path, summary } => {
            let config = source.load()?;
            let store = StateStore::open(config.state.file.clone());
            let value = match (path, summary) {
                (_, true) => Some(store.system_status()),
                (Some(path), false) => store.get(&path),
                (None, false) => Some(store.snapshot()),
            };
            print_value(value.as_ref());
            Ok(())
        }
        StateAction::Reset { run_only } => {
            let runner = CliRunner::new(source, debug)?;
            runner.log_startup("state reset");
            let store = runner.open_store();
            if run_only {
                store.reset_session_keys();
            } else {
                store.reset();
            }
            store.persist()?;
            println!(
                "State {} ({})",
                if run_only { "returned to idle" } else { "reset" },
                runner.config().state.file.display()
            );
            Ok(())
        }
    }
}

fn print_value(value: Option<&Value>) {
    match value {
        None => println!("(not set)"),
        Some(Value::String(text)) => println!("{}", text),
        Some(other) => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}

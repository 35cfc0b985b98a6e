//! Seatplan CLI - Command-line interface
//!
//! This binary provides a command-line interface to the seatplan library:
//! full analysis sessions, plan encoding, controller access, and state and
//! configuration management.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::devices::DevicesAction;
use commands::state::StateAction;
use error::CliError;
use runner::ConfigSource;

#[derive(Parser)]
#[command(name = "seatplan")]
#[command(version = seatplan::VERSION)]
#[command(about = "Plan seat placement from a scene and drive the seat cells", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.seatplan/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging, echoed to stdout
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full session: analyze the scene, encode the plan, dispatch it
    Run {
        /// Number of people to seat
        #[arg(long)]
        people: u32,

        /// Scene image path or URL
        #[arg(long)]
        image: String,

        /// Scenario name; also names the result report
        #[arg(long)]
        scenario: String,

        /// Directory of canned analysis replies (overrides replay.directory)
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Never open the controllers; the command is dry-run
        #[arg(long)]
        no_hardware: bool,

        /// Print progress events while the session runs
        #[arg(long)]
        watch: bool,
    },

    /// Print the 16 digit command for a placement plan
    Encode {
        /// Plan JSON file, or - for stdin
        #[arg(long)]
        plan: String,

        /// Also print each cell's chunk and actions
        #[arg(long)]
        chunks: bool,
    },

    /// Cell controller discovery and manual control
    Devices {
        #[command(subcommand)]
        action: DevicesAction,
    },

    /// Inspect or reset the persisted state
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let source = ConfigSource::new(cli.config);

    let result: Result<(), CliError> = match cli.command {
        Commands::Run {
            people,
            image,
            scenario,
            replay,
            no_hardware,
            watch,
        } => commands::run::run(
            commands::run::RunArgs {
                people,
                image,
                scenario,
                replay,
                no_hardware,
                watch,
            },
            &source,
            cli.debug,
        ),
        Commands::Encode { plan, chunks } => {
            commands::encode::run(commands::encode::EncodeArgs { plan, chunks })
        }
        Commands::Devices { action } => commands::devices::run(action, &source, cli.debug),
        Commands::State { action } => commands::state::run(action, &source, cli.debug),
        Commands::Config { command } => commands::config::run(command, &source),
    };

    if let Err(e) = result {
        e.exit();
    }
}

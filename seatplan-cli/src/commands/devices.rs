//! Cell controller CLI commands.
//!
//! Every command except `list` connects to the controllers that are present,
//! performs one action and closes the links again.

use clap::Subcommand;
use tracing::info;

use seatplan::codec::{CellId, EncodedCommand};
use seatplan::device::{DeviceLinkManager, MANUAL_KEYS, RESET_TOKEN};

use super::common::{parse_cell, print_connect, print_dispatch};
use crate::error::CliError;
use crate::runner::{CliRunner, ConfigSource};

/// Devices subcommands.
#[derive(Debug, Subcommand)]
pub enum DevicesAction {
    /// Show the identity table and which controllers are plugged in
    List,

    /// Send a 16 digit command, one 4 digit chunk per cell
    Send {
        /// Command digits (e.g., 1000000000010000)
        code: String,
    },

    /// Send the same token to every connected controller
    Broadcast {
        /// Token to send
        token: String,
    },

    /// Send one manual key to a single cell
    Manual {
        /// Cell number (1-4)
        #[arg(value_parser = parse_cell)]
        cell: CellId,

        /// Key to send (one of Q A W S E D R F V T G B)
        key: String,
    },

    /// Broadcast the reset token to every connected controller
    Reset,
}

/// Run a devices subcommand.
pub fn run(action: DevicesAction, source: &ConfigSource, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(source, debug)?;
    runner.log_startup("devices");
    let manager = runner.device_manager()?;

    match action {
        DevicesAction::List => run_list(&manager),
        DevicesAction::Send { code } => {
            let command: EncodedCommand = code.parse()?;
            with_links(&manager, |m| {
                print_dispatch(&m.dispatch(&command));
                Ok(())
            })
        }
        DevicesAction::Broadcast { token } => with_links(&manager, |m| {
            print_dispatch(&m.broadcast(&token)?);
            Ok(())
        }),
        DevicesAction::Manual { cell, key } => with_links(&manager, |m| {
            let sent = m.send_to_cell(cell, &key).map_err(|e| match e {
                seatplan::device::DeviceError::InvalidCommand(_) => CliError::InvalidInput(
                    format!("Unknown manual key '{}'. Valid keys: {}", key, MANUAL_KEYS),
                ),
                other => CliError::Device(other),
            })?;
            println!("Sent '{}' to cell {}", sent, cell);
            Ok(())
        }),
        DevicesAction::Reset => with_links(&manager, |m| {
            info!(token = RESET_TOKEN, "Resetting controllers");
            print_dispatch(&m.reset());
            Ok(())
        }),
    }
}

fn run_list(manager: &DeviceLinkManager) -> Result<(), CliError> {
    let ports = manager.scan()?;

    println!("Cell Controllers");
    println!("================");
    for identity in manager.identities().iter() {
        let port = ports
            .iter()
            .find(|(_, cell)| *cell == Some(identity.cell))
            .map(|(port, _)| port.port_name.as_str());
        match port {
            Some(port) => println!("  cell {}  {}  present on {}", identity.cell, identity.serial, port),
            None => println!("  cell {}  {}  not found", identity.cell, identity.serial),
        }
    }

    let others: Vec<_> = ports.iter().filter(|(_, cell)| cell.is_none()).collect();
    if !others.is_empty() {
        println!();
        println!("Other serial ports:");
        for (port, _) in others {
            println!(
                "  {}  serial {}",
                port.port_name,
                port.serial_number.as_deref().unwrap_or("(none)")
            );
        }
    }
    Ok(())
}

/// Connect, run `f`, then always close the links.
fn with_links(
    manager: &DeviceLinkManager,
    f: impl FnOnce(&DeviceLinkManager) -> Result<(), CliError>,
) -> Result<(), CliError> {
    print_connect(&manager.discover_and_connect());
    let result = f(manager);
    manager.shutdown();
    result
}

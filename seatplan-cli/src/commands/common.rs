//! Common types and utilities shared across CLI commands.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use seatplan::codec::{CellId, CELL_COUNT};
use seatplan::device::{ChunkResult, ConnectReport, DispatchOutcome, EndpointStatus};

use crate::error::CliError;

/// Parse a cell number argument (1 to 4).
pub fn parse_cell(s: &str) -> Result<CellId, String> {
    s.trim()
        .parse::<u8>()
        .ok()
        .and_then(CellId::new)
        .ok_or_else(|| format!("cell must be a number from 1 to {}", CELL_COUNT))
}

/// Read a file argument, with `-` meaning stdin.
pub fn read_input(source: &str) -> Result<String, CliError> {
    if source == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|error| CliError::FileRead {
                path: PathBuf::from("<stdin>"),
                error,
            })?;
        return Ok(text);
    }
    fs::read_to_string(source).map_err(|error| CliError::FileRead {
        path: PathBuf::from(source),
        error,
    })
}

/// Print one line per controller of a connect pass.
pub fn print_connect(report: &ConnectReport) {
    println!(
        "Controllers connected: {}/{}",
        report.live_count(),
        report.endpoints.len()
    );
    for (cell, serial, status) in &report.endpoints {
        let detail = match status {
            EndpointStatus::Connected { port } => format!("connected on {}", port),
            EndpointStatus::NotFound => "not found".to_string(),
            EndpointStatus::Failed { port, reason } => format!("failed on {}: {}", port, reason),
        };
        println!("  cell {} ({}): {}", cell, serial, detail);
    }
}

/// Print what a dispatch or broadcast did.
pub fn print_dispatch(outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::DryRun { payload } => {
            println!("Nothing delivered to the controllers, dry run: {}", payload);
        }
        DispatchOutcome::Sent(report) => {
            println!(
                "Sent to {}/{} controllers",
                report.sent_count(),
                report.results.len()
            );
            for (cell, result) in &report.results {
                match result {
                    ChunkResult::Sent { payload } => println!("  cell {}: {}", cell, payload),
                    ChunkResult::Skipped => println!("  cell {}: not connected", cell),
                    ChunkResult::Failed { reason } => println!("  cell {}: FAILED ({})", cell, reason),
                }
            }
        }
    }
}

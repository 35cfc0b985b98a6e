//! Encode command - print the wire command for a placement plan.

use seatplan::codec::{encode_reply, CellId};

use super::common::read_input;
use crate::error::CliError;

/// Arguments for the encode command.
pub struct EncodeArgs {
    /// Plan file, or `-` for stdin
    pub plan: String,
    /// Also print each cell's chunk and actions
    pub chunks: bool,
}

/// Run the encode command.
///
/// Accepts anything the `encode_command` stage accepts: plain JSON, a
/// fenced block inside prose, `{"task_sequence": ...}` or a bare cell map.
pub fn run(args: EncodeArgs) -> Result<(), CliError> {
    let text = read_input(&args.plan)?;
    let (plan, command) = encode_reply(&text)?;

    println!("{}", command);

    if args.chunks {
        for cell in CellId::all() {
            let actions: Vec<String> = plan.cell(cell).iter().map(|a| a.to_string()).collect();
            let actions = if actions.is_empty() {
                "unchanged".to_string()
            } else {
                actions.join("; ")
            };
            println!("  cell {}: {}  {}", cell, command.chunk(cell), actions);
        }
    }

    Ok(())
}

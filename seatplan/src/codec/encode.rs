//! Plan encoding.

use tracing::{debug, warn};

use super::command::EncodedCommand;
use super::error::CodecError;
use super::extract::extract_json_text;
use super::plan::{CellId, PlacementPlan};
use super::token::ActionToken;

/// Highest value a cell chunk can carry.
const MAX_CELL_VALUE: i64 = 9999;

/// Four digit code for one cell's actions.
///
/// Sum of the action codes minus the number of `unfold` actions. An empty
/// list encodes as `0000`.
pub fn encode_cell(cell: CellId, actions: &[ActionToken]) -> Result<String, CodecError> {
    let sum: i64 = actions.iter().map(|a| i64::from(a.code())).sum();
    let unfolds = actions
        .iter()
        .filter(|a| matches!(a, ActionToken::Unfold))
        .count() as i64;
    let value = sum - unfolds;

    if value < 0 {
        return Err(CodecError::CellUnderflow { cell, value });
    }
    if value > MAX_CELL_VALUE {
        return Err(CodecError::CellOverflow { cell, value });
    }
    Ok(format!("{value:04}"))
}

/// Encode a plan into its 16 digit command.
///
/// Deterministic and free of I/O. Fails without a partial result if any
/// cell is out of range.
pub fn encode(plan: &PlacementPlan) -> Result<EncodedCommand, CodecError> {
    let mut digits = String::with_capacity(super::COMMAND_WIDTH);
    for cell in CellId::all() {
        digits.push_str(&encode_cell(cell, plan.cell(cell))?);
    }
    EncodedCommand::new(digits)
}

/// Encode the plan contained in a free-text reply.
///
/// An empty reply is an all-unchanged plan. Otherwise the JSON is extracted
/// with [`extract_json_text`] and parsed with [`PlacementPlan::from_json_str`].
pub fn encode_reply(reply: &str) -> Result<(PlacementPlan, EncodedCommand), CodecError> {
    let plan = if reply.trim().is_empty() {
        warn!("Empty plan reply, using an all-unchanged plan");
        PlacementPlan::new()
    } else {
        PlacementPlan::from_json_str(&extract_json_text(reply))?
    };
    let command = encode(&plan)?;
    debug!(command = %command, "Plan encoded");
    Ok((plan, command))
}

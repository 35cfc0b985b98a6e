//! Codec errors.

use thiserror::Error;

use super::plan::CellId;

/// Errors raised while building a plan or encoding it.
///
/// None of these produce a partial command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Token does not have the `name` or `name(param)` shape
    #[error("malformed action token '{token}'")]
    Parse { token: String },

    /// Unknown action name, or a parameter outside the action's table
    #[error("invalid action '{token}': {reason}")]
    Validation { token: String, reason: String },

    /// Cell code does not fit in four digits
    #[error("cell {cell} encodes to {value}, above 9999")]
    CellOverflow { cell: CellId, value: i64 },

    /// Cell code is negative (more unfolds than the other codes cover)
    #[error("cell {cell} encodes to {value}, below 0")]
    CellUnderflow { cell: CellId, value: i64 },

    /// Plan JSON has the wrong shape
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

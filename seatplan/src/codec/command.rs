//! The 16 digit wire command.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::error::CodecError;
use super::plan::{CellId, CELL_COUNT};

/// Digits per cell.
pub const CHUNK_WIDTH: usize = 4;

/// Digits per command.
pub const COMMAND_WIDTH: usize = CHUNK_WIDTH * CELL_COUNT;

/// Exactly 16 ASCII digits; four 4-digit chunks in cell order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedCommand(String);

impl EncodedCommand {
    /// Validate a command string.
    pub fn new(digits: impl Into<String>) -> Result<Self, CodecError> {
        let digits = digits.into();
        if digits.len() != COMMAND_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::Parse { token: digits });
        }
        Ok(Self(digits))
    }

    /// All cells unchanged.
    pub fn idle() -> Self {
        Self("0".repeat(COMMAND_WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The four chunks, cell 1 first.
    pub fn chunks(&self) -> [&str; CELL_COUNT] {
        std::array::from_fn(|i| &self.0[i * CHUNK_WIDTH..(i + 1) * CHUNK_WIDTH])
    }

    /// Chunk addressed to `cell`.
    pub fn chunk(&self, cell: CellId) -> &str {
        self.chunks()[cell.index()]
    }
}

impl FromStr for EncodedCommand {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl fmt::Display for EncodedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for EncodedCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

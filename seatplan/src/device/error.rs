//! Device errors.

use thiserror::Error;

use crate::codec::CellId;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// Port could not be opened after all attempts
    #[error("cannot connect to {serial} on {port}: {reason}")]
    Connection {
        serial: String,
        port: String,
        reason: String,
    },

    /// Write or flush failed on an open link
    #[error("write to cell {cell} failed: {source}")]
    Dispatch {
        cell: CellId,
        #[source]
        source: std::io::Error,
    },

    /// Listing serial ports failed
    #[error("cannot enumerate serial ports: {0}")]
    Enumeration(String),

    /// Rejected manual key or broadcast token
    #[error("invalid command '{0}'")]
    InvalidCommand(String),

    /// Cell has no live link
    #[error("cell {0} is not connected")]
    NotConnected(CellId),

    /// Identity table does not have one serial per cell
    #[error("identity table must list exactly {expected} serial numbers, got {actual}")]
    IdentityTable { expected: usize, actual: usize },
}

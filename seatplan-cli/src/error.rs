//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and exit codes: 130 when a run was cancelled, 1 for everything else.

use std::fmt;
use std::path::PathBuf;
use std::process;

use seatplan::codec::CodecError;
use seatplan::device::DeviceError;
use seatplan::service::ServiceError;
use seatplan::state::StateError;

/// Exit code of a cancelled run (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Invalid command-line input
    InvalidInput(String),
    /// Plan could not be encoded
    Codec(CodecError),
    /// Controller access failed
    Device(DeviceError),
    /// State file could not be written
    State(StateError),
    /// Session facade failed
    Service(ServiceError),
    /// A pipeline stage failed
    RunFailed(String),
    /// The run was cancelled before it completed
    Cancelled { session_id: String },
    /// Failed to read an input file
    FileRead { path: PathBuf, error: std::io::Error },
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Cancelled { .. } => EXIT_CANCELLED,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Device(DeviceError::Connection { .. } | DeviceError::Enumeration(_)) => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Controller unplugged: check the USB cables");
                eprintln!("  2. Permissions: add your user to the 'dialout' group (Linux)");
                eprintln!("  3. Wrong serial numbers: run 'seatplan devices list'");
            }
            CliError::Device(DeviceError::NotConnected(_)) => {
                eprintln!();
                eprintln!("Run 'seatplan devices list' to see which controllers are present.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidInput(msg) => write!(f, "{}", msg),
            CliError::Codec(e) => write!(f, "Cannot encode plan: {}", e),
            CliError::Device(e) => write!(f, "Controller error: {}", e),
            CliError::State(e) => write!(f, "State error: {}", e),
            CliError::Service(e) => write!(f, "Session error: {}", e),
            CliError::RunFailed(msg) => write!(f, "Run failed: {}", msg),
            CliError::Cancelled { session_id } => write!(f, "Run {} was cancelled", session_id),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Codec(e) => Some(e),
            CliError::Device(e) => Some(e),
            CliError::State(e) => Some(e),
            CliError::Service(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<seatplan::config::ConfigFileError> for CliError {
    fn from(e: seatplan::config::ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        CliError::Codec(e)
    }
}

impl From<DeviceError> for CliError {
    fn from(e: DeviceError) -> Self {
        CliError::Device(e)
    }
}

impl From<StateError> for CliError {
    fn from(e: StateError) -> Self {
        CliError::State(e)
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e)
    }
}

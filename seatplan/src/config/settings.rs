//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Persisted state tree settings
    pub state: StateSettings,
    /// Result report settings
    pub output: OutputSettings,
    /// Logging settings
    pub logging: LoggingSettings,
    /// Cell controller settings
    pub hardware: HardwareSettings,
    /// Progress broadcast settings
    pub broadcast: BroadcastSettings,
    /// Session lifecycle settings
    pub session: SessionSettings,
    /// Replay analysis service settings
    pub replay: ReplaySettings,
}

/// State store configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSettings {
    /// JSON file mirroring the state tree
    pub file: PathBuf,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    /// Root directory; reports land in `<directory>/log_data/`
    pub directory: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

/// Cell controller configuration.
///
/// The order of `serial_numbers` is the cell order: entry 0 drives cell 1.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareSettings {
    /// USB serial numbers of the cell controllers, cell 1 first
    pub serial_numbers: Vec<String>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Read/write timeout for an open port, in milliseconds
    pub port_timeout_ms: u64,
    /// Connection attempts per controller
    pub connect_retries: u32,
    /// Linear backoff unit between attempts, in milliseconds
    pub retry_backoff_ms: u64,
    /// Wait after opening a port before it is considered live, in milliseconds
    pub settle_ms: u64,
    /// Delay between writes to consecutive controllers, in milliseconds
    pub inter_write_ms: u64,
    /// Wait after a dispatch before links are torn down, in milliseconds
    pub post_dispatch_ms: u64,
}

impl HardwareSettings {
    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn inter_write(&self) -> Duration {
        Duration::from_millis(self.inter_write_ms)
    }

    pub fn post_dispatch(&self) -> Duration {
        Duration::from_millis(self.post_dispatch_ms)
    }
}

/// Progress broadcast configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastSettings {
    /// Interval between state polls per observer, in milliseconds
    pub poll_interval_ms: u64,
}

impl BroadcastSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Sessions idle for longer than this are expired
    pub idle_timeout_secs: u64,
}

impl SessionSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Replay analysis service configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplaySettings {
    /// Directory holding `<stage>.txt` canned responses
    pub directory: Option<PathBuf>,
}

//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::settings::*;

// =============================================================================
// Hardware
// =============================================================================

/// Factory serial numbers of the four cell controllers, cell 1 first.
pub const DEFAULT_SERIAL_NUMBERS: [&str; 4] = [
    "33437363436351303113",
    "3343736343635121F0B0",
    "33437363436351409183",
    "33437363436351010223",
];

/// Baud rate the cell firmware is built for.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Port read/write timeout (1 second).
pub const DEFAULT_PORT_TIMEOUT_MS: u64 = 1000;

/// Connection attempts per controller.
pub const DEFAULT_CONNECT_RETRIES: u32 = 3;

/// Linear backoff unit: attempt N waits N x 500ms.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Controllers reset when the port opens; wait for the bootloader.
pub const DEFAULT_SETTLE_MS: u64 = 2000;

/// Delay between consecutive controller writes.
pub const DEFAULT_INTER_WRITE_MS: u64 = 20;

/// Time the motors get before links are closed after a dispatch.
pub const DEFAULT_POST_DISPATCH_MS: u64 = 2000;

// =============================================================================
// Broadcast / sessions
// =============================================================================

/// Observer polling interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Idle session expiry (30 minutes).
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 1800;

// =============================================================================
// Files
// =============================================================================

/// State file name inside the config directory.
pub const DEFAULT_STATE_FILE_NAME: &str = "state.json";

/// Output directory name inside the config directory.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "output";

/// Log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "seatplan.log";

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            state: StateSettings {
                file: config_dir.join(DEFAULT_STATE_FILE_NAME),
            },
            output: OutputSettings {
                directory: config_dir.join(DEFAULT_OUTPUT_DIR_NAME),
            },
            logging: LoggingSettings {
                file: config_dir.join(DEFAULT_LOG_FILE_NAME),
            },
            hardware: HardwareSettings::default(),
            broadcast: BroadcastSettings {
                poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            },
            session: SessionSettings {
                idle_timeout_secs: DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
            },
            replay: ReplaySettings::default(),
        }
    }
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            serial_numbers: DEFAULT_SERIAL_NUMBERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            baud_rate: DEFAULT_BAUD_RATE,
            port_timeout_ms: DEFAULT_PORT_TIMEOUT_MS,
            connect_retries: DEFAULT_CONNECT_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            inter_write_ms: DEFAULT_INTER_WRITE_MS,
            post_dispatch_ms: DEFAULT_POST_DISPATCH_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hardware_has_four_cells() {
        let hw = HardwareSettings::default();
        assert_eq!(hw.serial_numbers.len(), 4);
        assert_eq!(hw.serial_numbers[0], "33437363436351303113");
        assert_eq!(hw.serial_numbers[3], "33437363436351010223");
        assert_eq!(hw.baud_rate, 9600);
    }

    #[test]
    fn test_default_paths_live_in_config_dir() {
        let config = ConfigFile::default();
        let dir = super::super::file::config_directory();
        assert_eq!(config.state.file, dir.join("state.json"));
        assert_eq!(config.logging.file, dir.join("seatplan.log"));
        assert!(config.replay.directory.is_none());
    }
}

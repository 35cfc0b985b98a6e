//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization and
//! construction of the library components the commands share.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use seatplan::config::{config_file_path, ConfigFile};
use seatplan::device::DeviceLinkManager;
use seatplan::logging::{default_log_file, init_logging, LoggingGuard};
use seatplan::state::StateStore;

use crate::error::CliError;

/// Where the configuration comes from: `--config` or the default path.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    path: Option<PathBuf>,
}

impl ConfigSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(config_file_path)
    }

    /// Load the file; a missing file yields defaults.
    pub fn load(&self) -> Result<ConfigFile, CliError> {
        Ok(ConfigFile::load_from(&self.path())?)
    }
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Load configuration and initialize logging.
    ///
    /// Log lines always go to the configured log file. With `debug_mode`
    /// they are also echoed to stdout at debug level.
    pub fn new(source: &ConfigSource, debug_mode: bool) -> Result<Self, CliError> {
        let config = source.load()?;

        let log_path = &config.logging.file;
        let log_dir = log_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| default_log_file().to_string());

        let logging_guard = init_logging(log_dir, &log_file, debug_mode, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Seatplan v{}", seatplan::VERSION);
        info!("Seatplan CLI: {} command", command);
    }

    /// Open the persisted state tree.
    pub fn open_store(&self) -> Arc<StateStore> {
        let file = &self.config.state.file;
        info!(file = %file.display(), "Opening state store");
        Arc::new(StateStore::open(file.clone()))
    }

    /// Device manager over the host's serial ports.
    pub fn device_manager(&self) -> Result<DeviceLinkManager, CliError> {
        Ok(DeviceLinkManager::from_settings(&self.config.hardware)?)
    }
}

//! Configuration for seatplan.
//!
//! Configuration is stored in an INI file (`~/.seatplan/config.ini` by
//! default) and loaded into a [`ConfigFile`]. Each INI section maps to one
//! settings struct:
//!
//! - `[state]` - persisted state tree location
//! - `[output]` - where result reports are written
//! - `[logging]` - log file location
//! - `[hardware]` - cell controller identities and serial timings
//! - `[broadcast]` - observer polling interval
//! - `[session]` - idle session expiry
//! - `[replay]` - canned analysis responses
//!
//! # Example
//!
//! ```
//! use seatplan::config::{ConfigFile, ConfigKey};
//!
//! let mut config = ConfigFile::default();
//! ConfigKey::HardwareBaudRate.set(&mut config, "19200").unwrap();
//! assert_eq!(config.hardware.baud_rate, 19200);
//! ```

mod defaults;
mod file;
mod keys;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::{
    BroadcastSettings, ConfigFile, HardwareSettings, LoggingSettings, OutputSettings,
    ReplaySettings, SessionSettings, StateSettings,
};

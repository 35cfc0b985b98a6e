//! Configuration key access and validation.
//!
//! Type-safe get/set of configuration values by dotted key name, with
//! validation via the Specification Pattern.

use std::str::FromStr;
use thiserror::Error;

use super::file::{expand_tilde, path_to_display};
use super::parser::parse_serial_list;
use super::settings::ConfigFile;
use crate::codec::CELL_COUNT;

/// Errors that can occur when getting or setting configuration values.
#[derive(Debug, Error)]
pub enum ConfigKeyError {
    /// Unknown configuration key.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Validation failed for the value.
    #[error("Invalid value for {key}: {reason}")]
    ValidationFailed { key: String, reason: String },
}

/// Supported configuration keys.
///
/// Each key maps to a specific field in [`ConfigFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    StateFile,
    OutputDirectory,
    LoggingFile,

    // Hardware settings
    HardwareSerialNumbers,
    HardwareBaudRate,
    HardwarePortTimeoutMs,
    HardwareConnectRetries,
    HardwareRetryBackoffMs,
    HardwareSettleMs,
    HardwareInterWriteMs,
    HardwarePostDispatchMs,

    BroadcastPollIntervalMs,
    SessionIdleTimeoutSecs,
    ReplayDirectory,
}

impl FromStr for ConfigKey {
    type Err = ConfigKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == lower)
            .ok_or_else(|| ConfigKeyError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Get the canonical key name (e.g., "hardware.baud_rate").
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::StateFile => "state.file",
            ConfigKey::OutputDirectory => "output.directory",
            ConfigKey::LoggingFile => "logging.file",
            ConfigKey::HardwareSerialNumbers => "hardware.serial_numbers",
            ConfigKey::HardwareBaudRate => "hardware.baud_rate",
            ConfigKey::HardwarePortTimeoutMs => "hardware.port_timeout_ms",
            ConfigKey::HardwareConnectRetries => "hardware.connect_retries",
            ConfigKey::HardwareRetryBackoffMs => "hardware.retry_backoff_ms",
            ConfigKey::HardwareSettleMs => "hardware.settle_ms",
            ConfigKey::HardwareInterWriteMs => "hardware.inter_write_ms",
            ConfigKey::HardwarePostDispatchMs => "hardware.post_dispatch_ms",
            ConfigKey::BroadcastPollIntervalMs => "broadcast.poll_interval_ms",
            ConfigKey::SessionIdleTimeoutSecs => "session.idle_timeout_secs",
            ConfigKey::ReplayDirectory => "replay.directory",
        }
    }

    /// Get the section name (e.g., "hardware").
    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or("")
    }

    /// Get the key name within the section (e.g., "baud_rate").
    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or(self.name())
    }

    /// Get the value from a config file as a string.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::StateFile => path_to_display(&config.state.file),
            ConfigKey::OutputDirectory => path_to_display(&config.output.directory),
            ConfigKey::LoggingFile => path_to_display(&config.logging.file),
            ConfigKey::HardwareSerialNumbers => config.hardware.serial_numbers.join(","),
            ConfigKey::HardwareBaudRate => config.hardware.baud_rate.to_string(),
            ConfigKey::HardwarePortTimeoutMs => config.hardware.port_timeout_ms.to_string(),
            ConfigKey::HardwareConnectRetries => config.hardware.connect_retries.to_string(),
            ConfigKey::HardwareRetryBackoffMs => config.hardware.retry_backoff_ms.to_string(),
            ConfigKey::HardwareSettleMs => config.hardware.settle_ms.to_string(),
            ConfigKey::HardwareInterWriteMs => config.hardware.inter_write_ms.to_string(),
            ConfigKey::HardwarePostDispatchMs => config.hardware.post_dispatch_ms.to_string(),
            ConfigKey::BroadcastPollIntervalMs => config.broadcast.poll_interval_ms.to_string(),
            ConfigKey::SessionIdleTimeoutSecs => config.session.idle_timeout_secs.to_string(),
            ConfigKey::ReplayDirectory => config
                .replay
                .directory
                .as_ref()
                .map(|p| path_to_display(p))
                .unwrap_or_default(),
        }
    }

    /// Validate and set a value in the config file.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigKeyError> {
        self.validate(value)?;
        let value = value.trim();
        let invalid = |reason: &str| ConfigKeyError::ValidationFailed {
            key: self.name().to_string(),
            reason: reason.to_string(),
        };

        match self {
            ConfigKey::StateFile => config.state.file = expand_tilde(value),
            ConfigKey::OutputDirectory => config.output.directory = expand_tilde(value),
            ConfigKey::LoggingFile => config.logging.file = expand_tilde(value),
            ConfigKey::HardwareSerialNumbers => {
                config.hardware.serial_numbers = parse_serial_list(value)
            }
            ConfigKey::HardwareBaudRate => {
                config.hardware.baud_rate = value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::HardwarePortTimeoutMs => {
                config.hardware.port_timeout_ms =
                    value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::HardwareConnectRetries => {
                config.hardware.connect_retries =
                    value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::HardwareRetryBackoffMs => {
                config.hardware.retry_backoff_ms =
                    value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::HardwareSettleMs => {
                config.hardware.settle_ms = value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::HardwareInterWriteMs => {
                config.hardware.inter_write_ms =
                    value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::HardwarePostDispatchMs => {
                config.hardware.post_dispatch_ms =
                    value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::BroadcastPollIntervalMs => {
                config.broadcast.poll_interval_ms =
                    value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::SessionIdleTimeoutSecs => {
                config.session.idle_timeout_secs =
                    value.parse().map_err(|_| invalid("out of range"))?
            }
            ConfigKey::ReplayDirectory => {
                config.replay.directory = if value.is_empty() {
                    None
                } else {
                    Some(expand_tilde(value))
                }
            }
        }
        Ok(())
    }

    /// Validate a value according to this key's specification.
    pub fn validate(&self, value: &str) -> Result<(), ConfigKeyError> {
        self.specification()
            .is_satisfied_by(value.trim())
            .map_err(|reason| ConfigKeyError::ValidationFailed {
                key: self.name().to_string(),
                reason,
            })
    }

    fn specification(&self) -> Box<dyn ValueSpecification> {
        match self {
            ConfigKey::StateFile | ConfigKey::OutputDirectory | ConfigKey::LoggingFile => {
                Box::new(PathSpec)
            }
            ConfigKey::HardwareSerialNumbers => Box::new(SerialListSpec),
            ConfigKey::HardwareBaudRate
            | ConfigKey::HardwareConnectRetries
            | ConfigKey::BroadcastPollIntervalMs
            | ConfigKey::SessionIdleTimeoutSecs => Box::new(PositiveIntegerSpec),
            ConfigKey::HardwarePortTimeoutMs
            | ConfigKey::HardwareRetryBackoffMs
            | ConfigKey::HardwareSettleMs
            | ConfigKey::HardwareInterWriteMs
            | ConfigKey::HardwarePostDispatchMs => Box::new(NonNegativeIntegerSpec),
            ConfigKey::ReplayDirectory => Box::new(OptionalPathSpec),
        }
    }

    /// Get all supported configuration keys.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::StateFile,
            ConfigKey::OutputDirectory,
            ConfigKey::LoggingFile,
            ConfigKey::HardwareSerialNumbers,
            ConfigKey::HardwareBaudRate,
            ConfigKey::HardwarePortTimeoutMs,
            ConfigKey::HardwareConnectRetries,
            ConfigKey::HardwareRetryBackoffMs,
            ConfigKey::HardwareSettleMs,
            ConfigKey::HardwareInterWriteMs,
            ConfigKey::HardwarePostDispatchMs,
            ConfigKey::BroadcastPollIntervalMs,
            ConfigKey::SessionIdleTimeoutSecs,
            ConfigKey::ReplayDirectory,
        ]
    }
}

// ============================================================================
// Value Specifications (Specification Pattern)
// ============================================================================

trait ValueSpecification {
    /// Returns Ok(()) if valid, Err(reason) if invalid.
    fn is_satisfied_by(&self, value: &str) -> Result<(), String>;
}

/// Integer greater than zero.
struct PositiveIntegerSpec;

impl ValueSpecification for PositiveIntegerSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err("must be a positive integer".to_string()),
        }
    }
}

/// Integer, zero allowed (durations that may be disabled).
struct NonNegativeIntegerSpec;

impl ValueSpecification for NonNegativeIntegerSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        value
            .parse::<u64>()
            .map(|_| ())
            .map_err(|_| "must be a non-negative integer".to_string())
    }
}

struct PathSpec;

impl ValueSpecification for PathSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        if value.is_empty() {
            Err("must be a valid path".to_string())
        } else {
            Ok(())
        }
    }
}

/// Empty clears the value.
struct OptionalPathSpec;

impl ValueSpecification for OptionalPathSpec {
    fn is_satisfied_by(&self, _value: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Comma separated, alphanumeric serial numbers.
struct SerialListSpec;

impl ValueSpecification for SerialListSpec {
    fn is_satisfied_by(&self, value: &str) -> Result<(), String> {
        let serials = parse_serial_list(value);
        if serials.len() != CELL_COUNT {
            return Err(format!(
                "must list exactly {CELL_COUNT} comma separated serial numbers"
            ));
        }
        match serials
            .iter()
            .find(|s| !s.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            Some(bad) => Err(format!("'{bad}' is not an alphanumeric serial number")),
            None => Ok(()),
        }
    }
}

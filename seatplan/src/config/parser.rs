//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::str::FromStr;

use super::file::{expand_tilde, ConfigFileError};
use crate::codec::CELL_COUNT;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [state] section
    if let Some(section) = ini.section(Some("state")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.state.file = expand_tilde(v);
        }
    }

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.output.directory = expand_tilde(v);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
    }

    // [hardware] section
    if let Some(section) = ini.section(Some("hardware")) {
        if let Some(v) = section.get("serial_numbers") {
            let serials = parse_serial_list(v);
            if serials.len() != CELL_COUNT {
                return Err(ConfigFileError::InvalidValue {
                    section: "hardware".to_string(),
                    key: "serial_numbers".to_string(),
                    value: v.to_string(),
                    reason: format!("must list exactly {CELL_COUNT} serial numbers, cell 1 first"),
                });
            }
            config.hardware.serial_numbers = serials;
        }
        if let Some(v) = section.get("baud_rate") {
            config.hardware.baud_rate = parse_positive("hardware", "baud_rate", v)?;
        }
        if let Some(v) = section.get("port_timeout_ms") {
            config.hardware.port_timeout_ms = parse_number("hardware", "port_timeout_ms", v)?;
        }
        if let Some(v) = section.get("connect_retries") {
            config.hardware.connect_retries = parse_positive("hardware", "connect_retries", v)?;
        }
        if let Some(v) = section.get("retry_backoff_ms") {
            config.hardware.retry_backoff_ms = parse_number("hardware", "retry_backoff_ms", v)?;
        }
        if let Some(v) = section.get("settle_ms") {
            config.hardware.settle_ms = parse_number("hardware", "settle_ms", v)?;
        }
        if let Some(v) = section.get("inter_write_ms") {
            config.hardware.inter_write_ms = parse_number("hardware", "inter_write_ms", v)?;
        }
        if let Some(v) = section.get("post_dispatch_ms") {
            config.hardware.post_dispatch_ms = parse_number("hardware", "post_dispatch_ms", v)?;
        }
    }

    // [broadcast] section
    if let Some(section) = ini.section(Some("broadcast")) {
        if let Some(v) = section.get("poll_interval_ms") {
            config.broadcast.poll_interval_ms =
                parse_positive("broadcast", "poll_interval_ms", v)?;
        }
    }

    // [session] section
    if let Some(section) = ini.section(Some("session")) {
        if let Some(v) = section.get("idle_timeout_secs") {
            config.session.idle_timeout_secs =
                parse_positive("session", "idle_timeout_secs", v)?;
        }
    }

    // [replay] section
    if let Some(section) = ini.section(Some("replay")) {
        config.replay.directory = non_empty(section.get("directory")).map(expand_tilde);
    }

    Ok(config)
}

/// Split a comma separated serial list, dropping blanks.
pub(super) fn parse_serial_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a non-negative integer".to_string(),
        })
}

fn parse_positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + Default + PartialEq,
{
    let parsed: T = parse_number(section, key, value)?;
    if parsed == T::default() {
        return Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

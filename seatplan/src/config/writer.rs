//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use super::file::path_to_display;
use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let replay_directory = config
        .replay
        .directory
        .as_ref()
        .map(|p| path_to_display(p))
        .unwrap_or_default();

    format!(
        r#"[state]
; JSON file mirroring the shared state tree. Recreated from defaults if
; missing or unreadable.
file = {}

[output]
; Result reports are written to <directory>/log_data/<scenario>.txt
directory = {}

[logging]
; Log file, cleared on every start
file = {}

[hardware]
; USB serial numbers of the cell controllers, comma separated.
; Order matters: the first entry drives cell 1 and receives the first
; four digits of every command.
serial_numbers = {}
; Serial baud rate (the cell firmware expects 9600)
baud_rate = {}
; Read/write timeout for an open port
port_timeout_ms = {}
; Connection attempts per controller; attempt N waits N x retry_backoff_ms
connect_retries = {}
retry_backoff_ms = {}
; Wait after opening a port before sending (controllers reset on open)
settle_ms = {}
; Delay between writes to consecutive controllers
inter_write_ms = {}
; Wait after a dispatch before closing the ports
post_dispatch_ms = {}

[broadcast]
; How often each observer re-reads the state tree
poll_interval_ms = {}

[session]
; Sessions idle for longer than this are dropped
idle_timeout_secs = {}

[replay]
; Directory with <stage>.txt canned analysis replies. Leave empty to
; require an analysis service.
directory = {}
"#,
        path_to_display(&config.state.file),
        path_to_display(&config.output.directory),
        path_to_display(&config.logging.file),
        config.hardware.serial_numbers.join(", "),
        config.hardware.baud_rate,
        config.hardware.port_timeout_ms,
        config.hardware.connect_retries,
        config.hardware.retry_backoff_ms,
        config.hardware.settle_ms,
        config.hardware.inter_write_ms,
        config.hardware.post_dispatch_ms,
        config.broadcast.poll_interval_ms,
        config.session.idle_timeout_secs,
        replay_directory,
    )
}

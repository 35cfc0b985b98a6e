//! Link lifecycle and command routing.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::codec::{CellId, EncodedCommand};
use crate::config::HardwareSettings;

use super::error::DeviceError;
use super::identity::{DeviceIdentity, IdentityTable};
use super::report::{ChunkResult, ConnectReport, DispatchOutcome, DispatchReport, EndpointStatus};
use super::serial::SerialPortEnumerator;
use super::transport::{PortEnumerator, PortInfo, SerialSettings, Transport};

/// Broadcast token that returns every cell to its home position.
pub const RESET_TOKEN: &str = "P";

/// Keys accepted by [`DeviceLinkManager::send_to_cell`].
///
/// Q/A, W/S and E/D step the three steppers; R/F/V and T/G/B set the two
/// servos.
pub const MANUAL_KEYS: &str = "QAWSEDRFVTGB";

/// Serial settings and the waits around connecting and writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    pub serial: SerialSettings,
    /// Open attempts per controller
    pub connect_retries: u32,
    /// Attempt N is followed by a wait of N x this
    pub retry_backoff: Duration,
    /// Wait after opening before links are live
    pub settle: Duration,
    /// Wait between writes to consecutive controllers
    pub inter_write: Duration,
}

impl LinkTiming {
    pub fn from_settings(settings: &HardwareSettings) -> Self {
        Self {
            serial: SerialSettings {
                baud_rate: settings.baud_rate,
                timeout: settings.port_timeout(),
            },
            connect_retries: settings.connect_retries,
            retry_backoff: settings.retry_backoff(),
            settle: settings.settle(),
            inter_write: settings.inter_write(),
        }
    }

    /// Default serial settings with every wait set to zero.
    pub fn immediate() -> Self {
        Self {
            retry_backoff: Duration::ZERO,
            settle: Duration::ZERO,
            inter_write: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self::from_settings(&HardwareSettings::default())
    }
}

struct Link {
    port: String,
    transport: Box<dyn Transport>,
}

/// Owns the links to the cell controllers.
///
/// Construct one per process. Methods take `&self` and serialize on an
/// internal lock, so the manager can be shared behind an `Arc`.
pub struct DeviceLinkManager {
    identities: IdentityTable,
    enumerator: Arc<dyn PortEnumerator>,
    timing: LinkTiming,
    links: Mutex<BTreeMap<CellId, Link>>,
}

impl DeviceLinkManager {
    pub fn new(
        identities: IdentityTable,
        enumerator: Arc<dyn PortEnumerator>,
        timing: LinkTiming,
    ) -> Self {
        Self {
            identities,
            enumerator,
            timing,
            links: Mutex::new(BTreeMap::new()),
        }
    }

    /// Manager over the host's serial ports, configured from `[hardware]`.
    pub fn from_settings(settings: &HardwareSettings) -> Result<Self, DeviceError> {
        Ok(Self::new(
            IdentityTable::new(&settings.serial_numbers)?,
            Arc::new(SerialPortEnumerator),
            LinkTiming::from_settings(settings),
        ))
    }

    pub fn identities(&self) -> &IdentityTable {
        &self.identities
    }

    pub fn is_live(&self, cell: CellId) -> bool {
        self.links.lock().contains_key(&cell)
    }

    pub fn live_cells(&self) -> Vec<CellId> {
        self.links.lock().keys().copied().collect()
    }

    /// Ports the enumerator currently reports, paired with the cell they
    /// would drive.
    pub fn scan(&self) -> Result<Vec<(PortInfo, Option<CellId>)>, DeviceError> {
        Ok(self
            .enumerator
            .available_ports()?
            .into_iter()
            .map(|port| {
                let cell = port
                    .serial_number
                    .as_deref()
                    .and_then(|serial| self.identities.cell_for(serial));
                (port, cell)
            })
            .collect())
    }

    // =========================================================================
    // Connect
    // =========================================================================

    /// Open links to every controller that is present and not already live.
    ///
    /// Missing controllers are reported as not found and open failures as
    /// failed; neither is an error. Newly opened links become live after one
    /// settle wait.
    pub fn discover_and_connect(&self) -> ConnectReport {
        let ports = match self.enumerator.available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!(error = %e, "Port enumeration failed, treating all controllers as absent");
                Vec::new()
            }
        };

        let mut links = self.links.lock();
        let mut report = ConnectReport::default();
        let mut opened = Vec::new();

        for identity in self.identities.iter() {
            let cell = identity.cell;
            if let Some(link) = links.get(&cell) {
                report.endpoints.push((
                    cell,
                    identity.serial.clone(),
                    EndpointStatus::Connected {
                        port: link.port.clone(),
                    },
                ));
                continue;
            }

            let Some(port) = ports
                .iter()
                .find(|p| p.serial_number.as_deref() == Some(identity.serial.as_str()))
            else {
                warn!(cell = %cell, serial = %identity.serial, "Controller not found");
                report
                    .endpoints
                    .push((cell, identity.serial.clone(), EndpointStatus::NotFound));
                continue;
            };

            match self.open_with_retry(identity, port) {
                Ok(transport) => opened.push((identity, port.port_name.clone(), transport)),
                Err(e) => {
                    error!(cell = %cell, error = %e, "Controller connection failed");
                    report.endpoints.push((
                        cell,
                        identity.serial.clone(),
                        EndpointStatus::Failed {
                            port: port.port_name.clone(),
                            reason: e.to_string(),
                        },
                    ));
                }
            }
        }

        if !opened.is_empty() {
            pause(self.timing.settle);
        }
        for (identity, port, transport) in opened {
            info!(cell = %identity.cell, serial = %identity.serial, port = %port, "Controller connected");
            report.endpoints.push((
                identity.cell,
                identity.serial.clone(),
                EndpointStatus::Connected { port: port.clone() },
            ));
            links.insert(identity.cell, Link { port, transport });
        }

        report.endpoints.sort_by_key(|(cell, _, _)| *cell);
        info!(
            live = links.len(),
            expected = self.identities.iter().count(),
            "Controller discovery finished"
        );
        report
    }

    fn open_with_retry(
        &self,
        identity: &DeviceIdentity,
        port: &PortInfo,
    ) -> Result<Box<dyn Transport>, DeviceError> {
        let attempts = self.timing.connect_retries.max(1);
        let mut last_error: Option<io::Error> = None;

        for attempt in 1..=attempts {
            match self.enumerator.open(port, self.timing.serial) {
                Ok(transport) => return Ok(transport),
                Err(e) => {
                    debug!(
                        cell = %identity.cell,
                        port = %port.port_name,
                        attempt,
                        error = %e,
                        "Open attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        pause(self.timing.retry_backoff * attempt);
                    }
                }
            }
        }

        Err(DeviceError::Connection {
            serial: identity.serial.clone(),
            port: port.port_name.clone(),
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Send each cell its chunk of `command`, cell 1 first.
    ///
    /// Cells without a live link are skipped. A failed write is reported
    /// for that cell and the remaining cells are still written. With no
    /// live links, or when every write fails, the outcome is a dry run.
    pub fn dispatch(&self, command: &EncodedCommand) -> DispatchOutcome {
        let chunks = command.chunks();
        info!(command = %command, "Dispatching command");
        self.write_each(command.as_str(), |cell| chunks[cell.index()].to_string())
    }

    /// Send the same token to every live controller.
    pub fn broadcast(&self, token: &str) -> Result<DispatchOutcome, DeviceError> {
        let token = token.trim();
        if token.is_empty() || token.contains(['\n', '\r']) {
            return Err(DeviceError::InvalidCommand(token.to_string()));
        }
        info!(token, "Broadcasting to all controllers");
        Ok(self.write_each(token, |_| token.to_string()))
    }

    /// Broadcast [`RESET_TOKEN`].
    pub fn reset(&self) -> DispatchOutcome {
        self.write_each(RESET_TOKEN, |_| RESET_TOKEN.to_string())
    }

    /// Send one manual key (see [`MANUAL_KEYS`], case-insensitive) to `cell`.
    ///
    /// Returns the key as sent.
    pub fn send_to_cell(&self, cell: CellId, key: &str) -> Result<char, DeviceError> {
        let key_char = manual_key(key).ok_or_else(|| DeviceError::InvalidCommand(key.to_string()))?;

        let mut links = self.links.lock();
        let link = links
            .get_mut(&cell)
            .ok_or(DeviceError::NotConnected(cell))?;
        write_line(link, &key_char.to_string())
            .map_err(|source| DeviceError::Dispatch { cell, source })?;
        debug!(cell = %cell, key = %key_char, "Manual key sent");
        Ok(key_char)
    }

    fn write_each(&self, label: &str, payload_for: impl Fn(CellId) -> String) -> DispatchOutcome {
        let mut links = self.links.lock();
        if links.is_empty() {
            info!(payload = label, "No live controllers, dry run");
            return DispatchOutcome::DryRun {
                payload: label.to_string(),
            };
        }

        let mut report = DispatchReport::default();
        let mut written_any = false;
        for identity in self.identities.iter() {
            let cell = identity.cell;
            let Some(link) = links.get_mut(&cell) else {
                debug!(cell = %cell, "Skipping cell without a live link");
                report.results.push((cell, ChunkResult::Skipped));
                continue;
            };

            if written_any {
                pause(self.timing.inter_write);
            }
            written_any = true;

            let payload = payload_for(cell);
            let result = match write_line(link, &payload) {
                Ok(()) => {
                    debug!(cell = %cell, payload = %payload, "Sent");
                    ChunkResult::Sent { payload }
                }
                Err(source) => {
                    let e = DeviceError::Dispatch { cell, source };
                    error!(error = %e, "Dispatch failed");
                    ChunkResult::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            report.results.push((cell, result));
        }
        if report.sent_count() == 0 {
            warn!(payload = label, "No controller accepted the write, dry run");
            return DispatchOutcome::DryRun {
                payload: label.to_string(),
            };
        }
        DispatchOutcome::Sent(report)
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Close every link. Never fails; safe to call repeatedly.
    ///
    /// Returns the number of links that were open.
    pub fn shutdown(&self) -> usize {
        let links = std::mem::take(&mut *self.links.lock());
        let count = links.len();
        for (cell, mut link) in links {
            if let Err(e) = link.transport.close() {
                warn!(cell = %cell, port = %link.port, error = %e, "Error closing controller link");
            }
        }
        if count > 0 {
            info!(closed = count, "Controller links closed");
        }
        count
    }
}

impl Drop for DeviceLinkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DeviceLinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLinkManager")
            .field("identities", &self.identities)
            .field("timing", &self.timing)
            .field("live", &self.live_cells())
            .finish()
    }
}

fn manual_key(key: &str) -> Option<char> {
    let mut chars = key.trim().chars();
    let c = chars.next()?.to_ascii_uppercase();
    (chars.next().is_none() && MANUAL_KEYS.contains(c)).then_some(c)
}

fn write_line(link: &mut Link, payload: &str) -> io::Result<()> {
    let mut line = String::with_capacity(payload.len() + 1);
    line.push_str(payload);
    line.push('\n');
    link.transport.write_all(line.as_bytes())?;
    link.transport.flush()
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

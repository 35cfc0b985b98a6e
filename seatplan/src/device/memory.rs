//! In-process port bus.
//!
//! Stands in for real hardware: ports are registered with a serial number,
//! every byte written is recorded, and open or write failures can be
//! injected.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::DeviceError;
use super::transport::{PortEnumerator, PortInfo, SerialSettings, Transport};

#[derive(Debug, Default)]
struct PortState {
    serial: Option<String>,
    written: Vec<u8>,
    open_failures_left: u32,
    open_attempts: u32,
    fail_writes: bool,
    open: bool,
    closed_count: u32,
}

/// Shared registry of fake ports. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    ports: Arc<Mutex<Vec<(String, PortState)>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port carrying a USB serial number.
    pub fn add_port(&self, port_name: &str, serial: &str) -> &Self {
        self.ports.lock().push((
            port_name.to_string(),
            PortState {
                serial: Some(serial.to_string()),
                ..PortState::default()
            },
        ));
        self
    }

    /// Register a port that is not a USB device.
    pub fn add_anonymous_port(&self, port_name: &str) -> &Self {
        self.ports
            .lock()
            .push((port_name.to_string(), PortState::default()));
        self
    }

    /// Make the next `count` opens of `port_name` fail.
    pub fn fail_opens(&self, port_name: &str, count: u32) {
        self.with_port(port_name, |state| state.open_failures_left = count);
    }

    /// Make every write to `port_name` fail.
    pub fn fail_writes(&self, port_name: &str) {
        self.with_port(port_name, |state| state.fail_writes = true);
    }

    /// Everything written to `port_name`, as text.
    pub fn written(&self, port_name: &str) -> String {
        self.with_port(port_name, |state| {
            String::from_utf8_lossy(&state.written).into_owned()
        })
        .unwrap_or_default()
    }

    pub fn open_attempts(&self, port_name: &str) -> u32 {
        self.with_port(port_name, |state| state.open_attempts)
            .unwrap_or(0)
    }

    pub fn is_open(&self, port_name: &str) -> bool {
        self.with_port(port_name, |state| state.open)
            .unwrap_or(false)
    }

    pub fn closed_count(&self, port_name: &str) -> u32 {
        self.with_port(port_name, |state| state.closed_count)
            .unwrap_or(0)
    }

    fn with_port<R>(&self, port_name: &str, f: impl FnOnce(&mut PortState) -> R) -> Option<R> {
        let mut ports = self.ports.lock();
        ports
            .iter_mut()
            .find(|(name, _)| name == port_name)
            .map(|(_, state)| f(state))
    }
}

impl PortEnumerator for MemoryBus {
    fn available_ports(&self) -> Result<Vec<PortInfo>, DeviceError> {
        Ok(self
            .ports
            .lock()
            .iter()
            .map(|(name, state)| PortInfo {
                port_name: name.clone(),
                serial_number: state.serial.clone(),
            })
            .collect())
    }

    fn open(&self, port: &PortInfo, _settings: SerialSettings) -> io::Result<Box<dyn Transport>> {
        let result = self.with_port(&port.port_name, |state| {
            state.open_attempts += 1;
            if state.open_failures_left > 0 {
                state.open_failures_left -= 1;
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "port busy"));
            }
            state.open = true;
            Ok(())
        });

        match result {
            Some(Ok(())) => Ok(Box::new(MemoryTransport {
                bus: self.clone(),
                port_name: port.port_name.clone(),
            })),
            Some(Err(e)) => Err(e),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such port")),
        }
    }
}

struct MemoryTransport {
    bus: MemoryBus,
    port_name: String,
}

impl Transport for MemoryTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.bus
            .with_port(&self.port_name, |state| {
                if state.fail_writes || !state.open {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write failed"));
                }
                state.written.extend_from_slice(data);
                Ok(())
            })
            .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::NotFound, "no such port")))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.bus.with_port(&self.port_name, |state| {
            state.open = false;
            state.closed_count += 1;
        });
        Ok(())
    }
}

//! Port access traits.

use std::io;
use std::time::Duration;

use super::error::DeviceError;

/// An enumerated serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS port name (`/dev/ttyACM0`, `COM3`)
    pub port_name: String,
    /// USB serial number, when the port is a USB device
    pub serial_number: Option<String>,
}

/// Line settings used when opening a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub timeout: Duration,
}

/// Lists and opens ports.
pub trait PortEnumerator: Send + Sync {
    fn available_ports(&self) -> Result<Vec<PortInfo>, DeviceError>;

    fn open(&self, port: &PortInfo, settings: SerialSettings)
        -> io::Result<Box<dyn Transport>>;
}

/// An open link to one controller.
pub trait Transport: Send {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Release the port. Called once; the transport is dropped afterwards.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

//! `serialport` backed port access.

use std::io::{self, Write};

use serialport::{SerialPort, SerialPortType};
use tracing::debug;

use super::error::DeviceError;
use super::transport::{PortEnumerator, PortInfo, SerialSettings, Transport};

/// Enumerates and opens the host's serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortEnumerator;

impl PortEnumerator for SerialPortEnumerator {
    fn available_ports(&self) -> Result<Vec<PortInfo>, DeviceError> {
        let ports =
            serialport::available_ports().map_err(|e| DeviceError::Enumeration(e.to_string()))?;

        Ok(ports
            .into_iter()
            .map(|port| {
                let serial_number = match port.port_type {
                    SerialPortType::UsbPort(usb) => usb.serial_number,
                    _ => None,
                };
                PortInfo {
                    port_name: port.port_name,
                    serial_number,
                }
            })
            .collect())
    }

    fn open(&self, port: &PortInfo, settings: SerialSettings) -> io::Result<Box<dyn Transport>> {
        debug!(port = %port.port_name, baud = settings.baud_rate, "Opening serial port");
        let handle = serialport::new(&port.port_name, settings.baud_rate)
            .timeout(settings.timeout)
            .open()
            .map_err(io::Error::from)?;
        Ok(Box::new(SerialTransport { port: Some(handle) }))
    }
}

struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port closed"))
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port()?.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port()?.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the handle closes the descriptor.
        self.port.take();
        Ok(())
    }
}

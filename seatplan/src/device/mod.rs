//! Cell controller links.
//!
//! Each cell is driven by one microcontroller on a USB serial port, found by
//! its USB serial number. [`DeviceLinkManager`] owns the open links:
//!
//! - [`DeviceLinkManager::discover_and_connect`] matches enumerated ports
//!   against the [`IdentityTable`] and opens them with retry and backoff
//! - [`DeviceLinkManager::dispatch`] routes each 4-digit chunk of an
//!   [`EncodedCommand`](crate::codec::EncodedCommand) to its cell
//! - [`DeviceLinkManager::broadcast`] sends one token to every cell
//! - [`DeviceLinkManager::shutdown`] closes everything, never failing
//!
//! Port access goes through the [`PortEnumerator`] and [`Transport`] traits.
//! [`SerialPortEnumerator`] is the real implementation; [`memory`] provides
//! an in-process bus that records writes.
//!
//! A missing or unreachable controller is never an error for the caller:
//! with no live links or no successful write, dispatch reports a
//! dry run.

mod error;
mod identity;
mod manager;
pub mod memory;
mod report;
mod serial;
mod transport;

pub use error::DeviceError;
pub use identity::{DeviceIdentity, IdentityTable};
pub use manager::{DeviceLinkManager, LinkTiming, MANUAL_KEYS, RESET_TOKEN};
pub use report::{ChunkResult, ConnectReport, DispatchOutcome, DispatchReport, EndpointStatus};
pub use serial::SerialPortEnumerator;
pub use transport::{PortEnumerator, PortInfo, SerialSettings, Transport};

//! Process-level facade.
//!
//! [`SeatplanService`] owns the shared state store, the session and
//! cancellation registries, the progress broadcaster and, optionally, the
//! device link manager, and runs complete sessions: pipeline, command
//! dispatch and hardware teardown.
//!
//! # Example
//!
//! ```ignore
//! use seatplan::service::{SeatplanService, ServiceConfig};
//!
//! let service = SeatplanService::new(store, Arc::new(ReplayService::new(dir)))
//!     .with_config(ServiceConfig::from_config_file(&config))
//!     .with_devices(Arc::new(DeviceLinkManager::from_settings(&config.hardware)?));
//!
//! let session = service.start_session(SessionKind::Desktop);
//! let outcome = service.run_session(&session.id, input).await?;
//! ```

mod config;
mod error;
mod facade;
mod hardware;

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::ServiceError;
pub use facade::{SeatplanService, SessionOutcome, SessionReport};
pub use hardware::{record_connect, record_dispatch};

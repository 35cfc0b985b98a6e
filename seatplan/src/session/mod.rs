//! Sessions.
//!
//! A session is one end-to-end run plus the observers watching it. Sessions
//! are registered in a [`SessionRegistry`], mirrored into the state tree under
//! `sessions.<id>`, and expire after a period without activity.

mod id;
mod registry;

pub use id::{SessionId, SessionKind};
pub use registry::{Session, SessionRegistry};

//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (get, set, list, path)
//! - [`devices`] - Cell controller discovery and manual control
//! - [`encode`] - Encode a placement plan into a wire command
//! - [`run`] - Full session: pipeline, then dispatch
//! - [`state`] - Inspect or reset the persisted state tree

pub mod common;
pub mod config;
pub mod devices;
pub mod encode;
pub mod run;
pub mod state;

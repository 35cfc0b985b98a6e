//! Service configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    ConfigFile, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POST_DISPATCH_MS,
    DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
};

/// Runtime settings of a [`SeatplanService`](super::SeatplanService).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use seatplan::service::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .post_dispatch_wait(Duration::ZERO)
///     .hardware_enabled(false)
///     .build();
///
/// assert!(!config.hardware_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Result reports go under `<dir>/log_data/`; none are written if unset
    output_dir: Option<PathBuf>,
    poll_interval: Duration,
    idle_timeout: Duration,
    /// Wait after a dispatch before the links are closed
    post_dispatch_wait: Duration,
    /// When false, runs always dry-run the dispatch
    hardware_enabled: bool,
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Settings from the loaded config file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self::builder()
            .output_dir(config.output.directory.clone())
            .poll_interval(config.broadcast.poll_interval())
            .idle_timeout(config.session.idle_timeout())
            .post_dispatch_wait(config.hardware.post_dispatch())
            .build()
    }

    pub fn output_dir(&self) -> Option<&PathBuf> {
        self.output_dir.as_ref()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn post_dispatch_wait(&self) -> Duration {
        self.post_dispatch_wait
    }

    pub fn hardware_enabled(&self) -> bool {
        self.hardware_enabled
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    output_dir: Option<PathBuf>,
    poll_interval: Option<Duration>,
    idle_timeout: Option<Duration>,
    post_dispatch_wait: Option<Duration>,
    hardware_enabled: Option<bool>,
}

impl ServiceConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn post_dispatch_wait(mut self, wait: Duration) -> Self {
        self.post_dispatch_wait = Some(wait);
        self
    }

    pub fn hardware_enabled(mut self, enabled: bool) -> Self {
        self.hardware_enabled = Some(enabled);
        self
    }

    pub fn build(self) -> ServiceConfig {
        ServiceConfig {
            output_dir: self.output_dir,
            poll_interval: self
                .poll_interval
                .unwrap_or(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)),
            idle_timeout: self
                .idle_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SESSION_IDLE_TIMEOUT_SECS)),
            post_dispatch_wait: self
                .post_dispatch_wait
                .unwrap_or(Duration::from_millis(DEFAULT_POST_DISPATCH_MS)),
            hardware_enabled: self.hardware_enabled.unwrap_or(true),
        }
    }
}

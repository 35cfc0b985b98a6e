//! Seatplan service facade implementation.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::broadcast::{ProgressBroadcaster, Watch};
use crate::cancel::{CancellationRegistry, StopPredicate};
use crate::codec::EncodedCommand;
use crate::device::{ConnectReport, DeviceLinkManager, DispatchOutcome};
use crate::pipeline::{
    default_stages, mark_completed, AnalysisService, PipelineRun, PipelineRunner, RunInput,
    RunOutcome,
};
use crate::session::{Session, SessionId, SessionKind, SessionRegistry};
use crate::state::{NotificationLevel, ProcessingStatus, StateStore};

use super::config::ServiceConfig;
use super::error::ServiceError;
use super::hardware::{record_connect, record_dispatch};

/// Everything a completed session produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub run: PipelineRun,
    /// Connect pass, when hardware was used
    pub connect: Option<ConnectReport>,
    /// Delivery of the run's command, when it produced one
    pub dispatch: Option<DispatchOutcome>,
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Completed(Box<SessionReport>),
    /// Cancelled or failed before completing
    Stopped(RunOutcome),
}

impl SessionOutcome {
    pub fn status(&self) -> ProcessingStatus {
        match self {
            SessionOutcome::Completed(_) => ProcessingStatus::Completed,
            SessionOutcome::Stopped(outcome) => outcome.status(),
        }
    }

    pub fn report(&self) -> Option<&SessionReport> {
        match self {
            SessionOutcome::Completed(report) => Some(report.as_ref()),
            SessionOutcome::Stopped(_) => None,
        }
    }
}

/// High-level facade for seat placement sessions.
///
/// Encapsulates component wiring: the shared [`StateStore`], session and
/// cancellation registries, the analysis service, and the optional
/// [`DeviceLinkManager`]. Without devices every dispatch is a dry run.
pub struct SeatplanService {
    store: Arc<StateStore>,
    analysis: Arc<dyn AnalysisService>,
    devices: Option<Arc<DeviceLinkManager>>,
    sessions: SessionRegistry,
    cancellations: CancellationRegistry,
    config: ServiceConfig,
}

impl SeatplanService {
    pub fn new(store: Arc<StateStore>, analysis: Arc<dyn AnalysisService>) -> Self {
        let config = ServiceConfig::default();
        Self {
            sessions: SessionRegistry::new(config.idle_timeout()).with_store(Arc::clone(&store)),
            store,
            analysis,
            devices: None,
            cancellations: CancellationRegistry::new(),
            config,
        }
    }

    /// Replace the configuration. Call before registering sessions.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.sessions =
            SessionRegistry::new(config.idle_timeout()).with_store(Arc::clone(&self.store));
        self.config = config;
        self
    }

    pub fn with_devices(mut self, devices: Arc<DeviceLinkManager>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn devices(&self) -> Option<&Arc<DeviceLinkManager>> {
        self.devices.as_ref()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Summary of the state tree.
    pub fn status(&self) -> Value {
        self.store.system_status()
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub fn start_session(&self, kind: SessionKind) -> Session {
        self.sessions.register(kind)
    }

    /// Stream progress of `session_id` to a new observer.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn watch(&self, session_id: &SessionId, disconnect: CancellationToken) -> Watch {
        self.sessions.touch(session_id);
        ProgressBroadcaster::new(Arc::clone(&self.store))
            .with_poll_interval(self.config.poll_interval())
            .watch(session_id.clone(), disconnect)
    }

    /// Request cancellation of a running session.
    ///
    /// Returns `false` if the session has no run in progress.
    pub fn cancel(&self, session_id: &SessionId) -> bool {
        self.sessions.touch(session_id);
        let requested = self.cancellations.request_cancel(session_id);
        if !requested {
            warn!(session_id = %session_id, "Cancel requested for a session with no active run");
        }
        requested
    }

    pub fn is_running(&self, session_id: &SessionId) -> bool {
        self.cancellations.get(session_id).is_some()
    }

    // =========================================================================
    // Runs
    // =========================================================================

    /// Run the pipeline for `session_id`, then deliver its command.
    ///
    /// `processing.status` turns `completed` only after the delivery is
    /// recorded under `hardware.*`.
    pub async fn run_session(
        &self,
        session_id: &SessionId,
        input: RunInput,
    ) -> Result<SessionOutcome, ServiceError> {
        self.run(session_id, input, None).await
    }

    /// Like [`run_session`](Self::run_session), also stopping when `stop`
    /// returns true at a stage boundary.
    pub async fn run_session_with_stop(
        &self,
        session_id: &SessionId,
        input: RunInput,
        stop: StopPredicate,
    ) -> Result<SessionOutcome, ServiceError> {
        self.run(session_id, input, Some(stop)).await
    }

    #[instrument(skip_all, fields(session_id = %session_id, scenario = %input.scenario))]
    async fn run(
        &self,
        session_id: &SessionId,
        input: RunInput,
        stop: Option<StopPredicate>,
    ) -> Result<SessionOutcome, ServiceError> {
        let controller = self
            .cancellations
            .try_register(session_id, stop)
            .ok_or_else(|| ServiceError::AlreadyRunning(session_id.clone()))?;
        if !self.sessions.touch(session_id) {
            self.sessions
                .register_with_id(session_id.clone(), SessionKind::default());
        }

        let runner = self.runner();
        let joined = tokio::task::spawn_blocking(move || runner.run(&input, &controller)).await;
        self.cancellations.remove(session_id);

        let run = match joined? {
            Ok(run) => run,
            Err(outcome) => {
                info!(status = %outcome.status(), "Session stopped");
                return Ok(SessionOutcome::Stopped(outcome));
            }
        };

        let delivered = match run.command().cloned() {
            Some(command) => self
                .deliver(command)
                .await
                .map(|(connect, outcome)| (connect, Some(outcome))),
            None => Ok((None, None)),
        };
        let (connect, dispatch) = match delivered {
            Ok(delivered) => delivered,
            Err(e) => {
                self.store.batch(|store| {
                    store.set_processing_status(ProcessingStatus::Error, 100, None);
                    store.set("processing.message", json!(e.to_string()));
                });
                return Err(e);
            }
        };
        mark_completed(&self.store, &run);

        Ok(SessionOutcome::Completed(Box::new(SessionReport {
            run,
            connect,
            dispatch,
        })))
    }

    fn runner(&self) -> PipelineRunner {
        let runner = PipelineRunner::new(
            Arc::clone(&self.store),
            default_stages(Arc::clone(&self.analysis)),
        )
        .with_deferred_completion();
        match self.config.output_dir() {
            Some(dir) => runner.with_output_dir(dir.clone()),
            None => runner,
        }
    }

    /// Connect, dispatch, wait, then close the links.
    ///
    /// Falls back to a dry run without devices; hardware problems never
    /// fail the session.
    async fn deliver(
        &self,
        command: EncodedCommand,
    ) -> Result<(Option<ConnectReport>, DispatchOutcome), ServiceError> {
        let (connect, outcome) = match (&self.devices, self.config.hardware_enabled()) {
            (Some(devices), true) => {
                let devices = Arc::clone(devices);
                let wait = self.config.post_dispatch_wait();
                let command = command.clone();
                let (connect, outcome) = tokio::task::spawn_blocking(move || {
                    let connect = devices.discover_and_connect();
                    let outcome = devices.dispatch(&command);
                    if !outcome.is_dry_run() && !wait.is_zero() {
                        std::thread::sleep(wait);
                    }
                    devices.shutdown();
                    (connect, outcome)
                })
                .await?;
                record_connect(&self.store, &connect);
                (Some(connect), outcome)
            }
            _ => {
                info!(command = %command, "Hardware not in use, dry run");
                let outcome = DispatchOutcome::DryRun {
                    payload: command.to_string(),
                };
                (None, outcome)
            }
        };

        record_dispatch(&self.store, command.as_str(), &outcome);
        let message = match &outcome {
            DispatchOutcome::Sent(report) => {
                format!("Command {command} sent to {} cell(s)", report.sent_count())
            }
            DispatchOutcome::DryRun { .. } => format!("Command {command} not sent (dry run)"),
        };
        self.store.add_notification(message, NotificationLevel::Info);
        Ok((connect, outcome))
    }
}

impl std::fmt::Debug for SeatplanService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatplanService")
            .field("sessions", &self.sessions)
            .field("cancellations", &self.cancellations)
            .field("devices", &self.devices)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::memory::MemoryBus;
    use crate::device::{IdentityTable, LinkTiming};
    use crate::pipeline::StaticService;
    use serde_json::json;
    use std::time::Duration;

    const PLAN: &str = r#"{"task_sequence": {"1": ["seat_rotate(90)"], "3": ["fold"]}}"#;

    fn service_replies() -> Arc<StaticService> {
        Arc::new(
            StaticService::new()
                .with_reply("analyze_input", r#"{"mood": "calm"}"#)
                .with_reply("generate_placement", r#"{"instruction": {"1": "front"}}"#)
                .with_reply("plan_actions", PLAN),
        )
    }

    fn quick_config() -> ServiceConfig {
        ServiceConfig::builder()
            .post_dispatch_wait(Duration::ZERO)
            .poll_interval(Duration::from_millis(5))
            .build()
    }

    #[tokio::test]
    async fn test_run_without_devices_dry_runs() {
        let store = Arc::new(StateStore::in_memory());
        let service = SeatplanService::new(Arc::clone(&store), service_replies())
            .with_config(quick_config());
        let session = service.start_session(SessionKind::Desktop);

        let outcome = service
            .run_session(&session.id, RunInput::new("demo", 3, "img.png"))
            .await
            .unwrap();

        let report = outcome.report().expect("completed");
        assert_eq!(
            report.run.command().map(EncodedCommand::as_str),
            Some("1000000000010000")
        );
        assert!(report.dispatch.as_ref().unwrap().is_dry_run());
        assert_eq!(store.get("hardware.motor_status"), Some(json!("dry_run")));
        assert_eq!(store.processing_status(), ProcessingStatus::Completed);
        assert!(!service.is_running(&session.id));
    }

    #[tokio::test]
    async fn test_run_dispatches_to_live_cells() {
        let bus = MemoryBus::new();
        bus.add_port("/dev/ttyACM0", "SN1");
        bus.add_port("/dev/ttyACM2", "SN3");
        let devices = Arc::new(DeviceLinkManager::new(
            IdentityTable::new(&["SN1", "SN2", "SN3", "SN4"]).unwrap(),
            Arc::new(bus.clone()),
            LinkTiming::immediate(),
        ));
        let store = Arc::new(StateStore::in_memory());
        let service = SeatplanService::new(Arc::clone(&store), service_replies())
            .with_config(quick_config())
            .with_devices(Arc::clone(&devices));

        let outcome = service
            .run_session(&SessionId::from("s1"), RunInput::new("demo", 3, "img.png"))
            .await
            .unwrap();

        assert_eq!(outcome.status(), ProcessingStatus::Completed);
        assert_eq!(bus.written("/dev/ttyACM0"), "1000\n");
        assert_eq!(bus.written("/dev/ttyACM2"), "0001\n");
        assert!(devices.live_cells().is_empty());
        assert_eq!(store.get("hardware.live_count"), Some(json!(2)));
        assert_eq!(store.get("hardware.motor_status"), Some(json!("dispatched")));
    }

    #[tokio::test]
    async fn test_stop_predicate_cancels_run() {
        let store = Arc::new(StateStore::in_memory());
        let service = SeatplanService::new(Arc::clone(&store), service_replies())
            .with_config(quick_config());

        let outcome = service
            .run_session_with_stop(
                &SessionId::from("s2"),
                RunInput::new("demo", 1, "img.png"),
                Arc::new(|| true),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status(), ProcessingStatus::Cancelled);
        assert!(store.get("hardware.last_command").is_none());
        assert!(!service.is_running(&SessionId::from("s2")));
    }

    #[tokio::test]
    async fn test_stage_failure_is_reported() {
        let store = Arc::new(StateStore::in_memory());
        let analysis = Arc::new(StaticService::new().with_reply("analyze_input", "{}"));
        let service = SeatplanService::new(Arc::clone(&store), analysis).with_config(quick_config());

        let outcome = service
            .run_session(&SessionId::from("s3"), RunInput::new("demo", 1, "img.png"))
            .await
            .unwrap();

        match outcome {
            SessionOutcome::Stopped(RunOutcome::Failed(failure)) => {
                assert_eq!(failure.stage, "generate_placement")
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(store.processing_status(), ProcessingStatus::Error);
    }

    #[tokio::test]
    async fn test_dispatch_recorded_before_completed_status() {
        let store = Arc::new(StateStore::in_memory());
        let writes = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = Arc::clone(&writes);
        store.add_listener(Arc::new(move |path: &str, value: &Value| {
            seen.lock().push((path.to_string(), value.clone()));
        }));
        let service = SeatplanService::new(Arc::clone(&store), service_replies())
            .with_config(quick_config());

        service
            .run_session(&SessionId::from("s4"), RunInput::new("demo", 3, "img.png"))
            .await
            .unwrap();

        let writes = writes.lock();
        let position = |path: &str, value: Value| {
            writes
                .iter()
                .position(|(p, v)| p == path && *v == value)
                .unwrap_or_else(|| panic!("{path} = {value} never written"))
        };
        let recorded = position("hardware.motor_status", json!("dry_run"));
        let completed = position("processing.status", json!("completed"));
        assert!(recorded < completed);
    }

    #[tokio::test]
    async fn test_watch_after_run_waits_for_next_run() {
        let store = Arc::new(StateStore::in_memory());
        let service = SeatplanService::new(Arc::clone(&store), service_replies())
            .with_config(quick_config());
        let session = service.start_session(SessionKind::Desktop);
        service
            .run_session(&session.id, RunInput::new("demo", 3, "img.png"))
            .await
            .unwrap();

        let mut watch = service.watch(&session.id, CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(watch.events.try_recv().is_err());
        assert!(!watch.handle.is_finished());
        watch.handle.abort();
    }

    #[test]
    fn test_cancel_unknown_session() {
        let service = SeatplanService::new(
            Arc::new(StateStore::in_memory()),
            Arc::new(StaticService::new()),
        );
        assert!(!service.cancel(&SessionId::from("nobody")));
    }
}

//! Runs the stage list for one session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::cancel::CancellationController;
use crate::codec::EncodedCommand;
use crate::session::SessionId;
use crate::state::{NotificationLevel, ProcessingStatus, StateStore};

use super::error::{RunOutcome, StageFailure};
use super::report;
use super::stage::{RunInput, Stage, StageContext, StageOutput};

/// Receives a milestone after every completed stage.
pub trait ProgressObserver: Send + Sync {
    /// `progress` is 0-100, `step` the 1-based index of the finished stage.
    fn on_progress(&self, progress: u8, label: &str, step: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(u8, &str, usize) + Send + Sync,
{
    fn on_progress(&self, progress: u8, label: &str, step: usize) {
        self(progress, label, step)
    }
}

/// One completed stage.
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub name: String,
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub output: StageOutput,
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub session_id: SessionId,
    /// Written to `processing.run_id` when the run began
    pub run_id: String,
    pub input: RunInput,
    pub stages: Vec<StageRecord>,
    pub total_elapsed: Duration,
    /// Where the result report was written, if it was.
    pub report_path: Option<PathBuf>,
}

impl PipelineRun {
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|record| record.name == name)
    }

    /// The command produced by the last command-producing stage.
    pub fn command(&self) -> Option<&EncodedCommand> {
        self.stages
            .iter()
            .rev()
            .find_map(|record| record.output.command())
    }

    /// Seconds per stage, in stage order.
    pub fn step_times(&self) -> Value {
        let times: Map<String, Value> = self
            .stages
            .iter()
            .map(|record| (record.name.clone(), json!(record.duration.as_secs_f64())))
            .collect();
        Value::Object(times)
    }
}

/// Executes an ordered list of stages against the shared state.
pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    store: Arc<StateStore>,
    output_dir: Option<PathBuf>,
    observer: Option<Arc<dyn ProgressObserver>>,
    defer_completion: bool,
}

impl PipelineRunner {
    pub fn new(store: Arc<StateStore>, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            store,
            output_dir: None,
            observer: None,
            defer_completion: false,
        }
    }

    /// Write the result report under `<dir>/log_data/` on completion.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Leave `processing.status` running after the last stage.
    ///
    /// The caller writes the terminal status with [`mark_completed`] once
    /// its own follow-up work is recorded.
    pub fn with_deferred_completion(mut self) -> Self {
        self.defer_completion = true;
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Run every stage in order.
    ///
    /// Blocks for as long as the stages do. Cancellation is honoured at the
    /// start and before and after each stage.
    #[instrument(skip_all, fields(session_id = %cancel.session_id(), scenario = %input.scenario))]
    pub fn run(
        &self,
        input: &RunInput,
        cancel: &CancellationController,
    ) -> Result<PipelineRun, RunOutcome> {
        let session_id = cancel.session_id().clone();
        let run_start = Instant::now();
        let run_id = Uuid::new_v4().simple().to_string();
        self.begin(&session_id, &run_id, input);

        if cancel.is_cancelled() {
            return Err(self.cancelled(&session_id, None));
        }

        let total = self.stages.len();
        let mut outputs: Vec<(String, StageOutput)> = Vec::with_capacity(total);
        let mut records = Vec::with_capacity(total);

        for (index, stage) in self.stages.iter().enumerate() {
            let name = stage.name();
            if cancel.is_cancelled() {
                return Err(self.cancelled(&session_id, Some(name)));
            }

            debug!(stage = name, step = index + 1, total, "Stage starting");
            let started_at = Utc::now();
            let start = Instant::now();
            let result = stage.run(&StageContext::new(input, &outputs));
            let duration = start.elapsed();

            let output = match result {
                Ok(output) => output,
                Err(source) => {
                    return Err(self.failed(StageFailure {
                        stage: name.to_string(),
                        source,
                    }))
                }
            };

            if cancel.is_cancelled() {
                return Err(self.cancelled(&session_id, Some(name)));
            }

            let step = index + 1;
            let progress = (step * 100 / total.max(1)) as u8;
            self.publish(name, stage.label(), step, progress, &output);
            if let Some(observer) = &self.observer {
                observer.on_progress(progress, stage.label(), step);
            }
            info!(
                stage = name,
                duration_ms = duration.as_millis() as u64,
                progress,
                "Stage complete"
            );

            records.push(StageRecord {
                name: name.to_string(),
                label: stage.label().to_string(),
                started_at,
                duration,
                output: output.clone(),
            });
            outputs.push((name.to_string(), output));
        }

        let mut run = PipelineRun {
            session_id,
            run_id,
            input: input.clone(),
            stages: records,
            total_elapsed: run_start.elapsed(),
            report_path: None,
        };
        self.complete(&mut run);
        Ok(run)
    }

    /// Reset the per-run keys and mark the run as running.
    fn begin(&self, session_id: &SessionId, run_id: &str, input: &RunInput) {
        self.store.batch(|store| {
            store.reset_session_keys();
            store.set("processing.session_id", session_id.as_str());
            store.set("processing.run_id", run_id);
            store.set("step_times", json!({}));
            store.set("total_elapsed", Value::Null);
            store.set_upload_status([
                ("scenario", json!(input.scenario)),
                ("people_count", json!(input.people_count)),
                ("image_path", json!(input.image)),
            ]);
            store.set_processing_status(ProcessingStatus::Running, 0, Some(&input.scenario));
        });
        info!(run_id, stages = self.stages.len(), "Run started");
    }

    fn publish(&self, name: &str, label: &str, step: usize, progress: u8, output: &StageOutput) {
        self.store.batch(|store| {
            store.set(&format!("analysis_result.{name}"), output.to_value());
            store.set("current_step", json!(step));
            store.set("processing.progress", json!(progress));
            store.set("processing.message", json!(label));
        });
    }

    fn complete(&self, run: &mut PipelineRun) {
        if let Some(dir) = &self.output_dir {
            match report::write_report(dir, run) {
                Ok(path) => run.report_path = Some(path),
                Err(e) => error!(error = %e, "Failed to write result report"),
            }
        }

        self.store.batch(|store| {
            store.set("step_times", run.step_times());
            store.set("total_elapsed", json!(run.total_elapsed.as_secs_f64()));
            if self.defer_completion {
                store.set("processing.message", json!("Stages complete"));
            } else {
                mark_completed(store, run);
            }
        });
        info!(
            total_ms = run.total_elapsed.as_millis() as u64,
            command = run.command().map(EncodedCommand::as_str).unwrap_or("-"),
            "Run completed"
        );
    }

    fn cancelled(&self, session_id: &SessionId, at_stage: Option<&str>) -> RunOutcome {
        self.store.batch(|store| {
            store.reset_session_keys();
            store.set_processing_status(ProcessingStatus::Cancelled, 0, None);
            store.set("processing.message", json!("Cancelled"));
            store.add_notification("Run cancelled", NotificationLevel::Warning);
        });
        warn!(at_stage = at_stage.unwrap_or("-"), "Run cancelled");
        RunOutcome::Cancelled {
            session_id: session_id.clone(),
            at_stage: at_stage.map(str::to_string),
        }
    }

    fn failed(&self, failure: StageFailure) -> RunOutcome {
        let message = failure.to_string();
        self.store.batch(|store| {
            let progress = store
                .get_as::<u8>("processing.progress")
                .unwrap_or_default();
            store.set_processing_status(ProcessingStatus::Error, progress, None);
            store.set("processing.message", json!(message));
            store.add_notification(message.clone(), NotificationLevel::Error);
        });
        error!(stage = %failure.stage, error = %failure.source, "Run failed");
        RunOutcome::Failed(failure)
    }
}

/// Write the terminal `completed` status for `run`.
pub fn mark_completed(store: &StateStore, run: &PipelineRun) {
    store.batch(|store| {
        store.set("processing.message", json!("Completed"));
        store.set_processing_status(ProcessingStatus::Completed, 100, None);
        store.add_notification(
            format!("Run '{}' completed", run.input.scenario),
            NotificationLevel::Success,
        );
    });
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("stages", &self.stage_names())
            .field("output_dir", &self.output_dir)
            .field("defer_completion", &self.defer_completion)
            .finish()
    }
}

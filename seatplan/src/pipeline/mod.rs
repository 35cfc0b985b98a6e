//! Staged analysis pipeline.
//!
//! A run executes an ordered list of [`Stage`]s against one session. Every
//! stage output is published to the [`StateStore`](crate::state::StateStore)
//! under `analysis_result.<stage>` before the next stage starts, so
//! observers see outputs in stage order.
//!
//! # Architecture
//!
//! ```text
//! RunInput → analyze_input → generate_placement → plan_actions → encode_command → PipelineRun
//!                 │                 │                  │               │
//!                 └──────── AnalysisService ───────────┘          CommandCodec
//! ```
//!
//! # Outcomes
//!
//! [`PipelineRunner::run`] returns `Ok(PipelineRun)` on completion and
//! `Err(RunOutcome)` otherwise. [`RunOutcome::Cancelled`] is a deliberate
//! stop requested through the session's
//! [`CancellationController`](crate::cancel::CancellationController);
//! [`RunOutcome::Failed`] carries the failing stage's name and error.
//!
//! Cancellation is checked when the run starts and immediately before and
//! after every stage. A stage that is already executing is never
//! interrupted.

mod analysis;
mod error;
mod report;
mod runner;
mod stage;
pub mod stages;

pub use analysis::{AnalysisService, ReplayService, ServiceCallError, ServiceRequest, StaticService};
pub use error::{RunOutcome, StageError, StageFailure};
pub use report::{render_report, report_path, write_report};
pub use runner::{mark_completed, PipelineRun, PipelineRunner, ProgressObserver, StageRecord};
pub use stage::{RunInput, Stage, StageContext, StageOutput};
pub use stages::{default_stages, AnalyzeInput, EncodeCommand, GeneratePlacement, PlanActions};

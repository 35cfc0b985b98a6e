//! The stage interface.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::codec::{EncodedCommand, PlacementPlan};

use super::error::StageError;

/// Inputs of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInput {
    /// Scenario name; also names the result report.
    pub scenario: String,
    pub people_count: u32,
    /// Path or data URL of the uploaded image.
    pub image: String,
}

impl RunInput {
    pub fn new(scenario: impl Into<String>, people_count: u32, image: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            people_count,
            image: image.into(),
        }
    }
}

/// Output of one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    /// Structured description of the input
    Analysis(Value),
    /// `{"instruction": {...}}` placement document
    Placement(Value),
    /// Free-text reply containing the per-cell action plan
    ActionPlan(String),
    /// The parsed plan and its wire command
    Command {
        plan: PlacementPlan,
        command: EncodedCommand,
    },
    /// Any other text output
    Text(String),
}

impl StageOutput {
    /// Value published to the state tree.
    pub fn to_value(&self) -> Value {
        match self {
            StageOutput::Analysis(value) | StageOutput::Placement(value) => value.clone(),
            StageOutput::ActionPlan(text) | StageOutput::Text(text) => json!(text),
            StageOutput::Command { plan, command } => {
                let mut value = plan.to_value();
                value["command"] = json!(command.as_str());
                value
            }
        }
    }

    /// Text form, used as the next service input and in the result report.
    pub fn render(&self) -> String {
        match self {
            StageOutput::Analysis(value) | StageOutput::Placement(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            StageOutput::ActionPlan(text) | StageOutput::Text(text) => text.clone(),
            StageOutput::Command { command, .. } => command.as_str().to_string(),
        }
    }

    pub fn command(&self) -> Option<&EncodedCommand> {
        match self {
            StageOutput::Command { command, .. } => Some(command),
            _ => None,
        }
    }
}

/// What a stage sees when it runs.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    input: &'a RunInput,
    outputs: &'a [(String, StageOutput)],
}

impl<'a> StageContext<'a> {
    pub fn new(input: &'a RunInput, outputs: &'a [(String, StageOutput)]) -> Self {
        Self { input, outputs }
    }

    pub fn input(&self) -> &'a RunInput {
        self.input
    }

    /// Output of the stage that ran just before this one.
    pub fn previous(&self) -> Option<&'a StageOutput> {
        self.outputs.last().map(|(_, output)| output)
    }

    /// Output of an earlier stage by name.
    pub fn output(&self, stage: &str) -> Option<&'a StageOutput> {
        self.outputs
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, output)| output)
    }

    /// Like [`previous`](Self::previous) but an error names what is missing.
    pub fn require_previous(&self, expected: &str) -> Result<&'a StageOutput, StageError> {
        self.previous()
            .ok_or_else(|| StageError::MissingInput(expected.to_string()))
    }
}

/// One step of the pipeline.
///
/// Stages are synchronous and may block; the runner is expected to be
/// driven from a blocking thread.
pub trait Stage: Send + Sync {
    /// Stable identifier, used as the state key and report section.
    fn name(&self) -> &str;

    /// Human-readable status label shown while the stage completes.
    fn label(&self) -> &str {
        self.name()
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError>;
}

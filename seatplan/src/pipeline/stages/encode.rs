//! Stage 4: encode the action plan into the wire command.

use tracing::info;

use crate::codec::encode_reply;
use crate::pipeline::error::StageError;
use crate::pipeline::stage::{Stage, StageContext, StageOutput};

use super::PlanActions;

/// Parses the previous stage's plan and encodes it with the codec.
///
/// Parse and validation errors fail the stage with the codec's message.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeCommand;

impl EncodeCommand {
    pub const NAME: &'static str = "encode_command";
}

impl Stage for EncodeCommand {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn label(&self) -> &str {
        "Encoding command"
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let reply = ctx.require_previous(PlanActions::NAME)?.render();
        let (plan, command) = encode_reply(&reply)?;
        info!(command = %command, "Seat command encoded");
        Ok(StageOutput::Command { plan, command })
    }
}

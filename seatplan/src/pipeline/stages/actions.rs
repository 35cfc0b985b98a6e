//! Stage 3: turn the placement into per-cell seat actions.

use std::sync::Arc;

use crate::pipeline::analysis::{AnalysisService, ServiceRequest};
use crate::pipeline::error::StageError;
use crate::pipeline::stage::{Stage, StageContext, StageOutput};

use super::GeneratePlacement;

/// Sends the placement to the service and keeps the reply text as is.
pub struct PlanActions {
    service: Arc<dyn AnalysisService>,
}

impl PlanActions {
    pub const NAME: &'static str = "plan_actions";

    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }
}

impl Stage for PlanActions {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn label(&self) -> &str {
        "Planning seat actions"
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let placement = ctx.require_previous(GeneratePlacement::NAME)?;
        let reply = self
            .service
            .invoke(&ServiceRequest::new(Self::NAME, placement.render()))?;
        Ok(StageOutput::ActionPlan(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RunInput, StaticService};
    use serde_json::json;

    #[test]
    fn test_reply_kept_verbatim() {
        let reply = "Plan:\n```json\n{\"task_sequence\": {\"1\": [\"fold\"]}}\n```";
        let service = Arc::new(StaticService::new().with_reply(PlanActions::NAME, reply));
        let stage = PlanActions::new(service.clone());
        let input = RunInput::new("demo", 1, "img");
        let outputs = vec![(
            GeneratePlacement::NAME.to_string(),
            StageOutput::Placement(json!({"instruction": {}})),
        )];

        let output = stage.run(&StageContext::new(&input, &outputs)).unwrap();

        assert_eq!(output, StageOutput::ActionPlan(reply.to_string()));
        assert!(service.requests()[0].image.is_none());
    }
}

//! Built-in stages of the seat placement pipeline.
//!
//! | # | stage | output |
//! |---|---|---|
//! | 1 | [`AnalyzeInput`] | [`StageOutput::Analysis`](super::StageOutput::Analysis) |
//! | 2 | [`GeneratePlacement`] | [`StageOutput::Placement`](super::StageOutput::Placement) |
//! | 3 | [`PlanActions`] | [`StageOutput::ActionPlan`](super::StageOutput::ActionPlan) |
//! | 4 | [`EncodeCommand`] | [`StageOutput::Command`](super::StageOutput::Command) |

mod actions;
mod analyze;
mod encode;
mod placement;

use std::sync::Arc;

pub use actions::PlanActions;
pub use analyze::AnalyzeInput;
pub use encode::EncodeCommand;
pub use placement::GeneratePlacement;

use super::analysis::AnalysisService;
use super::stage::Stage;

/// The four production stages, in order, sharing one service.
pub fn default_stages(service: Arc<dyn AnalysisService>) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(AnalyzeInput::new(Arc::clone(&service))),
        Box::new(GeneratePlacement::new(Arc::clone(&service))),
        Box::new(PlanActions::new(service)),
        Box::new(EncodeCommand),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StaticService;

    #[test]
    fn test_default_stage_order() {
        let stages = default_stages(Arc::new(StaticService::new()));
        let names: Vec<&str> = stages.iter().map(|stage| stage.name()).collect();
        assert_eq!(
            names,
            ["analyze_input", "generate_placement", "plan_actions", "encode_command"]
        );
    }
}

//! Stage 1: describe the input.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::codec::extract_json_text;
use crate::pipeline::analysis::{AnalysisService, ServiceRequest};
use crate::pipeline::error::StageError;
use crate::pipeline::stage::{Stage, StageContext, StageOutput};

/// Sends the people count and image to the service and returns its JSON
/// description with `"people"` as the first key.
pub struct AnalyzeInput {
    service: Arc<dyn AnalysisService>,
}

impl AnalyzeInput {
    pub const NAME: &'static str = "analyze_input";

    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }
}

impl Stage for AnalyzeInput {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn label(&self) -> &str {
        "Analyzing input"
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let input = ctx.input();
        let request = ServiceRequest::new(Self::NAME, format!("people_count = {}", input.people_count))
            .with_image(input.image.clone());
        let reply = self.service.invoke(&request)?;
        Ok(StageOutput::Analysis(inject_people(&reply, input.people_count)))
    }
}

/// Prefix the reply's JSON object with the people count.
///
/// A JSON value that is not an object goes under `model_output`; text that
/// is not JSON at all goes under `raw_model_output`.
pub(crate) fn inject_people(reply: &str, people: u32) -> Value {
    let mut out = Map::new();
    out.insert("people".into(), Value::from(people));

    match serde_json::from_str::<Value>(&extract_json_text(reply)) {
        Ok(Value::Object(fields)) => {
            debug!(fields = fields.len(), "Input analysis parsed");
            out.extend(fields);
        }
        Ok(other) => {
            out.insert("model_output".into(), other);
        }
        Err(e) => {
            warn!(error = %e, "Input analysis is not JSON, keeping raw reply");
            out.insert("raw_model_output".into(), Value::String(reply.to_string()));
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RunInput, StaticService};
    use serde_json::json;

    #[test]
    fn test_people_is_first_key() {
        let value = inject_people("```json\n{\"layout\": \"round\", \"kids\": 2}\n```", 5);
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["people", "layout", "kids"]);
        assert_eq!(value["people"], 5);
    }

    #[test]
    fn test_non_object_and_non_json() {
        assert_eq!(
            inject_people("[1, 2]", 2),
            json!({"people": 2, "model_output": [1, 2]})
        );
        assert_eq!(
            inject_people("sorry, I can't", 2),
            json!({"people": 2, "raw_model_output": "sorry, I can't"})
        );
    }

    #[test]
    fn test_stage_sends_count_and_image() {
        let service = Arc::new(StaticService::new().with_reply(AnalyzeInput::NAME, "{}"));
        let stage = AnalyzeInput::new(service.clone());
        let input = RunInput::new("demo", 4, "data:image/png;base64,AAAA");

        let output = stage.run(&StageContext::new(&input, &[])).unwrap();

        assert_eq!(output, StageOutput::Analysis(json!({"people": 4})));
        let request = &service.requests()[0];
        assert_eq!(request.input, "people_count = 4");
        assert_eq!(request.image.as_deref(), Some("data:image/png;base64,AAAA"));
    }
}

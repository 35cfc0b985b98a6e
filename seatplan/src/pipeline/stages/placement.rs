//! Stage 2: choose a seat placement.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::codec::extract_json_text;
use crate::pipeline::analysis::{AnalysisService, ServiceRequest};
use crate::pipeline::error::StageError;
use crate::pipeline::stage::{Stage, StageContext, StageOutput};

use super::AnalyzeInput;

fn instruction_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?is)"instruction"\s*:\s*(\{.*\})"#).expect("valid instruction regex")
    })
}

/// Sends the input analysis to the service and normalises the reply to
/// `{"instruction": {...}}`.
pub struct GeneratePlacement {
    service: Arc<dyn AnalysisService>,
}

impl GeneratePlacement {
    pub const NAME: &'static str = "generate_placement";

    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }
}

impl Stage for GeneratePlacement {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn label(&self) -> &str {
        "Generating placement"
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<StageOutput, StageError> {
        let analysis = ctx.require_previous(AnalyzeInput::NAME)?;
        let request = ServiceRequest::new(Self::NAME, analysis.render())
            .with_image(ctx.input().image.clone());
        let reply = self.service.invoke(&request)?;
        Ok(StageOutput::Placement(normalize_instruction(&reply)))
    }
}

fn wrap(instruction: Value) -> Value {
    match instruction {
        Value::Object(_) => json!({ "instruction": instruction }),
        other => json!({ "instruction": { "raw_model_output": other } }),
    }
}

/// Reduce a placement reply to `{"instruction": {...}}`.
///
/// Accepts a top-level `instruction` key or a bare object. When the reply
/// is not valid JSON, an `"instruction": {...}` fragment is tried before
/// falling back to the raw text.
pub(crate) fn normalize_instruction(reply: &str) -> Value {
    match serde_json::from_str::<Value>(&extract_json_text(reply)) {
        Ok(Value::Object(mut fields)) => match fields.remove("instruction") {
            Some(instruction) => wrap(instruction),
            None => wrap(Value::Object(fields)),
        },
        Ok(other) => wrap(other),
        Err(_) => {
            let fragment = instruction_block()
                .captures(reply)
                .and_then(|captures| serde_json::from_str::<Map<String, Value>>(&captures[1]).ok());
            match fragment {
                Some(instruction) => wrap(Value::Object(instruction)),
                None => {
                    warn!("Placement reply has no instruction object, keeping raw reply");
                    wrap(Value::String(reply.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RunInput, StaticService};

    #[test]
    fn test_instruction_key_is_unwrapped() {
        let value = normalize_instruction(r#"{"instruction": {"1": "front"}, "note": "x"}"#);
        assert_eq!(value, json!({"instruction": {"1": "front"}}));
    }

    #[test]
    fn test_bare_object_is_wrapped() {
        let value = normalize_instruction("```json\n{\"seats\": [1, 2]}\n```");
        assert_eq!(value, json!({"instruction": {"seats": [1, 2]}}));
    }

    #[test]
    fn test_non_object_instruction() {
        let value = normalize_instruction(r#"{"instruction": "rotate all"}"#);
        assert_eq!(value, json!({"instruction": {"raw_model_output": "rotate all"}}));
    }

    #[test]
    fn test_fragment_in_broken_json() {
        let reply = r#"{"instruction": {"1": "A"}, trailing garbage"#;
        assert_eq!(normalize_instruction(reply), json!({"instruction": {"1": "A"}}));
    }

    #[test]
    fn test_plain_text_fallback() {
        assert_eq!(
            normalize_instruction("no idea"),
            json!({"instruction": {"raw_model_output": "no idea"}})
        );
    }

    #[test]
    fn test_requires_analysis() {
        let stage = GeneratePlacement::new(Arc::new(StaticService::new()));
        let input = RunInput::new("demo", 1, "img");
        let err = stage.run(&StageContext::new(&input, &[])).unwrap_err();
        assert!(matches!(err, StageError::MissingInput(_)));
    }
}

//! Locating the JSON object in a free-text service reply.

use std::sync::OnceLock;

use regex::Regex;

fn fenced_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("valid fence regex"))
}

/// Best guess at the JSON text inside `reply`.
///
/// Takes the body of the first fenced code block if there is one, otherwise
/// the span from the first `{` to the last `}`. Returns the trimmed reply
/// when neither applies; the caller decides what to do if it doesn't parse.
pub fn extract_json_text(reply: &str) -> String {
    let text = reply.trim();
    if let Some(captures) = fenced_block().captures(text) {
        return captures[1].trim().to_string();
    }
    if text.starts_with('{') && text.ends_with('}') {
        return text.to_string();
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(first), Some(last)) if first < last => text[first..=last].to_string(),
        _ => text.to_string(),
    }
}

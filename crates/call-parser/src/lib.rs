//! Converts raw markup blocks into structured [`ToolCall`] records.
//!
//! Two syntaxes are accepted, tried in order: an attribute-tagged XML-like
//! block (`<tool name="…" call_id="…">` with single-level `<parameter>`
//! children) and a JSON body between the tags. Malformed JSON gets one
//! repair pass for unescaped quotes before the block is given up on.

pub mod repair;
pub mod scan;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use toolbridge_core_types::ToolCall;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("block does not open with a tool tag")]
    NotToolMarkup,
    #[error("payload is neither attribute form nor JSON: {0}")]
    InvalidPayload(String),
    #[error("payload carries no tool name")]
    MissingName,
}

static TOOL_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<tool\s+name="([^"]+)"(?:\s+call_id="([^"]+)")?"#).expect("tool open grammar")
});

static PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<parameter\s+name="([^"]+)">(.*?)</parameter>"#).expect("parameter grammar")
});

/// Parse one complete markup block. Attribute form wins when the opening tag
/// carries a `name`; otherwise the inner payload is parsed as JSON.
pub fn parse_block(raw: &str) -> Result<ToolCall, ParseError> {
    if !raw.trim_start().starts_with("<tool") {
        return Err(ParseError::NotToolMarkup);
    }
    if let Some(call) = parse_attribute_form(raw) {
        return Ok(normalize(call));
    }
    let inner = scan::inner_payload(raw);
    parse_json_form(inner).map(normalize)
}

fn parse_attribute_form(raw: &str) -> Option<ToolCall> {
    let raw = raw.trim_start();
    let caps = TOOL_OPEN_RE.captures(raw)?;
    let name = caps.get(1)?.as_str().to_string();
    let call_id = caps.get(2).map(|m| m.as_str().to_string());
    let mut args = serde_json::Map::new();
    for param in PARAM_RE.captures_iter(raw) {
        args.insert(
            param[1].to_string(),
            serde_json::Value::String(param[2].to_string()),
        );
    }
    Some(ToolCall {
        name,
        args,
        call_id,
    })
}

fn parse_json_form(inner: &str) -> Result<ToolCall, ParseError> {
    let value = match serde_json::from_str::<serde_json::Value>(inner) {
        Ok(value) => value,
        Err(first_err) => {
            let repaired = repair::repair_quotes(inner);
            serde_json::from_str::<serde_json::Value>(&repaired)
                .map_err(|_| ParseError::InvalidPayload(first_err.to_string()))?
        }
    };
    let call: ToolCall = serde_json::from_value(value)
        .map_err(|err| ParseError::InvalidPayload(err.to_string()))?;
    if call.name.is_empty() {
        return Err(ParseError::MissingName);
    }
    Ok(call)
}

/// `question` option lists written as a JSON-encoded string are folded into
/// a real array so downstream consumers see one shape.
fn normalize(mut call: ToolCall) -> ToolCall {
    if call.is_question() {
        if let Some(serde_json::Value::String(raw)) = call.args.get("options") {
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(raw) {
                if parsed.is_array() {
                    call.args.insert("options".to_string(), parsed);
                }
            }
        }
    }
    call
}

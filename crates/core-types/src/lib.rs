//! Shared vocabulary for the toolbridge pipeline.
//!
//! Every member crate speaks in terms of these types: the structured
//! [`ToolCall`] extracted from chat markup, its dedup identity ([`CallKey`]),
//! the conversation scope keys live under, and the result shape coming back
//! from the execution service.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Shared error type for pipeline seams that do not warrant their own enum.
#[derive(Debug, Error, Clone)]
pub enum BridgeError {
    #[error("{message}")]
    Message { message: String },
}

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// A structured call extracted from chat markup. Never mutated after parsing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
    #[serde(
        rename = "callId",
        alias = "call_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub call_id: Option<String>,
}

impl ToolCall {
    /// Calls named `question` are answered locally and never reach the
    /// execution service.
    pub fn is_question(&self) -> bool {
        self.name == "question"
    }

    pub fn question_text(&self) -> String {
        self.args
            .get("question")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// `options` arrives either as a JSON array or as a JSON-encoded string
    /// of an array; both forms are accepted.
    pub fn question_options(&self) -> Vec<String> {
        match self.args.get("options") {
            Some(serde_json::Value::Array(items)) => items.iter().map(value_as_text).collect(),
            Some(serde_json::Value::String(raw)) => {
                match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
                    Ok(items) => items.iter().map(value_as_text).collect(),
                    Err(_) => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }
}

fn value_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Dedup identity of a call: `name:call_id` when the markup carried an id,
/// otherwise a content hash of the raw matched text.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CallKey(pub String);

impl CallKey {
    pub fn for_call(call: &ToolCall, raw: &str) -> Self {
        match &call.call_id {
            Some(id) => Self(format!("{}:{}", call.name, id)),
            None => Self(content_hash(raw)),
        }
    }
}

impl fmt::Display for CallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// FNV-1a over the raw matched text. Collisions only matter within one
/// conversation and one retention window, so 64 bits is plenty.
pub fn content_hash(raw: &str) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in raw.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    format!("{hash:016x}")
}

/// Scope under which dedup keys live, derived from the page address so two
/// conversations never see each other's keys.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub const DEFAULT: &'static str = "default";

    /// Path when it carries more than `/`, else the first recognised query
    /// parameter, else the fixed default.
    pub fn from_page_url(page_url: &str) -> Self {
        let Ok(url) = Url::parse(page_url) else {
            return Self(Self::DEFAULT.to_string());
        };
        let path = url.path().trim_matches('/');
        if !path.is_empty() {
            return Self(path.to_string());
        }
        for param in ["id", "conversation", "chat", "c"] {
            if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == param) {
                if !value.is_empty() {
                    return Self(value.into_owned());
                }
            }
        }
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to a page element, minted by whichever page adapter is in
/// use. The pipeline never looks inside.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NodeRef(pub String);

/// Stable identity of a rendered message container.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub String);

/// Marker used to recognise a message container while walking up from a
/// mutated node. Both fields set means both must match.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerMarker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl ContainerMarker {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            class: None,
        }
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self {
            tag: None,
            class: Some(class.into()),
        }
    }

    pub fn matches(&self, tag: &str, classes: &[String]) -> bool {
        if self.tag.is_none() && self.class.is_none() {
            return false;
        }
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(expected) = &self.class {
            if !classes.iter().any(|c| c == expected) {
                return false;
            }
        }
        true
    }
}

/// How text is pushed into the page's editable input surface. A property of
/// the host page, not a runtime decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Simulated clipboard paste.
    Paste,
    /// Editor insert-text command.
    InsertText,
    /// Direct value assignment plus an input notification.
    Value,
    /// Rich-text innerHTML replacement.
    RichText,
}

/// Capability record for one host page family, resolved once from the page
/// origin and passed explicitly to UI automation and the DOM observer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteAdapter {
    /// Hostname fragment this profile applies to.
    pub site: String,
    /// Prioritised selectors for the editable input surface.
    pub editor: Vec<String>,
    /// Prioritised selectors for the submit control.
    pub send_button: Vec<String>,
    /// Selector for the stop-generation control, when the page has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_button: Option<String>,
    pub fill_method: FillMethod,
    /// Whether this page family streams via client-side rendering and needs
    /// the DOM observer instead of the network tap.
    #[serde(default)]
    pub use_observer: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_markers: Vec<ContainerMarker>,
}

/// Response of the execution service for one call. Consumed exactly once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        rename = "stopStream",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stop_stream: Option<bool>,
}

impl ExecutionResult {
    pub const EMPTY_PLACEHOLDER: &'static str = "[toolbridge] empty response";

    pub fn display_text(&self) -> &str {
        self.output
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.error.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(Self::EMPTY_PLACEHOLDER)
    }

    pub fn wants_stop(&self) -> bool {
        self.stop_stream.unwrap_or(false)
    }
}

/// Envelope on the channel between the detection side and the execution
/// side. Each envelope is consumed exactly once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    #[serde(rename = "TOOL_CALL")]
    ToolCall { data: ToolCall },
}

impl BridgeMessage {
    pub fn tool_call(data: ToolCall) -> Self {
        Self::ToolCall { data }
    }
}

/// Where a candidate markup block was observed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BlockOrigin {
    StreamTap,
    DomContainer(ContainerId),
}

impl BlockOrigin {
    pub fn container(&self) -> Option<&ContainerId> {
        match self {
            Self::StreamTap => None,
            Self::DomContainer(id) => Some(id),
        }
    }
}

/// Sink shared by both acquisition paths: a complete markup block has been
/// observed and should be parsed, gated and queued.
#[async_trait]
pub trait BlockSink: Send + Sync {
    async fn on_block(&self, origin: BlockOrigin, raw: &str);
}

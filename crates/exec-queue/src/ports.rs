use async_trait::async_trait;

use toolbridge_core_types::ToolCall;

/// What gets written back into the page for one completed call.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub text: String,
    /// Whether the auto-submit countdown may start after the write.
    pub auto_send: bool,
    /// Interrupt the page's in-progress generation before writing.
    pub stop_stream: bool,
}

impl Delivery {
    /// Written into the input but never auto-submitted (answers, errors,
    /// instructional messages).
    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            auto_send: false,
            stop_stream: false,
        }
    }

    pub fn auto(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            auto_send: true,
            stop_stream: false,
        }
    }
}

/// Executes one call against the remote service. Implementations convert
/// every failure into a user-readable [`Delivery`]; nothing propagates.
#[async_trait]
pub trait CallExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> Delivery;
}

/// Local interactive prompt for `question` calls. Blocks the queue until
/// the user answers; an empty string is a valid answer.
#[async_trait]
pub trait QuestionPort: Send + Sync {
    async fn ask(&self, question: String, options: Vec<String>) -> String;
}

/// Receives each call's delivery, in acceptance order, one at a time.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, delivery: Delivery);
}

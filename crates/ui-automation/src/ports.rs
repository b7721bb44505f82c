use async_trait::async_trait;

use toolbridge_core_types::{ContainerId, NodeRef, ToolCall};

use crate::AutomationError;

/// Write access to the page's input surface, implemented by the page
/// adapter for whatever driver is in use.
#[async_trait]
pub trait InputPort: Send + Sync {
    /// First element matching any of the selectors, in priority order.
    async fn query_first(&self, selectors: &[String]) -> Option<NodeRef>;

    async fn focus(&self, node: &NodeRef) -> Result<(), AutomationError>;

    /// Simulated clipboard paste into the node.
    async fn paste_text(&self, node: &NodeRef, text: &str) -> Result<(), AutomationError>;

    /// Editor insert-text command.
    async fn insert_text(&self, node: &NodeRef, text: &str) -> Result<(), AutomationError>;

    /// Direct value assignment plus the input notification the page's
    /// framework listens for.
    async fn set_value(&self, node: &NodeRef, text: &str) -> Result<(), AutomationError>;

    /// Rich-text innerHTML replacement.
    async fn set_rich_text(&self, node: &NodeRef, text: &str) -> Result<(), AutomationError>;

    async fn click(&self, node: &NodeRef) -> Result<(), AutomationError>;
}

/// Transient user-facing status: toasts and the auto-submit countdown.
/// Sync on purpose — implementations hand off to their own UI machinery.
pub trait NoticePort: Send + Sync {
    fn toast(&self, message: &str);
    fn countdown_tick(&self, remaining_secs: u64);
    fn countdown_closed(&self);
}

/// Outcome of the interactive approval affordance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApprovalDecision {
    Approved,
    Dismissed,
}

/// Renders an approval card next to a message container when automatic
/// execution is disabled. Dismissal must leave the call unmarked so it can
/// be approved later.
#[async_trait]
pub trait ApprovalPort: Send + Sync {
    async fn request_approval(
        &self,
        container: Option<&ContainerId>,
        call: &ToolCall,
    ) -> ApprovalDecision;
}

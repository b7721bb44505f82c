use async_trait::async_trait;

use toolbridge_core_types::{ContainerId, NodeRef};

/// One element on the way up from a mutated node, nearest first.
#[derive(Clone, Debug)]
pub struct AncestorInfo {
    /// Stable identity minted by the page adapter for this element.
    pub id: ContainerId,
    pub tag: String,
    pub classes: Vec<String>,
}

/// Structural or text mutation reported by the page adapter.
#[derive(Clone, Debug)]
pub enum DomMutation {
    CharacterData { node: NodeRef },
    ChildrenAdded { node: NodeRef },
}

impl DomMutation {
    pub fn node(&self) -> &NodeRef {
        match self {
            Self::CharacterData { node } | Self::ChildrenAdded { node } => node,
        }
    }
}

/// Read-only view of the rendered page, implemented by the page adapter.
#[async_trait]
pub trait DomPort: Send + Sync {
    /// Ancestor chain of a node, nearest first.
    async fn ancestors(&self, node: &NodeRef) -> Vec<AncestorInfo>;

    /// Message containers currently rendered, for the startup scan.
    async fn rendered_containers(&self) -> Vec<ContainerId>;

    /// Full text content of a container, or `None` if it is gone.
    async fn container_text(&self, id: &ContainerId) -> Option<String>;
}

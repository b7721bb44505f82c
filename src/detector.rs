//! The gate between block acquisition and execution: parse, optionally ask
//! for approval, dedup atomically, then queue.
//!
//! Both acquisition paths feed this one sink, so every policy lives here
//! exactly once. A block that fails to parse is logged and dropped; the
//! stream may legitimately contain tool-shaped text that is not a call.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use dedup_store::DedupStore;
use exec_queue::ExecQueue;
use toolbridge_core_types::{BlockOrigin, BlockSink, CallKey};
use ui_automation::{ApprovalDecision, ApprovalPort};

pub struct CallDetector {
    store: Arc<DedupStore>,
    queue: ExecQueue,
    approval: Arc<dyn ApprovalPort>,
    auto_execute: bool,
}

impl CallDetector {
    pub fn new(
        store: Arc<DedupStore>,
        queue: ExecQueue,
        approval: Arc<dyn ApprovalPort>,
        auto_execute: bool,
    ) -> Self {
        Self {
            store,
            queue,
            approval,
            auto_execute,
        }
    }
}

#[async_trait]
impl BlockSink for CallDetector {
    async fn on_block(&self, origin: BlockOrigin, raw: &str) {
        let call = match call_parser::parse_block(raw) {
            Ok(call) => call,
            Err(err) => {
                warn!(%err, len = raw.len(), "discarding unparseable block");
                return;
            }
        };
        let key = CallKey::for_call(&call, raw);

        if !self.auto_execute {
            // Cheap pre-check so already-handled calls never re-prompt.
            match self.store.is_processed(&key).await {
                Ok(true) => {
                    debug!(%key, "already processed, not prompting");
                    return;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(%err, %key, "dedup lookup failed, dropping call");
                    return;
                }
            }
            let decision = self
                .approval
                .request_approval(origin.container(), &call)
                .await;
            if decision == ApprovalDecision::Dismissed {
                // Left unmarked: the user can approve a later sighting.
                info!(%key, call = %call.name, "call dismissed");
                return;
            }
        }

        match self.store.check_and_mark(&key).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(%key, "duplicate sighting suppressed");
                return;
            }
            Err(err) => {
                warn!(%err, %key, "dedup gate failed, dropping call");
                return;
            }
        }

        info!(%key, call = %call.name, origin = ?origin, "call accepted");
        if let Err(err) = self.queue.submit(call).await {
            warn!(%err, %key, "queue rejected accepted call");
        }
    }
}

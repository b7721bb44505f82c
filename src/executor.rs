//! Bridges the execution queue to the remote service, converting every
//! failure mode into a user-readable delivery. Nothing thrown from here
//! ever stalls the queue.

use async_trait::async_trait;
use tracing::warn;

use exec_queue::{CallExecutor, Delivery};
use remote_client::{ExecOutcome, RemoteClient};
use toolbridge_core_types::ToolCall;

pub const NOT_CONFIGURED_MESSAGE: &str =
    "[toolbridge] execution service is not configured; set the service address and restart";
pub const AUTH_FAILED_MESSAGE: &str =
    "[toolbridge] authentication failed; check the access token";

/// `client` is `None` when no service address could be established; every
/// call then degrades to an instructional message in the input box.
pub struct RemoteExecutor {
    client: Option<RemoteClient>,
}

impl RemoteExecutor {
    pub fn new(client: Option<RemoteClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallExecutor for RemoteExecutor {
    async fn execute(&self, call: &ToolCall) -> Delivery {
        let Some(client) = &self.client else {
            return Delivery::manual(NOT_CONFIGURED_MESSAGE);
        };
        match client.exec(call).await {
            Ok(ExecOutcome::Completed(result)) => Delivery {
                text: result.display_text().to_string(),
                auto_send: true,
                stop_stream: result.wants_stop(),
            },
            Ok(ExecOutcome::Unauthorized) => Delivery::manual(AUTH_FAILED_MESSAGE),
            Ok(ExecOutcome::HttpError(status)) => {
                warn!(status, call = %call.name, "service returned an error status");
                Delivery::manual(format!("[toolbridge error] HTTP {status}"))
            }
            Err(err) => {
                warn!(%err, call = %call.name, "exec round trip failed");
                Delivery::manual(format!("[toolbridge error] {err}"))
            }
        }
    }
}

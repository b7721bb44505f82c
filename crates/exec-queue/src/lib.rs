//! Serialized execution of accepted tool calls.
//!
//! One bounded channel, one worker: the remote service never sees
//! overlapping requests from a page, and call N's result is delivered
//! before call N+1 is executed — even though detection order across the
//! two acquisition paths is otherwise unsynchronized. `question` calls are
//! answered locally and never reach the executor.

pub mod ports;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use toolbridge_core_types::{BridgeMessage, ToolCall};

pub use crate::ports::{CallExecutor, Delivery, DeliverySink, QuestionPort};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("execution queue is closed")]
    Closed,
}

/// Submission side. Cheap to clone; both acquisition paths hold one.
#[derive(Clone)]
pub struct ExecQueue {
    tx: mpsc::Sender<BridgeMessage>,
}

impl ExecQueue {
    pub async fn submit(&self, call: ToolCall) -> Result<(), QueueError> {
        self.tx
            .send(BridgeMessage::tool_call(call))
            .await
            .map_err(|_| QueueError::Closed)
    }
}

/// Worker lifecycle. Aborts the worker when dropped.
pub struct WorkerHandle {
    task: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Wait for the worker to drain and exit. It exits once every
    /// [`ExecQueue`] clone has been dropped.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub fn spawn(
    executor: Arc<dyn CallExecutor>,
    question: Arc<dyn QuestionPort>,
    sink: Arc<dyn DeliverySink>,
    capacity: usize,
) -> (ExecQueue, WorkerHandle) {
    let (tx, mut rx) = mpsc::channel(capacity.max(1));
    let task = tokio::spawn(async move {
        while let Some(BridgeMessage::ToolCall { data: call }) = rx.recv().await {
            run_one(&*executor, &*question, &*sink, call).await;
        }
        debug!("execution queue drained");
    });
    (
        ExecQueue { tx },
        WorkerHandle { task: Some(task) },
    )
}

async fn run_one(
    executor: &dyn CallExecutor,
    question: &dyn QuestionPort,
    sink: &dyn DeliverySink,
    call: ToolCall,
) {
    if call.is_question() {
        info!(call = %call.name, "routing question call to the local prompt");
        let answer = question
            .ask(call.question_text(), call.question_options())
            .await;
        sink.deliver(Delivery::manual(answer)).await;
        return;
    }
    info!(call = %call.name, call_id = ?call.call_id, "executing tool call");
    let delivery = executor.execute(&call).await;
    sink.deliver(delivery).await;
}

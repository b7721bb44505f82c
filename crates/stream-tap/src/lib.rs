//! Network-response tap: watches every response stream for complete
//! tool-invocation blocks as bytes arrive.
//!
//! The tap keeps one growing text buffer per in-flight response. After each
//! chunk the buffer is scanned; complete blocks are cut out and handed to
//! the sink, incomplete trailing data waits for the next chunk. The tap
//! observes — the stream itself passes through to the page untouched.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use toolbridge_core_types::{BlockOrigin, BlockSink};

/// Identity of one in-flight response.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResponseId(pub Uuid);

impl ResponseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResponseId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of a tapped response, as reported by the page adapter.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    Started,
    Chunk(Vec<u8>),
    Finished,
    Failed,
}

#[derive(Default)]
struct ResponseBuffer {
    text: String,
    /// Trailing bytes of a UTF-8 code point split across chunks.
    carry: Vec<u8>,
}

impl ResponseBuffer {
    fn push_bytes(&mut self, bytes: &[u8]) {
        let mut data = std::mem::take(&mut self.carry);
        data.extend_from_slice(bytes);
        match std::str::from_utf8(&data) {
            Ok(text) => self.text.push_str(text),
            Err(err) if err.error_len().is_none() => {
                let valid = err.valid_up_to();
                self.text.push_str(&String::from_utf8_lossy(&data[..valid]));
                self.carry = data[valid..].to_vec();
            }
            Err(_) => self.text.push_str(&String::from_utf8_lossy(&data)),
        }
    }

    fn drain_complete_blocks(&mut self) -> Vec<String> {
        call_parser::scan::drain_blocks(&mut self.text)
    }
}

pub struct StreamTap {
    buffers: DashMap<ResponseId, ResponseBuffer>,
    sink: Arc<dyn BlockSink>,
}

impl StreamTap {
    pub fn new(sink: Arc<dyn BlockSink>) -> Self {
        Self {
            buffers: DashMap::new(),
            sink,
        }
    }

    /// Number of responses currently holding a buffer.
    pub fn tracked(&self) -> usize {
        self.buffers.len()
    }

    pub async fn ingest(&self, id: ResponseId, event: StreamEvent) {
        match event {
            StreamEvent::Started => {
                self.buffers.entry(id).or_default();
                trace!(response = %id.0, "tap buffer opened");
            }
            StreamEvent::Chunk(bytes) => {
                let blocks = {
                    let mut buffer = self.buffers.entry(id).or_default();
                    buffer.push_bytes(&bytes);
                    buffer.drain_complete_blocks()
                };
                for raw in blocks {
                    debug!(response = %id.0, len = raw.len(), "complete block extracted");
                    self.sink.on_block(BlockOrigin::StreamTap, &raw).await;
                }
            }
            StreamEvent::Finished | StreamEvent::Failed => {
                self.buffers.remove(&id);
                trace!(response = %id.0, "tap buffer closed");
            }
        }
    }
}

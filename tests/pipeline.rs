//! End-to-end pipeline exercises: chunked stream in, service round trip,
//! result written back into the mocked page.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use dedup_store::MemoryStorage;
use dom_observer::DomPort;
use exec_queue::QuestionPort;
use stream_tap::{ResponseId, StreamEvent};
use toolbridge::{Bridge, BridgeConfig, PagePorts};
use toolbridge_core_types::{ContainerId, NodeRef, ToolCall};
use ui_automation::{ApprovalDecision, ApprovalPort, AutomationError, InputPort, NoticePort};

#[derive(Default)]
struct PageMock {
    nodes: HashMap<String, NodeRef>,
    writes: Mutex<Vec<String>>,
    clicks: Mutex<Vec<NodeRef>>,
}

impl PageMock {
    fn chat_page() -> Arc<Self> {
        Arc::new(Self {
            nodes: [
                ("#prompt-textarea", "n-editor"),
                ("button[data-testid=\"send-button\"]", "n-send"),
                ("button[data-testid=\"stop-button\"]", "n-stop"),
            ]
            .into_iter()
            .map(|(sel, node)| (sel.to_string(), NodeRef(node.to_string())))
            .collect(),
            ..Default::default()
        })
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn clicks(&self) -> Vec<NodeRef> {
        self.clicks.lock().unwrap().clone()
    }
}

#[async_trait]
impl InputPort for PageMock {
    async fn query_first(&self, selectors: &[String]) -> Option<NodeRef> {
        selectors.iter().find_map(|s| self.nodes.get(s).cloned())
    }

    async fn focus(&self, _node: &NodeRef) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn paste_text(&self, _node: &NodeRef, text: &str) -> Result<(), AutomationError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn insert_text(&self, _node: &NodeRef, text: &str) -> Result<(), AutomationError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn set_value(&self, _node: &NodeRef, text: &str) -> Result<(), AutomationError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn set_rich_text(&self, _node: &NodeRef, text: &str) -> Result<(), AutomationError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn click(&self, node: &NodeRef) -> Result<(), AutomationError> {
        self.clicks.lock().unwrap().push(node.clone());
        Ok(())
    }
}

#[derive(Default)]
struct SilentNotice {
    ticks: AtomicUsize,
}

impl NoticePort for SilentNotice {
    fn toast(&self, _message: &str) {}
    fn countdown_tick(&self, _remaining: u64) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
    fn countdown_closed(&self) {}
}

struct AlwaysApprove;

#[async_trait]
impl ApprovalPort for AlwaysApprove {
    async fn request_approval(
        &self,
        _container: Option<&ContainerId>,
        _call: &ToolCall,
    ) -> ApprovalDecision {
        ApprovalDecision::Approved
    }
}

struct CannedAnswer(&'static str);

#[async_trait]
impl QuestionPort for CannedAnswer {
    async fn ask(&self, _question: String, _options: Vec<String>) -> String {
        self.0.to_string()
    }
}

struct EmptyDom;

#[async_trait]
impl DomPort for EmptyDom {
    async fn ancestors(&self, _node: &NodeRef) -> Vec<dom_observer::AncestorInfo> {
        Vec::new()
    }
    async fn rendered_containers(&self) -> Vec<ContainerId> {
        Vec::new()
    }
    async fn container_text(&self, _id: &ContainerId) -> Option<String> {
        None
    }
}

/// One-shot HTTP fixture answering a single request with a canned response.
async fn serve_once(status_line: &'static str, body: &'static str) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if n == 0 || request_complete(&request) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    });
    addr
}

fn request_complete(request: &[u8]) -> bool {
    let Some(header_end) = request
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| p + 4)
    else {
        return false;
    };
    let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + content_length
}

fn test_config(service_url: String) -> BridgeConfig {
    BridgeConfig {
        service_url,
        auto_send: true,
        delay_min_secs: 0,
        delay_max_secs: 0,
        ..Default::default()
    }
}

fn start_bridge(config: &BridgeConfig, page: Arc<PageMock>) -> Bridge {
    Bridge::start(
        config,
        "https://chatgpt.com/c/abc123",
        PagePorts {
            input: page,
            notice: Arc::new(SilentNotice::default()),
            approval: Arc::new(AlwaysApprove),
            question: Arc::new(CannedAnswer("blue")),
            dom: Some(Arc::new(EmptyDom)),
        },
        Arc::new(MemoryStorage::new()),
    )
}

const CALL_BLOCK: &str =
    r#"<tool name="read_file" call_id="7"><parameter name="path">/tmp/x</parameter></tool>"#;

#[tokio::test]
async fn chunked_stream_executes_once_and_writes_the_result() {
    let addr = serve_once("200 OK", r#"{"output":"file contents"}"#).await;
    let page = PageMock::chat_page();
    let bridge = start_bridge(&test_config(format!("http://{addr}")), page.clone());

    let id = ResponseId::new();
    bridge.ingest_stream(id, StreamEvent::Started).await;
    let (a, b) = CALL_BLOCK.as_bytes().split_at(25);
    bridge.ingest_stream(id, StreamEvent::Chunk(a.to_vec())).await;
    bridge.ingest_stream(id, StreamEvent::Chunk(b.to_vec())).await;
    // The same block arriving again is a duplicate sighting.
    bridge
        .ingest_stream(id, StreamEvent::Chunk(CALL_BLOCK.as_bytes().to_vec()))
        .await;
    bridge.ingest_stream(id, StreamEvent::Finished).await;
    bridge.shutdown().await;

    assert_eq!(page.writes(), vec!["file contents".to_string()]);
    // Zero-delay countdown: the send control was clicked.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(page.clicks(), vec![NodeRef("n-send".into())]);
}

#[tokio::test]
async fn unauthorized_service_writes_auth_message_without_submitting() {
    let addr = serve_once("401 Unauthorized", "{}").await;
    let page = PageMock::chat_page();
    let bridge = start_bridge(&test_config(format!("http://{addr}")), page.clone());

    let id = ResponseId::new();
    bridge
        .ingest_stream(id, StreamEvent::Chunk(CALL_BLOCK.as_bytes().to_vec()))
        .await;
    bridge.shutdown().await;

    let writes = page.writes();
    assert_eq!(writes.len(), 1);
    assert!(writes[0].contains("authentication failed"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(page.clicks().is_empty());
}

#[tokio::test]
async fn stop_stream_clicks_stop_before_writing() {
    let addr = serve_once("200 OK", r#"{"output":"interrupted","stopStream":true}"#).await;
    let page = PageMock::chat_page();
    let bridge = start_bridge(&test_config(format!("http://{addr}")), page.clone());

    let id = ResponseId::new();
    bridge
        .ingest_stream(id, StreamEvent::Chunk(CALL_BLOCK.as_bytes().to_vec()))
        .await;
    bridge.shutdown().await;

    assert_eq!(page.clicks().first(), Some(&NodeRef("n-stop".into())));
    assert_eq!(page.writes(), vec!["interrupted".to_string()]);
}

#[tokio::test]
async fn question_call_is_answered_locally() {
    // No service fixture: a question must never produce an HTTP request.
    let page = PageMock::chat_page();
    let bridge = start_bridge(&test_config("http://127.0.0.1:9".into()), page.clone());

    let block = r#"<tool name="question" call_id="42"><parameter name="question">Favourite colour?</parameter><parameter name="options">["red","blue"]</parameter></tool>"#;
    let id = ResponseId::new();
    bridge
        .ingest_stream(id, StreamEvent::Chunk(block.as_bytes().to_vec()))
        .await;
    bridge.shutdown().await;

    assert_eq!(page.writes(), vec!["blue".to_string()]);
    // Answers are never auto-submitted.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(page.clicks().is_empty());
}

#[tokio::test]
async fn countdown_cancel_prevents_submission() {
    let addr = serve_once("200 OK", r#"{"output":"slow result"}"#).await;
    let page = PageMock::chat_page();
    let config = BridgeConfig {
        delay_min_secs: 5,
        delay_max_secs: 5,
        ..test_config(format!("http://{addr}"))
    };
    let bridge = start_bridge(&config, page.clone());

    let id = ResponseId::new();
    bridge
        .ingest_stream(id, StreamEvent::Chunk(CALL_BLOCK.as_bytes().to_vec()))
        .await;
    // Wait until the result is written and the countdown armed.
    let mut waited = 0;
    while !bridge.countdown_active() && waited < 100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += 1;
    }
    assert!(bridge.countdown_active());
    bridge.cancel_countdown();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(page.clicks().is_empty());
    bridge.shutdown().await;
}

#[tokio::test]
async fn init_prompt_is_written_and_submitted() {
    let addr = serve_once("200 OK", "Please use the available tools.").await;
    let page = PageMock::chat_page();
    let bridge = start_bridge(&test_config(format!("http://{addr}")), page.clone());

    bridge.send_init_prompt().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(page.writes(), vec!["Please use the available tools.".to_string()]);
    assert_eq!(page.clicks(), vec![NodeRef("n-send".into())]);
    bridge.shutdown().await;
}

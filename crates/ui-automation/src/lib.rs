//! Writes execution results back into the page and optionally auto-submits.
//!
//! Which element is the editor, which control submits, and how text gets in
//! are all properties of the host page, captured once in the site adapter.
//! Everything here degrades to a logged no-op when a target is missing —
//! a broken page must never take the detection pipeline down with it.

pub mod ports;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use exec_queue::{Delivery, DeliverySink};
use toolbridge_core_types::{FillMethod, NodeRef, SiteAdapter};
use toolbridge_scheduler::{bounded_probe, random_delay, Countdown, CountdownHandle};

pub use crate::ports::{ApprovalDecision, ApprovalPort, InputPort, NoticePort};

const SUBMIT_PROBE_ATTEMPTS: u32 = 50;
const SUBMIT_PROBE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error, Clone)]
pub enum AutomationError {
    #[error("page operation failed: {0}")]
    Page(String),
}

/// Auto-submit behaviour, from user configuration.
#[derive(Clone, Debug)]
pub struct SubmitSettings {
    pub auto_send: bool,
    pub delay_min: Duration,
    pub delay_max: Duration,
    /// Pause after clicking the stop control, letting the interruption
    /// take effect before the result is written.
    pub stop_grace: Duration,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            auto_send: true,
            delay_min: Duration::from_secs(1),
            delay_max: Duration::from_secs(4),
            stop_grace: Duration::from_millis(600),
        }
    }
}

pub struct UiAutomation {
    adapter: SiteAdapter,
    input: Arc<dyn InputPort>,
    notice: Arc<dyn NoticePort>,
    settings: SubmitSettings,
    active_countdown: Mutex<Option<CountdownHandle>>,
}

impl UiAutomation {
    pub fn new(
        adapter: SiteAdapter,
        input: Arc<dyn InputPort>,
        notice: Arc<dyn NoticePort>,
        settings: SubmitSettings,
    ) -> Self {
        Self {
            adapter,
            input,
            notice,
            settings,
            active_countdown: Mutex::new(None),
        }
    }

    pub fn adapter(&self) -> &SiteAdapter {
        &self.adapter
    }

    /// Put `text` into the page's input surface using the site's fill
    /// strategy. Missing editor is a logged no-op.
    pub async fn write(&self, text: &str) {
        let Some(node) = self.input.query_first(&self.adapter.editor).await else {
            warn!(site = %self.adapter.site, "editor not found; dropping write");
            return;
        };
        if let Err(err) = self.input.focus(&node).await {
            debug!(%err, "focus failed before fill");
        }
        let filled = match self.adapter.fill_method {
            FillMethod::Paste => self.input.paste_text(&node, text).await,
            FillMethod::InsertText => self.input.insert_text(&node, text).await,
            FillMethod::Value => self.input.set_value(&node, text).await,
            FillMethod::RichText => self.input.set_rich_text(&node, text).await,
        };
        if let Err(err) = filled {
            warn!(%err, site = %self.adapter.site, "fill failed");
        }
    }

    /// Start the cancellable auto-submit countdown. No-op when auto-send
    /// is disabled.
    pub fn submit(&self) {
        if !self.settings.auto_send {
            return;
        }
        let delay = random_delay(self.settings.delay_min, self.settings.delay_max);
        let input = Arc::clone(&self.input);
        let selectors = self.adapter.send_button.clone();
        let notice = Arc::clone(&self.notice);
        let tick_notice = Arc::clone(&self.notice);
        let handle = Countdown::start(
            delay,
            Duration::from_secs(1),
            move |remaining| tick_notice.countdown_tick(remaining),
            move || async move {
                notice.countdown_closed();
                let found = bounded_probe(SUBMIT_PROBE_ATTEMPTS, SUBMIT_PROBE_INTERVAL, || {
                    let input = Arc::clone(&input);
                    let selectors = selectors.clone();
                    async move { input.query_first(&selectors).await }
                })
                .await;
                match found {
                    Some(node) => {
                        if let Err(err) = input.click(&node).await {
                            warn!(%err, "submit click failed");
                        }
                    }
                    None => warn!("submit control never appeared"),
                }
            },
        );
        if let Some(previous) = self.active_countdown.lock().replace(handle) {
            previous.cancel();
        }
    }

    /// User-facing cancel. Final: nothing further happens for the pending
    /// result.
    pub fn cancel_countdown(&self) {
        if let Some(handle) = self.active_countdown.lock().take() {
            handle.cancel();
            self.notice.countdown_closed();
        }
    }

    pub fn countdown_active(&self) -> bool {
        self.active_countdown
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_cancelled())
    }

    /// Interrupt the page's in-progress generation, then give it a moment.
    async fn stop_generation(&self) {
        if let Some(selector) = &self.adapter.stop_button {
            match self
                .input
                .query_first(std::slice::from_ref(selector))
                .await
            {
                Some(node) => {
                    if let Err(err) = self.input.click(&node).await {
                        warn!(%err, "stop control click failed");
                    }
                }
                None => debug!("stop control not present"),
            }
        }
        self.notice.toast("generation stopped, writing result");
        tokio::time::sleep(self.settings.stop_grace).await;
    }
}

#[async_trait]
impl DeliverySink for UiAutomation {
    async fn deliver(&self, delivery: Delivery) {
        if delivery.stop_stream {
            self.stop_generation().await;
        }
        self.write(&delivery.text).await;
        if delivery.auto_send {
            self.submit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockInput {
        /// selector → node minted for it
        nodes: HashMap<String, NodeRef>,
        writes: Mutex<Vec<(NodeRef, String, FillMethod)>>,
        clicks: Mutex<Vec<NodeRef>>,
    }

    impl MockInput {
        fn with_nodes(pairs: &[(&str, &str)]) -> Self {
            Self {
                nodes: pairs
                    .iter()
                    .map(|(sel, node)| (sel.to_string(), NodeRef(node.to_string())))
                    .collect(),
                ..Default::default()
            }
        }

        async fn record(&self, node: &NodeRef, text: &str, method: FillMethod) {
            self.writes
                .lock()
                .push((node.clone(), text.to_string(), method));
        }
    }

    #[async_trait]
    impl InputPort for MockInput {
        async fn query_first(&self, selectors: &[String]) -> Option<NodeRef> {
            selectors.iter().find_map(|s| self.nodes.get(s).cloned())
        }

        async fn focus(&self, _node: &NodeRef) -> Result<(), AutomationError> {
            Ok(())
        }

        async fn paste_text(&self, node: &NodeRef, text: &str) -> Result<(), AutomationError> {
            self.record(node, text, FillMethod::Paste).await;
            Ok(())
        }

        async fn insert_text(&self, node: &NodeRef, text: &str) -> Result<(), AutomationError> {
            self.record(node, text, FillMethod::InsertText).await;
            Ok(())
        }

        async fn set_value(&self, node: &NodeRef, text: &str) -> Result<(), AutomationError> {
            self.record(node, text, FillMethod::Value).await;
            Ok(())
        }

        async fn set_rich_text(&self, node: &NodeRef, text: &str) -> Result<(), AutomationError> {
            self.record(node, text, FillMethod::RichText).await;
            Ok(())
        }

        async fn click(&self, node: &NodeRef) -> Result<(), AutomationError> {
            self.clicks.lock().push(node.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockNotice {
        toasts: Mutex<Vec<String>>,
        ticks: AtomicUsize,
    }

    impl NoticePort for MockNotice {
        fn toast(&self, message: &str) {
            self.toasts.lock().push(message.to_string());
        }

        fn countdown_tick(&self, _remaining: u64) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        fn countdown_closed(&self) {}
    }

    fn adapter() -> SiteAdapter {
        SiteAdapter {
            site: "example.com".into(),
            editor: vec!["#missing".into(), "#editor".into()],
            send_button: vec!["#send".into()],
            stop_button: Some("#stop".into()),
            fill_method: FillMethod::Paste,
            use_observer: false,
            container_markers: vec![],
        }
    }

    fn instant_settings() -> SubmitSettings {
        SubmitSettings {
            auto_send: true,
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
            stop_grace: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn write_uses_first_matching_selector_and_fill_method() {
        let input = Arc::new(MockInput::with_nodes(&[("#editor", "n-editor")]));
        let ui = UiAutomation::new(
            adapter(),
            input.clone(),
            Arc::new(MockNotice::default()),
            SubmitSettings::default(),
        );
        ui.write("hello").await;
        let writes = input.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, NodeRef("n-editor".into()));
        assert_eq!(writes[0].1, "hello");
        assert_eq!(writes[0].2, FillMethod::Paste);
    }

    #[tokio::test]
    async fn missing_editor_is_a_silent_noop() {
        let input = Arc::new(MockInput::default());
        let ui = UiAutomation::new(
            adapter(),
            input.clone(),
            Arc::new(MockNotice::default()),
            SubmitSettings::default(),
        );
        ui.write("dropped").await;
        assert!(input.writes.lock().is_empty());
    }

    #[tokio::test]
    async fn delivery_with_auto_send_clicks_submit_after_countdown() {
        let input = Arc::new(MockInput::with_nodes(&[
            ("#editor", "n-editor"),
            ("#send", "n-send"),
        ]));
        let ui = UiAutomation::new(
            adapter(),
            input.clone(),
            Arc::new(MockNotice::default()),
            instant_settings(),
        );
        ui.deliver(Delivery::auto("result")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(input.clicks.lock().as_slice(), &[NodeRef("n-send".into())]);
    }

    #[tokio::test]
    async fn cancel_before_expiry_prevents_submission() {
        let input = Arc::new(MockInput::with_nodes(&[
            ("#editor", "n-editor"),
            ("#send", "n-send"),
        ]));
        let ui = UiAutomation::new(
            adapter(),
            input.clone(),
            Arc::new(MockNotice::default()),
            SubmitSettings {
                delay_min: Duration::from_secs(5),
                delay_max: Duration::from_secs(5),
                ..instant_settings()
            },
        );
        ui.deliver(Delivery::auto("result")).await;
        assert!(ui.countdown_active());
        ui.cancel_countdown();
        assert!(!ui.countdown_active());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(input.clicks.lock().is_empty());
    }

    #[tokio::test]
    async fn auto_send_disabled_never_starts_a_countdown() {
        let input = Arc::new(MockInput::with_nodes(&[
            ("#editor", "n-editor"),
            ("#send", "n-send"),
        ]));
        let ui = UiAutomation::new(
            adapter(),
            input.clone(),
            Arc::new(MockNotice::default()),
            SubmitSettings {
                auto_send: false,
                ..instant_settings()
            },
        );
        ui.deliver(Delivery::auto("result")).await;
        assert!(!ui.countdown_active());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(input.clicks.lock().is_empty());
    }

    #[tokio::test]
    async fn stop_stream_interrupts_before_writing() {
        let input = Arc::new(MockInput::with_nodes(&[
            ("#editor", "n-editor"),
            ("#send", "n-send"),
            ("#stop", "n-stop"),
        ]));
        let notice = Arc::new(MockNotice::default());
        let ui = UiAutomation::new(adapter(), input.clone(), notice.clone(), instant_settings());
        ui.deliver(Delivery {
            text: "done".into(),
            auto_send: true,
            stop_stream: true,
        })
        .await;
        // Stop was clicked before anything was written.
        assert_eq!(input.clicks.lock().first(), Some(&NodeRef("n-stop".into())));
        assert_eq!(input.writes.lock()[0].1, "done");
        assert_eq!(notice.toasts.lock().len(), 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(input
            .clicks
            .lock()
            .contains(&NodeRef("n-send".into())));
        assert!(notice.ticks.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn manual_delivery_skips_the_countdown() {
        let input = Arc::new(MockInput::with_nodes(&[
            ("#editor", "n-editor"),
            ("#send", "n-send"),
        ]));
        let ui = UiAutomation::new(
            adapter(),
            input.clone(),
            Arc::new(MockNotice::default()),
            instant_settings(),
        );
        ui.deliver(Delivery::manual("auth failed")).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(input.clicks.lock().is_empty());
        assert_eq!(input.writes.lock()[0].1, "auth failed");
    }
}

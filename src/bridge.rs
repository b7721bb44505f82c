//! Assembly of the whole pipeline for one attached page.
//!
//! The page adapter supplies the ports (input surface, notices, approval,
//! question prompt, optionally DOM access); everything else is wired here
//! from configuration: site profile, conversation-scoped dedup store,
//! remote client, serialized execution queue, and the two acquisition
//! paths feeding one detector.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use dedup_store::{DedupStore, StoragePort, StoreConfig};
use dom_observer::{DomMutation, DomObserver, DomPort, ObserverConfig};
use exec_queue::{ExecQueue, QuestionPort, WorkerHandle};
use remote_client::RemoteClient;
use stream_tap::{ResponseId, StreamEvent, StreamTap};
use toolbridge_core_types::{ConversationId, SiteAdapter};
use ui_automation::{ApprovalPort, InputPort, NoticePort, SubmitSettings, UiAutomation};

use crate::config::BridgeConfig;
use crate::detector::CallDetector;
use crate::executor::RemoteExecutor;
use crate::sites;

const QUEUE_CAPACITY: usize = 32;

/// Everything the page adapter must provide for one attached page.
pub struct PagePorts {
    pub input: Arc<dyn InputPort>,
    pub notice: Arc<dyn NoticePort>,
    pub approval: Arc<dyn ApprovalPort>,
    pub question: Arc<dyn QuestionPort>,
    /// Required only for sites whose profile sets `use_observer`.
    pub dom: Option<Arc<dyn DomPort>>,
}

pub struct Bridge {
    ui: Arc<UiAutomation>,
    tap: Arc<StreamTap>,
    observer: Option<Arc<DomObserver>>,
    client: Option<RemoteClient>,
    queue: ExecQueue,
    worker: Option<WorkerHandle>,
    conversation: ConversationId,
    site: String,
}

impl Bridge {
    pub fn start(
        config: &BridgeConfig,
        page_url: &str,
        ports: PagePorts,
        storage: Arc<dyn StoragePort>,
    ) -> Self {
        let host = Url::parse(page_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let adapter = sites::resolve(&host, &config.sites);
        let conversation = ConversationId::from_page_url(page_url);
        info!(site = %adapter.site, conversation = %conversation, "attaching bridge");

        let store = Arc::new(DedupStore::new(
            storage,
            conversation.clone(),
            StoreConfig::default(),
        ));

        let client = match RemoteClient::new(&config.service_url, config.auth_token.clone()) {
            Ok(client) => Some(client),
            Err(err) => {
                warn!(%err, url = %config.service_url, "service address rejected");
                None
            }
        };

        let ui = Arc::new(UiAutomation::new(
            adapter.clone(),
            ports.input,
            ports.notice,
            SubmitSettings {
                auto_send: config.auto_send,
                delay_min: config.delay_min(),
                delay_max: config.delay_max(),
                ..SubmitSettings::default()
            },
        ));

        let (queue, worker) = exec_queue::spawn(
            Arc::new(RemoteExecutor::new(client.clone())),
            ports.question,
            ui.clone(),
            QUEUE_CAPACITY,
        );

        let detector = Arc::new(CallDetector::new(
            store,
            queue.clone(),
            ports.approval,
            config.auto_execute,
        ));

        let tap = Arc::new(StreamTap::new(detector.clone()));
        let observer = match (&adapter, ports.dom) {
            (SiteAdapter { use_observer: true, .. }, Some(dom)) => Some(DomObserver::new(
                dom,
                detector,
                adapter.container_markers.clone(),
                ObserverConfig {
                    debounce: config.debounce(),
                },
            )),
            (SiteAdapter { use_observer: true, .. }, None) => {
                warn!(site = %adapter.site, "profile wants the DOM observer but no DOM port was provided");
                None
            }
            _ => None,
        };

        let site = adapter.site.clone();
        Self {
            ui,
            tap,
            observer,
            client,
            queue,
            worker: Some(worker),
            conversation,
            site,
        }
    }

    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// Feed a tapped network response event.
    pub async fn ingest_stream(&self, id: ResponseId, event: StreamEvent) {
        self.tap.ingest(id, event).await;
    }

    /// Feed a DOM mutation. No-op for sites without the observer.
    pub async fn dom_mutation(&self, mutation: DomMutation) {
        if let Some(observer) = &self.observer {
            observer.on_mutation(mutation).await;
        }
    }

    /// Scan containers already rendered at attach time.
    pub async fn initial_scan(&self) {
        if let Some(observer) = &self.observer {
            observer.initial_scan().await;
        }
    }

    /// Fetch the initialization prompt and place it in the input, submitting
    /// per the auto-send policy. Degrades to a warning when the service is
    /// unavailable.
    pub async fn send_init_prompt(&self) {
        let Some(client) = &self.client else {
            warn!("init prompt skipped: no service configured");
            return;
        };
        match client.prompt().await {
            Ok(text) if !text.is_empty() => {
                self.ui.write(&text).await;
                self.ui.submit();
            }
            Ok(_) => info!("service returned an empty init prompt"),
            Err(err) => warn!(%err, "init prompt fetch failed"),
        }
    }

    /// User-facing countdown cancel.
    pub fn cancel_countdown(&self) {
        self.ui.cancel_countdown();
    }

    pub fn countdown_active(&self) -> bool {
        self.ui.countdown_active()
    }

    /// Drain the queue and stop the worker. Calls already accepted are
    /// executed and delivered first.
    pub async fn shutdown(mut self) {
        let worker = self.worker.take();
        // The detector's queue clone dies with the acquisition paths.
        drop(self.tap);
        drop(self.observer);
        drop(self.queue);
        if let Some(worker) = worker {
            worker.join().await;
        }
        info!(conversation = %self.conversation, "bridge detached");
    }
}

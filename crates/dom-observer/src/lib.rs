//! DOM-side acquisition path for pages that render responses client-side,
//! where tapping the network stream is unreliable.
//!
//! Mutations arrive from the page adapter; each is resolved to the nearest
//! ancestor recognised as a stable message container (markers come from the
//! site adapter), collected into a pending set, and a superseding debounce
//! timer coalesces bursts before every pending container's full text is
//! rescanned through the shared block scanner. An initial scan catches
//! calls rendered before the observer attached (e.g. after a reload).

pub mod ports;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use toolbridge_core_types::{BlockOrigin, BlockSink, ContainerId, ContainerMarker};
use toolbridge_scheduler::Debouncer;

pub use crate::ports::{AncestorInfo, DomMutation, DomPort};

/// Tunables for the observer.
#[derive(Clone, Debug)]
pub struct ObserverConfig {
    /// Quiet period before pending containers are rescanned.
    pub debounce: Duration,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(800),
        }
    }
}

pub struct DomObserver {
    port: Arc<dyn DomPort>,
    sink: Arc<dyn BlockSink>,
    markers: Vec<ContainerMarker>,
    debouncer: Debouncer,
    pending: Mutex<HashSet<ContainerId>>,
}

impl DomObserver {
    pub fn new(
        port: Arc<dyn DomPort>,
        sink: Arc<dyn BlockSink>,
        markers: Vec<ContainerMarker>,
        config: ObserverConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            port,
            sink,
            markers,
            debouncer: Debouncer::new(config.debounce),
            pending: Mutex::new(HashSet::new()),
        })
    }

    /// Scan everything already rendered. Run once at attach time.
    pub async fn initial_scan(&self) {
        for id in self.port.rendered_containers().await {
            self.scan_container(&id).await;
        }
    }

    /// Feed one mutation. Cheap: resolves the container and arms the
    /// debounce timer; actual scanning happens when the burst settles.
    pub async fn on_mutation(self: &Arc<Self>, mutation: DomMutation) {
        let chain = self.port.ancestors(mutation.node()).await;
        let Some(container) = chain
            .into_iter()
            .find(|a| self.markers.iter().any(|m| m.matches(&a.tag, &a.classes)))
        else {
            trace!(node = %mutation.node().0, "mutation outside any message container");
            return;
        };
        self.pending.lock().insert(container.id);
        let observer = Arc::clone(self);
        self.debouncer.schedule(move || async move {
            observer.flush_pending().await;
        });
    }

    /// Rescan and clear the pending set. Normally driven by the debounce
    /// timer; public so tests and shutdown paths can force a cycle.
    pub async fn flush_pending(&self) {
        let pending: Vec<ContainerId> = self.pending.lock().drain().collect();
        for id in pending {
            self.scan_container(&id).await;
        }
    }

    async fn scan_container(&self, id: &ContainerId) {
        let Some(text) = self.port.container_text(id).await else {
            debug!(container = %id.0, "container vanished before rescan");
            return;
        };
        for raw in call_parser::scan::find_blocks(&text) {
            self.sink
                .on_block(BlockOrigin::DomContainer(id.clone()), raw)
                .await;
        }
    }
}

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::{GatewayError, GatewayResult};
use crate::models::route::RouteDefinition;
use crate::route::store::RouteStore;

/// Signal published to the proxying engine whenever the table changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRefresh;

/// Remote source of the route document: one full fetch at startup plus a
/// stream of pushed replacement documents.
#[async_trait]
pub trait RouteConfigSource: Send + Sync {
    async fn fetch(&self) -> GatewayResult<String>;

    /// Channel of pushed full documents. Each received value replaces the
    /// synchronizer's previous contribution to the table.
    async fn watch(&self) -> mpsc::Receiver<String>;
}

/// Keeps the shared route table in step with the remote config source.
///
/// Lifecycle: `bootstrap` populates an empty store once, then `listen`
/// consumes pushes on its own task, reconciling with clear-then-repopulate
/// scoped to the ids this synchronizer added. Every change publishes a
/// [`RouteRefresh`] event.
pub struct RouteSynchronizer {
    store: Arc<RouteStore>,
    source: Arc<dyn RouteConfigSource>,
    refresh: broadcast::Sender<RouteRefresh>,
    tracked_ids: Mutex<HashSet<String>>,
}

impl RouteSynchronizer {
    pub fn new(store: Arc<RouteStore>, source: Arc<dyn RouteConfigSource>) -> Self {
        let (refresh, _) = broadcast::channel(16);
        Self {
            store,
            source,
            refresh,
            tracked_ids: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<RouteStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouteRefresh> {
        self.refresh.subscribe()
    }

    /// Startup: populate the store from a full fetch if it is empty. A
    /// connectivity failure leaves the dynamic table empty (only static
    /// routes apply) without failing the process.
    pub async fn bootstrap(&self) {
        if !self.store.dynamic_is_empty() {
            return;
        }
        match self.source.fetch().await {
            Ok(document) => {
                tracing::info!("bootstrapping route table from remote config");
                self.reconcile(&document);
            }
            Err(err) => {
                tracing::error!(error = %err, "route config source unreachable; starting with an empty dynamic table");
            }
        }
    }

    /// Push-notification loop; runs on its own task so reconciliation never
    /// blocks request processing.
    pub async fn listen(self: Arc<Self>) {
        let mut pushes = self.source.watch().await;
        while let Some(document) = pushes.recv().await {
            tracing::info!("route config push received");
            self.reconcile(&document);
        }
        tracing::debug!("route config push channel closed");
    }

    /// Replaces this synchronizer's routes with the document's contents. A
    /// malformed document is logged and the previous table is kept; there is
    /// never a clear without a replacement.
    pub fn reconcile(&self, document: &str) {
        let definitions: Vec<RouteDefinition> = match serde_json::from_str(document) {
            Ok(definitions) => definitions,
            Err(err) => {
                tracing::error!(error = %err, "malformed route document; keeping the previous table");
                return;
            }
        };

        let mut tracked = self.tracked_ids.lock().expect("route id set poisoned");
        for id in tracked.drain() {
            self.store.delete(&id);
        }
        for definition in definitions {
            tracked.insert(definition.id.clone());
            self.store.save(definition);
        }
        drop(tracked);

        self.publish();
    }

    /// Programmatic route admin: write one route and refresh.
    pub fn add_route(&self, definition: RouteDefinition) {
        self.tracked_ids
            .lock()
            .expect("route id set poisoned")
            .insert(definition.id.clone());
        self.store.save(definition);
        self.publish();
    }

    pub fn delete_route(&self, id: &str) -> bool {
        self.tracked_ids.lock().expect("route id set poisoned").remove(id);
        let deleted = self.store.delete(id);
        if deleted {
            self.publish();
        }
        deleted
    }

    fn publish(&self) {
        // No subscribers yet is fine; the proxying engine attaches later.
        let _ = self.refresh.send(RouteRefresh);
        tracing::debug!(routes = self.store.dynamic_len(), "route refresh published");
    }
}

/// Config source backed by an HTTP endpoint serving the route document,
/// polled for changes. Stands in for a push-capable config service.
pub struct HttpRouteConfigSource {
    http: reqwest::Client,
    url: String,
    poll_interval: Duration,
}

impl HttpRouteConfigSource {
    pub fn new(http: reqwest::Client, url: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            poll_interval,
        }
    }

    async fn fetch_document(http: &reqwest::Client, url: &str) -> GatewayResult<String> {
        http.get(url)
            .send()
            .await
            .map_err(|err| GatewayError::connect(format!("route config fetch failed: {err}")))?
            .text()
            .await
            .map_err(|err| GatewayError::connect(format!("route config fetch failed: {err}")))
    }
}

#[async_trait]
impl RouteConfigSource for HttpRouteConfigSource {
    async fn fetch(&self) -> GatewayResult<String> {
        Self::fetch_document(&self.http, &self.url).await
    }

    async fn watch(&self) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(4);
        let http = self.http.clone();
        let url = self.url.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut last: Option<String> = None;
            loop {
                tokio::time::sleep(poll_interval).await;
                match Self::fetch_document(&http, &url).await {
                    Ok(document) => {
                        if last.as_deref() != Some(document.as_str()) {
                            last = Some(document.clone());
                            if tx.send(document).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "route config poll failed"),
                }
            }
        });

        rx
    }
}

/// In-process source fed through a channel. Used by tests and by embedders
/// that already have a config push mechanism.
pub struct ChannelRouteConfigSource {
    document: Mutex<Option<String>>,
    push_rx: Mutex<Option<mpsc::Receiver<String>>>,
    push_tx: mpsc::Sender<String>,
}

impl ChannelRouteConfigSource {
    pub fn new(initial: Option<String>) -> Self {
        let (push_tx, push_rx) = mpsc::channel(4);
        Self {
            document: Mutex::new(initial),
            push_rx: Mutex::new(Some(push_rx)),
            push_tx,
        }
    }

    /// Handle for pushing replacement documents.
    pub fn pusher(&self) -> mpsc::Sender<String> {
        self.push_tx.clone()
    }
}

#[async_trait]
impl RouteConfigSource for ChannelRouteConfigSource {
    async fn fetch(&self) -> GatewayResult<String> {
        self.document
            .lock()
            .expect("document lock poisoned")
            .clone()
            .ok_or_else(|| GatewayError::connect("route config source has no document"))
    }

    async fn watch(&self) -> mpsc::Receiver<String> {
        self.push_rx
            .lock()
            .expect("push receiver lock poisoned")
            .take()
            .unwrap_or_else(|| mpsc::channel(1).1)
    }
}

//! Shared collaborators and the resource registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::debug;

use pod_notify::{
    ChannelDiscovery, NotificationConfig, NotificationSubscription, NotificationTransport,
    SolidChannelDiscovery, WebSocketTransport,
};
use pod_protocol::HttpTransport;
use pod_store::{Dataset, InMemoryDataset, RdfCodec, TurtleCodec};
use pod_types::{normalize_uri, GraphName, ResourceError, ResourceResult};

use crate::resource::{Container, Leaf, Resource};

/// Default minimum spacing between two same-named requests on a resource.
pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_millis(1_000);

/// Everything a resource needs to talk to its pod, plus the registry that
/// hands out one [`Resource`] per normalised URI.
pub struct PodContext {
    dataset: Arc<dyn Dataset>,
    http: Arc<dyn HttpTransport>,
    codec: Arc<dyn RdfCodec>,
    notification_transport: Arc<dyn NotificationTransport>,
    channel_discovery: Arc<dyn ChannelDiscovery>,
    notification_config: NotificationConfig,
    batch_window: Duration,
    registry: Mutex<HashMap<String, Resource>>,
    this: Weak<PodContext>,
}

/// Builder for [`PodContext`]. Only the HTTP transport is required.
pub struct PodContextBuilder {
    http: Arc<dyn HttpTransport>,
    dataset: Option<Arc<dyn Dataset>>,
    codec: Option<Arc<dyn RdfCodec>>,
    notification_transport: Option<Arc<dyn NotificationTransport>>,
    channel_discovery: Option<Arc<dyn ChannelDiscovery>>,
    notification_config: NotificationConfig,
    batch_window: Duration,
}

impl PodContextBuilder {
    pub fn with_dataset(mut self, dataset: Arc<dyn Dataset>) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn RdfCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_notification_transport(mut self, transport: Arc<dyn NotificationTransport>) -> Self {
        self.notification_transport = Some(transport);
        self
    }

    pub fn with_channel_discovery(mut self, discovery: Arc<dyn ChannelDiscovery>) -> Self {
        self.channel_discovery = Some(discovery);
        self
    }

    pub fn with_notification_config(mut self, config: NotificationConfig) -> Self {
        self.notification_config = config;
        self
    }

    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    pub fn build(self) -> Arc<PodContext> {
        let dataset = self
            .dataset
            .unwrap_or_else(|| Arc::new(InMemoryDataset::new()));
        let codec = self.codec.unwrap_or_else(|| Arc::new(TurtleCodec::new()));
        let channel_discovery = self.channel_discovery.unwrap_or_else(|| {
            Arc::new(SolidChannelDiscovery::new(Arc::clone(&self.http), Arc::clone(&codec)))
        });
        let notification_transport = self
            .notification_transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport));
        Arc::new_cyclic(|this| PodContext {
            dataset,
            http: self.http,
            codec,
            notification_transport,
            channel_discovery,
            notification_config: self.notification_config,
            batch_window: self.batch_window,
            registry: Mutex::new(HashMap::new()),
            this: this.clone(),
        })
    }
}

impl PodContext {
    pub fn builder(http: Arc<dyn HttpTransport>) -> PodContextBuilder {
        PodContextBuilder {
            http,
            dataset: None,
            codec: None,
            notification_transport: None,
            channel_discovery: None,
            notification_config: NotificationConfig::default(),
            batch_window: DEFAULT_BATCH_WINDOW,
        }
    }

    pub fn dataset(&self) -> &Arc<dyn Dataset> {
        &self.dataset
    }

    pub fn http(&self) -> &Arc<dyn HttpTransport> {
        &self.http
    }

    pub fn codec(&self) -> &Arc<dyn RdfCodec> {
        &self.codec
    }

    pub fn batch_window(&self) -> Duration {
        self.batch_window
    }

    pub fn notification_config(&self) -> &NotificationConfig {
        &self.notification_config
    }

    /// The resource for `uri`, created on first use. The fragment is
    /// ignored; a trailing `/` makes it a container.
    pub fn resource(&self, uri: &str) -> Resource {
        let uri = normalize_uri(uri);
        let mut registry = self.registry.lock().expect("lock poisoned");
        if let Some(existing) = registry.get(uri) {
            return existing.clone();
        }
        let subscription = NotificationSubscription::new(
            uri,
            Arc::clone(&self.channel_discovery),
            Arc::clone(&self.notification_transport),
            self.notification_config.clone(),
        );
        let resource = Resource::new(uri, self.this.clone(), self.batch_window, subscription);
        debug!(uri, kind = resource.kind(), "registered resource");
        registry.insert(uri.to_string(), resource.clone());
        resource
    }

    pub fn leaf(&self, uri: &str) -> ResourceResult<Leaf> {
        match self.resource(uri) {
            Resource::Leaf(leaf) => Ok(leaf),
            Resource::Container(_) => Err(ResourceError::invalid_uri(uri, "expected a leaf URI")),
        }
    }

    pub fn container(&self, uri: &str) -> ResourceResult<Container> {
        match self.resource(uri) {
            Resource::Container(container) => Ok(container),
            Resource::Leaf(_) => Err(ResourceError::invalid_uri(uri, "expected a container URI")),
        }
    }

    /// The registered resource for `uri`, without creating one.
    pub fn cached(&self, uri: &str) -> Option<Resource> {
        self.registry
            .lock()
            .expect("lock poisoned")
            .get(normalize_uri(uri))
            .cloned()
    }

    /// Drop the registry entry for `uri` and its graph. Returns whether the
    /// resource was registered. Existing handles keep working but are no
    /// longer the ones the registry hands out.
    pub fn forget(&self, uri: &str) -> bool {
        let uri = normalize_uri(uri);
        let removed = self.registry.lock().expect("lock poisoned").remove(uri);
        if let Some(resource) = &removed {
            resource.unsubscribe_from_all_notifications();
        }
        self.dataset
            .delete_matches(None, None, None, Some(&GraphName::named(uri)));
        removed.is_some()
    }

    pub fn resource_count(&self) -> usize {
        self.registry.lock().expect("lock poisoned").len()
    }
}

impl std::fmt::Debug for PodContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodContext")
            .field("batch_window", &self.batch_window)
            .field("resources", &self.resource_count())
            .field("quads", &self.dataset.len())
            .finish()
    }
}

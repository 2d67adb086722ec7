use std::sync::Arc;

use tracing::{debug, info};

use pod_protocol::{HttpTransport, ReqwestTransport};
use pod_resource::{Container, Leaf, PodContext, Resource, TransactionCoordinator, TransactionSuccess};
use pod_store::{Dataset, DatasetChanges};
use pod_types::vocab::pim;
use pod_types::{is_container_uri, normalize_uri, GraphName, ResourceError, Term};

use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};
use crate::transaction::PodTransaction;

/// High-level pod client.
///
/// Hands out one [`Resource`] per URI and keeps a single local dataset
/// that every resource reads into and writes from.
#[derive(Clone, Debug)]
pub struct PodClient {
    context: Arc<PodContext>,
    config: ClientConfig,
}

impl PodClient {
    /// A client talking HTTP through `reqwest`.
    pub fn connect(config: ClientConfig) -> SdkResult<Self> {
        let transport = ReqwestTransport::new(&config.transport())?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// A client over any transport, such as an in-memory pod.
    pub fn with_transport(http: Arc<dyn HttpTransport>, config: ClientConfig) -> Self {
        let context = PodContext::builder(http)
            .with_batch_window(config.batch_window())
            .with_notification_config(config.notifications.clone())
            .build();
        Self { context, config }
    }

    /// A client over a context built by the caller.
    pub fn from_context(context: Arc<PodContext>) -> Self {
        Self {
            context,
            config: ClientConfig::default(),
        }
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared context behind every resource handle.
    pub fn context(&self) -> &Arc<PodContext> {
        &self.context
    }

    /// The local dataset mirroring what has been read.
    pub fn dataset(&self) -> &Arc<dyn Dataset> {
        self.context.dataset()
    }

    // ---- Resources ----

    /// The handle for `uri`, a container if it ends in `/`.
    pub fn resource(&self, uri: &str) -> Resource {
        self.context.resource(uri)
    }

    /// The leaf at `uri`; container URIs are refused.
    pub fn leaf(&self, uri: &str) -> SdkResult<Leaf> {
        Ok(self.context.leaf(uri)?)
    }

    /// The container at `uri`; leaf URIs are refused.
    pub fn container(&self, uri: &str) -> SdkResult<Container> {
        Ok(self.context.container(uri)?)
    }

    /// Drop the handle and graph kept for `uri`. Returns whether a handle
    /// was registered.
    pub fn forget(&self, uri: &str) -> bool {
        self.context.forget(uri)
    }

    // ---- Transactions ----

    /// Begin buffering dataset changes for a later [`PodTransaction::commit`].
    pub fn start_transaction(&self) -> PodTransaction {
        PodTransaction::new(Arc::clone(&self.context))
    }

    /// Commit a prepared change set directly.
    pub async fn commit_changes(&self, changes: &DatasetChanges) -> SdkResult<TransactionSuccess> {
        let coordinator = TransactionCoordinator::new(Arc::clone(&self.context));
        Ok(coordinator.commit(changes).await?)
    }

    // ---- Discovery ----

    /// The storage containers a WebID profile advertises with
    /// `pim:storage`, read from the profile document.
    pub async fn discover_storage(&self, webid: &str) -> SdkResult<Vec<Container>> {
        let profile = self.context.leaf(webid)?;
        let read = profile.read().await?;
        if read.is_absent() {
            return Err(SdkError::NoStorage { webid: webid.to_string() });
        }

        let graph = GraphName::named(normalize_uri(webid));
        let subject = Term::iri(webid);
        let predicate = Term::iri(pim::STORAGE);
        let mut storages = Vec::new();
        for quad in self.dataset().match_quads(Some(&subject), Some(&predicate), None, Some(&graph)) {
            let Some(uri) = quad.object.as_iri() else {
                continue;
            };
            if !is_container_uri(uri) {
                return Err(ResourceError::noncompliant(webid, format!("storage {uri} is not a container")).into());
            }
            storages.push(self.context.container(uri)?);
        }
        if storages.is_empty() {
            return Err(SdkError::NoStorage { webid: webid.to_string() });
        }
        info!(webid, storages = storages.len(), "discovered storage");
        Ok(storages)
    }

    /// The storage root above `uri`.
    pub async fn root_container_of(&self, uri: &str) -> SdkResult<Container> {
        debug!(uri, "looking up root container");
        Ok(self.resource(uri).get_root_container().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_protocol::{InMemoryPod, Method};
    use pod_types::Quad;

    const ROOT: &str = "https://pod.example/";
    const CARD: &str = "https://pod.example/profile/card";
    const WEBID: &str = "https://pod.example/profile/card#me";

    fn client() -> (Arc<InMemoryPod>, PodClient) {
        let pod = Arc::new(InMemoryPod::new(ROOT));
        pod.add_turtle(
            CARD,
            "<https://pod.example/profile/card#me> <http://www.w3.org/ns/pim/space#storage> <https://pod.example/> .",
        );
        pod.add_turtle("https://pod.example/notes.ttl", "");
        let client = PodClient::with_transport(pod.clone(), ClientConfig::default());
        (pod, client)
    }

    fn note(value: &str) -> Quad {
        Quad::new(
            Term::iri("https://pod.example/notes.ttl#it"),
            Term::iri("http://ex/says"),
            Term::literal(value),
            GraphName::named("https://pod.example/notes.ttl"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn storage_is_discovered_from_profile() {
        let (_pod, client) = client();
        let storages = client.discover_storage(WEBID).await.unwrap();
        assert_eq!(storages.len(), 1);
        assert_eq!(storages[0].uri(), ROOT);
    }

    #[tokio::test(start_paused = true)]
    async fn profile_without_storage_is_an_error() {
        let (pod, client) = client();
        pod.add_turtle("https://pod.example/profile/bare", "");
        let err = client.discover_storage("https://pod.example/profile/bare#me").await.unwrap_err();
        assert_eq!(err.kind(), "noStorageError");
    }

    #[tokio::test(start_paused = true)]
    async fn transaction_commits_to_the_pod() {
        let (pod, client) = client();
        let mut tx = client.start_transaction();
        tx.add(note("hello"));
        assert_eq!(tx.match_quads(None, None, None, None).len(), 1);
        assert!(client.dataset().is_empty());

        let success = tx.commit().await.unwrap();
        assert_eq!(success.results.len(), 1);
        assert!(pod.document_text("https://pod.example/notes.ttl").unwrap().contains("hello"));
        let graph = GraphName::named("https://pod.example/notes.ttl");
        assert_eq!(client.dataset().graph_quads(&graph), vec![note("hello")]);
    }

    #[tokio::test(start_paused = true)]
    async fn rolled_back_transaction_sends_nothing() {
        let (pod, client) = client();
        let mut tx = client.start_transaction();
        tx.add(note("never"));
        tx.rollback();
        assert_eq!(pod.request_count(Method::Patch, "https://pod.example/notes.ttl"), 0);
        assert!(client.dataset().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn root_is_found_for_nested_resources() {
        let (_pod, client) = client();
        let root = client.root_container_of("https://pod.example/profile/card").await.unwrap();
        assert_eq!(root.uri(), ROOT);
    }
}

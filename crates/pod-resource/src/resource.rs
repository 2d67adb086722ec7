//! Leaf and container resources.
//!
//! A resource is a cheap handle onto shared per-URI state. Every operation
//! is routed through the resource's [`BatchedRequester`], and only a
//! successful outcome moves the state; a failed one leaves it as it was.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use bytes::Bytes;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tracing::{debug, warn};

use pod_notify::NotificationSubscription;
use pod_store::DatasetChanges;
use pod_types::{
    child_uri, is_container_uri, parent_uri, AggregateError, GraphName, ResourceError,
    ResourceResult,
};

use crate::containment::contained_uris;
use crate::context::PodContext;
use crate::outcome::{CreateOutcome, DeleteSuccess, ReadSuccess, UpdateSuccess};
use crate::requester::{
    BatchedRequester, OwnAcl, CHECK_ROOT, CREATE, DELETE, READ, UPDATE, UPLOAD,
};
use crate::requests::NewContent;
use crate::state::{BinaryContent, ContentKind, FetchState, Presence, ResourceState};

pub(crate) struct ResourceCore {
    pub uri: String,
    context: Weak<PodContext>,
    state: Mutex<ResourceState>,
    pub requester: BatchedRequester,
    pub acl: Mutex<Option<OwnAcl>>,
    pub notifications: NotificationSubscription,
}

impl ResourceCore {
    pub fn context(&self) -> ResourceResult<Arc<PodContext>> {
        self.context
            .upgrade()
            .ok_or_else(|| ResourceError::unexpected(self.uri.as_str(), "the pod client has been dropped"))
    }

    fn state(&self) -> ResourceState {
        self.state.lock().expect("lock poisoned").clone()
    }

    fn update_state(&self, f: impl FnOnce(&mut ResourceState)) {
        f(&mut self.state.lock().expect("lock poisoned"));
    }

    fn fetch_state(&self) -> FetchState {
        if self.requester.is_loading(READ) {
            FetchState::Fetching
        } else if self.state().did_fetch {
            FetchState::Fetched
        } else {
            FetchState::Unfetched
        }
    }

    fn apply_read(&self, read: &ReadSuccess) {
        self.update_state(|state| {
            state.did_fetch = true;
            match read {
                ReadSuccess::Absent { .. } => {
                    state.presence = Presence::Absent;
                    state.content = ContentKind::Unknown;
                    state.binary = None;
                }
                ReadSuccess::Data { .. } => {
                    state.presence = Presence::Present;
                    state.content = ContentKind::Data;
                    state.binary = None;
                }
                ReadSuccess::Binary { mime_type, blob, .. } => {
                    state.presence = Presence::Present;
                    state.content = ContentKind::Binary;
                    state.binary = Some(BinaryContent {
                        mime_type: mime_type.clone(),
                        blob: blob.clone(),
                    });
                }
                ReadSuccess::Container { is_root, .. } => {
                    state.presence = Presence::Present;
                    state.is_root = Some(*is_root);
                }
            }
        });
    }

    fn apply_created(&self, outcome: &CreateOutcome, content: &NewContent) {
        match outcome {
            CreateOutcome::AlreadyExists(read) => self.apply_read(read),
            CreateOutcome::Created { .. } => self.update_state(|state| {
                state.did_fetch = true;
                state.presence = Presence::Present;
                if !is_container_uri(&self.uri) {
                    if content.mime_type == pod_protocol::media::TURTLE {
                        state.content = ContentKind::Data;
                        state.binary = None;
                    } else {
                        state.content = ContentKind::Binary;
                        state.binary = Some(BinaryContent {
                            mime_type: content.mime_type.clone(),
                            blob: content.body.clone(),
                        });
                    }
                }
            }),
        }
    }

    fn apply_deleted(&self) {
        self.update_state(|state| {
            state.did_fetch = true;
            state.presence = Presence::Absent;
            state.content = ContentKind::Unknown;
            state.binary = None;
        });
    }

    /// The read this resource's state already answers, if it was fetched.
    fn cached_read(&self) -> Option<ReadSuccess> {
        let state = self.state();
        if !state.did_fetch {
            return None;
        }
        let uri = self.uri.clone();
        match state.presence {
            Presence::Unknown => None,
            Presence::Absent => Some(ReadSuccess::Absent { uri }),
            Presence::Present if is_container_uri(&uri) => Some(ReadSuccess::Container {
                uri,
                is_root: state.is_root.unwrap_or(false),
            }),
            Presence::Present => match (state.content, state.binary) {
                (ContentKind::Binary, Some(binary)) => Some(ReadSuccess::Binary {
                    uri,
                    mime_type: binary.mime_type,
                    blob: binary.blob,
                }),
                (ContentKind::Binary, None) => None,
                _ => Some(ReadSuccess::Data { uri }),
            },
        }
    }

    pub async fn read(&self) -> ResourceResult<ReadSuccess> {
        let read = self.requester.read(self.context()?).await?;
        self.apply_read(&read);
        Ok(read)
    }

    async fn read_if_unfetched(&self) -> ResourceResult<ReadSuccess> {
        match self.cached_read() {
            Some(read) => Ok(read),
            None => self.read().await,
        }
    }

    async fn create(&self, name: &'static str, content: NewContent, overwrite: bool) -> ResourceResult<CreateOutcome> {
        let outcome = self
            .requester
            .create(self.context()?, name, content.clone(), overwrite)
            .await?;
        self.apply_created(&outcome, &content);
        Ok(outcome)
    }

    async fn delete_own(&self) -> ResourceResult<DeleteSuccess> {
        let deleted = self.requester.delete(self.context()?).await?;
        self.apply_deleted();
        Ok(deleted)
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A resource of either kind.
#[derive(Clone)]
pub enum Resource {
    Leaf(Leaf),
    Container(Container),
}

impl Resource {
    pub(crate) fn new(
        uri: &str,
        context: Weak<PodContext>,
        batch_window: Duration,
        notifications: NotificationSubscription,
    ) -> Self {
        let core = Arc::new(ResourceCore {
            uri: uri.to_string(),
            context,
            state: Mutex::new(ResourceState::default()),
            requester: BatchedRequester::new(uri, batch_window),
            acl: Mutex::new(None),
            notifications,
        });
        Self::from_core(core)
    }

    pub(crate) fn from_core(core: Arc<ResourceCore>) -> Self {
        if is_container_uri(&core.uri) {
            Self::Container(Container { core })
        } else {
            Self::Leaf(Leaf { core })
        }
    }

    pub(crate) fn core(&self) -> &Arc<ResourceCore> {
        match self {
            Self::Leaf(leaf) => &leaf.core,
            Self::Container(container) => &container.core,
        }
    }

    /// The resource's URI.
    pub fn uri(&self) -> &str {
        &self.core().uri
    }

    /// `"leaf"` or `"container"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "leaf",
            Self::Container(_) => "container",
        }
    }

    /// The leaf, if this is one.
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Container(_) => None,
        }
    }

    /// The container, if this is one.
    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Self::Container(container) => Some(container),
            Self::Leaf(_) => None,
        }
    }

    /// Whether both handles share the same underlying state.
    pub fn same_resource(&self, other: &Resource) -> bool {
        Arc::ptr_eq(self.core(), other.core())
    }

    /// Whether the resource has been read, or is being read right now.
    pub fn fetch_state(&self) -> FetchState {
        self.core().fetch_state()
    }

    /// What the last successful request said about existence.
    pub fn presence(&self) -> Presence {
        self.core().state().presence
    }

    /// Whether any request for this resource is queued or running.
    pub fn is_loading(&self) -> bool {
        self.core().requester.is_busy()
    }

    /// `GET` the resource, merging with a read already queued.
    pub async fn read(&self) -> ResourceResult<ReadSuccess> {
        self.core().read().await
    }

    /// Answer from local state when the resource was already fetched,
    /// otherwise read it.
    pub async fn read_if_unfetched(&self) -> ResourceResult<ReadSuccess> {
        self.core().read_if_unfetched().await
    }

    /// Delete whatever is at this URI, then create the resource empty.
    pub async fn create_and_overwrite(&self) -> ResourceResult<CreateOutcome> {
        self.core().create(CREATE, NewContent::turtle(), true).await
    }

    /// Create the resource empty unless a read finds it already there.
    pub async fn create_if_absent(&self) -> ResourceResult<CreateOutcome> {
        self.core().create(CREATE, NewContent::turtle(), false).await
    }

    /// Delete the resource. Containers delete their children first.
    pub fn delete(&self) -> BoxFuture<'static, ResourceResult<DeleteSuccess>> {
        let this = self.clone();
        async move {
            match this {
                Self::Leaf(leaf) => leaf.delete().await,
                Self::Container(container) => container.delete().await,
            }
        }
        .boxed()
    }

    /// The enclosing container; `None` for a storage root.
    pub async fn get_parent_container(&self) -> ResourceResult<Option<Container>> {
        match self {
            Self::Leaf(leaf) => leaf.get_parent_container().map(Some),
            Self::Container(container) => container.get_parent_container().await,
        }
    }

    /// The storage root above this resource.
    pub async fn get_root_container(&self) -> ResourceResult<Container> {
        match self {
            Self::Leaf(leaf) => leaf.get_root_container().await,
            Self::Container(container) => container.get_root_container().await,
        }
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.core().state();
        f.debug_struct("Resource")
            .field("uri", &self.uri())
            .field("kind", &self.kind())
            .field("fetch_state", &self.fetch_state())
            .field("presence", &state.presence)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Leaf
// ---------------------------------------------------------------------------

/// A non-container resource: RDF data or a binary file.
#[derive(Clone)]
pub struct Leaf {
    pub(crate) core: Arc<ResourceCore>,
}

impl Leaf {
    /// The leaf's URI.
    pub fn uri(&self) -> &str {
        &self.core.uri
    }

    pub fn fetch_state(&self) -> FetchState {
        self.core.fetch_state()
    }

    pub fn presence(&self) -> Presence {
        self.core.state().presence
    }

    /// Data, binary or not yet known.
    pub fn content_kind(&self) -> ContentKind {
        self.core.state().content
    }

    pub fn is_binary(&self) -> bool {
        self.content_kind() == ContentKind::Binary
    }

    pub fn is_data(&self) -> bool {
        self.content_kind() == ContentKind::Data
    }

    /// The last binary body read or uploaded.
    pub fn binary(&self) -> Option<BinaryContent> {
        self.core.state().binary
    }

    /// Whether any request for this leaf is queued or running.
    pub fn is_loading(&self) -> bool {
        self.core.requester.is_busy()
    }

    pub fn is_reading(&self) -> bool {
        self.core.requester.is_loading(READ)
    }

    pub fn is_creating(&self) -> bool {
        self.core.requester.is_loading(CREATE)
    }

    pub fn is_uploading(&self) -> bool {
        self.core.requester.is_loading(UPLOAD)
    }

    pub fn is_updating(&self) -> bool {
        self.core.requester.is_loading(UPDATE)
    }

    pub fn is_deleting(&self) -> bool {
        self.core.requester.is_loading(DELETE)
    }

    /// Wrap the handle as a [`Resource`].
    pub fn into_resource(self) -> Resource {
        Resource::Leaf(self)
    }

    /// `GET` the leaf. Turtle replaces its graph; anything else is kept as
    /// binary content.
    pub async fn read(&self) -> ResourceResult<ReadSuccess> {
        self.core.read().await
    }

    /// Answer from local state when the leaf was already fetched, otherwise
    /// read it.
    pub async fn read_if_unfetched(&self) -> ResourceResult<ReadSuccess> {
        self.core.read_if_unfetched().await
    }

    /// Delete the leaf if present, then create it as an empty Turtle document.
    pub async fn create_and_overwrite(&self) -> ResourceResult<CreateOutcome> {
        self.core.create(CREATE, NewContent::turtle(), true).await
    }

    /// Create the leaf as an empty Turtle document unless it already exists.
    pub async fn create_if_absent(&self) -> ResourceResult<CreateOutcome> {
        self.core.create(CREATE, NewContent::turtle(), false).await
    }

    /// Replace the leaf with `blob` stored as `mime_type`. A Turtle body is
    /// also loaded into the leaf's graph.
    pub async fn upload_and_overwrite(
        &self,
        blob: impl Into<Bytes>,
        mime_type: &str,
    ) -> ResourceResult<CreateOutcome> {
        self.core
            .create(UPLOAD, NewContent::binary(mime_type, blob), true)
            .await
    }

    /// Store `blob` as `mime_type` unless the leaf already exists.
    pub async fn upload_if_absent(
        &self,
        blob: impl Into<Bytes>,
        mime_type: &str,
    ) -> ResourceResult<CreateOutcome> {
        self.core
            .create(UPLOAD, NewContent::binary(mime_type, blob), false)
            .await
    }

    /// Patch this leaf with changes to its own graph.
    ///
    /// The changes are applied to the dataset right away and undone if the
    /// pod rejects them. Changes naming any other graph are refused.
    pub async fn update(&self, changes: DatasetChanges) -> ResourceResult<UpdateSuccess> {
        let graph = GraphName::named(self.uri());
        if let Some(other) = changes.graphs().into_iter().find(|g| g != &graph) {
            return Err(ResourceError::invalid_uri(
                self.uri(),
                format!("changes target {other}, not this resource"),
            ));
        }
        let updated = self.core.requester.update(self.core.context()?, changes).await?;
        self.core.update_state(|state| {
            state.presence = Presence::Present;
            state.content = ContentKind::Data;
            state.binary = None;
        });
        Ok(updated)
    }

    /// `DELETE` the leaf. A leaf that was already gone still succeeds.
    pub async fn delete(&self) -> ResourceResult<DeleteSuccess> {
        self.core.delete_own().await
    }

    /// The container holding this leaf. Every leaf has one.
    pub fn get_parent_container(&self) -> ResourceResult<Container> {
        let parent = parent_uri(self.uri())
            .ok_or_else(|| ResourceError::invalid_uri(self.uri(), "leaf has no parent container"))?;
        self.core.context()?.container(&parent)
    }

    /// The storage root above this leaf.
    pub async fn get_root_container(&self) -> ResourceResult<Container> {
        self.get_parent_container()?.get_root_container().await
    }
}

impl std::fmt::Debug for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leaf")
            .field("uri", &self.core.uri)
            .field("fetch_state", &self.fetch_state())
            .field("content", &self.content_kind())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// A container resource. Its children are whatever the dataset currently
/// says it contains.
#[derive(Clone)]
pub struct Container {
    pub(crate) core: Arc<ResourceCore>,
}

impl Container {
    /// The container's URI.
    pub fn uri(&self) -> &str {
        &self.core.uri
    }

    pub fn fetch_state(&self) -> FetchState {
        self.core.fetch_state()
    }

    pub fn presence(&self) -> Presence {
        self.core.state().presence
    }

    /// Whether any request for this container is queued or running.
    pub fn is_loading(&self) -> bool {
        self.core.requester.is_busy()
    }

    pub fn is_reading(&self) -> bool {
        self.core.requester.is_loading(READ)
    }

    pub fn is_creating(&self) -> bool {
        self.core.requester.is_loading(CREATE)
    }

    pub fn is_deleting(&self) -> bool {
        self.core.requester.is_loading(DELETE)
    }

    pub fn is_checking_root(&self) -> bool {
        self.core.requester.is_loading(CHECK_ROOT)
    }

    /// `Some(true)` once the container is known to be a storage root.
    pub fn is_root_container(&self) -> Option<bool> {
        self.core.state().is_root
    }

    /// Wrap the handle as a [`Resource`].
    pub fn into_resource(self) -> Resource {
        Resource::Container(self)
    }

    /// `GET` the container's listing and record its children.
    pub async fn read(&self) -> ResourceResult<ReadSuccess> {
        self.core.read().await
    }

    pub async fn read_if_unfetched(&self) -> ResourceResult<ReadSuccess> {
        self.core.read_if_unfetched().await
    }

    /// Delete the container and its contents, then create it empty.
    pub async fn create_and_overwrite(&self) -> ResourceResult<CreateOutcome> {
        self.core.create(CREATE, NewContent::turtle(), true).await
    }

    /// Create the container unless it already exists.
    pub async fn create_if_absent(&self) -> ResourceResult<CreateOutcome> {
        self.core.create(CREATE, NewContent::turtle(), false).await
    }

    /// The children currently recorded in the dataset.
    pub fn children(&self) -> ResourceResult<Vec<Resource>> {
        let context = self.core.context()?;
        Ok(contained_uris(context.dataset().as_ref(), self.uri())
            .iter()
            .map(|uri| context.resource(uri))
            .collect())
    }

    /// The resource named `slug` inside this container. A slug ending in
    /// `/` names a child container.
    pub fn child(&self, slug: &str) -> ResourceResult<Resource> {
        Ok(self.core.context()?.resource(&child_uri(self.uri(), slug)))
    }

    /// Create the child `slug`, replacing anything already there.
    pub async fn create_child_and_overwrite(&self, slug: &str) -> ResourceResult<CreateOutcome> {
        self.child(slug)?.create_and_overwrite().await
    }

    /// Create the child `slug` unless it already exists.
    pub async fn create_child_if_absent(&self, slug: &str) -> ResourceResult<CreateOutcome> {
        self.child(slug)?.create_if_absent().await
    }

    fn child_leaf(&self, slug: &str) -> ResourceResult<Leaf> {
        match self.child(slug)? {
            Resource::Leaf(leaf) => Ok(leaf),
            Resource::Container(c) => Err(ResourceError::invalid_uri(c.uri(), "cannot upload to a container")),
        }
    }

    /// Upload `blob` as the child leaf `slug`, replacing any existing one.
    pub async fn upload_child_and_overwrite(
        &self,
        slug: &str,
        blob: impl Into<Bytes>,
        mime_type: &str,
    ) -> ResourceResult<CreateOutcome> {
        self.child_leaf(slug)?.upload_and_overwrite(blob, mime_type).await
    }

    /// Upload `blob` as the child leaf `slug` unless one already exists.
    pub async fn upload_child_if_absent(
        &self,
        slug: &str,
        blob: impl Into<Bytes>,
        mime_type: &str,
    ) -> ResourceResult<CreateOutcome> {
        self.child_leaf(slug)?.upload_if_absent(blob, mime_type).await
    }

    /// Delete every child, then the container.
    ///
    /// Children are deleted concurrently, containers among them
    /// recursively. If any child fails the container is left in place and
    /// every child failure is returned in one [`AggregateError`].
    pub async fn delete(&self) -> ResourceResult<DeleteSuccess> {
        self.core.read_if_unfetched().await?;
        let children = self.children()?;
        if !children.is_empty() {
            debug!(uri = %self.uri(), children = children.len(), "deleting children");
            let results = join_all(children.iter().map(Resource::delete)).await;
            let errors: Vec<ResourceError> = results.into_iter().filter_map(Result::err).collect();
            if !errors.is_empty() {
                warn!(uri = %self.uri(), failed = errors.len(), "container not deleted");
                return Err(AggregateError::new(errors).into());
            }
        }
        self.core.delete_own().await
    }

    /// `HEAD` the container unless its root status is already known.
    pub async fn check_if_is_root_container(&self) -> ResourceResult<bool> {
        if let Some(known) = self.is_root_container() {
            return Ok(known);
        }
        let is_root = self.core.requester.check_root(self.core.context()?).await?;
        self.core.update_state(|state| state.is_root = Some(is_root));
        Ok(is_root)
    }

    /// The first container at or above this one that advertises itself
    /// as a storage root.
    pub async fn get_root_container(&self) -> ResourceResult<Container> {
        let context = self.core.context()?;
        let mut current = self.clone();
        loop {
            if current.check_if_is_root_container().await? {
                return Ok(current);
            }
            match parent_uri(current.uri()) {
                Some(parent) => current = context.container(&parent)?,
                None => {
                    return Err(ResourceError::NoRootContainer {
                        uri: self.uri().to_string(),
                    })
                }
            }
        }
    }

    /// The enclosing container, or `None` at a storage root or the top of
    /// the URI hierarchy.
    pub async fn get_parent_container(&self) -> ResourceResult<Option<Container>> {
        if self.check_if_is_root_container().await? {
            return Ok(None);
        }
        match parent_uri(self.uri()) {
            Some(parent) => self.core.context()?.container(&parent).map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("uri", &self.core.uri)
            .field("fetch_state", &self.fetch_state())
            .field("is_root", &self.is_root_container())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_protocol::{InMemoryPod, Method};
    use pod_types::Term;
    use std::time::Duration;

    const ROOT: &str = "https://pod.example/";
    const DOC: &str = "https://pod.example/docs/notes.ttl";

    fn setup() -> (Arc<InMemoryPod>, Arc<PodContext>) {
        let pod = Arc::new(InMemoryPod::new(ROOT));
        pod.add_turtle(DOC, "<#a> <http://ex/p> \"x\" .");
        let context = PodContext::builder(pod.clone()).build();
        (pod, context)
    }

    fn writes(pod: &InMemoryPod) -> Vec<(Method, String)> {
        pod.request_lines()
            .into_iter()
            .filter(|(m, _)| matches!(m, Method::Post | Method::Put | Method::Delete))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn concurrent_reads_share_one_request() {
        let (pod, context) = setup();
        let leaf = context.leaf(DOC).unwrap();
        let (a, b, c) = tokio::join!(leaf.read(), leaf.read(), leaf.read());
        let a = a.unwrap();
        assert_eq!(a, b.unwrap());
        assert_eq!(a, c.unwrap());
        assert_eq!(pod.request_count(Method::Get, DOC), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_state_follows_the_read() {
        let (pod, context) = setup();
        pod.set_latency(Duration::from_millis(100));
        let leaf = context.leaf(DOC).unwrap();
        assert_eq!(leaf.fetch_state(), FetchState::Unfetched);

        let reading = tokio::spawn({
            let leaf = leaf.clone();
            async move { leaf.read().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(leaf.fetch_state(), FetchState::Fetching);
        assert!(leaf.is_reading());

        reading.await.unwrap().unwrap();
        assert_eq!(leaf.fetch_state(), FetchState::Fetched);
        assert_eq!(leaf.presence(), Presence::Present);
        assert!(leaf.is_data());
    }

    #[tokio::test(start_paused = true)]
    async fn read_if_unfetched_uses_cached_state() {
        let (pod, context) = setup();
        let leaf = context.leaf(DOC).unwrap();
        leaf.read_if_unfetched().await.unwrap();
        let again = leaf.read_if_unfetched().await.unwrap();
        assert_eq!(again, ReadSuccess::Data { uri: DOC.into() });
        assert_eq!(pod.request_count(Method::Get, DOC), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_read_leaves_state_alone() {
        let (pod, context) = setup();
        let leaf = context.leaf(DOC).unwrap();
        leaf.read().await.unwrap();
        pod.fail(Method::Get, DOC, 500);
        let err = leaf.read().await.unwrap_err();
        assert_eq!(err.kind(), "serverError");
        assert_eq!(leaf.presence(), Presence::Present);
        assert_eq!(leaf.fetch_state(), FetchState::Fetched);
    }

    // ---------------------------------------------------------------------
    // Create and upload
    // ---------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn create_if_absent_keeps_existing_resource() {
        let (pod, context) = setup();
        let leaf = context.leaf(DOC).unwrap();
        let outcome = leaf.create_if_absent().await.unwrap();
        assert!(matches!(outcome, CreateOutcome::AlreadyExists(ReadSuccess::Data { .. })));
        assert!(writes(&pod).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn create_and_overwrite_deletes_then_posts() {
        let (pod, context) = setup();
        let leaf = context.leaf(DOC).unwrap();
        let outcome = leaf.create_and_overwrite().await.unwrap();
        assert_eq!(outcome.kind(), "createSuccess");
        assert_eq!(
            writes(&pod),
            vec![
                (Method::Delete, DOC.to_string()),
                (Method::Post, "https://pod.example/docs/".to_string()),
            ]
        );
        assert_eq!(pod.document_text(DOC).as_deref(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn uploads_are_cached_as_binary() {
        let (pod, context) = setup();
        let docs = context.container("https://pod.example/docs/").unwrap();
        docs.upload_child_if_absent("pic.png", vec![1u8, 2, 3], "image/png").await.unwrap();

        let leaf = context.leaf("https://pod.example/docs/pic.png").unwrap();
        assert!(leaf.is_binary());
        let binary = leaf.binary().unwrap();
        assert_eq!(binary.mime_type, "image/png");
        assert_eq!(&binary.blob[..], &[1u8, 2, 3][..]);
        let (content_type, _) = pod.document("https://pod.example/docs/pic.png").unwrap();
        assert_eq!(content_type, "image/png");

        let children: Vec<String> = docs.children().unwrap().iter().map(|c| c.uri().to_string()).collect();
        assert!(children.contains(&"https://pod.example/docs/pic.png".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn turtle_upload_fills_the_graph() {
        let (pod, context) = setup();
        let uri = "https://pod.example/docs/todo.ttl";
        let leaf = context.leaf(uri).unwrap();
        leaf.upload_and_overwrite("<#t> <http://ex/done> false .", "text/turtle")
            .await
            .unwrap();
        assert!(leaf.is_data());

        let read = leaf.read_if_unfetched().await.unwrap();
        assert_eq!(read.kind(), "dataReadSuccess");
        assert_eq!(pod.request_count(Method::Get, uri), 0);
        let quads = context.dataset().graph_quads(&GraphName::named(uri));
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].subject, Term::iri("https://pod.example/docs/todo.ttl#t"));
    }

    #[tokio::test(start_paused = true)]
    async fn created_container_gets_container_link() {
        let (pod, context) = setup();
        let root = context.container(ROOT).unwrap();
        let outcome = root.create_child_if_absent("photos/").await.unwrap();
        assert_eq!(outcome.uri(), "https://pod.example/photos/");
        assert!(pod.exists("https://pod.example/photos/"));
    }

    // ---------------------------------------------------------------------
    // Delete
    // ---------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn container_delete_removes_children_first() {
        let (pod, context) = setup();
        pod.add_turtle("https://pod.example/docs/nested/deep.ttl", "");
        let docs = context.container("https://pod.example/docs/").unwrap();

        let deleted = docs.delete().await.unwrap();
        assert!(deleted.resource_existed);
        assert!(!pod.exists("https://pod.example/docs/"));

        let deletes: Vec<String> = writes(&pod).into_iter().map(|(_, uri)| uri).collect();
        let position = |uri: &str| deletes.iter().position(|d| d == uri).unwrap();
        assert!(position("https://pod.example/docs/nested/deep.ttl") < position("https://pod.example/docs/nested/"));
        assert!(position("https://pod.example/docs/nested/") < position("https://pod.example/docs/"));
        assert!(position(DOC) < position("https://pod.example/docs/"));
        assert_eq!(docs.presence(), Presence::Absent);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_child_keeps_container() {
        let (pod, context) = setup();
        pod.add_turtle("https://pod.example/docs/other.ttl", "");
        pod.fail(Method::Delete, "https://pod.example/docs/other.ttl", 500);
        let docs = context.container("https://pod.example/docs/").unwrap();

        let err = docs.delete().await.unwrap_err();
        let ResourceError::Aggregate(aggregate) = err else {
            panic!("expected an aggregate error");
        };
        assert_eq!(aggregate.errors().len(), 1);
        assert_eq!(aggregate.errors()[0].kind(), "serverError");
        assert!(pod.exists("https://pod.example/docs/"));
        assert!(!pod.exists(DOC));
        assert_eq!(pod.request_count(Method::Delete, "https://pod.example/docs/"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_missing_leaf_reports_absence() {
        let (_pod, context) = setup();
        let leaf = context.leaf("https://pod.example/docs/missing.ttl").unwrap();
        let deleted = leaf.delete().await.unwrap();
        assert!(!deleted.resource_existed);
        assert_eq!(leaf.presence(), Presence::Absent);
    }

    // ---------------------------------------------------------------------
    // Hierarchy
    // ---------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn root_container_is_found_from_a_leaf() {
        let (pod, context) = setup();
        let leaf = context.leaf(DOC).unwrap();
        let root = leaf.get_root_container().await.unwrap();
        assert_eq!(root.uri(), ROOT);
        assert_eq!(root.is_root_container(), Some(true));

        // known statuses are not asked again
        let heads = pod.requests().iter().filter(|r| r.method == Method::Head).count();
        leaf.get_root_container().await.unwrap();
        assert_eq!(pod.requests().iter().filter(|r| r.method == Method::Head).count(), heads);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_root_is_reported() {
        let (pod, context) = setup();
        pod.unmark_root(ROOT);
        let docs = context.container("https://pod.example/docs/").unwrap();
        let err = docs.get_root_container().await.unwrap_err();
        assert_eq!(err.kind(), "noRootContainerError");
    }

    #[tokio::test(start_paused = true)]
    async fn root_has_no_parent() {
        let (_pod, context) = setup();
        let root = context.container(ROOT).unwrap();
        assert!(root.get_parent_container().await.unwrap().is_none());
        let docs = context.resource("https://pod.example/docs/");
        let parent = docs.get_parent_container().await.unwrap().unwrap();
        assert_eq!(parent.uri(), ROOT);
    }
}

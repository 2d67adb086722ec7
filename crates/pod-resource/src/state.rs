use bytes::Bytes;

/// Whether a resource has been read from the pod.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
    Unfetched,
    /// A read is queued or in flight.
    Fetching,
    Fetched,
}

/// What the client last learned about a resource's existence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Unknown,
    Present,
    Absent,
}

/// The shape of a present leaf's content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Unknown,
    /// Opaque bytes with a MIME type.
    Binary,
    /// RDF held in the dataset.
    Data,
}

/// The last binary body read from or uploaded to a leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryContent {
    pub mime_type: String,
    pub blob: Bytes,
}

#[derive(Clone, Debug)]
pub(crate) struct ResourceState {
    pub did_fetch: bool,
    pub presence: Presence,
    pub content: ContentKind,
    pub binary: Option<BinaryContent>,
    pub is_root: Option<bool>,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self {
            did_fetch: false,
            presence: Presence::Unknown,
            content: ContentKind::Unknown,
            binary: None,
            is_root: None,
        }
    }
}

//! Success values returned by resource operations.

use bytes::Bytes;

/// The result of reading a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadSuccess {
    /// The pod answered 404.
    Absent { uri: String },
    /// A Turtle leaf, now held in the dataset.
    Data { uri: String },
    /// A non-RDF leaf.
    Binary {
        uri: String,
        mime_type: String,
        blob: Bytes,
    },
    /// A container listing, now held in the dataset.
    Container { uri: String, is_root: bool },
}

impl ReadSuccess {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Absent { .. } => "absentReadSuccess",
            Self::Data { .. } => "dataReadSuccess",
            Self::Binary { .. } => "binaryReadSuccess",
            Self::Container { .. } => "containerReadSuccess",
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::Absent { uri }
            | Self::Data { uri }
            | Self::Binary { uri, .. }
            | Self::Container { uri, .. } => uri,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent { .. })
    }
}

/// The result of a create or upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { uri: String, did_overwrite: bool },
    /// The resource already existed and was left alone. Only the
    /// `*_if_absent` operations produce this.
    AlreadyExists(ReadSuccess),
}

impl CreateOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "createSuccess",
            Self::AlreadyExists(read) => read.kind(),
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::Created { uri, .. } => uri,
            Self::AlreadyExists(read) => read.uri(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteSuccess {
    pub uri: String,
    /// False when the pod answered 404.
    pub resource_existed: bool,
}

impl DeleteSuccess {
    pub fn kind(&self) -> &'static str {
        "deleteSuccess"
    }
}

/// One graph's share of a committed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateSuccess {
    /// The leaf was patched on the pod.
    Leaf { uri: String },
    /// Default-graph changes, applied locally only.
    DefaultGraph,
}

impl UpdateSuccess {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Leaf { .. } => "updateSuccess",
            Self::DefaultGraph => "updateDefaultGraphSuccess",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionSuccess {
    pub results: Vec<UpdateSuccess>,
}

impl TransactionSuccess {
    pub fn kind(&self) -> &'static str {
        "aggregateSuccess"
    }
}

use thiserror::Error;

use pod_notify::NotificationError;
use pod_protocol::ProtocolError;
use pod_types::ResourceError;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error("transport setup failed: {0}")]
    Transport(#[from] ProtocolError),

    #[error("no storage advertised by {webid}")]
    NoStorage { webid: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl SdkError {
    /// Stable name of the error kind, shared with the resource layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resource(e) => e.kind(),
            Self::Notification(e) => e.kind(),
            Self::Transport(_) => "transportError",
            Self::NoStorage { .. } => "noStorageError",
            Self::InvalidOperation(_) => "invalidOperationError",
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request to {uri} timed out")]
    Timeout { uri: String },

    #[error("malformed notification: {0}")]
    MalformedNotification(String),

    #[error("malformed update body: {0}")]
    MalformedUpdate(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

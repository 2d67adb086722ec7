use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("action '{name}' panicked: {message}")]
    ActionPanicked { name: String, message: String },

    #[error("batch driver stopped before the action completed")]
    DriverStopped,
}

pub type BatchResult<T> = Result<T, BatchError>;

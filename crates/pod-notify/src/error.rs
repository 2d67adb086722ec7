use thiserror::Error;

/// Failures delivered to notification callbacks or returned from
/// subscribing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    /// No notification channel could be set up for `uri`: the pod offers
    /// none this client can use, discovery failed or the channel would not
    /// open. `message` says which.
    #[error("notifications are not supported for {uri}: {message}")]
    Unsupported { uri: String, message: String },

    /// The channel dropped and a reconnect attempt is about to be made.
    #[error("notification channel for {uri} disconnected, reconnect attempt {attempt} of {max_attempts}")]
    DisconnectedReconnecting {
        uri: String,
        attempt: u32,
        max_attempts: u32,
    },

    /// Every reconnect attempt failed; the subscription is closed.
    #[error("notification channel for {uri} disconnected, gave up after {attempts} attempts")]
    DisconnectedGaveUp { uri: String, attempts: u32 },
}

impl NotificationError {
    /// Stable discriminant, e.g. `"unsupportedNotificationError"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unsupported { .. } => "unsupportedNotificationError",
            Self::DisconnectedReconnecting { .. } => "disconnectedAttemptingReconnectError",
            Self::DisconnectedGaveUp { .. } => "disconnectedNotAttemptingReconnectError",
        }
    }
}

impl NotificationError {
    pub fn unsupported(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unsupported {
            uri: uri.into(),
            message: message.into(),
        }
    }
}

pub type NotifyResult<T> = Result<T, NotificationError>;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use pod_types::vocab::{activity, notify};

use crate::error::{ProtocolError, ProtocolResult};

/// Activity type of an inbound notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NotificationType {
    Update,
    Delete,
    Add,
    Remove,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Add => "Add",
            Self::Remove => "Remove",
        }
    }
}

impl FromStr for NotificationType {
    type Err = ProtocolError;

    /// Accepts the short name, the `as:` CURIE, or the full ActivityStreams IRI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let short = s
            .strip_prefix(activity::NS)
            .or_else(|| s.strip_prefix("as:"))
            .unwrap_or(s);
        match short {
            "Update" => Ok(Self::Update),
            "Delete" => Ok(Self::Delete),
            "Add" => Ok(Self::Add),
            "Remove" => Ok(Self::Remove),
            other => Err(ProtocolError::MalformedNotification(format!(
                "unknown activity type {other}"
            ))),
        }
    }
}

impl TryFrom<String> for NotificationType {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change event delivered over a notification channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "@context", default)]
    pub context: serde_json::Value,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub object: String,
    /// The container an `Add`/`Remove` applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub published: String,
}

impl NotificationMessage {
    pub fn new(kind: NotificationType, object: impl Into<String>) -> Self {
        Self {
            context: serde_json::json!([activity::CONTEXT, notify::CONTEXT]),
            id: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            kind,
            object: object.into(),
            target: None,
            published: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// `published` as a timestamp, when the pod sent a valid one.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.published)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn parse(text: &str) -> ProtocolResult<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedNotification(e.to_string()))
    }

    pub fn to_json(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}

/// Body `POST`ed to a subscription endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub topic: String,
}

impl SubscriptionRequest {
    /// A `WebSocketChannel2023` subscription for `topic`.
    pub fn websocket(topic: impl Into<String>) -> Self {
        Self {
            context: vec![notify::CONTEXT.to_string()],
            channel_type: notify::WEBSOCKET_CHANNEL_2023.to_string(),
            topic: topic.into(),
        }
    }
}

/// The channel description returned by a subscription endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDescription {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    pub receive_from: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_full_types() {
        let short = r#"{"@context":["https://www.w3.org/ns/activitystreams"],"id":"urn:1","type":"Update","object":"https://pod.example/a","published":"2024-01-01T00:00:00Z"}"#;
        let msg = NotificationMessage::parse(short).unwrap();
        assert_eq!(msg.kind, NotificationType::Update);
        assert_eq!(msg.object, "https://pod.example/a");
        assert_eq!(msg.published_at().unwrap().timestamp(), 1_704_067_200);

        let full = r#"{"id":"urn:2","type":"https://www.w3.org/ns/activitystreams#Add","object":"https://pod.example/c/x","target":"https://pod.example/c/"}"#;
        let msg = NotificationMessage::parse(full).unwrap();
        assert_eq!(msg.kind, NotificationType::Add);
        assert_eq!(msg.target.as_deref(), Some("https://pod.example/c/"));
        assert!(msg.published_at().is_none());
    }

    #[test]
    fn rejects_unknown_type() {
        let text = r#"{"id":"urn:3","type":"Move","object":"x"}"#;
        assert!(NotificationMessage::parse(text).is_err());
    }

    #[test]
    fn serializes_short_type() {
        let msg = NotificationMessage::new(NotificationType::Delete, "https://pod.example/a");
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"Delete\""));
        assert_eq!(NotificationMessage::parse(&json).unwrap(), msg);
    }

    #[test]
    fn subscription_request_shape() {
        let req = SubscriptionRequest::websocket("https://pod.example/a");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["type"], notify::WEBSOCKET_CHANNEL_2023);
        assert_eq!(value["topic"], "https://pod.example/a");
        assert!(value["@context"].is_array());

        let resp: ChannelDescription =
            serde_json::from_str(r#"{"id":"x","receiveFrom":"wss://pod.example/ws/1"}"#).unwrap();
        assert_eq!(resp.receive_from, "wss://pod.example/ws/1");
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use pod_protocol::{
    check_response, headers, links_with_rel, media, ChannelDescription, HttpRequest, HttpTransport,
    SubscriptionRequest,
};
use pod_store::RdfCodec;
use pod_types::vocab::{notify, solid};
use pod_types::Term;

use crate::error::{NotificationError, NotifyResult};

/// Resolves the address a resource's notifications are received from.
#[async_trait]
pub trait ChannelDiscovery: Send + Sync {
    async fn discover(&self, topic: &str) -> NotifyResult<String>;
}

/// Discovery per the Solid Notifications protocol, requesting a
/// `WebSocketChannel2023` channel from the storage's subscription service.
pub struct SolidChannelDiscovery {
    http: Arc<dyn HttpTransport>,
    codec: Arc<dyn RdfCodec>,
}

impl SolidChannelDiscovery {
    pub fn new(http: Arc<dyn HttpTransport>, codec: Arc<dyn RdfCodec>) -> Self {
        Self { http, codec }
    }

    async fn send(&self, topic: &str, request: HttpRequest) -> NotifyResult<pod_protocol::HttpResponse> {
        let uri = request.uri.clone();
        let response = self
            .http
            .send(request)
            .await
            .map_err(|e| unsupported(topic, format!("discovery request to {uri} failed: {e}")))?;
        check_response(&uri, &response)
            .map_err(|e| unsupported(topic, format!("discovery failed: {e}")))?;
        Ok(response)
    }
}

fn unsupported(topic: &str, message: impl Into<String>) -> NotificationError {
    NotificationError::unsupported(topic, message)
}

#[async_trait]
impl ChannelDiscovery for SolidChannelDiscovery {
    async fn discover(&self, topic: &str) -> NotifyResult<String> {
        let head = self.send(topic, HttpRequest::head(topic)).await?;
        let description_uri = links_with_rel(&head, solid::STORAGE_DESCRIPTION, topic)
            .into_iter()
            .next()
            .ok_or_else(|| unsupported(topic, "no storage description link"))?;

        let description = self
            .send(
                topic,
                HttpRequest::get(&description_uri).header(headers::ACCEPT, media::TURTLE),
            )
            .await?;
        let quads = self
            .codec
            .parse(&description.text(), &description_uri)
            .map_err(|e| unsupported(topic, format!("unreadable storage description: {e}")))?;

        let websocket = Term::iri(notify::WEBSOCKET_CHANNEL_2023);
        let endpoint = quads
            .iter()
            .filter(|q| q.predicate.is_iri(notify::SUBSCRIPTION))
            .filter_map(|q| q.object.as_iri())
            .find(|service| {
                quads.iter().any(|q| {
                    q.subject.is_iri(service)
                        && q.predicate.is_iri(notify::CHANNEL_TYPE)
                        && q.object == websocket
                })
            })
            .ok_or_else(|| unsupported(topic, "no WebSocketChannel2023 subscription service"))?
            .to_string();

        let body = serde_json::to_vec(&SubscriptionRequest::websocket(topic))
            .map_err(|e| unsupported(topic, e.to_string()))?;
        let response = self
            .send(
                topic,
                HttpRequest::post(&endpoint)
                    .header(headers::CONTENT_TYPE, media::JSON_LD)
                    .header(headers::ACCEPT, media::JSON_LD)
                    .body(body),
            )
            .await?;
        let channel: ChannelDescription = serde_json::from_slice(&response.body)
            .map_err(|e| unsupported(topic, format!("unreadable channel description: {e}")))?;

        debug!(topic, endpoint = %endpoint, receive_from = %channel.receive_from, "notification channel discovered");
        Ok(channel.receive_from)
    }
}

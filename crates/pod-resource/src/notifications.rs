//! Live notifications on resources.
//!
//! Messages about a resource make it re-read itself before the message is
//! passed on, so callbacks observe the refreshed dataset. Each callback
//! receives events in the order the channel produced them, errors included.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use pod_notify::{NotificationCallback, NotificationEvent, NotifyResult};
use pod_protocol::NotificationType;
use pod_types::is_container_uri;

use crate::resource::{Container, Leaf, Resource, ResourceCore};

impl ResourceCore {
    fn refreshes_on(&self, event: &NotificationEvent) -> bool {
        match event {
            NotificationEvent::Message(message) => match message.kind {
                NotificationType::Update | NotificationType::Delete => true,
                NotificationType::Add | NotificationType::Remove => is_container_uri(&self.uri),
            },
            NotificationEvent::Error(_) => false,
        }
    }

    async fn subscribe(self: &Arc<Self>, callback: NotificationCallback) -> NotifyResult<Uuid> {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<NotificationEvent>();
        let resource = Arc::downgrade(self);
        // Ends once the registration is dropped and the queue drained.
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if let Some(core) = resource.upgrade().filter(|core| core.refreshes_on(&event)) {
                    if let Err(e) = core.read().await {
                        warn!(uri = %core.uri, error = %e, "refresh after notification failed");
                    }
                }
                callback(event);
            }
        });
        let forward: NotificationCallback = Arc::new(move |event: NotificationEvent| {
            let _ = events_tx.send(event);
        });
        self.notifications.subscribe(forward).await
    }
}

impl Leaf {
    /// Register `callback` for changes to this leaf, opening the channel if
    /// needed.
    pub async fn subscribe_to_notifications(&self, callback: NotificationCallback) -> NotifyResult<Uuid> {
        self.core.subscribe(callback).await
    }

    pub fn unsubscribe_from_notifications(&self, id: Uuid) -> bool {
        self.core.notifications.unsubscribe(id)
    }

    pub fn unsubscribe_from_all_notifications(&self) {
        self.core.notifications.unsubscribe_all()
    }

    pub fn is_subscribed_to_notifications(&self) -> bool {
        self.core.notifications.is_subscribed()
    }
}

impl Container {
    /// Register `callback` for changes to this container, including
    /// children being added or removed.
    pub async fn subscribe_to_notifications(&self, callback: NotificationCallback) -> NotifyResult<Uuid> {
        self.core.subscribe(callback).await
    }

    pub fn unsubscribe_from_notifications(&self, id: Uuid) -> bool {
        self.core.notifications.unsubscribe(id)
    }

    pub fn unsubscribe_from_all_notifications(&self) {
        self.core.notifications.unsubscribe_all()
    }

    pub fn is_subscribed_to_notifications(&self) -> bool {
        self.core.notifications.is_subscribed()
    }
}

impl Resource {
    pub async fn subscribe_to_notifications(&self, callback: NotificationCallback) -> NotifyResult<Uuid> {
        self.core().subscribe(callback).await
    }

    pub fn unsubscribe_from_notifications(&self, id: Uuid) -> bool {
        self.core().notifications.unsubscribe(id)
    }

    pub fn unsubscribe_from_all_notifications(&self) {
        self.core().notifications.unsubscribe_all()
    }

    pub fn is_subscribed_to_notifications(&self) -> bool {
        self.core().notifications.is_subscribed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PodContext;
    use async_trait::async_trait;
    use pod_notify::{ChannelDiscovery, ChannelEvent, NotificationConnection, NotificationTransport};
    use pod_protocol::{InMemoryPod, NotificationMessage};
    use pod_store::Dataset;
    use pod_types::GraphName;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const DOC: &str = "https://pod.example/doc.ttl";

    struct Channel {
        events: Mutex<Option<mpsc::UnboundedReceiver<ChannelEvent>>>,
    }

    struct ChannelConnection(mpsc::UnboundedReceiver<ChannelEvent>);

    #[async_trait]
    impl NotificationConnection for ChannelConnection {
        async fn next_event(&mut self) -> ChannelEvent {
            self.0.recv().await.unwrap_or(ChannelEvent::Closed)
        }

        async fn close(&mut self) {
            self.0.close();
        }
    }

    #[async_trait]
    impl NotificationTransport for Channel {
        async fn connect(&self, receive_from: &str) -> NotifyResult<Box<dyn NotificationConnection>> {
            match self.events.lock().unwrap().take() {
                Some(events) => Ok(Box::new(ChannelConnection(events))),
                None => Err(pod_notify::NotificationError::unsupported(receive_from, "already used")),
            }
        }
    }

    struct Fixed;

    #[async_trait]
    impl ChannelDiscovery for Fixed {
        async fn discover(&self, _topic: &str) -> NotifyResult<String> {
            Ok("ws://pod.example/ws/1".into())
        }
    }

    fn context_with_channel(pod: &Arc<InMemoryPod>) -> (Arc<PodContext>, mpsc::UnboundedSender<ChannelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let context = PodContext::builder(pod.clone())
            .with_notification_transport(Arc::new(Channel { events: Mutex::new(Some(rx)) }))
            .with_channel_discovery(Arc::new(Fixed))
            .with_batch_window(Duration::ZERO)
            .build();
        (context, tx)
    }

    fn update() -> ChannelEvent {
        let message = NotificationMessage::new(NotificationType::Update, DOC);
        ChannelEvent::Message(message.to_json().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn update_message_refreshes_before_forwarding() {
        let pod = Arc::new(InMemoryPod::new("https://pod.example/"));
        pod.add_turtle(DOC, "<#a> <http://ex/p> \"one\" .");
        let (context, tx) = context_with_channel(&pod);
        let leaf = context.leaf(DOC).unwrap();
        leaf.read().await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = Arc::clone(&context);
        let callback: NotificationCallback = Arc::new(move |event: NotificationEvent| {
            let quads = observer.dataset().graph_quads(&GraphName::named(DOC));
            sink.lock().unwrap().push((event, quads.len()));
        });
        leaf.subscribe_to_notifications(callback).await.unwrap();
        assert!(leaf.is_subscribed_to_notifications());

        pod.add_turtle(DOC, "<#a> <http://ex/p> \"one\" . <#b> <http://ex/p> \"two\" .");
        tx.send(update()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0].0, NotificationEvent::Message(_)));
        assert_eq!(seen[0].1, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_wait_behind_a_pending_refresh() {
        let pod = Arc::new(InMemoryPod::new("https://pod.example/"));
        pod.add_turtle(DOC, "<#a> <http://ex/p> \"one\" .");
        let (context, tx) = context_with_channel(&pod);
        let leaf = context.leaf(DOC).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: NotificationCallback = Arc::new(move |event: NotificationEvent| {
            let kind = match &event {
                NotificationEvent::Message(_) => "message",
                NotificationEvent::Error(e) => e.kind(),
            };
            sink.lock().unwrap().push(kind);
        });
        leaf.subscribe_to_notifications(callback).await.unwrap();

        pod.set_latency(Duration::from_millis(100));
        tx.send(update()).unwrap();
        tx.send(ChannelEvent::Error("reset".into())).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["message", "disconnectedAttemptingReconnectError"]
        );
    }
}

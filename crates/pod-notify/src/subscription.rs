//! One live notification channel per resource, shared by any number of
//! callbacks.
//!
//! The channel opens with the first callback and closes with the last. When
//! it drops unexpectedly the subscription reconnects up to
//! `max_reconnect_attempts` times, telling callbacks about each attempt, and
//! after the final failure delivers a single terminal error to each callback
//! and closes.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pod_protocol::NotificationMessage;

use crate::config::NotificationConfig;
use crate::discovery::ChannelDiscovery;
use crate::error::{NotificationError, NotifyResult};
use crate::transport::{ChannelEvent, NotificationConnection, NotificationTransport};

/// What a subscriber receives.
#[derive(Clone, Debug)]
pub enum NotificationEvent {
    Message(NotificationMessage),
    Error(NotificationError),
}

pub type NotificationCallback = Arc<dyn Fn(NotificationEvent) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    Closed,
    Opening,
    Open,
    Reconnecting,
}

struct Shared {
    state: SubscriptionState,
    callbacks: BTreeMap<Uuid, NotificationCallback>,
    shutdown: Option<oneshot::Sender<()>>,
    /// Bumped whenever a channel is opened or closed; a driver whose
    /// generation is stale stops delivering.
    generation: u64,
}

impl Shared {
    fn close(&mut self) {
        self.state = SubscriptionState::Closed;
        self.generation += 1;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

struct Inner {
    topic: String,
    discovery: Arc<dyn ChannelDiscovery>,
    transport: Arc<dyn NotificationTransport>,
    config: NotificationConfig,
    shared: Mutex<Shared>,
    open_lock: tokio::sync::Mutex<()>,
}

/// Notification subscription for a single topic resource.
pub struct NotificationSubscription {
    inner: Arc<Inner>,
}

impl NotificationSubscription {
    pub fn new(
        topic: impl Into<String>,
        discovery: Arc<dyn ChannelDiscovery>,
        transport: Arc<dyn NotificationTransport>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                topic: topic.into(),
                discovery,
                transport,
                config,
                shared: Mutex::new(Shared {
                    state: SubscriptionState::Closed,
                    callbacks: BTreeMap::new(),
                    shutdown: None,
                    generation: 0,
                }),
                open_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    pub fn state(&self) -> SubscriptionState {
        self.inner.shared.lock().expect("lock poisoned").state
    }

    /// True while a channel is open (or being re-established) and at least
    /// one callback is registered.
    pub fn is_subscribed(&self) -> bool {
        let shared = self.inner.shared.lock().expect("lock poisoned");
        shared.state != SubscriptionState::Closed && !shared.callbacks.is_empty()
    }

    pub fn callback_count(&self) -> usize {
        self.inner.shared.lock().expect("lock poisoned").callbacks.len()
    }

    /// Register `callback`, opening the channel if it is closed.
    ///
    /// If the channel cannot be opened the callback is not kept and the
    /// failure is returned.
    pub async fn subscribe(&self, callback: NotificationCallback) -> NotifyResult<Uuid> {
        let id = Uuid::new_v4();
        let _opening = self.inner.open_lock.lock().await;
        let needs_open = {
            let mut shared = self.inner.shared.lock().expect("lock poisoned");
            shared.callbacks.insert(id, callback);
            shared.state == SubscriptionState::Closed
        };
        if needs_open {
            if let Err(e) = self.inner.open().await {
                self.inner
                    .shared
                    .lock()
                    .expect("lock poisoned")
                    .callbacks
                    .remove(&id);
                return Err(e);
            }
        }
        debug!(topic = %self.inner.topic, subscription = %id, "callback registered");
        Ok(id)
    }

    /// Remove one callback. Returns whether it was registered. Removing the
    /// last callback closes the channel.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let mut shared = self.inner.shared.lock().expect("lock poisoned");
        let removed = shared.callbacks.remove(&id).is_some();
        if removed && shared.callbacks.is_empty() && shared.state != SubscriptionState::Closed {
            shared.close();
            info!(topic = %self.inner.topic, "notification channel closed");
        }
        removed
    }

    pub fn unsubscribe_all(&self) {
        let mut shared = self.inner.shared.lock().expect("lock poisoned");
        shared.callbacks.clear();
        if shared.state != SubscriptionState::Closed {
            shared.close();
            info!(topic = %self.inner.topic, "notification channel closed");
        }
    }
}

impl Drop for NotificationSubscription {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.inner.shared.lock() {
            shared.callbacks.clear();
            shared.close();
        }
    }
}

impl std::fmt::Debug for NotificationSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSubscription")
            .field("topic", &self.inner.topic)
            .field("state", &self.state())
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Channel driver
// ---------------------------------------------------------------------------

impl Inner {
    async fn connect(&self) -> NotifyResult<Box<dyn NotificationConnection>> {
        let address = self.discovery.discover(&self.topic).await?;
        self.transport.connect(&address).await
    }

    async fn open(self: &Arc<Self>) -> NotifyResult<()> {
        self.shared.lock().expect("lock poisoned").state = SubscriptionState::Opening;
        let mut connection = match self.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "could not open notification channel");
                let mut shared = self.shared.lock().expect("lock poisoned");
                if shared.state == SubscriptionState::Opening {
                    shared.state = SubscriptionState::Closed;
                }
                return Err(e);
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let generation = {
            let mut shared = self.shared.lock().expect("lock poisoned");
            if shared.callbacks.is_empty() {
                shared.state = SubscriptionState::Closed;
                None
            } else {
                shared.generation += 1;
                shared.shutdown = Some(shutdown_tx);
                shared.state = SubscriptionState::Open;
                Some(shared.generation)
            }
        };
        match generation {
            Some(generation) => {
                info!(topic = %self.topic, "notification channel open");
                tokio::spawn(Arc::clone(self).drive(generation, connection, shutdown_rx));
            }
            None => connection.close().await,
        }
        Ok(())
    }

    async fn drive(
        self: Arc<Self>,
        generation: u64,
        mut connection: Box<dyn NotificationConnection>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        loop {
            let event = tokio::select! {
                _ = &mut shutdown => None,
                event = connection.next_event() => Some(event),
            };
            let Some(event) = event else {
                connection.close().await;
                return;
            };
            match event {
                ChannelEvent::Message(text) => match NotificationMessage::parse(&text) {
                    Ok(message) => {
                        debug!(topic = %self.topic, kind = %message.kind, "notification received");
                        self.emit(generation, NotificationEvent::Message(message));
                    }
                    Err(e) => warn!(topic = %self.topic, error = %e, "ignoring malformed notification"),
                },
                ChannelEvent::Closed | ChannelEvent::Error(_) => {
                    if let ChannelEvent::Error(reason) = &event {
                        warn!(topic = %self.topic, reason = %reason, "notification channel failed");
                    }
                    match self.reconnect(generation, &mut shutdown).await {
                        Some(next) => connection = next,
                        None => return,
                    }
                }
            }
        }
    }

    async fn reconnect(
        &self,
        generation: u64,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> Option<Box<dyn NotificationConnection>> {
        if !self.set_state(generation, SubscriptionState::Reconnecting) {
            return None;
        }
        let max_attempts = self.config.max_reconnect_attempts;
        for attempt in 1..=max_attempts {
            self.emit(
                generation,
                NotificationEvent::Error(NotificationError::DisconnectedReconnecting {
                    uri: self.topic.clone(),
                    attempt,
                    max_attempts,
                }),
            );
            tokio::select! {
                _ = &mut *shutdown => return None,
                _ = tokio::time::sleep(self.config.reconnect_interval()) => {}
            }
            match self.connect().await {
                Ok(connection) => {
                    if self.set_state(generation, SubscriptionState::Open) {
                        info!(topic = %self.topic, attempt, "notification channel reconnected");
                        return Some(connection);
                    }
                    return None;
                }
                Err(e) => warn!(topic = %self.topic, attempt, error = %e, "reconnect attempt failed"),
            }
        }
        self.give_up(generation, max_attempts);
        None
    }

    fn set_state(&self, generation: u64, state: SubscriptionState) -> bool {
        let mut shared = self.shared.lock().expect("lock poisoned");
        if shared.generation != generation {
            return false;
        }
        shared.state = state;
        true
    }

    fn emit(&self, generation: u64, event: NotificationEvent) {
        let callbacks: Vec<NotificationCallback> = {
            let shared = self.shared.lock().expect("lock poisoned");
            if shared.generation != generation {
                return;
            }
            shared.callbacks.values().cloned().collect()
        };
        for callback in callbacks {
            callback(event.clone());
        }
    }

    fn give_up(&self, generation: u64, attempts: u32) {
        let callbacks = {
            let mut shared = self.shared.lock().expect("lock poisoned");
            if shared.generation != generation {
                return;
            }
            shared.state = SubscriptionState::Closed;
            shared.generation += 1;
            shared.shutdown = None;
            std::mem::take(&mut shared.callbacks)
        };
        warn!(topic = %self.topic, attempts, "giving up on notification channel");
        let error = NotificationError::DisconnectedGaveUp {
            uri: self.topic.clone(),
            attempts,
        };
        for callback in callbacks.into_values() {
            callback(NotificationEvent::Error(error.clone()));
        }
    }
}

//! Live change notifications for pod resources.
//!
//! A [`NotificationSubscription`] keeps one channel per topic resource open
//! for as long as callbacks are registered. Channels are found through the
//! storage description ([`SolidChannelDiscovery`]) and opened with a
//! [`NotificationTransport`], by default a WebSocket. Dropped channels are
//! re-established a bounded number of times per [`NotificationConfig`].

pub mod config;
pub mod discovery;
pub mod error;
pub mod subscription;
pub mod transport;

pub use config::NotificationConfig;
pub use discovery::{ChannelDiscovery, SolidChannelDiscovery};
pub use error::{NotificationError, NotifyResult};
pub use subscription::{
    NotificationCallback, NotificationEvent, NotificationSubscription, SubscriptionState,
};
pub use transport::{ChannelEvent, NotificationConnection, NotificationTransport, WebSocketTransport};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{NotificationError, NotifyResult};

/// What an open channel produced next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A text frame, expected to hold a JSON notification.
    Message(String),
    /// The remote closed the channel.
    Closed,
    /// The channel failed.
    Error(String),
}

/// An open notification channel.
#[async_trait]
pub trait NotificationConnection: Send {
    /// Wait for the next event. After `Closed` or `Error` the connection is
    /// finished.
    async fn next_event(&mut self) -> ChannelEvent;

    async fn close(&mut self);
}

/// Opens channels to the addresses produced by discovery.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn connect(&self, receive_from: &str) -> NotifyResult<Box<dyn NotificationConnection>>;
}

/// [`NotificationTransport`] for `WebSocketChannel2023` channels.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl NotificationTransport for WebSocketTransport {
    async fn connect(&self, receive_from: &str) -> NotifyResult<Box<dyn NotificationConnection>> {
        let (stream, _) = connect_async(receive_from)
            .await
            .map_err(|e| NotificationError::unsupported(receive_from, format!("channel did not open: {e}")))?;
        debug!(address = receive_from, "websocket channel open");
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl NotificationConnection for WebSocketConnection {
    async fn next_event(&mut self) -> ChannelEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return ChannelEvent::Message(text),
                Some(Ok(Message::Binary(bytes))) => {
                    if let Ok(text) = String::from_utf8(bytes) {
                        return ChannelEvent::Message(text);
                    }
                }
                Some(Ok(Message::Close(_))) | None => return ChannelEvent::Closed,
                Some(Ok(_)) => {}
                Some(Err(e)) => return ChannelEvent::Error(e.to_string()),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_port_is_unsupported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = format!("ws://{}/channel", listener.local_addr().unwrap());
        drop(listener);

        let err = match WebSocketTransport.connect(&address).await {
            Ok(_) => panic!("connected to a closed port"),
            Err(e) => e,
        };
        assert_eq!(err.kind(), "unsupportedNotificationError");
        assert!(err.to_string().contains("channel did not open"));
    }
}

//! Connection seam and its WebSocket implementation.
//!
//! The client drives a [`Connection`] obtained from a [`Connector`]; a
//! connection is handed over only after the Socket.IO handshake is done, so
//! the client itself deals in events only.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, trace, warn};

use crate::error::{RealtimeError, Result};
use crate::protocol::{self, Packet};

/// An established Socket.IO session.
#[async_trait]
pub trait Connection: Send {
    /// Emit a named event.
    async fn emit(&mut self, event: &str, data: Value) -> Result<()>;

    /// Next server event; `None` once the server closed the session.
    /// Must be safe to cancel between events.
    async fn next_event(&mut self) -> Result<Option<(String, Value)>>;

    /// Close the session.
    async fn close(&mut self);
}

/// Opens [`Connection`]s.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

/// Connector for a Socket.IO v4 server over WebSocket.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// `base_url` is the server's http(s) or ws(s) base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            url: protocol::socket_url(base_url)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let (mut stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| RealtimeError::Network(format!("WebSocket connection failed: {}", e)))?;

        match next_packet(&mut stream).await? {
            Packet::Open(handshake) => debug!(sid = ?handshake.get("sid"), "engine.io session opened"),
            other => {
                return Err(RealtimeError::Protocol(format!(
                    "expected Engine.IO open, got {:?}",
                    other
                )))
            }
        }

        stream.send(Message::Text(protocol::encode_connect())).await?;
        loop {
            match next_packet(&mut stream).await? {
                Packet::Connect(_) => break,
                Packet::ConnectError(reason) => {
                    return Err(RealtimeError::Protocol(format!(
                        "namespace connect refused: {}",
                        reason
                    )))
                }
                Packet::Ping(payload) => {
                    stream
                        .send(Message::Text(protocol::encode_pong(&payload)))
                        .await?
                }
                other => trace!(?other, "ignored during handshake"),
            }
        }

        debug!(url = %self.url, "socket.io session established");
        Ok(Box::new(WsConnection { stream }))
    }
}

async fn next_packet(stream: &mut WsStream) -> Result<Packet> {
    loop {
        let message = stream
            .next()
            .await
            .ok_or_else(|| RealtimeError::Network("Connection closed".to_string()))??;
        match message {
            Message::Text(text) => return protocol::decode(&text),
            Message::Close(_) => {
                return Err(RealtimeError::Network(
                    "Connection closed by server".to_string(),
                ))
            }
            _ => continue,
        }
    }
}

struct WsConnection {
    stream: WsStream,
}

#[async_trait]
impl Connection for WsConnection {
    async fn emit(&mut self, event: &str, data: Value) -> Result<()> {
        let frame = protocol::encode_event(event, &data)?;
        trace!(%frame, "emit");
        self.stream.send(Message::Text(frame)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<(String, Value)>> {
        loop {
            let message = match self.stream.next().await {
                None => return Ok(None),
                Some(message) => message?,
            };
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => return Ok(None),
                _ => continue,
            };
            match protocol::decode(&text) {
                Ok(Packet::Event { name, data }) => return Ok(Some((name, data))),
                Ok(Packet::Ping(payload)) => {
                    self.stream
                        .send(Message::Text(protocol::encode_pong(&payload)))
                        .await?
                }
                Ok(Packet::Close) | Ok(Packet::Disconnect) => return Ok(None),
                Ok(_) => continue,
                Err(e) => warn!("dropping undecodable frame: {}", e),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self
            .stream
            .send(Message::Text(protocol::encode_disconnect()))
            .await;
        if let Err(e) = self.stream.close(None).await {
            debug!("close handshake failed: {}", e);
        }
    }
}

//! Test WebSocket client.
//!
//! Speaks the JSON envelope protocol and asserts on received replies.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A test client speaking the game wire protocol.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Send one JSON envelope.
    pub async fn send(&mut self, envelope: Value) -> anyhow::Result<()> {
        self.ws.send(WsMessage::Text(envelope.to_string())).await?;
        Ok(())
    }

    /// Send an arbitrary text frame, bypassing JSON encoding.
    pub async fn ws_send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(WsMessage::Text(text.to_string())).await?;
        Ok(())
    }

    /// Receive a single reply envelope.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a reply with a timeout, skipping control frames.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Value> {
        loop {
            let frame = timeout(dur, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match frame {
                WsMessage::Text(text) => return Ok(serde_json::from_str(&text)?),
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                other => anyhow::bail!("unexpected frame: {:?}", other),
            }
        }
    }

    /// Send a registration envelope and return the reply.
    pub async fn register(&mut self, username: &str, password: &str) -> anyhow::Result<Value> {
        self.send(json!({
            "optype": "register",
            "username": username,
            "password": password,
        }))
        .await?;
        self.recv().await
    }

    /// Send a login envelope and return the reply.
    pub async fn login(&mut self, username: &str, password: &str) -> anyhow::Result<Value> {
        self.send(json!({
            "optype": "login",
            "username": username,
            "password": password,
        }))
        .await?;
        self.recv().await
    }

    /// Send an enter-room envelope and return the reply.
    pub async fn enter_room(&mut self) -> anyhow::Result<Value> {
        self.send(json!({"optype": "enter_room"})).await?;
        self.recv().await
    }

    /// Send an exit-room envelope and return the reply.
    pub async fn exit_room(&mut self) -> anyhow::Result<Value> {
        self.send(json!({"optype": "exit_room"})).await?;
        self.recv().await
    }

    /// Cleanly close the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

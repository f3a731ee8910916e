//! Gateway - TCP listener that accepts incoming connections.
//!
//! The game port speaks two protocols, the way the original platform served
//! its webroot and its WebSocket endpoint on one socket: a request carrying
//! a WebSocket upgrade proceeds to the handshake and a [`Connection`] task;
//! any other HTTP request is answered with the landing page and closed.

use crate::network::Connection;
use crate::state::Hub;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tracing::{error, info, instrument, warn};

/// Body served when no landing page file is configured.
const DEFAULT_LANDING_PAGE: &str = "<!DOCTYPE html><html><head><title>gobang online</title></head>\
     <body><h1>gobang online</h1><p>This endpoint speaks WebSocket.</p></body></html>";

/// How many times to re-peek while waiting for a complete request head.
const SNIFF_ATTEMPTS: u32 = 8;

/// Delay between sniff attempts.
const SNIFF_DELAY: Duration = Duration::from_millis(25);

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    hub: Arc<Hub>,
    landing_page: Arc<String>,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(
        addr: SocketAddr,
        landing_page: Option<String>,
        hub: Arc<Hub>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "listener bound");

        let page = match landing_page {
            Some(path) => std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("failed to read landing page {}: {}", path, e))?,
            None => DEFAULT_LANDING_PAGE.to_string(),
        };

        Ok(Self {
            listener,
            hub,
            landing_page: Arc::new(page),
        })
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let hub = Arc::clone(&self.hub);
                    let page = Arc::clone(&self.landing_page);

                    tokio::spawn(async move {
                        if let Err(e) = serve_socket(stream, addr, hub, page).await {
                            warn!(%addr, error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }
    }
}

/// Route one accepted socket to the WebSocket handshake or the landing page.
async fn serve_socket(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<Hub>,
    page: Arc<String>,
) -> anyhow::Result<()> {
    if is_websocket_upgrade(&stream).await? {
        let ws = accept_async(stream).await?;
        info!(%addr, "websocket handshake complete");

        crate::metrics::inc_connected();
        let result = Connection::new(ws, addr, hub).run().await;
        crate::metrics::dec_connected();
        result
    } else {
        serve_landing_page(stream, addr, &page).await
    }
}

/// Peek at the request head without consuming it and look for the
/// `Upgrade: websocket` header.
///
/// The head may not have arrived in one segment; re-peek a bounded number
/// of times, then classify with whatever is there.
async fn is_websocket_upgrade(stream: &TcpStream) -> std::io::Result<bool> {
    let mut buf = [0u8; 2048];
    for attempt in 0..SNIFF_ATTEMPTS {
        let n = stream.peek(&mut buf).await?;
        if n == 0 {
            return Ok(false);
        }
        let head = &buf[..n];
        let complete = head.windows(4).any(|w| w == b"\r\n\r\n");
        if complete || n == buf.len() || attempt == SNIFF_ATTEMPTS - 1 {
            let text = String::from_utf8_lossy(head).to_ascii_lowercase();
            return Ok(text.contains("upgrade: websocket"));
        }
        tokio::time::sleep(SNIFF_DELAY).await;
    }
    Ok(false)
}

/// Answer a plain HTTP request with the landing page and close.
async fn serve_landing_page(
    mut stream: TcpStream,
    addr: SocketAddr,
    page: &str,
) -> anyhow::Result<()> {
    info!(%addr, "plain http request, serving landing page");
    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        page.len(),
        page
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

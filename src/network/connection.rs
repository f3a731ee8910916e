//! Connection - handles an individual WebSocket client.
//!
//! Each connection runs in its own tokio task and is the only place a
//! session identity is established. Inbound frames and queued outbound
//! replies are multiplexed with `tokio::select!`; protocol-level replies
//! are written directly, while the queue carries messages pushed to this
//! user from elsewhere (the presence registry hands its send half out).
//!
//! Close tears down both presence entries unconditionally: eviction is
//! idempotent, so an unauthenticated close is a harmless no-op.

use crate::error::RouteError;
use crate::protocol::{ClientRequest, Credentials, ProfileBody, ServerReply};
use crate::state::{ConnectionHandle, Hub, Session};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, instrument, warn};

/// Queued replies per connection before pushed messages are dropped.
const OUTGOING_QUEUE: usize = 32;

/// A client connection handler.
pub struct Connection {
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    hub: Arc<Hub>,
    session: Session,
}

impl Connection {
    /// Create a new connection handler.
    pub fn new(ws: WebSocketStream<TcpStream>, addr: SocketAddr, hub: Arc<Hub>) -> Self {
        Self {
            ws,
            addr,
            hub,
            session: Session::new(),
        }
    }

    /// Run the connection event loop until the client goes away.
    #[instrument(skip(self), fields(addr = %self.addr), name = "connection")]
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(server = %self.hub.server_name, "client connected");

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<ServerReply>(OUTGOING_QUEUE);

        loop {
            tokio::select! {
                frame = self.ws.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Some(reply) = self.dispatch(&text, &outgoing_tx).await
                                && self.write(reply).await.is_err()
                            {
                                break;
                            }
                        }
                        Some(Ok(WsMessage::Binary(_))) => {
                            debug!("ignoring binary frame");
                        }
                        // tungstenite answers pings on its own.
                        Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => {}
                        Some(Ok(WsMessage::Frame(_))) => {}
                        Some(Ok(WsMessage::Close(_))) | None => {
                            break;
                        }
                        Some(Err(e)) => {
                            debug!(error = %e, "read error");
                            break;
                        }
                    }
                }
                Some(reply) = outgoing_rx.recv() => {
                    if self.write(reply).await.is_err() {
                        break;
                    }
                }
            }
        }

        // The user may be in the hall, a room, both, or neither.
        if let Some(uid) = self.session.uid() {
            self.hub.presence.evict(uid);
            crate::metrics::sync_presence(&self.hub.presence);
            info!(uid, username = self.session.username().unwrap_or("?"), "presence cleared");
        }
        info!("client disconnected");

        Ok(())
    }

    async fn write(&mut self, reply: ServerReply) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        self.ws.send(WsMessage::Text(reply.to_text())).await
    }

    /// Route one text frame. Returns the reply to write, if any.
    async fn dispatch(
        &mut self,
        text: &str,
        outgoing_tx: &ConnectionHandle,
    ) -> Option<ServerReply> {
        let request = match ClientRequest::decode(text) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "undecodable frame");
                return Some(ServerReply::error(RouteError::from(e).to_string()));
            }
        };

        match request {
            ClientRequest::Register(creds) => Some(self.handle_register(creds).await),
            ClientRequest::Login(creds) => Some(self.handle_login(creds, outgoing_tx).await),
            ClientRequest::EnterRoom => Some(self.handle_enter_room(outgoing_tx)),
            ClientRequest::ExitRoom => Some(self.handle_exit_room()),
            ClientRequest::Game(envelope) => self.handle_game(envelope),
        }
    }

    async fn handle_register(&self, creds: Credentials) -> ServerReply {
        let Some((username, password)) = creds.require() else {
            let route = RouteError::MissingCredentials;
            crate::metrics::registration_outcome(route.code());
            return ServerReply::register_fail(route.to_string());
        };

        match self.hub.db.users().register(username, password).await {
            Ok(profile) => {
                info!(uid = profile.id, username = %profile.username, "user registered");
                crate::metrics::registration_outcome("ok");
                ServerReply::register_ok()
            }
            Err(e) => {
                let route = RouteError::from(e);
                debug!(username = %username, error = %route, "registration refused");
                crate::metrics::registration_outcome(route.code());
                ServerReply::register_fail(route.to_string())
            }
        }
    }

    async fn handle_login(
        &mut self,
        creds: Credentials,
        outgoing_tx: &ConnectionHandle,
    ) -> ServerReply {
        if self.session.is_authenticated() {
            let route = RouteError::AlreadyAuthenticated;
            crate::metrics::login_outcome(route.code());
            return ServerReply::login_fail(route.to_string());
        }
        let Some((username, password)) = creds.require() else {
            let route = RouteError::MissingCredentials;
            crate::metrics::login_outcome(route.code());
            return ServerReply::login_fail(route.to_string());
        };

        match self.hub.db.users().authenticate(username, password).await {
            Ok(profile) => {
                let body = ProfileBody::from(&profile);
                self.session.authenticate(&profile);
                // A relogin from another connection lands here too and
                // silently replaces the old hall handle.
                self.hub.presence.hall().enter(profile.id, outgoing_tx.clone());
                crate::metrics::login_outcome("ok");
                crate::metrics::sync_presence(&self.hub.presence);
                info!(uid = profile.id, username = %profile.username, "login complete, entered hall");
                ServerReply::login_ok(body)
            }
            Err(e) => {
                let route = RouteError::from(e);
                if matches!(route, RouteError::Store) {
                    warn!(username = %username, error = %route, "login failed against store");
                } else {
                    debug!(username = %username, error = %route, "login refused");
                }
                crate::metrics::login_outcome(route.code());
                ServerReply::login_fail(route.to_string())
            }
        }
    }

    fn handle_enter_room(&self, outgoing_tx: &ConnectionHandle) -> ServerReply {
        let Some(uid) = self.session.uid() else {
            return ServerReply::enter_room_fail(RouteError::AuthRequired.to_string());
        };
        self.hub.presence.room().enter(uid, outgoing_tx.clone());
        crate::metrics::sync_presence(&self.hub.presence);
        debug!(uid, "entered room");
        ServerReply::enter_room_ok()
    }

    fn handle_exit_room(&self) -> ServerReply {
        let Some(uid) = self.session.uid() else {
            return ServerReply::exit_room_fail(RouteError::AuthRequired.to_string());
        };
        self.hub.presence.room().exit(uid);
        crate::metrics::sync_presence(&self.hub.presence);
        debug!(uid, "left room");
        ServerReply::exit_room_ok()
    }

    fn handle_game(&self, envelope: Value) -> Option<ServerReply> {
        let Some(uid) = self.session.uid() else {
            return Some(ServerReply::error(RouteError::AuthRequired.to_string()));
        };
        crate::metrics::game_forwarded();
        self.hub.game.forward(uid, envelope);
        None
    }
}

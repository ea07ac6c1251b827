//! WebSocket Game Server
//!
//! Accept loop and per-connection plumbing. The room key is taken from the
//! WebSocket upgrade path (`ws://host/<roomId>`); connections without one
//! are closed during the handshake.
//!
//! Each connection gets a reader loop (this task) and a writer task fed by
//! an unbounded channel, so room handlers push messages without awaiting
//! the socket. All game logic runs in [`handle_client_message`] under the
//! room's write lock; the socket layer never touches game state directly.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, warn};

use crate::game::types::PlayerId;
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::room::{ConnectionId, RoomId, RoomRegistry};
use crate::network::session::OutboundSender;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".parse().unwrap(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Build a config from the environment, honoring `PORT` when set.
    pub fn from_env() -> Result<Self, GameServerError> {
        let mut config = Self::default();
        if let Ok(port) = std::env::var("PORT") {
            let parsed: u16 = port
                .parse()
                .map_err(|_| GameServerError::InvalidPort(port.clone()))?;
            config.bind_addr.set_port(parsed);
        }
        Ok(config)
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// `PORT` was set but not a valid port number.
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

/// Per-connection state carried through the reader loop.
///
/// `player_id` starts empty and is filled in once the connection claims a
/// player slot via `PLAYER_READY`; it is what lets a disconnect know which
/// slot to release.
#[derive(Debug, Clone)]
pub struct ConnectionCtx {
    /// This connection's ephemeral id (lobby membership key).
    pub connection_id: ConnectionId,
    /// The room this connection is pinned to for its whole lifetime.
    pub room_id: RoomId,
    /// The player slot this connection holds, once bound.
    pub player_id: Option<PlayerId>,
}

impl ConnectionCtx {
    /// Fresh context for a connection that just completed its handshake.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            connection_id: ConnectionId::random(),
            room_id,
            player_id: None,
        }
    }
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// All live rooms.
    rooms: Arc<RoomRegistry>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            rooms: Arc::new(RoomRegistry::new()),
            shutdown_tx,
        }
    }

    /// The server's room registry.
    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            version = %self.config.version,
            "Game server listening on {}",
            self.config.bind_addr
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let rooms = self.rooms.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut path = String::new();
            let mut ws_stream = match accept_hdr_async(stream, |req: &Request, resp: Response| {
                path = req.uri().path().to_string();
                Ok(resp)
            })
            .await
            {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let Some(room_id) = RoomId::from_path(&path) else {
                warn!("Connection from {} without a room key, closing", addr);
                let _ = ws_stream.close(None).await;
                return;
            };

            let mut ctx = ConnectionCtx::new(room_id);
            info!(
                connection_id = %ctx.connection_id,
                room_id = %ctx.room_id,
                "Client {} connected",
                addr
            );

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

            // Writer task: serializes and pushes everything the rooms send.
            let writer_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        handle_client_message(
                                            &rooms, &mut ctx, &msg_tx, client_msg,
                                        )
                                        .await;
                                    }
                                    Err(e) => {
                                        // Malformed input is dropped without
                                        // a reply; the sender gets no hint.
                                        debug!("Invalid message from {}: {}", addr, e);
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                debug!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            handle_disconnect(&rooms, &ctx).await;
            writer_task.abort();
            info!(connection_id = %ctx.connection_id, "Client {} cleaned up", addr);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Route one parsed message to its room.
///
/// The room's write lock is held for the whole handler, so each message is
/// applied atomically and broadcasts go out in a deterministic order.
pub async fn handle_client_message(
    rooms: &RoomRegistry,
    ctx: &mut ConnectionCtx,
    outbound: &OutboundSender,
    msg: ClientMessage,
) {
    let room = rooms.get_or_create(&ctx.room_id).await;
    let mut room = room.write().await;
    // Created after the awaits: ThreadRng must not cross a suspend point.
    let mut rng = rand::thread_rng();

    match msg {
        ClientMessage::IdentifyLobby => {
            room.join_lobby(ctx.connection_id, outbound.clone());
        }
        ClientMessage::StartGame(payload) => {
            room.start_game(
                ctx.connection_id,
                outbound,
                payload.game_type,
                payload.role,
            );
        }
        ClientMessage::PlayerReady(payload) => {
            if room.mark_player_ready(payload.player_id, outbound.clone(), &mut rng) {
                ctx.player_id = Some(payload.player_id);
            }
        }
        ClientMessage::SubmitGuess(payload) => {
            room.submit_guess(&payload.item);
        }
        ClientMessage::RequestNextRound => {
            // Only a connection that claimed a slot can vote for the next
            // round; anything else is silently ignored.
            if let Some(player_id) = ctx.player_id {
                room.request_next_round(player_id, &mut rng);
            }
        }
    }
}

/// Tear down a closed connection's room state, removing the room when it
/// ends up empty.
pub async fn handle_disconnect(rooms: &RoomRegistry, ctx: &ConnectionCtx) {
    let Some(room) = rooms.get(&ctx.room_id).await else {
        return;
    };
    let empty = room
        .write()
        .await
        .handle_disconnect(ctx.connection_id, ctx.player_id);
    if empty {
        rooms.remove_if_empty(&ctx.room_id).await;
    }
}

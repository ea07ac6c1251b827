//! Rooms and the Room Registry
//!
//! A room is one isolated game instance, keyed by the path segment of the
//! WebSocket upgrade request. At any instant it holds either a pre-game
//! lobby (up to two waiting connections) or a running [`GameSession`],
//! never both: starting a session clears the lobby, and tearing down a
//! session resets the room to an empty lobby.
//!
//! The registry is an injectable store rather than a process-global, so
//! tests can run isolated instances side by side.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::types::{GameType, PlayerId, Role};
use crate::network::protocol::{
    GameStartedPayload, RoomUpdatePayload, ServerMessage,
};
use crate::network::session::{GameSession, OutboundSender};
use crate::LOBBY_CAPACITY;

/// Opaque room key taken from the connection's request path.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Extract a room id from a request path (`"/R1"` → `R1`).
    ///
    /// Returns `None` for an empty segment; such connections are rejected
    /// outright.
    pub fn from_path(path: &str) -> Option<Self> {
        let key = path.strip_prefix('/').unwrap_or(path);
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    /// The raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ephemeral identifier for one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Mint a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connection waiting in a room's lobby.
#[derive(Debug, Clone)]
struct LobbyMember {
    id: ConnectionId,
    sender: OutboundSender,
}

/// One game room: a lobby or an active session.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    lobby: Vec<LobbyMember>,
    session: Option<GameSession>,
}

impl Room {
    /// Create an empty room.
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            lobby: Vec::new(),
            session: None,
        }
    }

    /// The room's key.
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Add a connection to the lobby (no-op when the lobby is full) and
    /// broadcast the updated occupancy.
    pub fn join_lobby(&mut self, connection_id: ConnectionId, sender: OutboundSender) {
        if self.lobby.len() < LOBBY_CAPACITY {
            self.lobby.push(LobbyMember {
                id: connection_id,
                sender,
            });
            debug!(room_id = %self.id, count = self.lobby.len(), "lobby join");
        }
        self.broadcast_lobby_count();
    }

    /// Start a session from a full lobby.
    ///
    /// The initiator gets `initiator_role`, the other lobby connection the
    /// complement; both learn only their own role and fresh player id.
    /// Ignored when a session already exists, the lobby is not full, or no
    /// second connection can be found.
    pub fn start_game(
        &mut self,
        initiator: ConnectionId,
        initiator_sender: &OutboundSender,
        game_type: GameType,
        initiator_role: Role,
    ) {
        if self.session.is_some() || self.lobby.len() != LOBBY_CAPACITY {
            return;
        }
        let Some(other) = self.lobby.iter().find(|m| m.id != initiator).cloned()
        else {
            return;
        };

        let initiator_id = PlayerId::random();
        let other_id = PlayerId::random();
        let other_role = initiator_role.complement();

        self.session = Some(GameSession::new(
            game_type,
            [
                (initiator_id, initiator_role, initiator_sender.clone()),
                (other_id, other_role, other.sender.clone()),
            ],
        ));
        self.lobby.clear();
        info!(room_id = %self.id, ?game_type, "session started");

        for (sender, role, player_id) in [
            (initiator_sender, initiator_role, initiator_id),
            (&other.sender, other_role, other_id),
        ] {
            if !sender.is_closed() {
                let _ = sender.send(ServerMessage::GameStarted(GameStartedPayload {
                    room_id: self.id.clone(),
                    game_type,
                    role,
                    player_id,
                }));
            }
        }
    }

    /// Forward a `PLAYER_READY` to the session, if one exists.
    ///
    /// Returns `true` when the connection was bound to the player slot.
    pub fn mark_player_ready<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        sender: OutboundSender,
        rng: &mut R,
    ) -> bool {
        match self.session.as_mut() {
            Some(session) => session.mark_ready(player_id, sender, rng),
            None => false,
        }
    }

    /// Forward a guess to the session, if one exists.
    pub fn submit_guess(&mut self, item: &str) {
        if let Some(session) = self.session.as_mut() {
            session.submit_guess(item);
        }
    }

    /// Forward a next-round readiness signal to the session, if one exists.
    pub fn request_next_round<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        rng: &mut R,
    ) {
        if let Some(session) = self.session.as_mut() {
            session.request_next_round(player_id, rng);
        }
    }

    /// Handle a closed connection.
    ///
    /// A bound player's slot is cleared; the session is destroyed (and the
    /// lobby reset) only when both slots are gone. A lobby connection is
    /// removed and the occupancy rebroadcast.
    ///
    /// Returns `true` when the room ends up with no lobby members and no
    /// session, making it eligible for registry removal.
    pub fn handle_disconnect(
        &mut self,
        connection_id: ConnectionId,
        player_id: Option<PlayerId>,
    ) -> bool {
        if let (Some(player_id), Some(session)) = (player_id, self.session.as_mut())
        {
            if session.has_player(player_id) {
                if session.mark_player_disconnected(player_id) {
                    info!(room_id = %self.id, "all players gone, session destroyed");
                    self.session = None;
                    self.lobby.clear();
                }
                return self.is_empty();
            }
        }

        self.lobby.retain(|m| m.id != connection_id);
        self.broadcast_lobby_count();
        self.is_empty()
    }

    /// Tell lobby members the current occupancy. Session players never see
    /// occupancy updates.
    fn broadcast_lobby_count(&self) {
        let msg = ServerMessage::RoomUpdate(RoomUpdatePayload {
            count: self.lobby.len(),
        });
        for member in &self.lobby {
            if !member.sender.is_closed() {
                let _ = member.sender.send(msg.clone());
            }
        }
    }

    /// Send a message to the room's current audience: the session players
    /// while a game runs, the lobby otherwise. Closed connections are
    /// skipped silently.
    pub fn broadcast(&self, msg: &ServerMessage) {
        match &self.session {
            Some(session) => session.broadcast(msg),
            None => {
                for member in &self.lobby {
                    if !member.sender.is_closed() {
                        let _ = member.sender.send(msg.clone());
                    }
                }
            }
        }
    }

    /// Whether the room holds neither lobby members nor a session.
    pub fn is_empty(&self) -> bool {
        self.lobby.is_empty() && self.session.is_none()
    }

    /// Current lobby occupancy.
    pub fn lobby_count(&self) -> usize {
        self.lobby.len()
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }
}

/// Shared handle to one room.
pub type SharedRoom = Arc<RwLock<Room>>;

/// Owns every live room, keyed by [`RoomId`].
///
/// Creation happens on first reference; removal happens when a disconnect
/// leaves a room empty. Emptiness is re-checked under the registry lock so
/// a concurrent join cannot lose its room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<BTreeMap<RoomId, SharedRoom>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The room for `id`, created empty if it does not exist yet.
    pub async fn get_or_create(&self, id: &RoomId) -> SharedRoom {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(room_id = %id, "room created");
                Arc::new(RwLock::new(Room::new(id.clone())))
            })
            .clone()
    }

    /// The room for `id`, if it exists.
    pub async fn get(&self, id: &RoomId) -> Option<SharedRoom> {
        self.rooms.read().await.get(id).cloned()
    }

    /// Drop the room for `id` if it is still empty.
    pub async fn remove_if_empty(&self, id: &RoomId) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(id) {
            if room.read().await.is_empty() {
                rooms.remove(id);
                debug!(room_id = %id, "room removed");
            }
        }
    }

    /// Number of live rooms.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Whether no rooms are live.
    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

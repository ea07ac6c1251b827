//! Network Layer
//!
//! WebSocket server, wire protocol, and per-room state. All game rules live
//! in `game/`; this layer owns connections, rooms, and sessions.

pub mod protocol;
pub mod room;
pub mod server;
pub mod session;

pub use protocol::{project_round_payload, ClientMessage, ServerMessage};
pub use room::{ConnectionId, Room, RoomId, RoomRegistry};
pub use server::{ConnectionCtx, GameServer, GameServerError, ServerConfig};
pub use session::{GameSession, OutboundSender, SessionPhase};

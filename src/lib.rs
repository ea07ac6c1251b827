//! # Mindmeld Game Server
//!
//! Room-based realtime matching game: one player (the "sender") is shown a
//! target item, the other (the "receiver") has to pick it out of four
//! options, over ten rounds in a shared WebSocket room.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MINDMELD SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Pure game logic (no I/O)                  │
//! │  ├── types.rs    - Game type, role, player identity          │
//! │  ├── pool.rs     - Item pools per game type                  │
//! │  └── round.rs    - Round generation (anti-repeat, options)   │
//! │                                                              │
//! │  network/        - Transport-facing layer                    │
//! │  ├── protocol.rs - Wire message types                        │
//! │  ├── session.rs  - Per-room game session state machine       │
//! │  ├── room.rs     - Room (lobby or session) and registry      │
//! │  └── server.rs   - WebSocket server and message dispatch     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency model
//!
//! Every room lives behind its own `RwLock`; each inbound message or close
//! event takes the write lock for its entire handling, so events for one
//! room run to completion without interleaving. Events for different rooms
//! are independent and run concurrently. All state is in-memory and scoped
//! to the process lifetime.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::pool::pool_for;
pub use game::round::{generate_round, RoundData};
pub use game::types::{GameType, PlayerId, Role};
pub use network::protocol::{ClientMessage, ServerMessage};
pub use network::room::{ConnectionId, Room, RoomId, RoomRegistry};
pub use network::server::{GameServer, GameServerError, ServerConfig};
pub use network::session::{GameSession, SessionPhase};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rounds per session; the round counter exceeding this signals game over.
pub const MAX_ROUNDS: u32 = 10;

/// Maximum connections waiting in a room's lobby.
pub const LOBBY_CAPACITY: usize = 2;

/// Players per game session, fixed at session creation.
pub const PLAYERS_PER_SESSION: usize = 2;

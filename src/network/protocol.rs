//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. Everything
//! is JSON: a tagged envelope `{"type": ..., "payload": ...}` with
//! SCREAMING_SNAKE_CASE tags and camelCase payload fields. Messages that
//! carry no data omit the payload entirely.
//!
//! Malformed input is rejected at this boundary; the state machine only
//! ever sees well-formed, typed messages.

use serde::{Deserialize, Serialize};

use crate::game::round::RoundData;
use crate::game::types::{GameType, PlayerId, Role};
use crate::network::room::RoomId;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Join the room's pre-game lobby.
    IdentifyLobby,

    /// Start a session from a full lobby, choosing game type and own role.
    StartGame(StartGamePayload),

    /// Claim a player slot (first contact or reconnection) and signal
    /// readiness for the first round.
    PlayerReady(PlayerReadyPayload),

    /// Submit an answer for the active round.
    SubmitGuess(GuessPayload),

    /// Signal readiness for the next round after a guess was resolved.
    RequestNextRound,
}

/// Payload of `START_GAME`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGamePayload {
    /// Which item pool to play with.
    pub game_type: GameType,
    /// The role the initiating player takes; the peer gets the complement.
    pub role: Role,
}

/// Payload of `PLAYER_READY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerReadyPayload {
    /// The player slot this connection claims.
    pub player_id: PlayerId,
}

/// Payload of `SUBMIT_GUESS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessPayload {
    /// The item the guesser picked.
    pub item: String,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Lobby occupancy changed.
    RoomUpdate(RoomUpdatePayload),

    /// A session started; sent individually, each player learns only their
    /// own role and player id.
    GameStarted(GameStartedPayload),

    /// A round started; sent individually with the role-projected view.
    NewRound(NewRoundPayload),

    /// A guess was resolved (broadcast to both players).
    GuessResult(GuessResultPayload),

    /// The round counter passed the maximum (broadcast, terminal).
    GameOver(GameOverPayload),

    /// The peer's connection dropped; their slot stays reserved.
    PlayerDisconnected,
}

/// Payload of `ROOM_UPDATE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdatePayload {
    /// Current lobby occupancy.
    pub count: usize,
}

/// Payload of `GAME_STARTED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedPayload {
    /// The room the session lives in.
    pub room_id: RoomId,
    /// The pool the session draws from.
    pub game_type: GameType,
    /// This player's role.
    pub role: Role,
    /// This player's freshly minted id.
    pub player_id: PlayerId,
}

/// Payload of `NEW_ROUND`. Exactly one of `sender`/`receiver` is set,
/// depending on the recipient's role; the other side serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoundPayload {
    /// 1-based round number.
    pub round: u32,
    /// Score entering the round.
    pub score: u32,
    /// The sender's view: the target item.
    pub sender: Option<SenderRoundView>,
    /// The receiver's view: the shuffled options.
    pub receiver: Option<ReceiverRoundView>,
}

/// What the sender learns about a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderRoundView {
    /// The target the receiver must pick.
    pub correct_item: String,
}

/// What the receiver learns about a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverRoundView {
    /// Four distinct items, one of them the target.
    pub options: Vec<String>,
}

/// Payload of `GUESS_RESULT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessResultPayload {
    /// Whether the picked item matched the target.
    pub result: GuessOutcome,
    /// Score after resolving the guess.
    pub score: u32,
    /// The item that was submitted.
    pub picked_item: String,
    /// The round's target item.
    pub correct_item: String,
}

/// Outcome of a guess; serializes as `"Correct"` / `"Wrong"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuessOutcome {
    /// The picked item was the target.
    Correct,
    /// It was not.
    Wrong,
}

/// Payload of `GAME_OVER`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPayload {
    /// The session's final score.
    pub final_score: u32,
}

/// Build the role-projected `NEW_ROUND` payload.
///
/// Information asymmetry is a game rule: the sender learns only the target,
/// the receiver only the options. Neither view contains the other's data.
pub fn project_round_payload(
    role: Role,
    round: u32,
    score: u32,
    data: &RoundData,
) -> NewRoundPayload {
    let (sender, receiver) = match role {
        Role::Sender => (
            Some(SenderRoundView {
                correct_item: data.correct_item.clone(),
            }),
            None,
        ),
        Role::Receiver => (
            None,
            Some(ReceiverRoundView {
                options: data.options.clone(),
            }),
        ),
    };
    NewRoundPayload {
        round,
        score,
        sender,
        receiver,
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

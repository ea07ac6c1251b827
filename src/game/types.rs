//! Shared identity and enumeration types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which item pool a session draws from.
///
/// Wire names are snake_case (`"random_words"`). Anything the server does
/// not recognize falls back to [`GameType::Colors`], matching the behavior
/// clients already rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum GameType {
    /// Hex color swatches.
    #[default]
    Colors,
    /// Animal image identifiers.
    Emotions,
    /// Short everyday words.
    RandomWords,
    /// String representations of 0-99.
    Numbers,
}

impl GameType {
    /// Parse a wire name, falling back to `Colors` for unknown values.
    pub fn from_name(name: &str) -> Self {
        match name {
            "colors" => GameType::Colors,
            "emotions" => GameType::Emotions,
            "random_words" => GameType::RandomWords,
            "numbers" => GameType::Numbers,
            _ => GameType::Colors,
        }
    }
}

impl From<String> for GameType {
    fn from(name: String) -> Self {
        GameType::from_name(&name)
    }
}

/// A player's role within a session.
///
/// The two players of a session always hold complementary roles: the sender
/// sees the target item, the receiver sees the candidate options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sees the correct item and has to get it across.
    Sender,
    /// Sees four options and has to pick the target.
    Receiver,
}

impl Role {
    /// The role held by the other player.
    pub fn complement(self) -> Role {
        match self {
            Role::Sender => Role::Receiver,
            Role::Receiver => Role::Sender,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sender => write!(f, "sender"),
            Role::Receiver => write!(f, "receiver"),
        }
    }
}

/// Ephemeral player identifier, minted when a session starts.
///
/// Serializes as a plain UUID string on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Mint a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

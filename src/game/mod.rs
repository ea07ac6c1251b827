//! Game Logic Module
//!
//! Everything the game knows without touching a socket.
//!
//! - `types`: game type, role, and player identity
//! - `pool`: fixed item pools, one per game type
//! - `round`: round generation with anti-repeat and distractor selection

pub mod pool;
pub mod round;
pub mod types;

// Re-export key types
pub use pool::pool_for;
pub use round::{generate_round, RoundData};
pub use types::{GameType, PlayerId, Role};

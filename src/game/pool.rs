//! Item Pool Registry
//!
//! Four fixed pools of candidate items, one per [`GameType`]. Pools are
//! immutable process-wide constants; every pool holds at least 5 items so
//! round generation always has a correct item plus 3 distractors to draw
//! even after excluding the previous round's answer.

use std::sync::LazyLock;

use super::types::GameType;

/// Hex color swatches shown for the `colors` game type.
pub static COLOR_POOL: LazyLock<Vec<String>> = LazyLock::new(|| {
    [
        "#FF0000", "#0000FF", "#008000", "#FFFF00", "#FFA500", "#800080",
        "#FF00FF", "#00FFFF", "#A52A2A", "#FFC0CB", "#808080", "#008080",
        "#800000", "#F0E68C",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

/// Animal image identifiers shown for the `emotions` game type.
pub static EMOTION_POOL: LazyLock<Vec<String>> = LazyLock::new(|| {
    [
        "cameleon.png",
        "dog.png",
        "elephant.png",
        "fox.png",
        "hedgehog.png",
        "octopus.png",
        "peacock.png",
        "rooster.png",
        "squirel.png",
        "turtle.png",
        "dog_2.png",
        "coala.png",
        "mercat.png",
        "penguin.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

/// Short words shown for the `random_words` game type.
pub static WORD_POOL: LazyLock<Vec<String>> = LazyLock::new(|| {
    [
        "Apple", "House", "Star", "River", "Cloud", "Bridge", "Forest",
        "Ocean", "Moon", "Sun", "Key", "Book", "Chair", "Door", "Floor",
        "Ghost", "Heart", "Light", "Magic", "Night", "Paper", "Queen",
        "Rock", "Ship", "Time", "Vibes", "Water", "Yacht", "Zen", "Map",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

/// The strings "0" through "99", for the `numbers` game type.
pub static NUMBER_POOL: LazyLock<Vec<String>> =
    LazyLock::new(|| (0..100).map(|i| i.to_string()).collect());

/// The item pool for a game type.
pub fn pool_for(game_type: GameType) -> &'static [String] {
    match game_type {
        GameType::Colors => COLOR_POOL.as_slice(),
        GameType::Emotions => EMOTION_POOL.as_slice(),
        GameType::RandomWords => WORD_POOL.as_slice(),
        GameType::Numbers => NUMBER_POOL.as_slice(),
    }
}

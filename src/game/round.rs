//! Round Generation
//!
//! Picks a correct item and a set of answer options for one round. The
//! previous round's answer is excluded from the entire option set, so the
//! same item never appears as the target (or as a distractor) twice in a
//! row.

use rand::seq::SliceRandom;
use rand::Rng;

/// Distractors presented alongside the correct item.
pub const DISTRACTORS_PER_ROUND: usize = 3;

/// Options shown to the receiver each round.
pub const OPTIONS_PER_ROUND: usize = DISTRACTORS_PER_ROUND + 1;

/// One round's target and the shuffled options containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundData {
    /// The item the sender sees and the receiver must pick.
    pub correct_item: String,
    /// Four distinct items in random order, containing `correct_item`.
    pub options: Vec<String>,
}

/// Generate a round from `pool`, never repeating `last_correct`.
///
/// The correct item is drawn uniformly from the pool minus the previous
/// answer; distractors are drawn without replacement from the pool minus
/// the correct item and the previous answer; the combined options are
/// shuffled independently of selection order.
///
/// Returns `None` if the pool is too small to yield a correct item plus
/// [`DISTRACTORS_PER_ROUND`] distinct distractors. All built-in pools are
/// large enough that this cannot happen.
pub fn generate_round<R: Rng + ?Sized>(
    pool: &[String],
    last_correct: Option<&str>,
    rng: &mut R,
) -> Option<RoundData> {
    let eligible: Vec<&String> = pool
        .iter()
        .filter(|item| Some(item.as_str()) != last_correct)
        .collect();
    let correct_item = (*eligible.choose(rng)?).clone();

    let distractor_pool: Vec<&String> = pool
        .iter()
        .filter(|item| **item != correct_item && Some(item.as_str()) != last_correct)
        .collect();
    if distractor_pool.len() < DISTRACTORS_PER_ROUND {
        return None;
    }

    let mut options: Vec<String> = distractor_pool
        .choose_multiple(rng, DISTRACTORS_PER_ROUND)
        .map(|item| (*item).clone())
        .collect();
    options.push(correct_item.clone());
    options.shuffle(rng);

    Some(RoundData {
        correct_item,
        options,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::game::pool::pool_for;
    use crate::game::types::GameType;

    fn pool_of(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_round_invariants(round: &RoundData, last: Option<&str>) {
        assert_eq!(round.options.len(), OPTIONS_PER_ROUND);
        assert!(round.options.contains(&round.correct_item));

        let unique: HashSet<&String> = round.options.iter().collect();
        assert_eq!(unique.len(), OPTIONS_PER_ROUND, "duplicate options");

        if let Some(last) = last {
            assert_ne!(round.correct_item, last);
            assert!(
                !round.options.iter().any(|o| o == last),
                "previous answer leaked into options"
            );
        }
    }

    #[test]
    fn test_first_round_has_no_exclusions() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = pool_for(GameType::Colors);
        let round = generate_round(pool, None, &mut rng).unwrap();
        assert_round_invariants(&round, None);
        assert!(pool.contains(&round.correct_item));
    }

    #[test]
    fn test_previous_answer_never_reappears() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = pool_for(GameType::Emotions);
        let mut last: Option<String> = None;
        for _ in 0..200 {
            let round = generate_round(pool, last.as_deref(), &mut rng).unwrap();
            assert_round_invariants(&round, last.as_deref());
            last = Some(round.correct_item);
        }
    }

    #[test]
    fn test_degenerate_five_item_pool_is_fully_determined() {
        // With 5 items and one excluded, the option set must be exactly
        // the 4 remaining items; only their order is random.
        let pool = pool_of(&["a", "b", "c", "d", "e"]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let round = generate_round(&pool, Some("e"), &mut rng).unwrap();
            assert_round_invariants(&round, Some("e"));
            let got: HashSet<&str> =
                round.options.iter().map(String::as_str).collect();
            let want: HashSet<&str> = ["a", "b", "c", "d"].into_iter().collect();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn test_pool_too_small_returns_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = pool_of(&["a", "b", "c", "d"]);
        assert!(generate_round(&pool, Some("a"), &mut rng).is_none());
        assert!(generate_round(&[], None, &mut rng).is_none());
    }

    #[test]
    fn test_exact_minimum_pool_without_exclusion() {
        let pool = pool_of(&["a", "b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(9);
        let round = generate_round(&pool, None, &mut rng).unwrap();
        assert_round_invariants(&round, None);
    }

    proptest! {
        #[test]
        fn prop_round_invariants_hold(
            seed in any::<u64>(),
            last_idx in proptest::option::of(0usize..100),
        ) {
            let pool = pool_for(GameType::Numbers);
            let last = last_idx.map(|i| pool[i].clone());
            let mut rng = StdRng::seed_from_u64(seed);
            let round = generate_round(pool, last.as_deref(), &mut rng).unwrap();
            assert_round_invariants(&round, last.as_deref());
        }
    }
}

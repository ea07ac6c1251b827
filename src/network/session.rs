//! Game Session State Machine
//!
//! One session per room per game: two fixed player slots with complementary
//! roles, a round counter, a score, and the readiness bookkeeping that
//! gates round starts. Sessions outlive individual connections: a slot
//! whose connection dropped stays reserved until the player rebinds via
//! `PLAYER_READY` or the last connection disappears.
//!
//! All methods run synchronously under the owning room's write lock, so a
//! session never observes a half-applied event.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use tokio::sync::mpsc;
use tracing::debug;

use crate::game::pool::pool_for;
use crate::game::round::{generate_round, RoundData};
use crate::game::types::{GameType, PlayerId, Role};
use crate::network::protocol::{
    project_round_payload, GameOverPayload, GuessOutcome, GuessResultPayload,
    ServerMessage,
};
use crate::MAX_ROUNDS;

/// Channel used to push messages to one connection's writer task.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Session created, waiting for both players' first `PLAYER_READY`.
    AwaitingReadiness,
    /// A round is live, waiting for a guess.
    RoundActive,
    /// A guess was resolved, waiting for both next-round readiness signals.
    RoundResolved,
    /// The round counter passed [`MAX_ROUNDS`]. Terminal.
    GameOver,
}

/// One player's slot in a session.
#[derive(Debug)]
pub struct PlayerSlot {
    /// The role this slot holds for the whole session.
    pub role: Role,
    /// The slot's live connection, or `None` while disconnected.
    pub sender: Option<OutboundSender>,
}

impl PlayerSlot {
    /// Whether the slot currently has a live connection.
    pub fn is_connected(&self) -> bool {
        self.sender.is_some()
    }
}

/// An active two-player game.
#[derive(Debug)]
pub struct GameSession {
    game_type: GameType,
    phase: SessionPhase,
    /// Exactly two entries, fixed at creation, roles complementary.
    players: BTreeMap<PlayerId, PlayerSlot>,
    score: u32,
    round: u32,
    last_correct_item: Option<String>,
    current_round: Option<RoundData>,
    /// Players that signaled readiness for the first round.
    ready_players: BTreeSet<PlayerId>,
    /// Players that signaled readiness for the next round after a guess.
    ready_for_next: BTreeSet<PlayerId>,
}

impl GameSession {
    /// Create a session from two `(player, role, connection)` seats.
    ///
    /// The caller (room start-game handling) guarantees complementary roles.
    pub fn new(
        game_type: GameType,
        seats: [(PlayerId, Role, OutboundSender); 2],
    ) -> Self {
        debug_assert_ne!(seats[0].1, seats[1].1, "roles must be complementary");
        let players = seats
            .into_iter()
            .map(|(id, role, sender)| {
                (
                    id,
                    PlayerSlot {
                        role,
                        sender: Some(sender),
                    },
                )
            })
            .collect();
        Self {
            game_type,
            phase: SessionPhase::AwaitingReadiness,
            players,
            score: 0,
            round: 0,
            last_correct_item: None,
            current_round: None,
            ready_players: BTreeSet::new(),
            ready_for_next: BTreeSet::new(),
        }
    }

    /// Bind `sender` to the slot of `player_id` and mark it ready for the
    /// first round. Starts the round once both players are ready.
    ///
    /// Rebinding an already-known player is how reconnection works: the new
    /// connection simply replaces the old one.
    ///
    /// Returns `false` (and does nothing) for an unknown player id.
    pub fn mark_ready<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        sender: OutboundSender,
        rng: &mut R,
    ) -> bool {
        let Some(slot) = self.players.get_mut(&player_id) else {
            debug!(%player_id, "PLAYER_READY for unknown player, ignoring");
            return false;
        };
        slot.sender = Some(sender);
        self.ready_players.insert(player_id);
        if self.ready_players.len() == self.players.len() {
            self.start_round(rng);
        }
        true
    }

    /// Resolve a guess against the active round.
    ///
    /// Ignored when no round is active. Both players receive the result;
    /// which connection submitted is deliberately not checked.
    pub fn submit_guess(&mut self, item: &str) {
        let Some(round_data) = &self.current_round else {
            return;
        };
        let correct_item = round_data.correct_item.clone();
        let result = if item == correct_item {
            self.score += 1;
            GuessOutcome::Correct
        } else {
            GuessOutcome::Wrong
        };
        self.phase = SessionPhase::RoundResolved;
        self.broadcast(&ServerMessage::GuessResult(GuessResultPayload {
            result,
            score: self.score,
            picked_item: item.to_string(),
            correct_item,
        }));
    }

    /// Record a next-round readiness signal; starts the round once both
    /// players have signaled. Ignored for unknown players and after game
    /// over.
    pub fn request_next_round<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        rng: &mut R,
    ) {
        if !self.players.contains_key(&player_id) {
            return;
        }
        self.ready_for_next.insert(player_id);
        if self.ready_for_next.len() == self.players.len() {
            self.start_round(rng);
        }
    }

    /// Advance to the next round, or end the game.
    ///
    /// Disconnected players are skipped when notifying; the round still
    /// advances without them.
    fn start_round<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.phase == SessionPhase::GameOver {
            return;
        }
        self.round += 1;
        if self.round > MAX_ROUNDS {
            self.phase = SessionPhase::GameOver;
            self.current_round = None;
            self.broadcast(&ServerMessage::GameOver(GameOverPayload {
                final_score: self.score,
            }));
            return;
        }

        let pool = pool_for(self.game_type);
        let Some(data) = generate_round(pool, self.last_correct_item.as_deref(), rng)
        else {
            // Unreachable with the built-in pools (all hold >= 5 items).
            debug!(game_type = ?self.game_type, "pool too small to start round");
            return;
        };

        self.last_correct_item = Some(data.correct_item.clone());
        self.ready_players.clear();
        self.ready_for_next.clear();
        self.phase = SessionPhase::RoundActive;

        for slot in self.players.values() {
            let Some(sender) = &slot.sender else { continue };
            let payload =
                project_round_payload(slot.role, self.round, self.score, &data);
            if !sender.is_closed() {
                let _ = sender.send(ServerMessage::NewRound(payload));
            }
        }
        self.current_round = Some(data);
    }

    /// Clear a disconnected player's slot.
    ///
    /// Returns `true` when no slot has a connection left; the caller must
    /// then destroy the session. Otherwise the surviving player is notified
    /// and the slot stays reserved for reconnection.
    pub fn mark_player_disconnected(&mut self, player_id: PlayerId) -> bool {
        if let Some(slot) = self.players.get_mut(&player_id) {
            slot.sender = None;
        }
        let all_gone = self.players.values().all(|slot| !slot.is_connected());
        if !all_gone {
            self.broadcast(&ServerMessage::PlayerDisconnected);
        }
        all_gone
    }

    /// Send a message to every connected player.
    pub fn broadcast(&self, msg: &ServerMessage) {
        for sender in self.connected_senders() {
            if !sender.is_closed() {
                let _ = sender.send(msg.clone());
            }
        }
    }

    /// The live connections of this session, in player-record order.
    pub fn connected_senders(&self) -> impl Iterator<Item = &OutboundSender> {
        self.players.values().filter_map(|slot| slot.sender.as_ref())
    }

    /// Whether `player_id` holds a slot in this session.
    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    /// The role of `player_id`, if they hold a slot.
    pub fn role_of(&self, player_id: PlayerId) -> Option<Role> {
        self.players.get(&player_id).map(|slot| slot.role)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Current round counter (0 before the first round).
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The active round's data, if a round has started and the game is not
    /// over.
    pub fn current_round(&self) -> Option<&RoundData> {
        self.current_round.as_ref()
    }

    /// The pool this session draws from.
    pub fn game_type(&self) -> GameType {
        self.game_type
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::network::protocol::NewRoundPayload;

    struct Harness {
        session: GameSession,
        sender_id: PlayerId,
        receiver_id: PlayerId,
        sender_rx: UnboundedReceiver<ServerMessage>,
        receiver_rx: UnboundedReceiver<ServerMessage>,
        rng: StdRng,
    }

    impl Harness {
        fn new(game_type: GameType) -> Self {
            let (tx_a, rx_a) = mpsc::unbounded_channel();
            let (tx_b, rx_b) = mpsc::unbounded_channel();
            let sender_id = PlayerId::random();
            let receiver_id = PlayerId::random();
            let session = GameSession::new(
                game_type,
                [
                    (sender_id, Role::Sender, tx_a),
                    (receiver_id, Role::Receiver, tx_b),
                ],
            );
            Self {
                session,
                sender_id,
                receiver_id,
                sender_rx: rx_a,
                receiver_rx: rx_b,
                rng: StdRng::seed_from_u64(1234),
            }
        }

        fn ready_both(&mut self) {
            let (tx_a, tx_b) = self.rebind_channels();
            assert!(self.session.mark_ready(self.sender_id, tx_a, &mut self.rng));
            assert!(self.session.mark_ready(self.receiver_id, tx_b, &mut self.rng));
        }

        /// Fresh channels bound to the same receivers is not possible with
        /// mpsc, so readiness tests rebind clones of the original senders
        /// the way a real client keeps its one connection.
        fn rebind_channels(&mut self) -> (OutboundSender, OutboundSender) {
            let tx_a = self
                .session
                .players
                .get(&self.sender_id)
                .and_then(|s| s.sender.clone())
                .expect("sender slot connected");
            let tx_b = self
                .session
                .players
                .get(&self.receiver_id)
                .and_then(|s| s.sender.clone())
                .expect("receiver slot connected");
            (tx_a, tx_b)
        }

        fn next_round_both(&mut self) {
            self.session
                .request_next_round(self.sender_id, &mut self.rng);
            self.session
                .request_next_round(self.receiver_id, &mut self.rng);
        }
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn new_round_payloads(msgs: &[ServerMessage]) -> Vec<&NewRoundPayload> {
        msgs.iter()
            .filter_map(|m| match m {
                ServerMessage::NewRound(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_round_waits_for_both_ready_signals() {
        let mut h = Harness::new(GameType::Colors);
        let (tx_a, _) = h.rebind_channels();
        h.session.mark_ready(h.sender_id, tx_a, &mut h.rng);

        assert_eq!(h.session.phase(), SessionPhase::AwaitingReadiness);
        assert!(drain(&mut h.sender_rx).is_empty());

        let (_, tx_b) = h.rebind_channels();
        h.session.mark_ready(h.receiver_id, tx_b, &mut h.rng);
        assert_eq!(h.session.phase(), SessionPhase::RoundActive);
        assert_eq!(h.session.round(), 1);
    }

    #[test]
    fn test_new_round_payloads_are_role_asymmetric() {
        let mut h = Harness::new(GameType::RandomWords);
        h.ready_both();

        let sender_msgs = drain(&mut h.sender_rx);
        let receiver_msgs = drain(&mut h.receiver_rx);
        let sender_view = new_round_payloads(&sender_msgs)[0];
        let receiver_view = new_round_payloads(&receiver_msgs)[0];

        assert_eq!(sender_view.round, 1);
        assert_eq!(sender_view.score, 0);
        assert!(sender_view.sender.is_some());
        assert!(sender_view.receiver.is_none());
        assert!(receiver_view.sender.is_none());
        let options = &receiver_view.receiver.as_ref().unwrap().options;
        assert_eq!(options.len(), 4);

        // The sender's target is among the receiver's options.
        let target = &sender_view.sender.as_ref().unwrap().correct_item;
        assert!(options.contains(target));
    }

    #[test]
    fn test_unknown_player_ready_is_ignored() {
        let mut h = Harness::new(GameType::Colors);
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(!h.session.mark_ready(PlayerId::random(), tx, &mut h.rng));
        assert_eq!(h.session.phase(), SessionPhase::AwaitingReadiness);
    }

    #[test]
    fn test_correct_guess_increments_score_and_broadcasts() {
        let mut h = Harness::new(GameType::Numbers);
        h.ready_both();
        drain(&mut h.sender_rx);
        drain(&mut h.receiver_rx);

        let target = h.session.current_round().unwrap().correct_item.clone();
        h.session.submit_guess(&target);

        assert_eq!(h.session.score(), 1);
        assert_eq!(h.session.phase(), SessionPhase::RoundResolved);
        for rx in [&mut h.sender_rx, &mut h.receiver_rx] {
            let msgs = drain(rx);
            assert_eq!(msgs.len(), 1);
            match &msgs[0] {
                ServerMessage::GuessResult(p) => {
                    assert_eq!(p.result, GuessOutcome::Correct);
                    assert_eq!(p.score, 1);
                    assert_eq!(p.picked_item, target);
                    assert_eq!(p.correct_item, target);
                }
                other => panic!("expected GUESS_RESULT, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_wrong_guess_leaves_score_untouched() {
        let mut h = Harness::new(GameType::Numbers);
        h.ready_both();
        drain(&mut h.sender_rx);
        drain(&mut h.receiver_rx);

        h.session.submit_guess("definitely not a number");
        assert_eq!(h.session.score(), 0);
        match &drain(&mut h.receiver_rx)[0] {
            ServerMessage::GuessResult(p) => {
                assert_eq!(p.result, GuessOutcome::Wrong);
                assert_eq!(p.score, 0);
            }
            other => panic!("expected GUESS_RESULT, got {other:?}"),
        }
    }

    #[test]
    fn test_guess_before_first_round_is_ignored() {
        let mut h = Harness::new(GameType::Colors);
        h.session.submit_guess("#FF0000");
        assert_eq!(h.session.score(), 0);
        assert!(drain(&mut h.sender_rx).is_empty());
        assert!(drain(&mut h.receiver_rx).is_empty());
    }

    #[test]
    fn test_next_round_waits_for_both_players() {
        let mut h = Harness::new(GameType::Colors);
        h.ready_both();
        let target = h.session.current_round().unwrap().correct_item.clone();
        h.session.submit_guess(&target);

        h.session.request_next_round(h.sender_id, &mut h.rng);
        assert_eq!(h.session.round(), 1);
        h.session.request_next_round(h.receiver_id, &mut h.rng);
        assert_eq!(h.session.round(), 2);
        assert_eq!(h.session.phase(), SessionPhase::RoundActive);
    }

    #[test]
    fn test_consecutive_rounds_never_repeat_the_target() {
        let mut h = Harness::new(GameType::Colors);
        h.ready_both();
        let mut last = h.session.current_round().unwrap().correct_item.clone();

        for _ in 0..9 {
            h.next_round_both();
            let current = h.session.current_round().unwrap();
            assert_ne!(current.correct_item, last);
            assert!(!current.options.contains(&last));
            last = current.correct_item.clone();
        }
    }

    #[test]
    fn test_score_carries_into_new_round_payload() {
        let mut h = Harness::new(GameType::Numbers);
        h.ready_both();
        let target = h.session.current_round().unwrap().correct_item.clone();
        h.session.submit_guess(&target);
        drain(&mut h.sender_rx);

        h.next_round_both();
        let msgs = drain(&mut h.sender_rx);
        let payload = new_round_payloads(&msgs)[0];
        assert_eq!(payload.round, 2);
        assert_eq!(payload.score, 1);
    }

    #[test]
    fn test_game_over_after_max_rounds_exactly_once() {
        let mut h = Harness::new(GameType::Numbers);
        h.ready_both();
        for _ in 0..(MAX_ROUNDS - 1) {
            h.next_round_both();
        }
        assert_eq!(h.session.round(), MAX_ROUNDS);
        drain(&mut h.sender_rx);
        drain(&mut h.receiver_rx);

        // The 11th start ends the game.
        h.next_round_both();
        assert_eq!(h.session.phase(), SessionPhase::GameOver);
        assert_eq!(h.session.round(), MAX_ROUNDS + 1);
        assert!(h.session.current_round().is_none());

        let msgs = drain(&mut h.receiver_rx);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(
            msgs[0],
            ServerMessage::GameOver(GameOverPayload { final_score: 0 })
        ));

        // Further readiness signals change nothing: no second GAME_OVER,
        // no new round.
        h.next_round_both();
        h.next_round_both();
        assert_eq!(h.session.round(), MAX_ROUNDS + 1);
        assert!(drain(&mut h.receiver_rx).is_empty());
        assert!(drain(&mut h.sender_rx).is_empty());
    }

    #[test]
    fn test_guess_after_game_over_is_ignored() {
        let mut h = Harness::new(GameType::Numbers);
        h.ready_both();
        for _ in 0..MAX_ROUNDS {
            h.next_round_both();
        }
        assert_eq!(h.session.phase(), SessionPhase::GameOver);
        drain(&mut h.sender_rx);

        h.session.submit_guess("42");
        assert_eq!(h.session.score(), 0);
        assert!(drain(&mut h.sender_rx).is_empty());
    }

    #[test]
    fn test_disconnect_notifies_survivor_and_keeps_session() {
        let mut h = Harness::new(GameType::Colors);
        h.ready_both();
        drain(&mut h.sender_rx);
        drain(&mut h.receiver_rx);

        let all_gone = h.session.mark_player_disconnected(h.sender_id);
        assert!(!all_gone);
        assert!(!h.session.players[&h.sender_id].is_connected());
        assert!(h.session.players[&h.receiver_id].is_connected());

        let msgs = drain(&mut h.receiver_rx);
        assert_eq!(msgs, vec![ServerMessage::PlayerDisconnected]);
        // The disconnected side got nothing.
        assert!(drain(&mut h.sender_rx).is_empty());
    }

    #[test]
    fn test_second_disconnect_reports_session_empty() {
        let mut h = Harness::new(GameType::Colors);
        h.ready_both();
        assert!(!h.session.mark_player_disconnected(h.sender_id));
        assert!(h.session.mark_player_disconnected(h.receiver_id));
    }

    #[test]
    fn test_reconnect_rebinds_without_skipping_rounds() {
        let mut h = Harness::new(GameType::Colors);
        h.ready_both();
        h.session.mark_player_disconnected(h.sender_id);
        drain(&mut h.receiver_rx);

        // The returning player claims their old slot from a new connection.
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        assert!(h.session.mark_ready(h.sender_id, new_tx, &mut h.rng));
        assert!(h.session.players[&h.sender_id].is_connected());

        // Readiness was consumed when round 1 started, so rebinding alone
        // must not fire another round.
        assert_eq!(h.session.round(), 1);
        assert!(drain(&mut new_rx).is_empty());

        // Broadcasts reach the new connection again.
        let target = h.session.current_round().unwrap().correct_item.clone();
        h.session.submit_guess(&target);
        assert_eq!(drain(&mut new_rx).len(), 1);
    }

    #[test]
    fn test_round_advances_past_disconnected_player() {
        let mut h = Harness::new(GameType::Colors);
        h.ready_both();
        h.session.mark_player_disconnected(h.sender_id);
        drain(&mut h.receiver_rx);

        let target = h.session.current_round().unwrap().correct_item.clone();
        h.session.submit_guess(&target);
        h.session.request_next_round(h.sender_id, &mut h.rng);
        h.session.request_next_round(h.receiver_id, &mut h.rng);

        // Round advanced; only the connected player heard about it.
        assert_eq!(h.session.round(), 2);
        let msgs = drain(&mut h.receiver_rx);
        assert!(!new_round_payloads(&msgs).is_empty());
        assert!(drain(&mut h.sender_rx).is_empty());
    }
}

//! Game state: the complete match snapshot.
//!
//! `GameState` is the single shared value of the engine. Every public
//! operation produces a new snapshot; no component mutates a previously
//! published one. Persistent collections (`im`) keep whole-state clones
//! cheap, so the engine can honor the new-snapshot-per-transition
//! contract without copying the world.
//!
//! All resumption context lives here - the pending action, the queued
//! effects, the cross-effect references, the trigger guards - so the
//! engine is a pure function `(state, decision) -> state` and a match
//! is restartable from any serialized snapshot.

use im::Vector;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::cards::{BoxKind, CardId, CardInstanceId, PlayedCard, Protocol};
use crate::effects::context::EffectContext;
use crate::effects::def::EffectDef;
use crate::engine::pending::PendingAction;

use super::log::GameLog;
use super::player::{PlayerId, PlayerPair};
use super::rng::GameRng;
use super::stats::PlayerStats;

/// Maximum hand size; the hand-limit phase discards down to this, and
/// a refresh draws up to it.
pub const HAND_LIMIT: usize = 5;

/// Lanes per player.
pub const LANE_COUNT: usize = 3;

/// The turn phases, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Start,
    Control,
    Compile,
    Action,
    HandLimit,
    End,
}

/// One stack of played cards. Bottom-to-top order: the last element is
/// the uncovered card.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub stack: Vec<PlayedCard>,
}

impl Lane {
    /// The uncovered (topmost) card.
    #[must_use]
    pub fn top(&self) -> Option<&PlayedCard> {
        self.stack.last()
    }

    /// Number of cards in the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Check if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Stack index of an instance, if present.
    #[must_use]
    pub fn position_of(&self, instance: CardInstanceId) -> Option<usize> {
        self.stack.iter().position(|c| c.instance == instance)
    }
}

/// One player's side of the match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Lane protocols, index-aligned with `lanes`.
    pub protocols: [Protocol; LANE_COUNT],

    /// Draw pile. The draw point is the end of the vector.
    pub deck: Vec<CardId>,

    /// Cards in hand.
    pub hand: Vec<PlayedCard>,

    /// The three lane stacks.
    pub lanes: [Lane; LANE_COUNT],

    /// Discard/trash pile; also the destination of deletes.
    pub trash: Vec<CardId>,

    /// Per-lane compiled flags, index-aligned with `protocols`.
    pub compiled: [bool; LANE_COUNT],

    /// Cached lane totals, rebuilt by the lane value calculator after
    /// every mutation. Never the source of truth.
    pub lane_values: [i64; LANE_COUNT],

    /// Compilation blocked by an opponent's card.
    pub cannot_compile: bool,

    /// Play statistics.
    pub stats: PlayerStats,
}

impl PlayerState {
    /// Create an empty side with the given protocols.
    #[must_use]
    pub fn new(protocols: [Protocol; LANE_COUNT]) -> Self {
        Self {
            protocols,
            deck: Vec::new(),
            hand: Vec::new(),
            lanes: Default::default(),
            trash: Vec::new(),
            compiled: [false; LANE_COUNT],
            lane_values: [0; LANE_COUNT],
            cannot_compile: false,
            stats: PlayerStats::new(),
        }
    }

    /// Hand position of an instance, if present.
    #[must_use]
    pub fn hand_position(&self, instance: CardInstanceId) -> Option<usize> {
        self.hand.iter().position(|c| c.instance == instance)
    }

    /// Lane index of a protocol, if assigned.
    #[must_use]
    pub fn lane_of_protocol(&self, protocol: &Protocol) -> Option<usize> {
        self.protocols.iter().position(|p| p == protocol)
    }

    /// Total cards this player has in play or in piles.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.deck.len()
            + self.hand.len()
            + self.trash.len()
            + self.lanes.iter().map(Lane::len).sum::<usize>()
    }
}

/// Identifies one start/end-phase effect instance: the card and the
/// rule box it lives in. A key fires at most once per phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseEffectKey {
    pub card: CardInstanceId,
    pub box_kind: BoxKind,
}

/// A not-yet-started effect waiting in the FIFO queue, together with
/// the context it must run under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEffect {
    pub effect: EffectDef,
    pub ctx: EffectContext,
}

/// The previous effect's chosen target, consumed by
/// `EffectTarget::Previous` in later effects of the same chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTarget {
    pub card: CardInstanceId,
    pub value: i64,
}

/// A turn interrupted by a response owed by the non-active player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptedTurn {
    pub player: PlayerId,
    pub phase: Phase,
}

/// Presentation hints produced by the most recent resolution step.
///
/// Cleared at the start of each engine call; drivers read them to
/// animate what just happened. They carry no rules weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationHint {
    Played {
        card: CardInstanceId,
        lane: usize,
        face_up: bool,
    },
    Deleted {
        card: CardInstanceId,
        owner: PlayerId,
        lane: usize,
    },
    Flipped {
        card: CardInstanceId,
        face_up: bool,
    },
    Shifted {
        card: CardInstanceId,
        from_lane: usize,
        to_lane: usize,
    },
    Returned {
        card: CardInstanceId,
        to: PlayerId,
    },
    Drawn {
        player: PlayerId,
        count: u32,
    },
    Compiled {
        player: PlayerId,
        lane: usize,
    },
}

/// The complete match snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    /// Both sides.
    pub players: PlayerPair<PlayerState>,

    /// Whose turn it is.
    pub turn: PlayerId,

    /// Current phase of that turn.
    pub phase: Phase,

    /// Turn counter, starting at 1.
    pub turn_number: u32,

    /// Control-token holder, when the control mechanic is enabled.
    pub control_holder: Option<PlayerId>,

    /// Whether the control mechanic is in play.
    pub use_control: bool,

    /// The winner, once decided.
    pub winner: Option<PlayerId>,

    /// Append-only match log.
    pub log: GameLog,

    /// The single outstanding decision, if any.
    pub pending: Option<PendingAction>,

    /// FIFO of effects to run once the pending action resolves.
    pub queue: Vector<QueuedEffect>,

    /// Cross-effect reference: the previous effect's chosen target.
    pub last_target: Option<LastTarget>,

    /// Cards discarded so far in the current chain.
    pub discarded_this_chain: u32,

    /// Current log nesting depth.
    pub log_indent: u8,

    /// Start/end effect keys already fired this phase.
    pub fired_phase_effects: FxHashSet<PhaseEffectKey>,

    /// Snapshot of phase effects taken at phase entry; cards entering
    /// play mid-phase do not join it.
    pub phase_effect_queue: Vec<PhaseEffectKey>,

    /// Cards whose uncover trigger already fired for their current
    /// exposure. Cleared per card when it is covered again or leaves
    /// play.
    pub uncover_guard: FxHashSet<CardInstanceId>,

    /// Set while a response owed by the non-active player is pending.
    pub interrupted: Option<InterruptedTurn>,

    /// Presentation hints from the latest resolution step.
    pub animations: Vec<AnimationHint>,

    /// Whether the turn player has taken their main action this turn.
    pub action_taken: bool,

    /// The match's single randomness source.
    pub rng: GameRng,

    next_instance: u32,
}

impl GameState {
    /// Create a bare state. Decks, hands, and the opening log are
    /// filled in by match setup.
    #[must_use]
    pub fn new(
        protocols: PlayerPair<[Protocol; LANE_COUNT]>,
        starting_player: PlayerId,
        use_control: bool,
        seed: u64,
    ) -> Self {
        Self {
            players: PlayerPair::new(|p| PlayerState::new(protocols[p].clone())),
            turn: starting_player,
            phase: Phase::Start,
            turn_number: 1,
            control_holder: None,
            use_control,
            winner: None,
            log: GameLog::new(),
            pending: None,
            queue: Vector::new(),
            last_target: None,
            discarded_this_chain: 0,
            log_indent: 0,
            fired_phase_effects: FxHashSet::default(),
            phase_effect_queue: Vec::new(),
            uncover_guard: FxHashSet::default(),
            interrupted: None,
            animations: Vec::new(),
            action_taken: false,
            rng: GameRng::new(seed),
            next_instance: 0,
        }
    }

    /// Allocate a fresh card instance id, unique across the match.
    pub fn alloc_instance(&mut self) -> CardInstanceId {
        let id = CardInstanceId::new(self.next_instance);
        self.next_instance += 1;
        id
    }

    /// Find a board card by instance id.
    #[must_use]
    pub fn locate(&self, instance: CardInstanceId) -> Option<BoardPosition> {
        for owner in PlayerId::both() {
            for (lane, stack) in self.players[owner].lanes.iter().enumerate() {
                if let Some(index) = stack.position_of(instance) {
                    return Some(BoardPosition { owner, lane, index });
                }
            }
        }
        None
    }

    /// Get a board card by position.
    #[must_use]
    pub fn board_card(&self, pos: BoardPosition) -> &PlayedCard {
        &self.players[pos.owner].lanes[pos.lane].stack[pos.index]
    }

    /// Get a board card by instance id.
    #[must_use]
    pub fn board_card_by_id(&self, instance: CardInstanceId) -> Option<&PlayedCard> {
        self.locate(instance).map(|pos| self.board_card(pos))
    }

    /// Whether a position is the top of its stack.
    #[must_use]
    pub fn is_uncovered(&self, pos: BoardPosition) -> bool {
        pos.index + 1 == self.players[pos.owner].lanes[pos.lane].len()
    }

    /// Serialize the whole state to a compact snapshot.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Restore a state from a snapshot.
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Location of a card on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPosition {
    pub owner: PlayerId,
    pub lane: usize,
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardId;

    fn protocols(a: &str, b: &str, c: &str) -> [Protocol; LANE_COUNT] {
        [Protocol::new(a), Protocol::new(b), Protocol::new(c)]
    }

    fn empty_state() -> GameState {
        GameState::new(
            PlayerPair::new(|p| {
                if p == PlayerId::ONE {
                    protocols("A", "B", "C")
                } else {
                    protocols("D", "E", "F")
                }
            }),
            PlayerId::ONE,
            false,
            42,
        )
    }

    #[test]
    fn test_new_state() {
        let state = empty_state();
        assert_eq!(state.turn, PlayerId::ONE);
        assert_eq!(state.phase, Phase::Start);
        assert_eq!(state.turn_number, 1);
        assert!(state.pending.is_none());
        assert!(state.queue.is_empty());
        assert!(state.winner.is_none());
    }

    #[test]
    fn test_alloc_instance_unique() {
        let mut state = empty_state();
        let a = state.alloc_instance();
        let b = state.alloc_instance();
        assert_ne!(a, b);
    }

    #[test]
    fn test_locate_and_uncovered() {
        let mut state = empty_state();
        let a = state.alloc_instance();
        let b = state.alloc_instance();

        let lane = &mut state.players[PlayerId::ONE].lanes[1];
        lane.stack.push(PlayedCard::new(a, CardId::new(0), true));
        lane.stack.push(PlayedCard::new(b, CardId::new(1), false));

        let pos_a = state.locate(a).unwrap();
        assert_eq!(pos_a.owner, PlayerId::ONE);
        assert_eq!(pos_a.lane, 1);
        assert_eq!(pos_a.index, 0);
        assert!(!state.is_uncovered(pos_a));

        let pos_b = state.locate(b).unwrap();
        assert!(state.is_uncovered(pos_b));

        assert!(state.locate(CardInstanceId(99)).is_none());
    }

    #[test]
    fn test_lane_of_protocol() {
        let state = empty_state();
        let side = &state.players[PlayerId::ONE];
        assert_eq!(side.lane_of_protocol(&Protocol::new("B")), Some(1));
        assert_eq!(side.lane_of_protocol(&Protocol::new("Z")), None);
    }

    #[test]
    fn test_total_cards() {
        let mut state = empty_state();
        let side = &mut state.players[PlayerId::ONE];
        side.deck = vec![CardId::new(0), CardId::new(1)];
        side.trash = vec![CardId::new(2)];
        let id = CardInstanceId(0);
        side.hand.push(PlayedCard::new(id, CardId::new(3), true));

        assert_eq!(state.players[PlayerId::ONE].total_cards(), 4);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut state = empty_state();
        state.log.note(PlayerId::ONE, "snapshot me");
        state.alloc_instance();

        let bytes = state.to_snapshot().unwrap();
        let restored = GameState::from_snapshot(&bytes).unwrap();

        assert_eq!(restored.turn, state.turn);
        assert_eq!(restored.log.len(), state.log.len());
        // The allocator continues where it left off.
        let mut a = state;
        let mut b = restored;
        assert_eq!(a.alloc_instance(), b.alloc_instance());
    }
}

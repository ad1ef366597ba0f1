//! Match setup.
//!
//! Builds the initial state: decks constructed from each side's chosen
//! protocols via the catalog, shuffled with the seeded RNG, opening
//! hands of 5, the opening log, and the starting player's start phase
//! entered.

use crate::cards::{CardId, Protocol};
use crate::core::{GameState, PlayerId, PlayerPair, LANE_COUNT};

use super::GameEngine;

/// Opening hand size.
pub const OPENING_HAND: usize = 5;

/// Parameters for a new match.
#[derive(Clone, Debug)]
pub struct MatchSetup {
    /// Each side's three protocols, lane-ordered.
    pub protocols: PlayerPair<[Protocol; LANE_COUNT]>,
    /// Whether the control mechanic is in play.
    pub use_control: bool,
    /// Who takes the first turn.
    pub starting_player: PlayerId,
    /// RNG seed; the same setup replays identically.
    pub seed: u64,
}

impl MatchSetup {
    /// Setup with defaults: player one starts, no control mechanic.
    #[must_use]
    pub fn new(
        player_protocols: [Protocol; LANE_COUNT],
        opponent_protocols: [Protocol; LANE_COUNT],
    ) -> Self {
        Self {
            protocols: PlayerPair::new(|p| {
                if p == PlayerId::ONE {
                    player_protocols.clone()
                } else {
                    opponent_protocols.clone()
                }
            }),
            use_control: false,
            starting_player: PlayerId::ONE,
            seed: 0,
        }
    }

    /// Enable the control mechanic (builder pattern).
    #[must_use]
    pub fn with_control(mut self) -> Self {
        self.use_control = true;
        self
    }

    /// Set the starting player (builder pattern).
    #[must_use]
    pub fn with_starting_player(mut self, player: PlayerId) -> Self {
        self.starting_player = player;
        self
    }

    /// Set the RNG seed (builder pattern).
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl GameEngine {
    /// Build and start a match.
    ///
    /// The returned state has the starting player's start phase already
    /// processed: it either carries a pending action (normally the main
    /// action choice) or, in degenerate setups, a finished game.
    #[must_use]
    pub fn create_initial_state(&self, setup: &MatchSetup) -> GameState {
        let mut st = GameState::new(
            setup.protocols.clone(),
            setup.starting_player,
            setup.use_control,
            setup.seed,
        );

        for player in PlayerId::both() {
            let mut deck: Vec<CardId> = st.players[player]
                .protocols
                .iter()
                .flat_map(|p| self.catalog().protocol_cards(p))
                .collect();
            st.rng.shuffle(&mut deck);
            st.players[player].deck = deck;
        }

        st.log.note(
            setup.starting_player,
            format!("Match begins - {} goes first", setup.starting_player),
        );

        for player in PlayerId::both() {
            let drawn = self.draw_cards(&mut st, player, OPENING_HAND);
            st.log
                .note(player, format!("{player} draws an opening hand of {drawn}"));
        }

        self.recalculate(&mut st);
        self.take_phase_snapshot(&mut st, crate::cards::TriggerMoment::StartPhase);
        self.advance(&mut st);
        st
    }
}

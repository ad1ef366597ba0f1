//! The cross-cutting effect context.
//!
//! Every executor receives an `EffectContext` by value. It carries the
//! actor/owner/turn distinctions that card text depends on: `card_owner`
//! is the implicit "you" of the rule text; `actor` is whoever actually
//! performs the current step. They differ when a card instructs "your
//! opponent discards...".
//!
//! The context is explicit data, never ambient state: it is stored
//! inside pending actions and queued effects so resolution resumes
//! correctly after serialization round-trips.

use serde::{Deserialize, Serialize};

use crate::cards::{CardInstanceId, TriggerMoment};
use crate::core::PlayerId;

/// Context threaded through effect execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectContext {
    /// Who the source card belongs to (the "you" in its text).
    pub card_owner: PlayerId,

    /// Who performs the current step.
    pub actor: PlayerId,

    /// Whose turn it is.
    pub current_turn: PlayerId,

    /// The moment that fired the source effect.
    pub trigger: TriggerMoment,

    /// The card carrying the effect.
    pub source_card: CardInstanceId,

    /// The line the source card sits in.
    pub source_lane: usize,

    /// Cards discarded earlier in this chain, for dynamic counts
    /// ("opponent discards one more than you did").
    pub discarded_count: u32,

    /// Suppress the uncover check after a delete. Set while resolving an
    /// on-cover replacement, where a new card is about to be placed and
    /// the exposed card below must not transiently fire.
    pub suppress_uncover: bool,
}

impl EffectContext {
    /// Context for an effect fired from a board card.
    #[must_use]
    pub fn for_card(
        card_owner: PlayerId,
        current_turn: PlayerId,
        trigger: TriggerMoment,
        source_card: CardInstanceId,
        source_lane: usize,
    ) -> Self {
        Self {
            card_owner,
            actor: card_owner,
            current_turn,
            trigger,
            source_card,
            source_lane,
            discarded_count: 0,
            suppress_uncover: false,
        }
    }

    /// Same context with a different actor (builder pattern).
    #[must_use]
    pub fn with_actor(mut self, actor: PlayerId) -> Self {
        self.actor = actor;
        self
    }

    /// Same context scoped to a different lane (builder pattern).
    #[must_use]
    pub fn with_lane(mut self, lane: usize) -> Self {
        self.source_lane = lane;
        self
    }
}

//! Declarative effect definitions.
//!
//! Card rule text compiles to `EffectDef` trees: an action with its
//! family-specific parameters, who performs it, whether it is optional,
//! and an optional conditional follow-up ("if you do..." / "then...").
//!
//! Definitions are pure data. The executors in `engine` give them
//! meaning against a game state.

use serde::{Deserialize, Serialize};

use super::filter::{TargetFilter, TargetScope, ValueCalc};

/// How a follow-up is gated on its predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUpKind {
    /// Fires only if the preceding effect executed against at least one
    /// target ("if you do...").
    IfExecuted,
    /// Fires regardless of the preceding effect's outcome ("then...").
    Then,
}

/// A conditional follow-up effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub kind: FollowUpKind,
    pub effect: EffectDef,
}

/// Who performs an effect, relative to the card owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectActor {
    /// The card owner (the "you" of the rule text).
    #[default]
    CardOwner,
    /// The card owner's opponent ("your opponent discards...").
    Opponent,
}

/// What an effect operates on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTarget {
    /// Targets computed by the filter evaluator.
    Filtered {
        filter: TargetFilter,
        scope: TargetScope,
        /// Exclude the source card from its own target set.
        exclude_source: bool,
    },
    /// The card carrying the effect ("flip this card").
    Source,
    /// The previous effect's chosen target in this chain. Stale
    /// references degrade to no-valid-targets.
    Previous,
}

impl EffectTarget {
    /// Filtered target with source excluded.
    #[must_use]
    pub fn filtered(filter: TargetFilter, scope: TargetScope) -> Self {
        Self::Filtered {
            filter,
            scope,
            exclude_source: true,
        }
    }

    /// Filtered target that may include the source card.
    #[must_use]
    pub fn filtered_with_source(filter: TargetFilter, scope: TargetScope) -> Self {
        Self::Filtered {
            filter,
            scope,
            exclude_source: false,
        }
    }
}

/// Number of cards an effect selects from the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectCount {
    /// Exactly N, clamped to the available targets.
    Exactly(u32),
    /// Up to N; the actor may choose fewer, including none.
    UpTo(u32),
    /// Every legal target.
    All,
}

/// Delete parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteParams {
    pub target: EffectTarget,
    pub count: SelectCount,
    /// Auto-execute: the engine picks by value without prompting, used
    /// by passive "on cover, delete the lowest" effects. Ties break
    /// deterministically (lowest line, then bottom of stack).
    pub auto: Option<ValueCalc>,
    /// Two-step flow: the actor first selects a line, then every card
    /// in that line matching the filter is deleted.
    pub lane_then_matching: bool,
}

/// Number of cards a discard removes from hand (or deck).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardCount {
    /// Exactly N, clamped to hand size.
    Exactly(u32),
    /// Up to N.
    UpTo(u32),
    /// The whole hand.
    All,
    /// The actor's entire deck goes to the trash.
    EntireDeck,
    /// One more than the cards discarded earlier in this chain.
    OneMoreThanPrevious,
}

/// Discard parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardParams {
    pub count: DiscardCount,
    /// Selected by the engine's RNG instead of the actor. Used when the
    /// opponent discards without seeing a choice.
    pub random: bool,
}

/// Where a returned card goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnDestination {
    /// The returned card's owner's hand.
    #[default]
    OwnerHand,
    /// The acting player's hand.
    ActorHand,
}

/// Return parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnParams {
    pub target: EffectTarget,
    pub destination: ReturnDestination,
    /// Two-step flow: select a line, then return every matching card in it.
    pub lane_then_all: bool,
}

/// What a reveal shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealSource {
    /// The actor's whole hand.
    Hand,
    /// The top card of the actor's deck. Gets a fresh synthetic id so
    /// later previous-target references resolve unambiguously.
    DeckTop,
    /// The actor's trash pile.
    Trash,
    /// The actor's entire deck.
    WholeDeck,
    /// A face-down board card, which stays face-down but becomes
    /// visible to both players.
    Board,
}

/// Reveal parameters. `filter` applies only to board reveals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealParams {
    pub source: RevealSource,
    pub filter: TargetFilter,
    pub scope: TargetScope,
}

/// Flip direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipDirection {
    /// Flip to the opposite orientation.
    #[default]
    Toggle,
    /// Face-up cards flip face-down.
    FaceDown,
    /// Face-down cards flip face-up.
    FaceUp,
}

/// Flip parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipParams {
    pub target: EffectTarget,
    pub direction: FlipDirection,
}

/// Shift parameters. A shift relocates a card to another of its
/// owner's lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftParams {
    pub target: EffectTarget,
    /// Destination line may not match the shifted card's protocol on
    /// either side.
    pub avoid_matching_protocols: bool,
}

/// Draw parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawParams {
    pub count: u32,
}

/// Rearrange parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RearrangeParams {
    /// Whose protocols get rearranged.
    pub target_player: EffectActor,
    /// The source card's protocol may not be placed onto the source
    /// card's line.
    pub forbid_own_protocol_own_lane: bool,
}

/// One atomic effect family with its parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectAction {
    Delete(DeleteParams),
    Discard(DiscardParams),
    Return(ReturnParams),
    Reveal(RevealParams),
    /// Transfer a chosen hand card to the opponent.
    Give,
    Flip(FlipParams),
    Shift(ShiftParams),
    Draw(DrawParams),
    /// Draw up to the hand cap.
    Refresh,
    Rearrange(RearrangeParams),
}

/// A complete effect definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDef {
    /// The action to perform.
    pub action: EffectAction,

    /// Who performs it.
    pub actor: EffectActor,

    /// "You may": the actor is asked before the effect runs. Declining
    /// counts as not-executed for `IfExecuted` follow-ups.
    pub optional: bool,

    /// Conditional follow-up, forming a chain.
    pub follow_up: Option<Box<FollowUp>>,
}

impl EffectDef {
    /// Wrap an action with default actor and no follow-up.
    #[must_use]
    pub fn new(action: EffectAction) -> Self {
        Self {
            action,
            actor: EffectActor::CardOwner,
            optional: false,
            follow_up: None,
        }
    }

    /// Delete effect with a filtered target.
    #[must_use]
    pub fn delete(filter: TargetFilter, scope: TargetScope, count: SelectCount) -> Self {
        Self::new(EffectAction::Delete(DeleteParams {
            target: EffectTarget::filtered(filter, scope),
            count,
            auto: None,
            lane_then_matching: false,
        }))
    }

    /// Discard effect.
    #[must_use]
    pub fn discard(count: DiscardCount) -> Self {
        Self::new(EffectAction::Discard(DiscardParams {
            count,
            random: false,
        }))
    }

    /// Return effect to the owner's hand.
    #[must_use]
    pub fn return_to_hand(filter: TargetFilter, scope: TargetScope) -> Self {
        Self::new(EffectAction::Return(ReturnParams {
            target: EffectTarget::filtered(filter, scope),
            destination: ReturnDestination::OwnerHand,
            lane_then_all: false,
        }))
    }

    /// Flip effect.
    #[must_use]
    pub fn flip(target: EffectTarget, direction: FlipDirection) -> Self {
        Self::new(EffectAction::Flip(FlipParams { target, direction }))
    }

    /// Shift effect.
    #[must_use]
    pub fn shift(target: EffectTarget) -> Self {
        Self::new(EffectAction::Shift(ShiftParams {
            target,
            avoid_matching_protocols: false,
        }))
    }

    /// Draw effect.
    #[must_use]
    pub fn draw(count: u32) -> Self {
        Self::new(EffectAction::Draw(DrawParams { count }))
    }

    /// Refresh effect (draw up to the hand cap).
    #[must_use]
    pub fn refresh() -> Self {
        Self::new(EffectAction::Refresh)
    }

    /// Rearrange the card owner's own protocols.
    #[must_use]
    pub fn rearrange_own() -> Self {
        Self::new(EffectAction::Rearrange(RearrangeParams {
            target_player: EffectActor::CardOwner,
            forbid_own_protocol_own_lane: false,
        }))
    }

    /// Performed by the opponent (builder pattern).
    #[must_use]
    pub fn performed_by_opponent(mut self) -> Self {
        self.actor = EffectActor::Opponent;
        self
    }

    /// Make optional (builder pattern).
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Attach a follow-up (builder pattern).
    #[must_use]
    pub fn with_follow_up(mut self, kind: FollowUpKind, effect: EffectDef) -> Self {
        self.follow_up = Some(Box::new(FollowUp { kind, effect }));
        self
    }

    /// "If you do..." follow-up (builder pattern).
    #[must_use]
    pub fn if_executed(self, effect: EffectDef) -> Self {
        self.with_follow_up(FollowUpKind::IfExecuted, effect)
    }

    /// "Then..." follow-up (builder pattern).
    #[must_use]
    pub fn then(self, effect: EffectDef) -> Self {
        self.with_follow_up(FollowUpKind::Then, effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_constructor() {
        let effect = EffectDef::delete(
            TargetFilter::any().opponents(),
            TargetScope::Anywhere,
            SelectCount::Exactly(1),
        );

        match &effect.action {
            EffectAction::Delete(params) => {
                assert_eq!(params.count, SelectCount::Exactly(1));
                assert!(params.auto.is_none());
            }
            _ => panic!("Expected Delete"),
        }
        assert_eq!(effect.actor, EffectActor::CardOwner);
        assert!(!effect.optional);
    }

    #[test]
    fn test_chain_builders() {
        let effect = EffectDef::discard(DiscardCount::Exactly(1))
            .if_executed(EffectDef::draw(2).then(EffectDef::refresh()));

        let follow = effect.follow_up.as_ref().unwrap();
        assert_eq!(follow.kind, FollowUpKind::IfExecuted);

        let nested = follow.effect.follow_up.as_ref().unwrap();
        assert_eq!(nested.kind, FollowUpKind::Then);
        assert!(matches!(nested.effect.action, EffectAction::Refresh));
    }

    #[test]
    fn test_opponent_actor() {
        let effect = EffectDef::discard(DiscardCount::Exactly(2)).performed_by_opponent();
        assert_eq!(effect.actor, EffectActor::Opponent);
    }

    #[test]
    fn test_serialization_round_trip() {
        let effect = EffectDef::delete(
            TargetFilter::any().calculation(ValueCalc::HighestValue),
            TargetScope::EachOtherLane,
            SelectCount::Exactly(1),
        )
        .optional()
        .then(EffectDef::draw(1));

        let json = serde_json::to_string(&effect).unwrap();
        let deserialized: EffectDef = serde_json::from_str(&json).unwrap();
        assert_eq!(effect, deserialized);
    }
}

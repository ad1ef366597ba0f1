//! Pending actions and decisions.
//!
//! When an effect needs a choice, the engine sets the state's single
//! `PendingAction` and returns control to the caller. The action's
//! common fields (actor, source, follow-up, context, in-flight effect)
//! live on the struct; the tagged `PendingKind` carries only the fields
//! its variant needs, so a driver can see exactly what is meaningful
//! for each decision.
//!
//! A `Decision` mirrors the pending kinds; the resolver validates it
//! against the stored metadata before any mutation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cards::{CardInstanceId, Protocol};
use crate::core::{PhaseEffectKey, PlayerId};
use crate::effects::context::EffectContext;
use crate::effects::def::{EffectDef, FollowUp};

/// A list of selected card instances. Most selections are 0-3 cards.
pub type Selection = SmallVec<[CardInstanceId; 3]>;

/// A list of lane indices.
pub type LaneList = SmallVec<[usize; 3]>;

/// How many cards a selection must contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionCount {
    /// Exactly N.
    Exactly(u32),
    /// Up to N, including none.
    UpTo(u32),
}

impl SelectionCount {
    /// Whether a selection of `n` cards satisfies this count.
    #[must_use]
    pub fn accepts(self, n: usize) -> bool {
        match self {
            SelectionCount::Exactly(k) => n == k as usize,
            SelectionCount::UpTo(k) => n <= k as usize,
        }
    }
}

/// Candidates in one line, for one-selection-per-line flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneGroup {
    pub lane: usize,
    pub candidates: Vec<CardInstanceId>,
}

/// A hand card with the lanes it may legally be played to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableCard {
    pub card: CardInstanceId,
    /// Lanes where a face-up play is legal (protocol match).
    pub face_up_lanes: LaneList,
    /// Lanes where a face-down play is legal (any lane).
    pub face_down_lanes: LaneList,
}

/// What decision is required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingKind {
    /// The turn player's main action: play a card or refresh.
    ChooseMainAction {
        playable: Vec<PlayableCard>,
        can_refresh: bool,
    },

    /// Select cards to delete from the listed candidates.
    SelectCardsToDelete {
        candidates: Vec<CardInstanceId>,
        count: SelectionCount,
    },

    /// Select exactly one card per listed line.
    SelectOnePerLane { groups: Vec<LaneGroup> },

    /// Select a line; every matching card in it is then deleted.
    SelectLaneForDelete { lanes: LaneList },

    /// Select cards from the actor's own hand to discard.
    SelectCardsToDiscard { count: SelectionCount },

    /// Select one card to flip.
    SelectCardToFlip { candidates: Vec<CardInstanceId> },

    /// Select one card to return to hand.
    SelectCardToReturn { candidates: Vec<CardInstanceId> },

    /// Select a line; every matching card in it is then returned.
    SelectLaneForReturn { lanes: LaneList },

    /// Select one card to shift.
    SelectCardToShift { candidates: Vec<CardInstanceId> },

    /// Select the destination line for a shift in progress.
    SelectLaneForShift {
        card: CardInstanceId,
        lanes: LaneList,
    },

    /// Select one of the actor's hand cards to give to the opponent.
    SelectHandCardToGive,

    /// Select a board card to reveal.
    SelectBoardCardToReveal { candidates: Vec<CardInstanceId> },

    /// Produce a new protocol ordering for the target player.
    PromptRearrange {
        target: PlayerId,
        /// This protocol may not be placed in this lane.
        forbidden: Option<(Protocol, usize)>,
    },

    /// Yes/no prompt for an optional effect. The effect itself is the
    /// pending action's stored `effect`.
    ConfirmOptional,

    /// Choose which phase effect fires next.
    SelectPhaseEffect { choices: Vec<PhaseEffectKey> },

    /// Choose which eligible lane to compile.
    SelectLaneForCompile { lanes: LaneList },
}

/// The single outstanding decision the engine is waiting on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Who must decide.
    pub actor: PlayerId,

    /// The card whose effect requires the decision, if any. `None` for
    /// structural decisions (main action, hand limit, compile).
    pub source: Option<CardInstanceId>,

    /// What kind of decision, with its constraint metadata.
    pub kind: PendingKind,

    /// The chain follow-up to process once this resolves.
    pub follow_up: Option<Box<FollowUp>>,

    /// The context the resolution must run under.
    pub ctx: Option<EffectContext>,

    /// The in-flight effect definition, for multi-step flows
    /// (lane-then-matching, shift destination, optional confirmation).
    pub effect: Option<EffectDef>,
}

impl PendingAction {
    /// A structural decision with no source card or chain context.
    #[must_use]
    pub fn structural(actor: PlayerId, kind: PendingKind) -> Self {
        Self {
            actor,
            source: None,
            kind,
            follow_up: None,
            ctx: None,
            effect: None,
        }
    }

    /// A decision required by a card effect.
    #[must_use]
    pub fn for_effect(actor: PlayerId, ctx: EffectContext, kind: PendingKind) -> Self {
        Self {
            actor,
            source: Some(ctx.source_card),
            kind,
            follow_up: None,
            ctx: Some(ctx),
            effect: None,
        }
    }

    /// Attach the chain follow-up (builder pattern).
    #[must_use]
    pub fn with_follow_up(mut self, follow_up: Option<Box<FollowUp>>) -> Self {
        self.follow_up = follow_up;
        self
    }

    /// Attach the in-flight effect (builder pattern).
    #[must_use]
    pub fn with_effect(mut self, effect: EffectDef) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// A driver's answer to a pending action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Main action: play a hand card to a lane.
    PlayCard {
        card: CardInstanceId,
        lane: usize,
        face_up: bool,
    },

    /// Main action: refresh (draw up to the hand cap).
    Refresh,

    /// Selected card instances, for any card-selection kind.
    SelectCards(Selection),

    /// Selected lane index.
    SelectLane(usize),

    /// Answer to an optional prompt.
    Confirm(bool),

    /// New protocol ordering, left to right.
    Rearrange([Protocol; 3]),

    /// Which phase effect fires next.
    SelectPhaseEffect(PhaseEffectKey),
}

//! Effect targeting: filters, scopes, and the target evaluator.
//!
//! `find_targets` is the single targeting path for every effect family.
//! It computes, for a filter and lane scope, the set of legal board
//! targets at a point in time. Ordering is deterministic: lines 0..3,
//! the card owner's side before the opponent's, bottom of stack first.
//!
//! ## Position default
//!
//! The position filter defaults to **uncovered**: most effects may only
//! target the topmost card of a stack unless their text says otherwise.
//!
//! ## Value calculations
//!
//! `highest_value`/`lowest_value` calculations return **all** tied
//! cards, never an arbitrary pick. Auto-executing callers break ties
//! deterministically; human-facing callers must force a choice.

use serde::{Deserialize, Serialize};

use crate::cards::{CardCatalog, CardInstanceId};
use crate::core::{GameState, PlayerId};

use super::context::EffectContext;
use super::passive::ActivePassives;

/// Which side's cards may be targeted, relative to the **card owner**
/// (the implicit "you" in card text), not the acting player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerFilter {
    /// The card owner's cards.
    Own,
    /// The card owner's opponent's cards.
    Opponent,
    /// Either side.
    #[default]
    Any,
}

/// Stack-position constraint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionFilter {
    /// Only cards with another card on top of them.
    Covered,
    /// Only the topmost card of a stack. The load-bearing default.
    #[default]
    Uncovered,
    /// Any position.
    Any,
}

/// Face-orientation constraint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceFilter {
    FaceUp,
    FaceDown,
    #[default]
    Any,
}

/// Value-based narrowing applied after the other filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueCalc {
    /// Keep only the cards tied for highest effective value.
    HighestValue,
    /// Keep only the cards tied for lowest effective value.
    LowestValue,
}

/// A target filter for one effect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFilter {
    /// Side constraint, relative to the card owner.
    pub owner: OwnerFilter,
    /// Stack position constraint (defaults to uncovered).
    pub position: PositionFilter,
    /// Face orientation constraint.
    pub face: FaceFilter,
    /// Minimum effective value, inclusive.
    pub value_min: Option<i64>,
    /// Maximum effective value, inclusive.
    pub value_max: Option<i64>,
    /// Exact effective value.
    pub value_equals: Option<i64>,
    /// Highest/lowest narrowing; ties are all kept.
    pub calculation: Option<ValueCalc>,
}

impl TargetFilter {
    /// Filter accepting any uncovered card.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to the card owner's side (builder pattern).
    #[must_use]
    pub fn own(mut self) -> Self {
        self.owner = OwnerFilter::Own;
        self
    }

    /// Restrict to the opponent's side (builder pattern).
    #[must_use]
    pub fn opponents(mut self) -> Self {
        self.owner = OwnerFilter::Opponent;
        self
    }

    /// Set the position constraint (builder pattern).
    #[must_use]
    pub fn position(mut self, position: PositionFilter) -> Self {
        self.position = position;
        self
    }

    /// Set the face constraint (builder pattern).
    #[must_use]
    pub fn face(mut self, face: FaceFilter) -> Self {
        self.face = face;
        self
    }

    /// Set an inclusive value range (builder pattern).
    #[must_use]
    pub fn value_between(mut self, min: i64, max: i64) -> Self {
        self.value_min = Some(min);
        self.value_max = Some(max);
        self
    }

    /// Require an exact value (builder pattern).
    #[must_use]
    pub fn value(mut self, value: i64) -> Self {
        self.value_equals = Some(value);
        self
    }

    /// Narrow to highest/lowest value (builder pattern).
    #[must_use]
    pub fn calculation(mut self, calc: ValueCalc) -> Self {
        self.calculation = Some(calc);
        self
    }
}

/// Which lanes an effect looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetScope {
    /// All three lines.
    #[default]
    Anywhere,
    /// Only the source card's line.
    ThisLane,
    /// Every line except the source card's.
    OtherLanes,
    /// All three lines, processed one line at a time.
    EachLane,
    /// One selection per line other than the source card's.
    EachOtherLane,
    /// A single resolved line index. The dispatcher rewrites the
    /// `EachLane` flow into a sequence of these.
    Lane(usize),
}

impl TargetScope {
    /// The concrete line indices this scope covers.
    #[must_use]
    pub fn lanes(self, source_lane: usize) -> Vec<usize> {
        match self {
            TargetScope::Anywhere | TargetScope::EachLane => vec![0, 1, 2],
            TargetScope::ThisLane => vec![source_lane],
            TargetScope::OtherLanes | TargetScope::EachOtherLane => {
                (0..3).filter(|&l| l != source_lane).collect()
            }
            TargetScope::Lane(lane) => vec![lane],
        }
    }
}

/// One legal target produced by the evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    /// The card instance.
    pub card: CardInstanceId,
    /// Whose board it sits on.
    pub owner: PlayerId,
    /// Line index (0..3).
    pub lane: usize,
    /// Whether it is the topmost card of its stack.
    pub uncovered: bool,
}

/// Compute all legal targets for a filter and scope.
///
/// Returns an ordered list; an empty list means the effect has no valid
/// targets and must be skipped (flagged not-executed to the chain
/// resolver).
pub fn find_targets(
    state: &GameState,
    catalog: &CardCatalog,
    filter: &TargetFilter,
    scope: TargetScope,
    ctx: &EffectContext,
    exclude_source: bool,
) -> Vec<TargetRef> {
    let passives = ActivePassives::scan(state, catalog);
    find_targets_with(state, catalog, &passives, filter, scope, ctx, exclude_source)
}

/// `find_targets` against a pre-computed passive-rule scan.
pub fn find_targets_with(
    state: &GameState,
    catalog: &CardCatalog,
    passives: &ActivePassives,
    filter: &TargetFilter,
    scope: TargetScope,
    ctx: &EffectContext,
    exclude_source: bool,
) -> Vec<TargetRef> {
    let mut out = Vec::new();
    let sides = [ctx.card_owner, ctx.card_owner.opponent()];

    for lane in scope.lanes(ctx.source_lane) {
        for side in sides {
            if !owner_matches(filter.owner, ctx.card_owner, side) {
                continue;
            }
            let stack = &state.players[side].lanes[lane].stack;
            let top = stack.len().saturating_sub(1);
            for (idx, card) in stack.iter().enumerate() {
                let uncovered = idx == top;
                if exclude_source && card.instance == ctx.source_card {
                    continue;
                }
                match filter.position {
                    PositionFilter::Uncovered if !uncovered => continue,
                    PositionFilter::Covered if uncovered => continue,
                    _ => {}
                }
                match filter.face {
                    FaceFilter::FaceUp if !card.face_up => continue,
                    FaceFilter::FaceDown if card.face_up => continue,
                    _ => {}
                }
                let value = passives.effective_value(card, side, lane, catalog);
                if filter.value_min.is_some_and(|m| value < m)
                    || filter.value_max.is_some_and(|m| value > m)
                    || filter.value_equals.is_some_and(|v| value != v)
                {
                    continue;
                }
                out.push(TargetRef {
                    card: card.instance,
                    owner: side,
                    lane,
                    uncovered,
                });
            }
        }
    }

    if let Some(calc) = filter.calculation {
        narrow_by_calculation(state, catalog, passives, &mut out, calc);
    }

    out
}

fn owner_matches(filter: OwnerFilter, card_owner: PlayerId, side: PlayerId) -> bool {
    match filter {
        OwnerFilter::Own => side == card_owner,
        OwnerFilter::Opponent => side == card_owner.opponent(),
        OwnerFilter::Any => true,
    }
}

/// Keep only the targets tied for highest/lowest effective value.
fn narrow_by_calculation(
    state: &GameState,
    catalog: &CardCatalog,
    passives: &ActivePassives,
    targets: &mut Vec<TargetRef>,
    calc: ValueCalc,
) {
    let value_of = |t: &TargetRef| -> i64 {
        let card = state.players[t.owner].lanes[t.lane]
            .stack
            .iter()
            .find(|c| c.instance == t.card)
            .expect("target came from this board");
        passives.effective_value(card, t.owner, t.lane, catalog)
    };

    let Some(extreme) = targets
        .iter()
        .map(value_of)
        .reduce(|a, b| match calc {
            ValueCalc::HighestValue => a.max(b),
            ValueCalc::LowestValue => a.min(b),
        })
    else {
        return;
    };

    targets.retain(|t| value_of(t) == extreme);
}

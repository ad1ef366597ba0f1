//! The lane value calculator.
//!
//! Recomputes every lane's cached total from current board contents
//! plus active passive modifiers. The cache is never the source of
//! truth: it is invalidated and rebuilt here after every board
//! mutation, before any compile-eligibility or value-based targeting
//! decision is made.
//!
//! Base value per lane = sum of face-up intrinsic values plus each
//! face-down card's effective value (2, or a passive override). Then
//! conditional modifiers apply, targeting own or opponent totals,
//! scoped to the source's line or the whole board. Final totals clamp
//! to zero.

use crate::cards::CardCatalog;
use crate::core::{GameState, PlayerId, LANE_COUNT};
use crate::effects::passive::{ActivePassives, CountUnit, PassiveRule, PassiveScope, ValueTarget};

/// Recompute all six lane totals and the compile-block flags.
///
/// Pure with respect to everything but the caches it rebuilds.
pub fn recalculate_lane_values(state: &mut GameState, catalog: &CardCatalog) {
    let passives = ActivePassives::scan(state, catalog);

    let mut totals = [[0i64; LANE_COUNT]; 2];
    for side in PlayerId::both() {
        for lane in 0..LANE_COUNT {
            totals[side.index()][lane] = base_lane_value(state, catalog, &passives, side, lane);
        }
    }

    apply_modifiers(state, &passives, &mut totals);

    for side in PlayerId::both() {
        for lane in 0..LANE_COUNT {
            state.players[side].lane_values[lane] = totals[side.index()][lane].max(0);
        }
    }

    refresh_compile_blocks(state, catalog);
}

/// Sum of effective card values in one lane.
fn base_lane_value(
    state: &GameState,
    catalog: &CardCatalog,
    passives: &ActivePassives,
    side: PlayerId,
    lane: usize,
) -> i64 {
    state.players[side].lanes[lane]
        .stack
        .iter()
        .map(|card| passives.effective_value(card, side, lane, catalog))
        .sum()
}

/// Apply `AddPerCount` and `AddToTotal` modifiers to the raw totals.
fn apply_modifiers(
    state: &GameState,
    passives: &ActivePassives,
    totals: &mut [[i64; LANE_COUNT]; 2],
) {
    for active in passives.iter() {
        let (target_player, amount, scope) = match active.rule {
            PassiveRule::AddToTotal {
                amount,
                target,
                scope,
            } => (resolve_target(active.owner, target), amount, scope),
            PassiveRule::AddPerCount {
                unit,
                per,
                target,
                scope,
            } => {
                let count = count_units(state, active.owner, active.lane, unit);
                (resolve_target(active.owner, target), per * count, scope)
            }
            _ => continue,
        };

        match scope {
            PassiveScope::ThisLane => {
                totals[target_player.index()][active.lane] += amount;
            }
            PassiveScope::Global => {
                for lane in 0..LANE_COUNT {
                    totals[target_player.index()][lane] += amount;
                }
            }
        }
    }
}

fn resolve_target(owner: PlayerId, target: ValueTarget) -> PlayerId {
    match target {
        ValueTarget::OwnTotal => owner,
        ValueTarget::OpponentTotal => owner.opponent(),
    }
}

fn count_units(state: &GameState, owner: PlayerId, lane: usize, unit: CountUnit) -> i64 {
    let stack = &state.players[owner].lanes[lane].stack;
    let count = match unit {
        CountUnit::FaceDownCardsInLane => stack.iter().filter(|c| !c.face_up).count(),
        CountUnit::FaceUpCardsInLane => stack.iter().filter(|c| c.face_up).count(),
        CountUnit::CardsInLane => stack.len(),
        CountUnit::CardsInHand => state.players[owner].hand.len(),
    };
    count as i64
}

/// A player cannot compile while the opponent has a face-up card with
/// the compile-blocking keyword on the board.
fn refresh_compile_blocks(state: &mut GameState, catalog: &CardCatalog) {
    for side in PlayerId::both() {
        let opponent = side.opponent();
        let blocked = state.players[opponent]
            .lanes
            .iter()
            .flat_map(|lane| lane.stack.iter())
            .any(|card| card.face_up && catalog.get(card.card).keywords.blocks_compile);
        state.players[side].cannot_compile = blocked;
    }
}

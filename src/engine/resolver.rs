//! Decision resolution and action completion.
//!
//! `GameEngine::resolve` is the engine's public step function: given a
//! state and a driver's decision for the pending action, it validates
//! the decision against the stored constraint metadata, applies the
//! mutation, processes the chain follow-up, drains the queue, and
//! advances the phase machine until the next decision or the end of the
//! game.
//!
//! Invalid decisions are rejected with no state mutation. The turn
//! advances if and only if no pending action and no queued effects
//! remain.

use crate::cards::{CardInstanceId, Protocol, TriggerMoment};
use crate::core::{GameState, Phase, PlayerId, HAND_LIMIT, LANE_COUNT};
use crate::effects::context::EffectContext;
use crate::effects::def::EffectAction;

use super::error::DecisionError;
use super::pending::{
    Decision, LaneGroup, PendingAction, PendingKind, PlayableCard, Selection, SelectionCount,
};
use super::GameEngine;

impl GameEngine {
    /// Resolve the pending action with a driver's decision.
    ///
    /// Returns the successor state, or an error leaving the input state
    /// untouched.
    pub fn resolve(
        &self,
        state: &GameState,
        decision: Decision,
    ) -> Result<GameState, DecisionError> {
        let mut st = state.clone();
        let pending = st.pending.take().ok_or(DecisionError::NoPendingAction)?;
        st.interrupted = None;
        st.animations.clear();

        self.apply_decision(&mut st, pending, decision)?;
        self.advance(&mut st);
        Ok(st)
    }

    fn apply_decision(
        &self,
        st: &mut GameState,
        pending: PendingAction,
        decision: Decision,
    ) -> Result<(), DecisionError> {
        match (&pending.kind, &decision) {
            (
                PendingKind::ChooseMainAction { playable, .. },
                Decision::PlayCard {
                    card,
                    lane,
                    face_up,
                },
            ) => {
                validate_play(playable, *card, *lane, *face_up)?;
                self.play_card_from_hand(st, pending.actor, *card, *lane, *face_up);
                Ok(())
            }

            (PendingKind::ChooseMainAction { can_refresh, .. }, Decision::Refresh) => {
                if !*can_refresh {
                    return Err(DecisionError::IllegalPlay);
                }
                let player = pending.actor;
                let missing = HAND_LIMIT - st.players[player].hand.len();
                let drawn = self.draw_cards(st, player, missing);
                st.players[player].stats.hands_refreshed += 1;
                st.action_taken = true;
                st.log
                    .note(player, format!("{player} refreshes, drawing {drawn} card(s)"));
                self.recalculate(st);
                Ok(())
            }

            (
                PendingKind::SelectCardsToDelete { candidates, count },
                Decision::SelectCards(selection),
            ) => {
                validate_selection(candidates, *count, selection)?;
                let ctx = pending.ctx.expect("delete pending carries its context");
                for &card in selection {
                    self.delete_card(st, card, &ctx);
                }
                self.finish(st, &pending, !selection.is_empty());
                Ok(())
            }

            (PendingKind::SelectOnePerLane { groups }, Decision::SelectCards(selection)) => {
                validate_one_per_lane(groups, selection)?;
                let ctx = pending.ctx.expect("delete pending carries its context");
                for &card in selection {
                    self.delete_card(st, card, &ctx);
                }
                self.finish(st, &pending, true);
                Ok(())
            }

            (PendingKind::SelectLaneForDelete { lanes }, Decision::SelectLane(lane)) => {
                validate_lane(lanes, *lane)?;
                let ctx = pending.ctx.expect("delete pending carries its context");
                let params = match pending.effect.as_ref().map(|e| &e.action) {
                    Some(EffectAction::Delete(params)) => params.clone(),
                    _ => return Err(DecisionError::WrongKind),
                };
                let deleted = self.delete_matching_in_lane(st, &params, &ctx, *lane);
                self.finish(st, &pending, deleted > 0);
                Ok(())
            }

            (
                PendingKind::SelectCardsToDiscard { count },
                Decision::SelectCards(selection),
            ) => {
                let hand: Vec<CardInstanceId> = st.players[pending.actor]
                    .hand
                    .iter()
                    .map(|c| c.instance)
                    .collect();
                validate_selection(&hand, *count, selection)?;
                for &card in selection {
                    self.discard_card(st, pending.actor, card, pending.ctx.as_ref());
                }
                self.finish(st, &pending, !selection.is_empty());
                Ok(())
            }

            (PendingKind::SelectCardToFlip { candidates }, Decision::SelectCards(selection)) => {
                let card = validate_single(candidates, selection)?;
                let ctx = pending.ctx.expect("flip pending carries its context");
                self.flip_card(st, card, &ctx);
                self.finish(st, &pending, true);
                Ok(())
            }

            (
                PendingKind::SelectCardToReturn { candidates },
                Decision::SelectCards(selection),
            ) => {
                let card = validate_single(candidates, selection)?;
                let ctx = pending.ctx.expect("return pending carries its context");
                let destination = match pending.effect.as_ref().map(|e| &e.action) {
                    Some(EffectAction::Return(params)) => params.destination,
                    _ => return Err(DecisionError::WrongKind),
                };
                self.return_card(st, card, destination, &ctx);
                self.finish(st, &pending, true);
                Ok(())
            }

            (PendingKind::SelectLaneForReturn { lanes }, Decision::SelectLane(lane)) => {
                validate_lane(lanes, *lane)?;
                let ctx = pending.ctx.expect("return pending carries its context");
                let params = match pending.effect.as_ref().map(|e| &e.action) {
                    Some(EffectAction::Return(params)) => params.clone(),
                    _ => return Err(DecisionError::WrongKind),
                };
                let returned = self.return_matching_in_lane(st, &params, &ctx, *lane);
                self.finish(st, &pending, returned > 0);
                Ok(())
            }

            (PendingKind::SelectCardToShift { candidates }, Decision::SelectCards(selection)) => {
                let card = validate_single(candidates, selection)?;
                let ctx = pending.ctx.expect("shift pending carries its context");
                let params = match pending.effect.as_ref().map(|e| &e.action) {
                    Some(EffectAction::Shift(params)) => params.clone(),
                    _ => return Err(DecisionError::WrongKind),
                };
                match self.shift_lane_stage_resolved(st, card, &params, &ctx) {
                    ShiftStage::Shifted => self.finish(st, &pending, true),
                    ShiftStage::Skipped => self.finish(st, &pending, false),
                    ShiftStage::NeedsLane(kind) => {
                        // Chain continues after the lane decision.
                        self.set_pending(
                            st,
                            PendingAction::for_effect(ctx.actor, ctx, kind)
                                .with_follow_up(pending.follow_up.clone())
                                .with_effect(
                                    pending.effect.clone().expect("shift pending stores it"),
                                ),
                        );
                    }
                }
                Ok(())
            }

            (
                PendingKind::SelectLaneForShift { card, lanes },
                Decision::SelectLane(lane),
            ) => {
                validate_lane(lanes, *lane)?;
                let ctx = pending.ctx.expect("shift pending carries its context");
                self.shift_card(st, *card, *lane, &ctx);
                self.finish(st, &pending, true);
                Ok(())
            }

            (PendingKind::SelectHandCardToGive, Decision::SelectCards(selection)) => {
                let hand: Vec<CardInstanceId> = st.players[pending.actor]
                    .hand
                    .iter()
                    .map(|c| c.instance)
                    .collect();
                let card = validate_single(&hand, selection)?;
                let ctx = pending.ctx.expect("give pending carries its context");
                self.give_card(st, card, &ctx);
                self.finish(st, &pending, true);
                Ok(())
            }

            (
                PendingKind::SelectBoardCardToReveal { candidates },
                Decision::SelectCards(selection),
            ) => {
                let card = validate_single(candidates, selection)?;
                let ctx = pending.ctx.expect("reveal pending carries its context");
                self.reveal_board_card(st, card, &ctx);
                self.finish(st, &pending, true);
                Ok(())
            }

            (
                PendingKind::PromptRearrange { target, forbidden },
                Decision::Rearrange(order),
            ) => {
                validate_rearrangement(st, *target, forbidden.as_ref(), order)?;
                self.apply_rearrangement(st, *target, order);
                self.finish(st, &pending, true);
                Ok(())
            }

            (PendingKind::ConfirmOptional, Decision::Confirm(accept)) => {
                let ctx = pending.ctx.expect("optional pending carries its context");
                if *accept {
                    let effect = pending.effect.clone().expect("optional pending stores it");
                    self.run_effect(st, &effect, &ctx);
                } else {
                    self.log_effect(st, ctx.actor, "declines the optional effect".to_string(), &ctx);
                    self.process_follow_up(st, pending.follow_up.as_deref(), &ctx, false);
                }
                Ok(())
            }

            (PendingKind::SelectPhaseEffect { choices }, Decision::SelectPhaseEffect(key)) => {
                if !choices.contains(key) {
                    return Err(DecisionError::UnknownPhaseEffect);
                }
                let moment = match st.phase {
                    Phase::Start => TriggerMoment::StartPhase,
                    Phase::End => TriggerMoment::EndPhase,
                    _ => return Err(DecisionError::WrongKind),
                };
                self.fire_phase_effect(st, *key, moment);
                Ok(())
            }

            (PendingKind::SelectLaneForCompile { lanes }, Decision::SelectLane(lane)) => {
                validate_lane(lanes, *lane)?;
                self.compile_lane(st, pending.actor, *lane);
                Ok(())
            }

            _ => Err(DecisionError::WrongKind),
        }
    }

    /// Post-mutation bookkeeping shared by effect-driven resolutions:
    /// rebuild caches and process the stored chain follow-up.
    fn finish(&self, st: &mut GameState, pending: &PendingAction, was_executed: bool) {
        self.recalculate(st);
        if let Some(ctx) = pending.ctx {
            self.process_follow_up(st, pending.follow_up.as_deref(), &ctx, was_executed);
        }
    }

    /// Shift stage two wrapper keeping `ExecStep` private to the
    /// executor module.
    fn shift_lane_stage_resolved(
        &self,
        st: &mut GameState,
        card: CardInstanceId,
        params: &crate::effects::def::ShiftParams,
        ctx: &EffectContext,
    ) -> ShiftStage {
        let lanes = self.valid_shift_lanes(st, card, params.avoid_matching_protocols);
        match lanes.len() {
            0 => {
                self.log_effect(st, ctx.actor, "no valid targets".to_string(), ctx);
                ShiftStage::Skipped
            }
            1 => {
                self.shift_card(st, card, lanes[0], ctx);
                ShiftStage::Shifted
            }
            _ => ShiftStage::NeedsLane(PendingKind::SelectLaneForShift { card, lanes }),
        }
    }

    /// Permute a player's protocols (and their compiled flags).
    fn apply_rearrangement(&self, st: &mut GameState, target: PlayerId, order: &[Protocol; 3]) {
        let side = &st.players[target];
        let mut new_compiled = [false; LANE_COUNT];
        for (i, protocol) in order.iter().enumerate() {
            let old = side
                .protocols
                .iter()
                .position(|p| p == protocol)
                .expect("validated permutation");
            new_compiled[i] = side.compiled[old];
        }

        let side = &mut st.players[target];
        side.protocols = order.clone();
        side.compiled = new_compiled;

        st.log.note(
            target,
            format!(
                "{target}'s protocols are rearranged: {}",
                order
                    .iter()
                    .map(Protocol::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        );
        self.recalculate(st);
    }
}

enum ShiftStage {
    Shifted,
    Skipped,
    NeedsLane(PendingKind),
}

// === Validation helpers ===

fn validate_play(
    playable: &[PlayableCard],
    card: CardInstanceId,
    lane: usize,
    face_up: bool,
) -> Result<(), DecisionError> {
    let entry = playable
        .iter()
        .find(|p| p.card == card)
        .ok_or(DecisionError::NotACandidate(card))?;
    let lanes = if face_up {
        &entry.face_up_lanes
    } else {
        &entry.face_down_lanes
    };
    if lanes.contains(&lane) {
        Ok(())
    } else {
        Err(DecisionError::IllegalPlay)
    }
}

fn validate_selection(
    candidates: &[CardInstanceId],
    count: SelectionCount,
    selection: &Selection,
) -> Result<(), DecisionError> {
    if !count.accepts(selection.len()) {
        return Err(DecisionError::WrongCount {
            got: selection.len(),
        });
    }
    for &card in selection {
        if !candidates.contains(&card) {
            return Err(DecisionError::NotACandidate(card));
        }
        if selection.iter().filter(|&&c| c == card).count() > 1 {
            return Err(DecisionError::NotACandidate(card));
        }
    }
    Ok(())
}

fn validate_single(
    candidates: &[CardInstanceId],
    selection: &Selection,
) -> Result<CardInstanceId, DecisionError> {
    if selection.len() != 1 {
        return Err(DecisionError::WrongCount {
            got: selection.len(),
        });
    }
    let card = selection[0];
    if candidates.contains(&card) {
        Ok(card)
    } else {
        Err(DecisionError::NotACandidate(card))
    }
}

fn validate_lane(lanes: &[usize], lane: usize) -> Result<(), DecisionError> {
    if lanes.contains(&lane) {
        Ok(())
    } else {
        Err(DecisionError::LaneNotAllowed(lane))
    }
}

fn validate_one_per_lane(
    groups: &[LaneGroup],
    selection: &Selection,
) -> Result<(), DecisionError> {
    if selection.len() != groups.len() {
        return Err(DecisionError::WrongCount {
            got: selection.len(),
        });
    }
    for group in groups {
        let in_group = selection
            .iter()
            .filter(|c| group.candidates.contains(c))
            .count();
        if in_group != 1 {
            return Err(DecisionError::WrongCount {
                got: selection.len(),
            });
        }
    }
    // Every selected card must belong to some group.
    for &card in selection {
        if !groups.iter().any(|g| g.candidates.contains(&card)) {
            return Err(DecisionError::NotACandidate(card));
        }
    }
    Ok(())
}

fn validate_rearrangement(
    st: &GameState,
    target: PlayerId,
    forbidden: Option<&(Protocol, usize)>,
    order: &[Protocol; 3],
) -> Result<(), DecisionError> {
    let mut current: Vec<&Protocol> = st.players[target].protocols.iter().collect();
    let mut proposed: Vec<&Protocol> = order.iter().collect();
    current.sort();
    proposed.sort();
    if current != proposed {
        return Err(DecisionError::InvalidRearrangement);
    }
    if let Some((protocol, lane)) = forbidden {
        if order[*lane] == *protocol {
            return Err(DecisionError::InvalidRearrangement);
        }
    }
    Ok(())
}

//! Effect executors.
//!
//! One executor per effect family. Each reads its parameters and the
//! execution context, evaluates targets, and either auto-resolves (zero
//! or one legal outcome, or an auto-execute calculation) or emits a
//! pending action describing the decision. Executors never prompt a
//! driver directly - the pending action carries everything a driver or
//! validator needs.
//!
//! Game-rule failures (no valid targets, short hand, stale previous
//! reference) are absorbed here: the effect is skipped with a log entry
//! and flagged not-executed to the chain resolver.

use crate::cards::{CardId, CardInstanceId, PlayedCard, TriggerMoment};
use crate::core::state::LastTarget;
use crate::core::{
    AnimationHint, GameState, LogEntry, LogPhase, PlayerId, QueuedEffect, HAND_LIMIT,
};
use crate::effects::context::EffectContext;
use crate::effects::def::{
    DeleteParams, DiscardCount, DiscardParams, DrawParams, EffectAction, EffectActor, EffectDef,
    EffectTarget, FlipDirection, FlipParams, RearrangeParams, ReturnDestination, ReturnParams,
    RevealParams, RevealSource, SelectCount, ShiftParams,
};
use crate::effects::filter::{find_targets_with, FaceFilter, TargetRef, TargetScope, ValueCalc};
use crate::effects::passive::ActivePassives;

use super::pending::{
    LaneGroup, LaneList, PendingAction, PendingKind, SelectionCount,
};
use super::GameEngine;

/// What an executor did with an effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The effect fully resolved against at least one target.
    Executed,
    /// The effect had nothing legal to do and was skipped. An
    /// `IfExecuted` follow-up treats this as not-executed.
    Skipped,
    /// A pending action was emitted; the chain resumes on resolution.
    Pending,
    /// The effect decomposed into queued per-lane steps that carry
    /// their own follow-ups.
    Deferred,
}

/// Internal executor result before chain processing.
enum ExecStep {
    Done(bool),
    NeedDecision(PendingKind),
    Deferred,
}

impl GameEngine {
    /// Run one effect under a context, processing its chain follow-up
    /// when it resolves synchronously.
    pub(crate) fn run_effect(
        &self,
        st: &mut GameState,
        effect: &EffectDef,
        ctx: &EffectContext,
    ) -> ExecOutcome {
        let actor = match effect.actor {
            EffectActor::CardOwner => ctx.card_owner,
            EffectActor::Opponent => ctx.card_owner.opponent(),
        };
        let mut ctx = ctx.with_actor(actor);
        ctx.discarded_count = st.discarded_this_chain;

        if effect.optional {
            let mut stored = effect.clone();
            stored.optional = false;
            self.set_pending(
                st,
                PendingAction::for_effect(ctx.actor, ctx, PendingKind::ConfirmOptional)
                    .with_follow_up(effect.follow_up.clone())
                    .with_effect(stored),
            );
            return ExecOutcome::Pending;
        }

        let step = match &effect.action {
            EffectAction::Delete(params) => self.exec_delete(st, effect, params, &ctx),
            EffectAction::Discard(params) => self.exec_discard(st, params, &ctx),
            EffectAction::Return(params) => self.exec_return(st, params, &ctx),
            EffectAction::Reveal(params) => self.exec_reveal(st, params, &ctx),
            EffectAction::Give => self.exec_give(st, &ctx),
            EffectAction::Flip(params) => self.exec_flip(st, params, &ctx),
            EffectAction::Shift(params) => self.exec_shift(st, params, &ctx),
            EffectAction::Draw(params) => self.exec_draw(st, params, &ctx),
            EffectAction::Refresh => self.exec_refresh(st, &ctx),
            EffectAction::Rearrange(params) => self.exec_rearrange(st, params, &ctx),
        };

        match step {
            ExecStep::Done(executed) => {
                // Hand-size passives mean even hand-only effects can
                // move lane totals; rebuild before the chain continues.
                self.recalculate(st);
                self.process_follow_up(st, effect.follow_up.as_deref(), &ctx, executed);
                if executed {
                    ExecOutcome::Executed
                } else {
                    ExecOutcome::Skipped
                }
            }
            ExecStep::NeedDecision(kind) => {
                self.set_pending(
                    st,
                    PendingAction::for_effect(ctx.actor, ctx, kind)
                        .with_follow_up(effect.follow_up.clone())
                        .with_effect(effect.clone()),
                );
                ExecOutcome::Pending
            }
            ExecStep::Deferred => ExecOutcome::Deferred,
        }
    }

    /// Run a follow-up if its condition allows.
    pub(crate) fn process_follow_up(
        &self,
        st: &mut GameState,
        follow_up: Option<&crate::effects::def::FollowUp>,
        ctx: &EffectContext,
        was_executed: bool,
    ) {
        let Some(follow_up) = follow_up else { return };
        let Some(next) = crate::effects::process_conditional(follow_up, was_executed) else {
            return;
        };
        let next = next.clone();
        st.log_indent = st.log_indent.saturating_add(1);
        self.run_effect(st, &next, ctx);
    }

    /// Set the pending action, tracking interrupted turns when the
    /// decision is owed by the non-active player.
    pub(crate) fn set_pending(&self, st: &mut GameState, pending: PendingAction) {
        if pending.actor != st.turn {
            st.interrupted = Some(crate::core::InterruptedTurn {
                player: st.turn,
                phase: st.phase,
            });
        }
        st.pending = Some(pending);
    }

    // === Delete ===

    fn exec_delete(
        &self,
        st: &mut GameState,
        effect: &EffectDef,
        params: &DeleteParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        if params.lane_then_matching {
            return self.delete_lane_stage(st, params, ctx);
        }

        match &params.target {
            EffectTarget::Source => match st.locate(ctx.source_card) {
                Some(_) => {
                    self.delete_card(st, ctx.source_card, ctx);
                    ExecStep::Done(true)
                }
                None => self.skip_no_targets(st, ctx),
            },
            EffectTarget::Previous => match self.previous_target_on_board(st) {
                Some(card) => {
                    self.delete_card(st, card, ctx);
                    ExecStep::Done(true)
                }
                None => self.skip_no_targets(st, ctx),
            },
            EffectTarget::Filtered {
                filter,
                scope,
                exclude_source,
            } => match scope {
                TargetScope::EachLane => {
                    self.defer_per_lane(st, effect, params, ctx, scope.lanes(ctx.source_lane))
                }
                TargetScope::EachOtherLane => {
                    self.delete_one_per_lane(st, params, ctx)
                }
                _ => {
                    let passives = ActivePassives::scan(st, self.catalog());
                    let targets = find_targets_with(
                        st,
                        self.catalog(),
                        &passives,
                        filter,
                        *scope,
                        ctx,
                        *exclude_source,
                    );
                    if targets.is_empty() {
                        return self.skip_no_targets(st, ctx);
                    }

                    if let Some(calc) = params.auto {
                        let narrowed = self.narrow_for_auto(st, &targets, calc);
                        self.delete_card(st, narrowed, ctx);
                        return ExecStep::Done(true);
                    }

                    match params.count {
                        SelectCount::All => {
                            for t in &targets {
                                self.delete_card(st, t.card, ctx);
                            }
                            ExecStep::Done(true)
                        }
                        SelectCount::Exactly(n) => {
                            if targets.len() <= n as usize {
                                // Forced: every target must go.
                                for t in &targets {
                                    self.delete_card(st, t.card, ctx);
                                }
                                ExecStep::Done(true)
                            } else {
                                ExecStep::NeedDecision(PendingKind::SelectCardsToDelete {
                                    candidates: targets.iter().map(|t| t.card).collect(),
                                    count: SelectionCount::Exactly(n),
                                })
                            }
                        }
                        SelectCount::UpTo(n) => {
                            let cap = (n as usize).min(targets.len()) as u32;
                            ExecStep::NeedDecision(PendingKind::SelectCardsToDelete {
                                candidates: targets.iter().map(|t| t.card).collect(),
                                count: SelectionCount::UpTo(cap),
                            })
                        }
                    }
                }
            },
        }
    }

    /// Select-lane-then-delete-matching: offer the lanes that contain
    /// at least one matching card.
    fn delete_lane_stage(
        &self,
        st: &mut GameState,
        params: &DeleteParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        let lanes = self.lanes_with_matches(st, &params.target, ctx);
        match lanes.len() {
            0 => self.skip_no_targets(st, ctx),
            1 => {
                let deleted = self.delete_matching_in_lane(st, params, ctx, lanes[0]);
                ExecStep::Done(deleted > 0)
            }
            _ => ExecStep::NeedDecision(PendingKind::SelectLaneForDelete { lanes }),
        }
    }

    /// Delete every matching card in one lane. Returns the count.
    pub(crate) fn delete_matching_in_lane(
        &self,
        st: &mut GameState,
        params: &DeleteParams,
        ctx: &EffectContext,
        lane: usize,
    ) -> usize {
        let EffectTarget::Filtered {
            filter,
            exclude_source,
            ..
        } = &params.target
        else {
            return 0;
        };
        let passives = ActivePassives::scan(st, self.catalog());
        let targets = find_targets_with(
            st,
            self.catalog(),
            &passives,
            filter,
            TargetScope::Lane(lane),
            ctx,
            *exclude_source,
        );
        for t in &targets {
            self.delete_card(st, t.card, ctx);
        }
        targets.len()
    }

    /// "Each lane" flow: one queued delete per lane that currently has
    /// matches, carrying the original follow-up on the last step.
    fn defer_per_lane(
        &self,
        st: &mut GameState,
        effect: &EffectDef,
        params: &DeleteParams,
        ctx: &EffectContext,
        lanes: Vec<usize>,
    ) -> ExecStep {
        let populated: Vec<usize> = lanes
            .into_iter()
            .filter(|&l| self.lane_has_match(st, &params.target, ctx, l))
            .collect();
        if populated.is_empty() {
            return self.skip_no_targets(st, ctx);
        }

        let last = populated.len() - 1;
        for (i, lane) in populated.into_iter().enumerate() {
            let mut step = EffectDef {
                action: EffectAction::Delete(DeleteParams {
                    target: retarget_lane(&params.target, lane),
                    count: params.count,
                    auto: params.auto,
                    lane_then_matching: false,
                }),
                actor: effect.actor,
                optional: false,
                follow_up: None,
            };
            if i == last {
                step.follow_up = effect.follow_up.clone();
            }
            st.queue.push_back(QueuedEffect {
                effect: step,
                ctx: *ctx,
            });
        }
        ExecStep::Deferred
    }

    /// "Each other line" flow: exactly one selection per populated line.
    fn delete_one_per_lane(
        &self,
        st: &mut GameState,
        params: &DeleteParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        let EffectTarget::Filtered {
            filter,
            exclude_source,
            ..
        } = &params.target
        else {
            return self.skip_no_targets(st, ctx);
        };
        let passives = ActivePassives::scan(st, self.catalog());
        let mut groups = Vec::new();
        for lane in TargetScope::EachOtherLane.lanes(ctx.source_lane) {
            let targets = find_targets_with(
                st,
                self.catalog(),
                &passives,
                filter,
                TargetScope::Lane(lane),
                ctx,
                *exclude_source,
            );
            if !targets.is_empty() {
                groups.push(LaneGroup {
                    lane,
                    candidates: targets.iter().map(|t| t.card).collect(),
                });
            }
        }

        if groups.is_empty() {
            return self.skip_no_targets(st, ctx);
        }
        if groups.iter().all(|g| g.candidates.len() == 1) {
            for group in &groups {
                self.delete_card(st, group.candidates[0], ctx);
            }
            return ExecStep::Done(true);
        }
        ExecStep::NeedDecision(PendingKind::SelectOnePerLane { groups })
    }

    /// Remove a card from the board into its owner's trash.
    pub(crate) fn delete_card(
        &self,
        st: &mut GameState,
        instance: CardInstanceId,
        ctx: &EffectContext,
    ) {
        let Some(pos) = st.locate(instance) else {
            // Stale reference mid-batch: an earlier delete in the same
            // resolution already removed it.
            return;
        };
        let was_top = st.is_uncovered(pos);
        let card = st.players[pos.owner].lanes[pos.lane].stack.remove(pos.index);
        st.players[pos.owner].trash.push(card.card);
        st.players[pos.owner].stats.cards_deleted += 1;
        st.uncover_guard.remove(&instance);
        st.animations.push(AnimationHint::Deleted {
            card: instance,
            owner: pos.owner,
            lane: pos.lane,
        });

        let name = self.card_display(card.card, card.face_up);
        self.log_effect(st, pos.owner, format!("{name} is deleted"), ctx);

        self.recalculate(st);

        if was_top && !ctx.suppress_uncover {
            self.fire_uncover(st, pos.owner, pos.lane, ctx.current_turn);
        }
    }

    fn lane_has_match(
        &self,
        st: &GameState,
        target: &EffectTarget,
        ctx: &EffectContext,
        lane: usize,
    ) -> bool {
        let EffectTarget::Filtered {
            filter,
            exclude_source,
            ..
        } = target
        else {
            return false;
        };
        let passives = ActivePassives::scan(st, self.catalog());
        !find_targets_with(
            st,
            self.catalog(),
            &passives,
            filter,
            TargetScope::Lane(lane),
            ctx,
            *exclude_source,
        )
        .is_empty()
    }

    fn lanes_with_matches(
        &self,
        st: &GameState,
        target: &EffectTarget,
        ctx: &EffectContext,
    ) -> LaneList {
        let EffectTarget::Filtered { scope, .. } = target else {
            return LaneList::new();
        };
        scope
            .lanes(ctx.source_lane)
            .into_iter()
            .filter(|&l| self.lane_has_match(st, target, ctx, l))
            .collect()
    }

    /// Deterministic pick for auto-executed value calculations:
    /// evaluator order already runs lane 0..3, owner before opponent,
    /// bottom of stack first, so the first narrowed target is the
    /// documented tie-break.
    fn narrow_for_auto(
        &self,
        st: &GameState,
        targets: &[TargetRef],
        calc: ValueCalc,
    ) -> CardInstanceId {
        let passives = ActivePassives::scan(st, self.catalog());
        let value_of = |t: &TargetRef| {
            let card = st
                .board_card_by_id(t.card)
                .expect("targets are board cards");
            passives.effective_value(card, t.owner, t.lane, self.catalog())
        };
        let extreme = targets
            .iter()
            .map(value_of)
            .reduce(|a, b| match calc {
                ValueCalc::HighestValue => a.max(b),
                ValueCalc::LowestValue => a.min(b),
            })
            .expect("caller checked non-empty");
        targets
            .iter()
            .find(|t| value_of(t) == extreme)
            .expect("an extreme target exists")
            .card
    }

    // === Discard ===

    fn exec_discard(
        &self,
        st: &mut GameState,
        params: &DiscardParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        if params.count == DiscardCount::EntireDeck {
            let deck = std::mem::take(&mut st.players[ctx.actor].deck);
            if deck.is_empty() {
                return self.skip_insufficient(st, ctx, "has no deck to discard");
            }
            let n = deck.len();
            st.players[ctx.actor].trash.extend(deck);
            self.log_effect(
                st,
                ctx.actor,
                format!("{} discards their entire deck ({n} cards)", ctx.actor),
                ctx,
            );
            return ExecStep::Done(true);
        }

        let hand_len = st.players[ctx.actor].hand.len();
        let wanted = match params.count {
            DiscardCount::Exactly(n) | DiscardCount::UpTo(n) => n as usize,
            DiscardCount::All => hand_len,
            DiscardCount::OneMoreThanPrevious => ctx.discarded_count as usize + 1,
            DiscardCount::EntireDeck => unreachable!("handled above"),
        };
        let clamped = wanted.min(hand_len);

        if clamped == 0 {
            return self.skip_insufficient(st, ctx, "has no cards to discard");
        }
        if clamped < wanted {
            self.log_effect(
                st,
                ctx.actor,
                format!("{} can only discard {clamped} of {wanted}", ctx.actor),
                ctx,
            );
        }

        let forced = matches!(
            params.count,
            DiscardCount::Exactly(_) | DiscardCount::All | DiscardCount::OneMoreThanPrevious
        );

        if params.random {
            for _ in 0..clamped {
                let len = st.players[ctx.actor].hand.len();
                if len == 0 {
                    break;
                }
                let idx = st.rng.gen_range_usize(0..len);
                let instance = st.players[ctx.actor].hand[idx].instance;
                self.discard_card(st, ctx.actor, instance, Some(ctx));
            }
            return ExecStep::Done(true);
        }

        if forced && clamped == hand_len {
            // The whole hand goes; no choice to make.
            let all: Vec<CardInstanceId> = st.players[ctx.actor]
                .hand
                .iter()
                .map(|c| c.instance)
                .collect();
            for instance in all {
                self.discard_card(st, ctx.actor, instance, Some(ctx));
            }
            return ExecStep::Done(true);
        }

        let count = if forced {
            SelectionCount::Exactly(clamped as u32)
        } else {
            SelectionCount::UpTo(clamped as u32)
        };
        ExecStep::NeedDecision(PendingKind::SelectCardsToDiscard { count })
    }

    /// Move a hand card to its holder's trash. `ctx` is absent for the
    /// structural hand-limit discard.
    pub(crate) fn discard_card(
        &self,
        st: &mut GameState,
        player: PlayerId,
        instance: CardInstanceId,
        ctx: Option<&EffectContext>,
    ) {
        let Some(idx) = st.players[player].hand_position(instance) else {
            return;
        };
        let card = st.players[player].hand.remove(idx);
        st.players[player].trash.push(card.card);
        st.players[player].stats.cards_discarded += 1;
        st.discarded_this_chain += 1;
        let name = self.card_name(card.card);
        let message = format!("{player} discards {name}");
        match ctx {
            Some(ctx) => self.log_effect(st, player, message, ctx),
            None => st.log.note(player, message),
        }
    }

    // === Return ===

    fn exec_return(
        &self,
        st: &mut GameState,
        params: &ReturnParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        if params.lane_then_all {
            let lanes = self.lanes_with_matches(st, &params.target, ctx);
            return match lanes.len() {
                0 => self.skip_no_targets(st, ctx),
                1 => {
                    let returned = self.return_matching_in_lane(st, params, ctx, lanes[0]);
                    ExecStep::Done(returned > 0)
                }
                _ => ExecStep::NeedDecision(PendingKind::SelectLaneForReturn { lanes }),
            };
        }

        let candidates = match self.resolve_single_target(st, &params.target, ctx) {
            Ok(candidates) => candidates,
            Err(step) => return step,
        };
        match candidates.len() {
            0 => self.skip_no_targets(st, ctx),
            1 => {
                self.return_card(st, candidates[0], params.destination, ctx);
                ExecStep::Done(true)
            }
            _ => ExecStep::NeedDecision(PendingKind::SelectCardToReturn { candidates }),
        }
    }

    /// Return every matching card in one lane. Returns the count.
    pub(crate) fn return_matching_in_lane(
        &self,
        st: &mut GameState,
        params: &ReturnParams,
        ctx: &EffectContext,
        lane: usize,
    ) -> usize {
        let EffectTarget::Filtered {
            filter,
            exclude_source,
            ..
        } = &params.target
        else {
            return 0;
        };
        let passives = ActivePassives::scan(st, self.catalog());
        let targets = find_targets_with(
            st,
            self.catalog(),
            &passives,
            filter,
            TargetScope::Lane(lane),
            ctx,
            *exclude_source,
        );
        for t in &targets {
            self.return_card(st, t.card, params.destination, ctx);
        }
        targets.len()
    }

    /// Send a board card back to a hand. The board instance is
    /// destroyed; the hand card gets a fresh identity.
    pub(crate) fn return_card(
        &self,
        st: &mut GameState,
        instance: CardInstanceId,
        destination: ReturnDestination,
        ctx: &EffectContext,
    ) {
        let Some(pos) = st.locate(instance) else {
            return;
        };
        let was_top = st.is_uncovered(pos);
        let card = st.players[pos.owner].lanes[pos.lane].stack.remove(pos.index);
        st.uncover_guard.remove(&instance);

        let to = match destination {
            ReturnDestination::OwnerHand => pos.owner,
            ReturnDestination::ActorHand => ctx.actor,
        };
        let fresh = st.alloc_instance();
        st.players[to].hand.push(PlayedCard::new(fresh, card.card, true));
        st.animations.push(AnimationHint::Returned { card: instance, to });

        let name = self.card_display(card.card, card.face_up);
        self.log_effect(st, to, format!("{name} returns to {to}'s hand"), ctx);

        self.recalculate(st);

        if was_top && !ctx.suppress_uncover {
            self.fire_uncover(st, pos.owner, pos.lane, ctx.current_turn);
        }
    }

    // === Reveal ===

    fn exec_reveal(
        &self,
        st: &mut GameState,
        params: &RevealParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        match params.source {
            RevealSource::Hand => {
                if st.players[ctx.actor].hand.is_empty() {
                    return self.skip_insufficient(st, ctx, "has no hand to reveal");
                }
                let names: Vec<String> = st.players[ctx.actor]
                    .hand
                    .iter()
                    .map(|c| self.card_name(c.card))
                    .collect();
                for card in &mut st.players[ctx.actor].hand {
                    card.revealed = true;
                }
                self.log_effect(
                    st,
                    ctx.actor,
                    format!("{} reveals their hand: {}", ctx.actor, names.join(", ")),
                    ctx,
                );
                ExecStep::Done(true)
            }
            RevealSource::DeckTop => {
                let Some(&card_id) = st.players[ctx.actor].deck.last() else {
                    return self.skip_insufficient(st, ctx, "has no deck to reveal");
                };
                // Fresh synthetic id: repeated triggers each produce a
                // distinct previous-target reference.
                let synthetic = st.alloc_instance();
                st.last_target = Some(LastTarget {
                    card: synthetic,
                    value: i64::from(self.catalog().get(card_id).value),
                });
                let name = self.card_name(card_id);
                self.log_effect(
                    st,
                    ctx.actor,
                    format!("{} reveals the top card of their deck: {name}", ctx.actor),
                    ctx,
                );
                ExecStep::Done(true)
            }
            RevealSource::Trash => {
                let trash = &st.players[ctx.actor].trash;
                if trash.is_empty() {
                    return self.skip_insufficient(st, ctx, "has an empty trash");
                }
                let names: Vec<String> =
                    trash.iter().map(|&c| self.card_name(c)).collect();
                self.log_effect(
                    st,
                    ctx.actor,
                    format!("{} reveals their trash: {}", ctx.actor, names.join(", ")),
                    ctx,
                );
                ExecStep::Done(true)
            }
            RevealSource::WholeDeck => {
                let deck = &st.players[ctx.actor].deck;
                if deck.is_empty() {
                    return self.skip_insufficient(st, ctx, "has an empty deck");
                }
                // Sorted so the reveal does not leak deck order.
                let mut names: Vec<String> =
                    deck.iter().map(|&c| self.card_name(c)).collect();
                names.sort();
                self.log_effect(
                    st,
                    ctx.actor,
                    format!("{} reveals their deck: {}", ctx.actor, names.join(", ")),
                    ctx,
                );
                ExecStep::Done(true)
            }
            RevealSource::Board => {
                let passives = ActivePassives::scan(st, self.catalog());
                let candidates: Vec<CardInstanceId> = find_targets_with(
                    st,
                    self.catalog(),
                    &passives,
                    &params.filter,
                    params.scope,
                    ctx,
                    true,
                )
                .iter()
                .map(|t| t.card)
                .collect();
                match candidates.len() {
                    0 => self.skip_no_targets(st, ctx),
                    1 => {
                        self.reveal_board_card(st, candidates[0], ctx);
                        ExecStep::Done(true)
                    }
                    _ => ExecStep::NeedDecision(PendingKind::SelectBoardCardToReveal {
                        candidates,
                    }),
                }
            }
        }
    }

    /// Mark a board card revealed and remember it as the chain target.
    pub(crate) fn reveal_board_card(
        &self,
        st: &mut GameState,
        instance: CardInstanceId,
        ctx: &EffectContext,
    ) {
        let Some(pos) = st.locate(instance) else {
            return;
        };
        let card_id = {
            let card = &mut st.players[pos.owner].lanes[pos.lane].stack[pos.index];
            card.revealed = true;
            card.card
        };
        st.last_target = Some(LastTarget {
            card: instance,
            value: i64::from(self.catalog().get(card_id).value),
        });
        let name = self.card_name(card_id);
        self.log_effect(
            st,
            pos.owner,
            format!("{name} is revealed in line {}", pos.lane + 1),
            ctx,
        );
    }

    // === Give ===

    fn exec_give(&self, st: &mut GameState, ctx: &EffectContext) -> ExecStep {
        let hand = &st.players[ctx.actor].hand;
        match hand.len() {
            0 => self.skip_insufficient(st, ctx, "has no card to give"),
            1 => {
                let instance = hand[0].instance;
                self.give_card(st, instance, ctx);
                ExecStep::Done(true)
            }
            _ => ExecStep::NeedDecision(PendingKind::SelectHandCardToGive),
        }
    }

    /// Transfer a hand card to the opponent's hand with fresh identity.
    pub(crate) fn give_card(
        &self,
        st: &mut GameState,
        instance: CardInstanceId,
        ctx: &EffectContext,
    ) {
        let Some(idx) = st.players[ctx.actor].hand_position(instance) else {
            return;
        };
        let card = st.players[ctx.actor].hand.remove(idx);
        let receiver = ctx.actor.opponent();
        let fresh = st.alloc_instance();
        st.players[receiver]
            .hand
            .push(PlayedCard::new(fresh, card.card, true));
        self.log_effect(
            st,
            ctx.actor,
            format!("{} gives a card to {receiver}", ctx.actor),
            ctx,
        );
    }

    // === Flip ===

    fn exec_flip(
        &self,
        st: &mut GameState,
        params: &FlipParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        let passives = ActivePassives::scan(st, self.catalog());
        let flips_blocked = passives.face_up_flips_blocked();

        let mut candidates = match &params.target {
            EffectTarget::Source => match st.locate(ctx.source_card) {
                Some(_) => vec![ctx.source_card],
                None => Vec::new(),
            },
            EffectTarget::Previous => self
                .previous_target_on_board(st)
                .map(|c| vec![c])
                .unwrap_or_default(),
            EffectTarget::Filtered {
                filter,
                scope,
                exclude_source,
            } => {
                let mut filter = filter.clone();
                match params.direction {
                    FlipDirection::FaceUp => filter.face = FaceFilter::FaceDown,
                    FlipDirection::FaceDown => filter.face = FaceFilter::FaceUp,
                    FlipDirection::Toggle => {}
                }
                find_targets_with(
                    st,
                    self.catalog(),
                    &passives,
                    &filter,
                    *scope,
                    ctx,
                    *exclude_source,
                )
                .iter()
                .map(|t| t.card)
                .collect()
            }
        };

        // Direction sanity for Source/Previous targets.
        candidates.retain(|&c| {
            let Some(card) = st.board_card_by_id(c) else {
                return false;
            };
            match params.direction {
                FlipDirection::FaceUp => !card.face_up,
                FlipDirection::FaceDown => card.face_up,
                FlipDirection::Toggle => true,
            }
        });

        if flips_blocked {
            // Only face-up -> face-down flips stay legal.
            let before = candidates.len();
            candidates.retain(|&c| {
                st.board_card_by_id(c).is_some_and(|card| card.face_up)
            });
            if candidates.is_empty() && before > 0 {
                self.log_effect(
                    st,
                    ctx.actor,
                    "flipping face-up is blocked".to_string(),
                    ctx,
                );
                return ExecStep::Done(false);
            }
        }

        match candidates.len() {
            0 => self.skip_no_targets(st, ctx),
            1 => {
                self.flip_card(st, candidates[0], ctx);
                ExecStep::Done(true)
            }
            _ => ExecStep::NeedDecision(PendingKind::SelectCardToFlip { candidates }),
        }
    }

    /// Toggle a board card's orientation, firing on-flip-up triggers.
    pub(crate) fn flip_card(
        &self,
        st: &mut GameState,
        instance: CardInstanceId,
        ctx: &EffectContext,
    ) {
        let Some(pos) = st.locate(instance) else {
            return;
        };
        let (card_id, now_face_up) = {
            let card = &mut st.players[pos.owner].lanes[pos.lane].stack[pos.index];
            card.flip();
            (card.card, card.face_up)
        };
        st.players[pos.owner].stats.cards_flipped += 1;
        st.animations.push(AnimationHint::Flipped {
            card: instance,
            face_up: now_face_up,
        });

        let orientation = if now_face_up { "face-up" } else { "face-down" };
        let name = self.card_display(card_id, now_face_up);
        self.log_effect(st, pos.owner, format!("{name} flips {orientation}"), ctx);

        self.recalculate(st);

        if now_face_up {
            self.enqueue_triggers(st, instance, TriggerMoment::OnFlipUp, ctx.current_turn, false);
        }
    }

    // === Shift ===

    fn exec_shift(
        &self,
        st: &mut GameState,
        params: &ShiftParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        let candidates = match self.resolve_single_target(st, &params.target, ctx) {
            Ok(candidates) => candidates,
            Err(step) => return step,
        };
        match candidates.len() {
            0 => self.skip_no_targets(st, ctx),
            1 => self.shift_lane_stage(st, candidates[0], params, ctx),
            _ => ExecStep::NeedDecision(PendingKind::SelectCardToShift { candidates }),
        }
    }

    /// Second shift stage: pick the destination lane.
    pub(crate) fn shift_lane_stage(
        &self,
        st: &mut GameState,
        card: CardInstanceId,
        params: &ShiftParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        let lanes = self.valid_shift_lanes(st, card, params.avoid_matching_protocols);
        match lanes.len() {
            0 => self.skip_no_targets(st, ctx),
            1 => {
                self.shift_card(st, card, lanes[0], ctx);
                ExecStep::Done(true)
            }
            _ => ExecStep::NeedDecision(PendingKind::SelectLaneForShift { card, lanes }),
        }
    }

    /// Lanes a card may shift to: its owner's other lanes, optionally
    /// excluding lanes whose protocol (on either side) matches the
    /// card's own protocol.
    pub(crate) fn valid_shift_lanes(
        &self,
        st: &GameState,
        instance: CardInstanceId,
        avoid_matching: bool,
    ) -> LaneList {
        let Some(pos) = st.locate(instance) else {
            return LaneList::new();
        };
        let protocol = self
            .catalog()
            .get(st.board_card(pos).card)
            .protocol
            .clone();
        (0..crate::core::LANE_COUNT)
            .filter(|&l| l != pos.lane)
            .filter(|&l| {
                !avoid_matching
                    || PlayerId::both()
                        .all(|p| st.players[p].protocols[l] != protocol)
            })
            .collect()
    }

    /// Relocate a board card to another of its owner's lanes, firing
    /// cover on the destination and uncover on the origin.
    pub(crate) fn shift_card(
        &self,
        st: &mut GameState,
        instance: CardInstanceId,
        dest_lane: usize,
        ctx: &EffectContext,
    ) {
        let Some(pos) = st.locate(instance) else {
            return;
        };
        let was_top = st.is_uncovered(pos);
        let card = st.players[pos.owner].lanes[pos.lane].stack.remove(pos.index);

        let covered = st.players[pos.owner].lanes[dest_lane]
            .top()
            .map(|c| c.instance);
        st.players[pos.owner].lanes[dest_lane].stack.push(card);
        st.players[pos.owner].stats.cards_shifted += 1;
        st.animations.push(AnimationHint::Shifted {
            card: instance,
            from_lane: pos.lane,
            to_lane: dest_lane,
        });

        let name = self.card_display(card.card, card.face_up);
        self.log_effect(
            st,
            pos.owner,
            format!("{name} shifts to line {}", dest_lane + 1),
            ctx,
        );

        self.recalculate(st);

        if let Some(covered) = covered {
            self.fire_cover(st, covered, ctx.current_turn);
        }
        if was_top && !ctx.suppress_uncover {
            self.fire_uncover(st, pos.owner, pos.lane, ctx.current_turn);
        }
    }

    // === Draw / Refresh ===

    fn exec_draw(
        &self,
        st: &mut GameState,
        params: &DrawParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        let drawn = self.draw_cards(st, ctx.actor, params.count as usize);
        if drawn == 0 {
            return self.skip_insufficient(st, ctx, "has nothing to draw");
        }
        self.log_effect(
            st,
            ctx.actor,
            format!("{} draws {drawn} card(s)", ctx.actor),
            ctx,
        );
        ExecStep::Done(true)
    }

    fn exec_refresh(&self, st: &mut GameState, ctx: &EffectContext) -> ExecStep {
        let missing = HAND_LIMIT.saturating_sub(st.players[ctx.actor].hand.len());
        if missing == 0 {
            return self.skip_insufficient(st, ctx, "already holds a full hand");
        }
        let drawn = self.draw_cards(st, ctx.actor, missing);
        st.players[ctx.actor].stats.hands_refreshed += 1;
        self.log_effect(
            st,
            ctx.actor,
            format!("{} refreshes, drawing {drawn} card(s)", ctx.actor),
            ctx,
        );
        ExecStep::Done(drawn > 0)
    }

    /// Draw up to `count` cards, recycling the trash into the deck when
    /// the deck runs out. Returns the number actually drawn.
    pub(crate) fn draw_cards(&self, st: &mut GameState, player: PlayerId, count: usize) -> usize {
        let mut drawn = 0;
        for _ in 0..count {
            if st.players[player].deck.is_empty() {
                if st.players[player].trash.is_empty() {
                    break;
                }
                let mut recycled = std::mem::take(&mut st.players[player].trash);
                st.rng.shuffle(&mut recycled);
                st.players[player].deck = recycled;
                st.log
                    .note(player, format!("{player} shuffles their trash into their deck"));
            }
            let Some(card_id) = st.players[player].deck.pop() else {
                break;
            };
            let instance = st.alloc_instance();
            st.players[player]
                .hand
                .push(PlayedCard::new(instance, card_id, true));
            st.players[player].stats.cards_drawn += 1;
            drawn += 1;
        }
        if drawn > 0 {
            st.animations.push(AnimationHint::Drawn {
                player,
                count: drawn as u32,
            });
        }
        drawn
    }

    // === Rearrange ===

    fn exec_rearrange(
        &self,
        st: &mut GameState,
        params: &RearrangeParams,
        ctx: &EffectContext,
    ) -> ExecStep {
        let passives = ActivePassives::scan(st, self.catalog());
        if passives.rearrange_blocked() {
            self.log_effect(
                st,
                ctx.actor,
                "protocols cannot be rearranged".to_string(),
                ctx,
            );
            return ExecStep::Done(false);
        }

        let target = match params.target_player {
            EffectActor::CardOwner => ctx.card_owner,
            EffectActor::Opponent => ctx.card_owner.opponent(),
        };
        let forbidden = if params.forbid_own_protocol_own_lane && target == ctx.card_owner {
            st.board_card_by_id(ctx.source_card).map(|card| {
                (
                    self.catalog().get(card.card).protocol.clone(),
                    ctx.source_lane,
                )
            })
        } else {
            None
        };

        ExecStep::NeedDecision(PendingKind::PromptRearrange { target, forbidden })
    }

    // === Shared helpers ===

    /// Resolve a single-card target specification into candidates.
    /// `Err` carries the skip step for stale Source/Previous targets.
    fn resolve_single_target(
        &self,
        st: &mut GameState,
        target: &EffectTarget,
        ctx: &EffectContext,
    ) -> Result<Vec<CardInstanceId>, ExecStep> {
        match target {
            EffectTarget::Source => match st.locate(ctx.source_card) {
                Some(_) => Ok(vec![ctx.source_card]),
                None => Err(self.skip_no_targets(st, ctx)),
            },
            EffectTarget::Previous => match self.previous_target_on_board(st) {
                Some(card) => Ok(vec![card]),
                None => Err(self.skip_no_targets(st, ctx)),
            },
            EffectTarget::Filtered {
                filter,
                scope,
                exclude_source,
            } => {
                let passives = ActivePassives::scan(st, self.catalog());
                Ok(find_targets_with(
                    st,
                    self.catalog(),
                    &passives,
                    filter,
                    *scope,
                    ctx,
                    *exclude_source,
                )
                .iter()
                .map(|t| t.card)
                .collect())
            }
        }
    }

    /// The previous chain target, if it still sits on the board.
    fn previous_target_on_board(&self, st: &GameState) -> Option<CardInstanceId> {
        let last = st.last_target?;
        st.locate(last.card).map(|_| last.card)
    }

    fn skip_no_targets(&self, st: &mut GameState, ctx: &EffectContext) -> ExecStep {
        self.log_effect(st, ctx.actor, "no valid targets".to_string(), ctx);
        ExecStep::Done(false)
    }

    fn skip_insufficient(
        &self,
        st: &mut GameState,
        ctx: &EffectContext,
        why: &str,
    ) -> ExecStep {
        self.log_effect(st, ctx.actor, format!("{} {why}", ctx.actor), ctx);
        ExecStep::Done(false)
    }

    /// Append a log entry at the current chain indent.
    pub(crate) fn log_effect(
        &self,
        st: &mut GameState,
        player: PlayerId,
        message: String,
        ctx: &EffectContext,
    ) {
        st.log.push(LogEntry {
            player,
            message,
            indent: st.log_indent,
            phase: Some(log_phase_for(ctx.trigger)),
            source: Some(ctx.source_card),
        });
    }

    /// Display name of a card template.
    pub(crate) fn card_name(&self, card: CardId) -> String {
        let def = self.catalog().get(card);
        format!("{}-{}", def.protocol, def.value)
    }

    /// Display name respecting hidden information: face-down cards log
    /// anonymously.
    pub(crate) fn card_display(&self, card: CardId, face_up: bool) -> String {
        if face_up {
            self.card_name(card)
        } else {
            "a face-down card".to_string()
        }
    }
}

impl GameEngine {
    /// Fire one effect against a state, as if triggered by the
    /// context's source card, resolving chained and queued effects
    /// until a decision is required or the chain is exhausted.
    ///
    /// Public entry point for drivers (and tests) that fire ad-hoc
    /// effects; the phase machine is not advanced.
    #[must_use]
    pub fn trigger_effect(
        &self,
        state: &GameState,
        effect: &EffectDef,
        ctx: EffectContext,
    ) -> GameState {
        let mut st = state.clone();
        st.log_indent = 0;
        st.animations.clear();
        self.run_effect(&mut st, effect, &ctx);
        while st.pending.is_none() && st.winner.is_none() {
            let Some(queued) = st.queue.pop_front() else {
                break;
            };
            st.log_indent = 0;
            self.run_effect(&mut st, &queued.effect, &queued.ctx);
        }
        st
    }
}

/// Rewrite a filtered target onto one concrete lane.
fn retarget_lane(target: &EffectTarget, lane: usize) -> EffectTarget {
    match target {
        EffectTarget::Filtered {
            filter,
            exclude_source,
            ..
        } => EffectTarget::Filtered {
            filter: filter.clone(),
            scope: TargetScope::Lane(lane),
            exclude_source: *exclude_source,
        },
        other => other.clone(),
    }
}

fn log_phase_for(trigger: TriggerMoment) -> LogPhase {
    match trigger {
        TriggerMoment::StartPhase => LogPhase::Start,
        TriggerMoment::EndPhase => LogPhase::End,
        TriggerMoment::OnUncover => LogPhase::Uncover,
        TriggerMoment::OnPlay | TriggerMoment::OnCover | TriggerMoment::OnFlipUp => {
            LogPhase::Middle
        }
    }
}

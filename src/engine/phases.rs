//! The trigger dispatcher and phase machine.
//!
//! A turn walks start -> control -> compile -> action -> hand-limit ->
//! end, then hands over to the opponent. Start and end phase effects
//! fire from a snapshot taken at phase entry, each at most once per
//! phase; uncover and cover events are deduplicated per discrete
//! exposure through a guard set.
//!
//! `advance` is the single driver: it steps the machine until a pending
//! action needs a decision or the game ends.

use crate::cards::{CardInstanceId, TriggerMoment};
use crate::core::{
    GameState, LogEntry, LogPhase, Phase, PhaseEffectKey, PlayerId, QueuedEffect, HAND_LIMIT,
    LANE_COUNT,
};
use crate::effects::context::EffectContext;

use super::pending::{LaneList, PendingAction, PendingKind, PlayableCard, SelectionCount};
use super::GameEngine;

/// Lane total required to compile.
pub const COMPILE_THRESHOLD: i64 = 10;

impl GameEngine {
    /// Step the phase machine until a decision is required or the game
    /// ends. Also drains the effect queue between steps.
    pub(crate) fn advance(&self, st: &mut GameState) {
        loop {
            if st.winner.is_some() {
                st.pending = None;
                return;
            }
            if st.pending.is_some() {
                return;
            }
            if let Some(queued) = st.queue.pop_front() {
                st.log_indent = 0;
                self.run_effect(st, &queued.effect, &queued.ctx);
                continue;
            }

            // Chain complete: reset the cross-effect references.
            st.log_indent = 0;
            st.discarded_this_chain = 0;
            st.last_target = None;

            match st.phase {
                Phase::Start => self.step_phase_effects(st, TriggerMoment::StartPhase),
                Phase::Control => self.step_control(st),
                Phase::Compile => self.step_compile(st),
                Phase::Action => self.step_action(st),
                Phase::HandLimit => self.step_hand_limit(st),
                Phase::End => self.step_phase_effects(st, TriggerMoment::EndPhase),
            }
        }
    }

    /// Enter the current turn player's start phase on a caller-built
    /// state and advance to the first decision.
    ///
    /// Drivers use this to resume play on reconstructed boards; normal
    /// matches enter turns through [`resolve`](GameEngine::resolve).
    #[must_use]
    pub fn begin_turn(&self, state: &GameState) -> GameState {
        let mut st = state.clone();
        st.phase = Phase::Start;
        st.action_taken = false;
        st.fired_phase_effects.clear();
        st.animations.clear();
        self.recalculate(&mut st);
        self.take_phase_snapshot(&mut st, TriggerMoment::StartPhase);
        self.advance(&mut st);
        st
    }

    // === Start / End ===

    /// Snapshot the turn player's phase effects at phase entry. Cards
    /// entering play mid-phase do not join the snapshot.
    pub(crate) fn take_phase_snapshot(&self, st: &mut GameState, moment: TriggerMoment) {
        let player = st.turn;
        let mut keys = Vec::new();
        for lane in &st.players[player].lanes {
            for card in &lane.stack {
                if !card.face_up {
                    continue;
                }
                let def = self.catalog().get(card.card);
                for (box_kind, _) in def.triggered_at(moment) {
                    let key = PhaseEffectKey {
                        card: card.instance,
                        box_kind,
                    };
                    if !st.fired_phase_effects.contains(&key) {
                        keys.push(key);
                    }
                }
            }
        }
        st.phase_effect_queue = keys;
    }

    /// Fire snapshot effects one at a time; the turn player orders them
    /// when several could fire.
    fn step_phase_effects(&self, st: &mut GameState, moment: TriggerMoment) {
        match st.phase_effect_queue.len() {
            0 => self.leave_phase(st, moment),
            1 => {
                let key = st.phase_effect_queue[0];
                self.fire_phase_effect(st, key, moment);
            }
            _ => {
                let choices = st.phase_effect_queue.clone();
                self.set_pending(
                    st,
                    PendingAction::structural(st.turn, PendingKind::SelectPhaseEffect { choices }),
                );
            }
        }
    }

    fn leave_phase(&self, st: &mut GameState, moment: TriggerMoment) {
        match moment {
            TriggerMoment::StartPhase => {
                st.phase = Phase::Control;
            }
            TriggerMoment::EndPhase => self.next_turn(st),
            _ => unreachable!("phase effects are start or end"),
        }
    }

    /// Fire one snapshot key: enqueue its box's effects. A key whose
    /// card left play or turned face-down is skipped (stale reference).
    pub(crate) fn fire_phase_effect(
        &self,
        st: &mut GameState,
        key: PhaseEffectKey,
        moment: TriggerMoment,
    ) {
        st.phase_effect_queue.retain(|k| *k != key);
        if !st.fired_phase_effects.insert(key) {
            // Already fired this phase; deliberately ignored.
            return;
        }

        let Some(pos) = st.locate(key.card) else {
            st.log.note(st.turn, "a phase effect's card has left play");
            return;
        };
        let card = *st.board_card(pos);
        if !card.face_up {
            return;
        }

        let def = self.catalog().get(card.card);
        let effects: Vec<_> = def
            .triggered_at(moment)
            .filter(|(box_kind, _)| *box_kind == key.box_kind)
            .map(|(_, effect)| effect.clone())
            .collect();

        let ctx = EffectContext::for_card(pos.owner, st.turn, moment, key.card, pos.lane);
        for effect in effects {
            st.queue.push_back(QueuedEffect { effect, ctx });
        }
    }

    // === Control ===

    /// Token exchange: the player whose face value leads in at least
    /// two lines takes the control token. Ties leave it in place.
    fn step_control(&self, st: &mut GameState) {
        if st.use_control {
            for player in PlayerId::both() {
                let leads = (0..LANE_COUNT)
                    .filter(|&l| {
                        st.players[player].lane_values[l]
                            > st.players[player.opponent()].lane_values[l]
                    })
                    .count();
                if leads >= 2 && st.control_holder != Some(player) {
                    st.control_holder = Some(player);
                    st.log.push(LogEntry {
                        player,
                        message: format!("{player} takes the control token"),
                        indent: 0,
                        phase: None,
                        source: None,
                    });
                }
            }
        }
        st.phase = Phase::Compile;
    }

    // === Compile ===

    /// Lanes the player could compile right now.
    pub(crate) fn compilable_lanes(&self, st: &GameState, player: PlayerId) -> LaneList {
        if st.players[player].cannot_compile {
            return LaneList::new();
        }
        (0..LANE_COUNT)
            .filter(|&l| {
                !st.players[player].compiled[l]
                    && st.players[player].lane_values[l] >= COMPILE_THRESHOLD
                    && st.players[player].lane_values[l]
                        > st.players[player.opponent()].lane_values[l]
            })
            .collect()
    }

    /// Compiling is mandatory; with several eligible lanes the player
    /// chooses the order.
    fn step_compile(&self, st: &mut GameState) {
        let lanes = self.compilable_lanes(st, st.turn);
        match lanes.len() {
            0 => st.phase = Phase::Action,
            1 => self.compile_lane(st, st.turn, lanes[0]),
            _ => self.set_pending(
                st,
                PendingAction::structural(st.turn, PendingKind::SelectLaneForCompile { lanes }),
            ),
        }
    }

    /// Compile one lane: mark the protocol, clear every card in the
    /// line on both sides, check for victory.
    pub(crate) fn compile_lane(&self, st: &mut GameState, player: PlayerId, lane: usize) {
        st.players[player].compiled[lane] = true;
        st.animations
            .push(crate::core::AnimationHint::Compiled { player, lane });
        let protocol = st.players[player].protocols[lane].clone();
        st.log.push(LogEntry {
            player,
            message: format!("{player} compiles {protocol}"),
            indent: 0,
            phase: Some(LogPhase::Compile),
            source: None,
        });

        // The whole line is cleared without uncover triggers; nothing
        // is exposed, the line is simply gone.
        for side in PlayerId::both() {
            let stack = std::mem::take(&mut st.players[side].lanes[lane].stack);
            for card in stack {
                st.uncover_guard.remove(&card.instance);
                st.players[side].trash.push(card.card);
            }
        }

        self.recalculate(st);

        if st.players[player].compiled.iter().all(|&c| c) {
            st.winner = Some(player);
            st.log.push(LogEntry {
                player,
                message: format!("{player} has compiled all protocols and wins"),
                indent: 0,
                phase: Some(LogPhase::Compile),
                source: None,
            });
        }
    }

    // === Action ===

    fn step_action(&self, st: &mut GameState) {
        if st.action_taken {
            st.phase = Phase::HandLimit;
            return;
        }
        let pending = self.main_action_pending(st);
        self.set_pending(st, pending);
    }

    /// Lanes where a player may play a card template.
    ///
    /// Face-up plays need the lane's protocol to match the card's;
    /// face-down plays are legal anywhere. Exposed for AI drivers.
    #[must_use]
    pub fn legal_lanes_for(
        &self,
        st: &GameState,
        player: PlayerId,
        card: crate::cards::CardId,
        face_up: bool,
    ) -> LaneList {
        if !face_up {
            return (0..LANE_COUNT).collect();
        }
        let protocol = &self.catalog().get(card).protocol;
        (0..LANE_COUNT)
            .filter(|&l| st.players[player].protocols[l] == *protocol)
            .collect()
    }

    /// The main-action decision: play a card or refresh.
    pub(crate) fn main_action_pending(&self, st: &GameState) -> PendingAction {
        let player = st.turn;
        let side = &st.players[player];
        let playable = side
            .hand
            .iter()
            .map(|card| PlayableCard {
                card: card.instance,
                face_up_lanes: self.legal_lanes_for(st, player, card.card, true),
                face_down_lanes: self.legal_lanes_for(st, player, card.card, false),
            })
            .collect();

        PendingAction::structural(
            player,
            PendingKind::ChooseMainAction {
                playable,
                can_refresh: side.hand.len() < HAND_LIMIT,
            },
        )
    }

    /// Play a hand card to a lane. Fires cover on the covered card and
    /// on-play on the played card.
    pub(crate) fn play_card_from_hand(
        &self,
        st: &mut GameState,
        player: PlayerId,
        instance: CardInstanceId,
        lane: usize,
        face_up: bool,
    ) {
        let Some(idx) = st.players[player].hand_position(instance) else {
            return;
        };
        let mut card = st.players[player].hand.remove(idx);
        card.face_up = face_up;
        if face_up {
            card.revealed = false;
        }

        let covered = st.players[player].lanes[lane].top().map(|c| c.instance);
        st.players[player].lanes[lane].stack.push(card);
        st.players[player].stats.cards_played += 1;
        st.animations.push(crate::core::AnimationHint::Played {
            card: instance,
            lane,
            face_up,
        });
        // A freshly played card's current exposure is consumed; its
        // uncover trigger waits for a future re-exposure.
        st.uncover_guard.insert(instance);
        st.action_taken = true;

        let name = self.card_display(card.card, face_up);
        st.log.push(LogEntry {
            player,
            message: format!("{player} plays {name} in line {}", lane + 1),
            indent: 0,
            phase: None,
            source: Some(instance),
        });

        self.recalculate(st);

        if let Some(covered) = covered {
            self.fire_cover(st, covered, st.turn);
        }
        if face_up {
            self.enqueue_triggers(st, instance, TriggerMoment::OnPlay, st.turn, false);
        }
    }

    // === Hand limit ===

    fn step_hand_limit(&self, st: &mut GameState) {
        let over = st.players[st.turn].hand.len().saturating_sub(HAND_LIMIT);
        if over > 0 {
            self.set_pending(
                st,
                PendingAction::structural(
                    st.turn,
                    PendingKind::SelectCardsToDiscard {
                        count: SelectionCount::Exactly(over as u32),
                    },
                ),
            );
            return;
        }
        st.phase = Phase::End;
        self.take_phase_snapshot(st, TriggerMoment::EndPhase);
    }

    // === Turn handover ===

    fn next_turn(&self, st: &mut GameState) {
        st.turn = st.turn.opponent();
        st.turn_number += 1;
        st.phase = Phase::Start;
        st.action_taken = false;
        st.fired_phase_effects.clear();
        st.phase_effect_queue.clear();
        st.interrupted = None;

        st.log.push(LogEntry {
            player: st.turn,
            message: format!("Turn {} - {}", st.turn_number, st.turn),
            indent: 0,
            phase: None,
            source: None,
        });

        self.take_phase_snapshot(st, TriggerMoment::StartPhase);
    }

    // === Cover / Uncover dispatch ===

    /// A card became covered: clear its exposure guard and fire its
    /// on-cover abilities. The context suppresses transient uncover
    /// checks, since a replacement is in flight.
    pub(crate) fn fire_cover(
        &self,
        st: &mut GameState,
        covered: CardInstanceId,
        current_turn: PlayerId,
    ) {
        st.uncover_guard.remove(&covered);

        let Some(pos) = st.locate(covered) else {
            return;
        };
        if !st.board_card(pos).face_up {
            return;
        }
        self.enqueue_triggers(st, covered, TriggerMoment::OnCover, current_turn, true);
    }

    /// A lane's top card got exposed: fire its on-uncover abilities at
    /// most once per discrete exposure.
    pub(crate) fn fire_uncover(
        &self,
        st: &mut GameState,
        owner: PlayerId,
        lane: usize,
        current_turn: PlayerId,
    ) {
        let Some(top) = st.players[owner].lanes[lane].top() else {
            return;
        };
        let instance = top.instance;
        if st.uncover_guard.contains(&instance) {
            // Already fired for this exposure; deliberately ignored.
            return;
        }
        st.uncover_guard.insert(instance);

        if st.board_card_by_id(instance).is_some_and(|c| c.face_up) {
            self.enqueue_triggers(st, instance, TriggerMoment::OnUncover, current_turn, false);
        }
    }

    /// Enqueue a card's triggered abilities for a moment.
    pub(crate) fn enqueue_triggers(
        &self,
        st: &mut GameState,
        instance: CardInstanceId,
        moment: TriggerMoment,
        current_turn: PlayerId,
        suppress_uncover: bool,
    ) {
        let Some(pos) = st.locate(instance) else {
            return;
        };
        let card = *st.board_card(pos);
        let def = self.catalog().get(card.card);
        let effects: Vec<_> = def
            .triggered_at(moment)
            .map(|(_, effect)| effect.clone())
            .collect();
        if effects.is_empty() {
            return;
        }

        let mut ctx = EffectContext::for_card(pos.owner, current_turn, moment, instance, pos.lane);
        ctx.suppress_uncover = suppress_uncover;
        for effect in effects {
            st.queue.push_back(QueuedEffect { effect, ctx });
        }
    }

    /// Rebuild the lane value caches.
    pub(crate) fn recalculate(&self, st: &mut GameState) {
        super::lane_value::recalculate_lane_values(st, self.catalog());
    }
}

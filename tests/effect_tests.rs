//! Effect executor integration tests.
//!
//! Covers the specified end-to-end scenarios: conditional chains with
//! interleaved decisions, tie-breaking prompts, per-line selections,
//! passive blocking, and the hand/deck economy effects.

mod common;

use common::*;

use protocol_duel::cards::TriggerMoment;
use protocol_duel::core::PlayerId;
use protocol_duel::effects::def::{DiscardCount, EffectAction, EffectDef, EffectTarget};
use protocol_duel::effects::filter::{
    FaceFilter, PositionFilter, TargetFilter, TargetScope, ValueCalc,
};
use protocol_duel::effects::SelectCount;
use protocol_duel::engine::{
    Decision, DecisionError, LaneList, PendingAction, PendingKind, PlayableCard, Selection,
};
use protocol_duel::EffectContext;

/// Scenario: play "discard 1, if you do delete 1 uncovered card" with
/// one opponent uncovered card on board. Discard resolves, the delete
/// auto-targets the only legal card, the turn ends.
#[test]
fn discard_then_delete_chain_ends_turn() {
    let engine = demo_engine();
    let mut st = board_state();
    st.action_taken = false;

    let target = place(&mut st, &engine, PlayerId::TWO, 0, "Current", 0, true);
    let decay2 = hand_card(&mut st, &engine, PlayerId::ONE, "Decay", 2);
    let filler1 = hand_card(&mut st, &engine, PlayerId::ONE, "Hearth", 3);
    let _filler2 = hand_card(&mut st, &engine, PlayerId::ONE, "Hearth", 4);

    st.pending = Some(PendingAction::structural(
        PlayerId::ONE,
        PendingKind::ChooseMainAction {
            playable: vec![PlayableCard {
                card: decay2,
                face_up_lanes: LaneList::from_slice(&[1]),
                face_down_lanes: LaneList::from_slice(&[0, 1, 2]),
            }],
            can_refresh: true,
        },
    ));

    let st = engine
        .resolve(
            &st,
            Decision::PlayCard {
                card: decay2,
                lane: 1,
                face_up: true,
            },
        )
        .expect("legal play");

    // The on-play chain pauses on the discard choice.
    let pending = st.pending.as_ref().expect("discard pending");
    assert_eq!(pending.actor, PlayerId::ONE);
    assert!(matches!(
        pending.kind,
        PendingKind::SelectCardsToDiscard { .. }
    ));

    let before = total_cards(&st);
    let st = engine.resolve(&st, select(filler1)).expect("legal discard");

    // Discard done, the single-target delete auto-resolved, the turn
    // passed to the opponent.
    assert!(st.locate(target).is_none());
    assert_eq!(st.players[PlayerId::TWO].trash.len(), 1);
    assert_eq!(st.players[PlayerId::ONE].trash.len(), 1);
    assert_eq!(st.players[PlayerId::ONE].stats.cards_discarded, 1);
    assert_eq!(st.players[PlayerId::TWO].stats.cards_deleted, 1);
    assert_eq!(st.turn, PlayerId::TWO);
    assert!(matches!(
        st.pending.as_ref().unwrap().kind,
        PendingKind::ChooseMainAction { .. }
    ));
    assert_eq!(total_cards(&st), before);
}

/// Scenario: deck of 3, hand of 4, refresh draws exactly 1.
#[test]
fn refresh_draws_up_to_hand_cap() {
    let engine = demo_engine();
    let mut st = board_state();
    st.action_taken = false;

    for value in 0..4 {
        hand_card(&mut st, &engine, PlayerId::ONE, "Hearth", value);
    }
    let filler = engine
        .catalog()
        .find(&protocol_duel::Protocol::new("Hearth"), 5)
        .unwrap();
    st.players[PlayerId::ONE].deck = vec![filler; 3];

    st.pending = Some(PendingAction::structural(
        PlayerId::ONE,
        PendingKind::ChooseMainAction {
            playable: Vec::new(),
            can_refresh: true,
        },
    ));

    let st = engine.resolve(&st, Decision::Refresh).expect("legal refresh");

    assert_eq!(st.players[PlayerId::ONE].hand.len(), 5);
    assert_eq!(st.players[PlayerId::ONE].deck.len(), 2);
    assert_eq!(st.players[PlayerId::ONE].stats.hands_refreshed, 1);
    assert_eq!(st.players[PlayerId::ONE].stats.cards_drawn, 1);
}

/// Scenario: a face-down card under a "face-down cards count as 4
/// here" passive contributes 4, not the default 2.
#[test]
fn face_down_override_in_lane_value() {
    let engine = demo_engine();
    let mut st = board_state();

    place(&mut st, &engine, PlayerId::ONE, 0, "Hearth", 3, false);
    place(&mut st, &engine, PlayerId::ONE, 0, "Veil", 0, true);

    protocol_duel::engine::recalculate_lane_values(&mut st, engine.catalog());

    // Veil-0 itself is worth 0; the face-down card counts as 4.
    assert_eq!(st.players[PlayerId::ONE].lane_values[0], 4);
    // Another lane's face-down card keeps the default.
    place(&mut st, &engine, PlayerId::ONE, 1, "Hearth", 6, false);
    protocol_duel::engine::recalculate_lane_values(&mut st, engine.catalog());
    assert_eq!(st.players[PlayerId::ONE].lane_values[1], 2);
}

/// Scenario: "delete your highest value uncovered card" with two tied
/// cards lists both; either choice is accepted and the other stays.
#[test]
fn tied_highest_value_prompts_choice() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 2, "Decay", 5, true);
    let a = place(&mut st, &engine, PlayerId::ONE, 0, "Hearth", 4, true);
    let b = place(&mut st, &engine, PlayerId::ONE, 1, "Hearth", 4, true);

    let effect = EffectDef::delete(
        TargetFilter::any().own().calculation(ValueCalc::HighestValue),
        TargetScope::Anywhere,
        SelectCount::Exactly(1),
    );
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 2);
    let st = engine.trigger_effect(&st, &effect, ctx);

    let pending = st.pending.as_ref().expect("tie needs a choice");
    let candidates = match &pending.kind {
        PendingKind::SelectCardsToDelete { candidates, .. } => candidates.clone(),
        other => panic!("expected delete selection, got {other:?}"),
    };
    assert_eq!(candidates, vec![a, b]);

    let resolved = engine.resolve(&st, select(b)).expect("either tie is legal");
    assert!(resolved.locate(b).is_none());
    assert!(resolved.locate(a).is_some());
    assert!(resolved
        .animations
        .iter()
        .any(|h| matches!(h, protocol_duel::AnimationHint::Deleted { card, .. } if *card == b)));

    // The other tied card is just as legal.
    let resolved = engine.resolve(&st, select(a)).expect("either tie is legal");
    assert!(resolved.locate(a).is_none());
    assert!(resolved.locate(b).is_some());
}

/// Scenario: an "each other line" delete with 2 of 3 lines populated
/// requires exactly 2 selections, one per populated line.
#[test]
fn each_other_line_requires_one_per_populated_line() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 0, "Decay", 6, true);
    let x1 = place(&mut st, &engine, PlayerId::ONE, 1, "Hearth", 3, true);
    let x2 = place(&mut st, &engine, PlayerId::TWO, 1, "Signal", 0, true);
    let y = place(&mut st, &engine, PlayerId::TWO, 2, "Bulwark", 0, true);

    let effect = EffectDef::delete(
        TargetFilter::any(),
        TargetScope::EachOtherLane,
        SelectCount::Exactly(1),
    );
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 0);
    let st = engine.trigger_effect(&st, &effect, ctx);

    let pending = st.pending.as_ref().expect("per-line selection");
    let groups = match &pending.kind {
        PendingKind::SelectOnePerLane { groups } => groups.clone(),
        other => panic!("expected one-per-lane, got {other:?}"),
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].lane, 1);
    assert_eq!(groups[0].candidates, vec![x1, x2]);
    assert_eq!(groups[1].lane, 2);
    assert_eq!(groups[1].candidates, vec![y]);

    // Too few and doubled-up selections are rejected.
    assert!(matches!(
        engine.resolve(&st, select(x1)),
        Err(DecisionError::WrongCount { .. })
    ));
    assert!(matches!(
        engine.resolve(
            &st,
            Decision::SelectCards(Selection::from_slice(&[x1, x2]))
        ),
        Err(DecisionError::WrongCount { .. })
    ));

    let resolved = engine
        .resolve(&st, Decision::SelectCards(Selection::from_slice(&[x2, y])))
        .expect("one per line");
    assert!(resolved.locate(x2).is_none());
    assert!(resolved.locate(y).is_none());
    assert!(resolved.locate(x1).is_some());
    assert!(resolved.locate(source).is_some());
}

/// "Each lane" deletes decompose into queued per-lane steps; the chain
/// follow-up fires once, after the last lane.
#[test]
fn each_lane_flow_processes_lanes_in_order() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 0, "Decay", 1, true);
    place(&mut st, &engine, PlayerId::ONE, 0, "Hearth", 2, false);
    place(&mut st, &engine, PlayerId::TWO, 1, "Signal", 0, false);
    let hearth = engine
        .catalog()
        .find(&protocol_duel::Protocol::new("Hearth"), 3)
        .unwrap();
    st.players[PlayerId::ONE].deck = vec![hearth];

    let effect = EffectDef::delete(
        TargetFilter::any()
            .position(PositionFilter::Any)
            .face(FaceFilter::FaceDown),
        TargetScope::EachLane,
        SelectCount::All,
    )
    .then(EffectDef::draw(1));
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 0);
    let st = engine.trigger_effect(&st, &effect, ctx);

    assert!(st.pending.is_none(), "all-matching deletes need no choice");
    assert_eq!(st.players[PlayerId::ONE].trash.len(), 1);
    assert_eq!(st.players[PlayerId::TWO].trash.len(), 1);
    // The follow-up fired exactly once.
    assert_eq!(st.players[PlayerId::ONE].stats.cards_drawn, 1);
}

/// A "cards cannot be flipped face-up" passive narrows flip targets to
/// face-up cards only.
#[test]
fn flip_blocking_passive_narrows_targets() {
    let engine = demo_engine();
    let mut st = board_state();

    let blocker = place(&mut st, &engine, PlayerId::ONE, 0, "Veil", 4, true);
    let face_down = place(&mut st, &engine, PlayerId::TWO, 1, "Signal", 0, false);
    let source = place(&mut st, &engine, PlayerId::ONE, 2, "Veil", 2, true);

    // Toggle-any flip: the face-down card would flip up, which is
    // blocked, so the blocker itself is the only candidate.
    let effect = EffectDef::flip(
        EffectTarget::filtered(TargetFilter::any(), TargetScope::Anywhere),
        protocol_duel::effects::FlipDirection::Toggle,
    );
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 2);
    let st2 = engine.trigger_effect(&st, &effect, ctx);

    assert!(st2.pending.is_none());
    let blocker_card = st2.board_card_by_id(blocker).unwrap();
    assert!(!blocker_card.face_up, "only legal flip was the blocker");
    let fd = st2.board_card_by_id(face_down).unwrap();
    assert!(!fd.face_up);

    // With the blocker gone face-down its passive is inactive, so the
    // same effect can now flip the face-down card up.
    let st3 = engine.trigger_effect(&st2, &effect, ctx);
    assert!(st3.pending.is_some() || {
        let fd = st3.board_card_by_id(face_down).unwrap();
        fd.face_up
    });
}

/// A face-up-only flip under the blocking passive is skipped entirely,
/// and its "if you do" follow-up does not fire.
#[test]
fn blocked_flip_counts_as_not_executed() {
    let engine = demo_engine();
    let mut st = board_state();

    place(&mut st, &engine, PlayerId::ONE, 0, "Veil", 4, true);
    let source = place(&mut st, &engine, PlayerId::ONE, 2, "Veil", 1, true);
    place(&mut st, &engine, PlayerId::TWO, 1, "Signal", 0, false);
    let hearth = engine
        .catalog()
        .find(&protocol_duel::Protocol::new("Hearth"), 3)
        .unwrap();
    st.players[PlayerId::ONE].deck = vec![hearth];

    let effect = EffectDef::flip(
        EffectTarget::filtered(
            TargetFilter::any().face(FaceFilter::FaceDown),
            TargetScope::Anywhere,
        ),
        protocol_duel::effects::FlipDirection::FaceUp,
    )
    .if_executed(EffectDef::draw(1));
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 2);
    let st = engine.trigger_effect(&st, &effect, ctx);

    assert!(st.pending.is_none());
    assert_eq!(st.players[PlayerId::ONE].stats.cards_drawn, 0);
    assert!(st
        .log
        .iter()
        .any(|e| e.message.contains("flipping face-up is blocked")));
}

/// Shift destination restricted away from lanes sharing the card's
/// protocol on either side.
#[test]
fn shift_avoids_matching_protocol_lanes() {
    let engine = demo_engine();
    let mut st = board_state();

    // Decay-1's protocol matches player one's lane 1, so the only legal
    // destination from lane 0 is lane 2.
    let card = place(&mut st, &engine, PlayerId::ONE, 0, "Decay", 1, true);
    let source = place(&mut st, &engine, PlayerId::TWO, 0, "Current", 3, true);

    let mut effect = EffectDef::shift(EffectTarget::filtered(
        TargetFilter::any().opponents(),
        TargetScope::Anywhere,
    ));
    if let EffectAction::Shift(ref mut params) = effect.action {
        params.avoid_matching_protocols = true;
    }
    let ctx = EffectContext::for_card(PlayerId::TWO, PlayerId::ONE, TriggerMoment::OnPlay, source, 0);
    let st = engine.trigger_effect(&st, &effect, ctx);

    assert!(st.pending.is_none(), "single legal destination auto-shifts");
    let pos = st.locate(card).expect("card still on board");
    assert_eq!(pos.lane, 2);
    assert_eq!(st.players[PlayerId::ONE].stats.cards_shifted, 1);
}

/// "Discard up to 2, then your opponent discards one more than you
/// did" - the dynamic count follows the actual discard, and a declined
/// "up to" still triggers the "then" follow-up.
#[test]
fn dynamic_discard_count_follows_chain() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 0, "Signal", 6, true);
    let f1 = hand_card(&mut st, &engine, PlayerId::ONE, "Hearth", 1);
    let f2 = hand_card(&mut st, &engine, PlayerId::ONE, "Hearth", 2);
    hand_card(&mut st, &engine, PlayerId::ONE, "Hearth", 3);
    for value in 0..4 {
        hand_card(&mut st, &engine, PlayerId::TWO, "Current", value);
    }

    let effect = EffectDef::discard(DiscardCount::UpTo(2)).then(
        EffectDef::discard(DiscardCount::OneMoreThanPrevious).performed_by_opponent(),
    );
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 0);
    let st2 = engine.trigger_effect(&st, &effect, ctx);

    assert!(matches!(
        st2.pending.as_ref().unwrap().kind,
        PendingKind::SelectCardsToDiscard { .. }
    ));

    // Discard both: the opponent then owes three.
    let st3 = engine
        .resolve(&st2, Decision::SelectCards(Selection::from_slice(&[f1, f2])))
        .expect("legal discard");
    let pending = st3.pending.as_ref().expect("opponent owes a discard");
    assert_eq!(pending.actor, PlayerId::TWO);
    assert!(st3.interrupted.is_some(), "response interrupts the turn");
    let hand: Vec<_> = st3.players[PlayerId::TWO].hand.iter().map(|c| c.instance).collect();
    let st4 = engine
        .resolve(
            &st3,
            Decision::SelectCards(Selection::from_slice(&hand[..3])),
        )
        .expect("forced discard");
    assert_eq!(st4.players[PlayerId::ONE].stats.cards_discarded, 2);
    assert_eq!(st4.players[PlayerId::TWO].stats.cards_discarded, 3);
    assert!(st4.interrupted.is_none());

    // Decline instead: "then" still fires, for one card.
    let st3 = engine
        .resolve(&st2, Decision::SelectCards(Selection::new()))
        .expect("up-to allows none");
    let pending = st3.pending.as_ref().expect("opponent still owes one");
    assert_eq!(pending.actor, PlayerId::TWO);
    match pending.kind {
        PendingKind::SelectCardsToDiscard { count } => {
            assert_eq!(count, protocol_duel::engine::SelectionCount::Exactly(1));
        }
        ref other => panic!("expected discard, got {other:?}"),
    }
}

/// Discarding an entire deck, then drawing, recycles the trash.
#[test]
fn entire_deck_discard_then_draw_recycles() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 0, "Hearth", 6, true);
    let filler = engine
        .catalog()
        .find(&protocol_duel::Protocol::new("Hearth"), 3)
        .unwrap();
    st.players[PlayerId::ONE].deck = vec![filler; 5];

    let effect = EffectDef::discard(DiscardCount::EntireDeck).then(EffectDef::draw(3));
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 0);
    let st = engine.trigger_effect(&st, &effect, ctx);

    assert_eq!(st.players[PlayerId::ONE].hand.len(), 3);
    assert_eq!(st.players[PlayerId::ONE].deck.len(), 2);
    assert!(st.players[PlayerId::ONE].trash.is_empty());
    assert!(st
        .log
        .iter()
        .any(|e| e.message.contains("shuffles their trash into their deck")));
}

/// Giving a hand card hands it over with a fresh identity; the
/// conditional draw follows.
#[test]
fn give_transfers_with_fresh_identity() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 1, "Signal", 3, true);
    let c1 = hand_card(&mut st, &engine, PlayerId::ONE, "Hearth", 1);
    hand_card(&mut st, &engine, PlayerId::ONE, "Hearth", 2);
    let filler = engine
        .catalog()
        .find(&protocol_duel::Protocol::new("Hearth"), 3)
        .unwrap();
    st.players[PlayerId::ONE].deck = vec![filler; 2];

    let effect = EffectDef::new(EffectAction::Give).if_executed(EffectDef::draw(2));
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 1);
    let st2 = engine.trigger_effect(&st, &effect, ctx);

    assert!(matches!(
        st2.pending.as_ref().unwrap().kind,
        PendingKind::SelectHandCardToGive
    ));
    let st3 = engine.resolve(&st2, select(c1)).expect("legal give");

    assert_eq!(st3.players[PlayerId::TWO].hand.len(), 1);
    let received = &st3.players[PlayerId::TWO].hand[0];
    assert_ne!(received.instance, c1, "transfer allocates a fresh id");
    // 2 in hand - 1 given + 2 drawn
    assert_eq!(st3.players[PlayerId::ONE].hand.len(), 3);
}

/// Board reveal feeds the previous-target slot for a chained flip.
#[test]
fn reveal_then_flip_previous_target() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 1, "Signal", 2, true);
    let hidden = place(&mut st, &engine, PlayerId::TWO, 0, "Current", 4, false);

    let effect = match &engine
        .catalog()
        .get(st.board_card_by_id(source).unwrap().card)
        .top
        .abilities[0]
    {
        protocol_duel::cards::Ability::Triggered { effect, .. } => effect.clone(),
        other => panic!("expected triggered ability, got {other:?}"),
    };
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 1);
    let st = engine.trigger_effect(&st, &effect, ctx);

    let flipped = st.board_card_by_id(hidden).unwrap();
    assert!(flipped.face_up, "revealed card then flipped face-up");
    assert!(!flipped.revealed, "flip-up clears the revealed marker");
}

/// A stale previous-target reference degrades to a skipped effect.
#[test]
fn stale_previous_target_is_skipped() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 1, "Veil", 2, true);
    st.last_target = Some(protocol_duel::core::LastTarget {
        card: protocol_duel::CardInstanceId(9999),
        value: 3,
    });

    let effect = EffectDef::flip(
        EffectTarget::Previous,
        protocol_duel::effects::FlipDirection::Toggle,
    );
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 1);
    let st = engine.trigger_effect(&st, &effect, ctx);

    assert!(st.pending.is_none());
    assert!(st.log.iter().any(|e| e.message.contains("no valid targets")));
}

/// Lane-then-return-all returns covered matches too, to their owners'
/// hands, with fresh identities.
#[test]
fn lane_then_return_all_matching() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 2, "Current", 5, true);
    let fd1 = place(&mut st, &engine, PlayerId::ONE, 0, "Hearth", 2, false);
    place(&mut st, &engine, PlayerId::ONE, 0, "Hearth", 4, true);
    let fd2 = place(&mut st, &engine, PlayerId::TWO, 0, "Signal", 1, false);

    let mut effect = EffectDef::return_to_hand(
        TargetFilter::any()
            .position(PositionFilter::Any)
            .face(FaceFilter::FaceDown),
        TargetScope::Anywhere,
    );
    if let EffectAction::Return(ref mut params) = effect.action {
        params.lane_then_all = true;
    }
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 2);
    let st = engine.trigger_effect(&st, &effect, ctx);

    assert!(st.pending.is_none(), "single matching lane auto-resolves");
    assert!(st.locate(fd1).is_none());
    assert!(st.locate(fd2).is_none());
    assert_eq!(st.players[PlayerId::ONE].hand.len(), 1);
    assert_eq!(st.players[PlayerId::TWO].hand.len(), 1);
    // The face-up card in the lane stayed put.
    assert_eq!(st.players[PlayerId::ONE].lanes[0].len(), 1);
}

/// Optional effects prompt, and declining counts as not-executed.
#[test]
fn optional_effect_confirm_and_decline() {
    let engine = demo_engine();
    let mut st = board_state();

    let source = place(&mut st, &engine, PlayerId::ONE, 0, "Veil", 6, true);

    let effect = EffectDef::flip(
        EffectTarget::Source,
        protocol_duel::effects::FlipDirection::FaceDown,
    )
    .optional();
    let ctx = EffectContext::for_card(PlayerId::ONE, PlayerId::ONE, TriggerMoment::OnPlay, source, 0);
    let st2 = engine.trigger_effect(&st, &effect, ctx);

    assert!(matches!(
        st2.pending.as_ref().unwrap().kind,
        PendingKind::ConfirmOptional
    ));

    let accepted = engine.resolve(&st2, Decision::Confirm(true)).unwrap();
    assert!(!accepted.board_card_by_id(source).unwrap().face_up);

    let declined = engine.resolve(&st2, Decision::Confirm(false)).unwrap();
    assert!(declined.board_card_by_id(source).unwrap().face_up);
}

//! Shared helpers for the integration suites.
#![allow(dead_code)]

use protocol_duel::cards::{CardCatalog, CardInstanceId, PlayedCard, Protocol};
use protocol_duel::core::{GameState, Phase, PlayerId, PlayerPair};
use protocol_duel::engine::{Decision, GameEngine, PendingKind, Selection};

/// Engine over the demo catalog.
pub fn demo_engine() -> GameEngine {
    GameEngine::new(CardCatalog::demo())
}

/// Player one's demo protocols.
pub fn p1_protocols() -> [Protocol; 3] {
    [
        Protocol::new("Hearth"),
        Protocol::new("Decay"),
        Protocol::new("Veil"),
    ]
}

/// Player two's demo protocols.
pub fn p2_protocols() -> [Protocol; 3] {
    [
        Protocol::new("Current"),
        Protocol::new("Signal"),
        Protocol::new("Bulwark"),
    ]
}

/// A bare mid-turn state: player one to act, action already taken, so
/// resolving a chain wraps the turn up afterwards.
pub fn board_state() -> GameState {
    let mut st = GameState::new(
        PlayerPair::new(|p| {
            if p == PlayerId::ONE {
                p1_protocols()
            } else {
                p2_protocols()
            }
        }),
        PlayerId::ONE,
        false,
        11,
    );
    st.phase = Phase::Action;
    st.action_taken = true;
    st
}

/// Place a card from the catalog onto a lane stack.
pub fn place(
    st: &mut GameState,
    engine: &GameEngine,
    side: PlayerId,
    lane: usize,
    protocol: &str,
    value: u8,
    face_up: bool,
) -> CardInstanceId {
    let card = engine
        .catalog()
        .find(&Protocol::new(protocol), value)
        .unwrap_or_else(|| panic!("{protocol}-{value} not in catalog"));
    let id = st.alloc_instance();
    st.players[side].lanes[lane]
        .stack
        .push(PlayedCard::new(id, card, face_up));
    id
}

/// Put a card from the catalog into a hand.
pub fn hand_card(
    st: &mut GameState,
    engine: &GameEngine,
    side: PlayerId,
    protocol: &str,
    value: u8,
) -> CardInstanceId {
    let card = engine
        .catalog()
        .find(&Protocol::new(protocol), value)
        .unwrap_or_else(|| panic!("{protocol}-{value} not in catalog"));
    let id = st.alloc_instance();
    st.players[side].hand.push(PlayedCard::new(id, card, true));
    id
}

/// Total cards across both players, every zone.
pub fn total_cards(st: &GameState) -> usize {
    PlayerId::both()
        .map(|p| st.players[p].total_cards())
        .sum()
}

/// A single-card selection.
pub fn select(card: CardInstanceId) -> Decision {
    Decision::SelectCards(Selection::from_slice(&[card]))
}

/// Pick a reasonable answer to whatever decision is pending. Used to
/// drive whole matches without a human.
pub fn auto_decision(st: &GameState) -> Decision {
    let pending = st.pending.as_ref().expect("a pending action to answer");
    match &pending.kind {
        PendingKind::ChooseMainAction {
            playable,
            can_refresh,
        } => {
            if let Some(p) = playable.iter().find(|p| !p.face_up_lanes.is_empty()) {
                Decision::PlayCard {
                    card: p.card,
                    lane: p.face_up_lanes[0],
                    face_up: true,
                }
            } else if let Some(p) = playable.first() {
                Decision::PlayCard {
                    card: p.card,
                    lane: p.face_down_lanes[0],
                    face_up: false,
                }
            } else {
                assert!(*can_refresh, "no play and no refresh available");
                Decision::Refresh
            }
        }

        PendingKind::SelectCardsToDelete { candidates, count } => {
            Decision::SelectCards(take_count(candidates, *count))
        }

        PendingKind::SelectOnePerLane { groups } => Decision::SelectCards(
            groups.iter().map(|g| g.candidates[0]).collect(),
        ),

        PendingKind::SelectLaneForDelete { lanes }
        | PendingKind::SelectLaneForReturn { lanes }
        | PendingKind::SelectLaneForCompile { lanes }
        | PendingKind::SelectLaneForShift { lanes, .. } => Decision::SelectLane(lanes[0]),

        PendingKind::SelectCardsToDiscard { count } => {
            let hand: Vec<CardInstanceId> = st.players[pending.actor]
                .hand
                .iter()
                .map(|c| c.instance)
                .collect();
            Decision::SelectCards(take_count(&hand, *count))
        }

        PendingKind::SelectCardToFlip { candidates }
        | PendingKind::SelectCardToReturn { candidates }
        | PendingKind::SelectCardToShift { candidates }
        | PendingKind::SelectBoardCardToReveal { candidates } => select(candidates[0]),

        PendingKind::SelectHandCardToGive => {
            select(st.players[pending.actor].hand[0].instance)
        }

        PendingKind::PromptRearrange { target, forbidden } => {
            let current = st.players[*target].protocols.clone();
            let orders = permutations(&current);
            let valid = orders
                .into_iter()
                .find(|order| match forbidden {
                    Some((protocol, lane)) => order[*lane] != *protocol,
                    None => true,
                })
                .expect("some permutation is always valid");
            Decision::Rearrange(valid)
        }

        PendingKind::ConfirmOptional => Decision::Confirm(true),

        PendingKind::SelectPhaseEffect { choices } => {
            Decision::SelectPhaseEffect(choices[0])
        }
    }
}

fn take_count(
    candidates: &[CardInstanceId],
    count: protocol_duel::engine::SelectionCount,
) -> Selection {
    use protocol_duel::engine::SelectionCount;
    let n = match count {
        SelectionCount::Exactly(n) => n as usize,
        SelectionCount::UpTo(n) => (n as usize).min(candidates.len()),
    };
    candidates.iter().take(n).copied().collect()
}

fn permutations(protocols: &[Protocol; 3]) -> Vec<[Protocol; 3]> {
    let p = protocols;
    vec![
        [p[0].clone(), p[1].clone(), p[2].clone()],
        [p[0].clone(), p[2].clone(), p[1].clone()],
        [p[1].clone(), p[0].clone(), p[2].clone()],
        [p[1].clone(), p[2].clone(), p[0].clone()],
        [p[2].clone(), p[0].clone(), p[1].clone()],
        [p[2].clone(), p[1].clone(), p[0].clone()],
    ]
}

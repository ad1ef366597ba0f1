//! The card catalog.
//!
//! A registry mapping `CardId` to immutable card definitions, with
//! `(protocol, value)` lookup and per-protocol deck construction. Card
//! data is external configuration; the catalog ships a built-in demo
//! set exercising every effect family so the engine is drivable
//! end-to-end without external data.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::effects::def::{
    DiscardCount, EffectAction, EffectDef, EffectTarget, FlipDirection, RearrangeParams,
    RevealParams, RevealSource, SelectCount,
};
use crate::effects::filter::{FaceFilter, PositionFilter, TargetFilter, TargetScope, ValueCalc};
use crate::effects::passive::{CountUnit, PassiveRule, PassiveScope, ValueTarget};

use super::definition::{CardDefinition, CardId, Keywords, Protocol, RuleBox, TriggerMoment};

/// Registry of card definitions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CardCatalog {
    cards: Vec<CardDefinition>,
    #[serde(skip)]
    by_key: FxHashMap<(String, u8), CardId>,
}

impl CardCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, returning its id.
    ///
    /// Later registrations win `(protocol, value)` lookup, so a custom
    /// set can shadow demo cards.
    pub fn register(&mut self, def: CardDefinition) -> CardId {
        let id = CardId::new(self.cards.len() as u32);
        self.by_key
            .insert((def.protocol.as_str().to_string(), def.value), id);
        self.cards.push(def);
        id
    }

    /// Get a definition. Panics on an unknown id - catalog ids are
    /// allocated by the catalog, so an unknown id is a defect.
    #[must_use]
    pub fn get(&self, id: CardId) -> &CardDefinition {
        &self.cards[id.raw() as usize]
    }

    /// Get a definition if the id is known.
    #[must_use]
    pub fn try_get(&self, id: CardId) -> Option<&CardDefinition> {
        self.cards.get(id.raw() as usize)
    }

    /// Look up a card by protocol and value.
    #[must_use]
    pub fn find(&self, protocol: &Protocol, value: u8) -> Option<CardId> {
        self.by_key
            .get(&(protocol.as_str().to_string(), value))
            .copied()
    }

    /// All cards of a protocol, ordered by value.
    #[must_use]
    pub fn protocol_cards(&self, protocol: &Protocol) -> Vec<CardId> {
        let mut out: Vec<CardId> = self
            .cards
            .iter()
            .enumerate()
            .filter(|(_, def)| def.protocol == *protocol)
            .map(|(i, _)| CardId::new(i as u32))
            .collect();
        out.sort_by_key(|id| self.get(*id).value);
        out
    }

    /// Number of registered cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Rebuild the lookup index (after deserialization).
    pub fn rebuild_index(&mut self) {
        self.by_key = self
            .cards
            .iter()
            .enumerate()
            .map(|(i, def)| {
                (
                    (def.protocol.as_str().to_string(), def.value),
                    CardId::new(i as u32),
                )
            })
            .collect();
    }

    /// The built-in demo set: six protocols, values 0-6 each.
    #[must_use]
    pub fn demo() -> Self {
        let mut catalog = Self::new();
        demo_set(&mut catalog);
        catalog
    }
}

/// Uncovered-any-side filter shorthand.
fn uncovered() -> TargetFilter {
    TargetFilter::any()
}

fn on_play(text: &str, effect: EffectDef) -> RuleBox {
    RuleBox::triggered(text, TriggerMoment::OnPlay, effect)
}

fn demo_set(catalog: &mut CardCatalog) {
    demo_hearth(catalog);
    demo_decay(catalog);
    demo_veil(catalog);
    demo_current(catalog);
    demo_signal(catalog);
    demo_bulwark(catalog);
}

/// Hearth: card draw and hand economy.
fn demo_hearth(catalog: &mut CardCatalog) {
    let p = "Hearth";
    catalog.register(CardDefinition::vanilla(p, 0).with_bottom(RuleBox::triggered(
        "Start: Draw 1 card.",
        TriggerMoment::StartPhase,
        EffectDef::draw(1),
    )));
    catalog.register(CardDefinition::vanilla(p, 1).with_top(on_play(
        "Draw 2 cards. Then discard 1 card.",
        EffectDef::draw(2).then(EffectDef::discard(DiscardCount::Exactly(1))),
    )));
    catalog.register(
        CardDefinition::vanilla(p, 2)
            .with_top(on_play("Refresh your hand.", EffectDef::refresh())),
    );
    catalog.register(CardDefinition::vanilla(p, 3));
    catalog.register(CardDefinition::vanilla(p, 4));
    catalog.register(CardDefinition::vanilla(p, 5));
    catalog.register(CardDefinition::vanilla(p, 6).with_top(on_play(
        "Discard your entire deck. Then draw 3 cards.",
        EffectDef::discard(DiscardCount::EntireDeck).then(EffectDef::draw(3)),
    )));
}

/// Decay: deletion and forced discards.
fn demo_decay(catalog: &mut CardCatalog) {
    let p = "Decay";
    catalog.register(CardDefinition::vanilla(p, 0).with_top(on_play(
        "Select a line. Delete all face-down cards in it.",
        {
            let mut effect = EffectDef::delete(
                TargetFilter::any()
                    .position(PositionFilter::Any)
                    .face(FaceFilter::FaceDown),
                TargetScope::Anywhere,
                SelectCount::All,
            );
            if let EffectAction::Delete(ref mut params) = effect.action {
                params.lane_then_matching = true;
            }
            effect
        },
    )));
    catalog.register(CardDefinition::vanilla(p, 1).with_top(on_play(
        "Delete 1 card with a value of 1 or less.",
        EffectDef::delete(
            {
                let mut f = uncovered();
                f.value_max = Some(1);
                f
            },
            TargetScope::Anywhere,
            SelectCount::Exactly(1),
        ),
    )));
    catalog.register(CardDefinition::vanilla(p, 2).with_top(on_play(
        "Discard 1 card. If you do, delete 1 uncovered card.",
        EffectDef::discard(DiscardCount::Exactly(1)).if_executed(EffectDef::delete(
            uncovered(),
            TargetScope::Anywhere,
            SelectCount::Exactly(1),
        )),
    )));
    catalog.register(CardDefinition::vanilla(p, 3).with_bottom(RuleBox::triggered(
        "When this card would be covered: first delete the lowest value uncovered card in this line.",
        TriggerMoment::OnCover,
        {
            let mut effect = EffectDef::delete(
                uncovered().calculation(ValueCalc::LowestValue),
                TargetScope::ThisLane,
                SelectCount::Exactly(1),
            );
            if let EffectAction::Delete(ref mut params) = effect.action {
                params.auto = Some(ValueCalc::LowestValue);
            }
            effect
        },
    )));
    catalog.register(CardDefinition::vanilla(p, 4).with_top(on_play(
        "Your opponent discards 1 card at random.",
        {
            let mut effect = EffectDef::discard(DiscardCount::Exactly(1)).performed_by_opponent();
            if let EffectAction::Discard(ref mut params) = effect.action {
                params.random = true;
            }
            effect
        },
    )));
    catalog.register(CardDefinition::vanilla(p, 5).with_top(on_play(
        "Delete your highest value uncovered card.",
        EffectDef::delete(
            uncovered().own().calculation(ValueCalc::HighestValue),
            TargetScope::Anywhere,
            SelectCount::Exactly(1),
        ),
    )));
    catalog.register(CardDefinition::vanilla(p, 6).with_top(on_play(
        "Delete 1 card in each other line.",
        EffectDef::delete(uncovered(), TargetScope::EachOtherLane, SelectCount::Exactly(1)),
    )));
}

/// Veil: face orientation tricks.
fn demo_veil(catalog: &mut CardCatalog) {
    let p = "Veil";
    catalog.register(CardDefinition::vanilla(p, 0).with_middle(RuleBox::passive(
        "Your face-down cards in this line count as 4.",
        PassiveRule::FaceDownValue {
            value: 4,
            scope: PassiveScope::ThisLane,
        },
    )));
    catalog.register(CardDefinition::vanilla(p, 1).with_top(on_play(
        "Flip 1 card face-down. If you do, draw 1 card.",
        EffectDef::flip(
            EffectTarget::filtered(
                uncovered().face(FaceFilter::FaceUp),
                TargetScope::Anywhere,
            ),
            FlipDirection::FaceDown,
        )
        .if_executed(EffectDef::draw(1)),
    )));
    catalog.register(CardDefinition::vanilla(p, 2).with_top(on_play(
        "Flip 1 card.",
        EffectDef::flip(
            EffectTarget::filtered(uncovered(), TargetScope::Anywhere),
            FlipDirection::Toggle,
        ),
    )));
    catalog.register(CardDefinition::vanilla(p, 3).with_bottom(RuleBox::triggered(
        "When this card is uncovered: flip this card.",
        TriggerMoment::OnUncover,
        EffectDef::flip(EffectTarget::Source, FlipDirection::FaceDown),
    )));
    catalog.register(CardDefinition::vanilla(p, 4).with_middle(RuleBox::passive(
        "Cards cannot be flipped face-up.",
        PassiveRule::BlockFaceUpFlips,
    )));
    catalog.register(CardDefinition::vanilla(p, 5).with_top(RuleBox::triggered(
        "When this card is flipped face-up: draw 2 cards.",
        TriggerMoment::OnFlipUp,
        EffectDef::draw(2),
    )));
    catalog.register(CardDefinition::vanilla(p, 6).with_top(on_play(
        "You may flip this card face-down.",
        EffectDef::flip(EffectTarget::Source, FlipDirection::FaceDown).optional(),
    )));
}

/// Current: movement between lines.
fn demo_current(catalog: &mut CardCatalog) {
    let p = "Current";
    catalog.register(CardDefinition::vanilla(p, 0));
    catalog.register(CardDefinition::vanilla(p, 1).with_top(on_play(
        "Return 1 uncovered card.",
        EffectDef::return_to_hand(uncovered(), TargetScope::Anywhere),
    )));
    catalog.register(CardDefinition::vanilla(p, 2).with_top(on_play(
        "Shift 1 of your other cards.",
        EffectDef::shift(EffectTarget::filtered(
            uncovered().own(),
            TargetScope::Anywhere,
        )),
    )));
    catalog.register(CardDefinition::vanilla(p, 3).with_top(on_play(
        "Shift 1 card. Its new line may not share its protocol.",
        {
            let mut effect = EffectDef::shift(EffectTarget::filtered(
                uncovered(),
                TargetScope::Anywhere,
            ));
            if let EffectAction::Shift(ref mut params) = effect.action {
                params.avoid_matching_protocols = true;
            }
            effect
        },
    )));
    catalog.register(CardDefinition::vanilla(p, 4));
    catalog.register(CardDefinition::vanilla(p, 5).with_top(on_play(
        "Select a line. Return all face-down cards in it.",
        {
            let mut effect = EffectDef::return_to_hand(
                TargetFilter::any()
                    .position(PositionFilter::Any)
                    .face(FaceFilter::FaceDown),
                TargetScope::Anywhere,
            );
            if let EffectAction::Return(ref mut params) = effect.action {
                params.lane_then_all = true;
            }
            effect
        },
    )));
    catalog.register(CardDefinition::vanilla(p, 6).with_top(on_play(
        "Rearrange your protocols.",
        EffectDef::rearrange_own(),
    )));
}

/// Signal: information and hand transfer.
fn demo_signal(catalog: &mut CardCatalog) {
    let p = "Signal";
    catalog.register(CardDefinition::vanilla(p, 0));
    catalog.register(CardDefinition::vanilla(p, 1).with_top(on_play(
        "Reveal the top card of your deck.",
        EffectDef::new(EffectAction::Reveal(RevealParams {
            source: RevealSource::DeckTop,
            filter: TargetFilter::any(),
            scope: TargetScope::Anywhere,
        })),
    )));
    catalog.register(CardDefinition::vanilla(p, 2).with_top(on_play(
        "Reveal 1 face-down card. If you do, flip it face-up.",
        EffectDef::new(EffectAction::Reveal(RevealParams {
            source: RevealSource::Board,
            filter: TargetFilter::any()
                .position(PositionFilter::Any)
                .face(FaceFilter::FaceDown),
            scope: TargetScope::Anywhere,
        }))
        .if_executed(EffectDef::flip(EffectTarget::Previous, FlipDirection::FaceUp)),
    )));
    catalog.register(CardDefinition::vanilla(p, 3).with_top(on_play(
        "Give 1 card from your hand to your opponent. If you do, draw 2 cards.",
        EffectDef::new(EffectAction::Give).if_executed(EffectDef::draw(2)),
    )));
    catalog.register(CardDefinition::vanilla(p, 4).with_top(on_play(
        "Rearrange your opponent's protocols.",
        EffectDef::new(EffectAction::Rearrange(RearrangeParams {
            target_player: crate::effects::def::EffectActor::Opponent,
            forbid_own_protocol_own_lane: false,
        })),
    )));
    catalog.register(CardDefinition::vanilla(p, 5).with_middle(RuleBox::passive(
        "Protocols cannot be rearranged.",
        PassiveRule::BlockRearrange,
    )));
    catalog.register(CardDefinition::vanilla(p, 6).with_top(on_play(
        "Discard up to 2 cards. Then your opponent discards one more than you did.",
        EffectDef::discard(DiscardCount::UpTo(2)).then(
            EffectDef::discard(DiscardCount::OneMoreThanPrevious).performed_by_opponent(),
        ),
    )));
}

/// Bulwark: lane value modifiers and compile denial.
fn demo_bulwark(catalog: &mut CardCatalog) {
    let p = "Bulwark";
    catalog.register(CardDefinition::vanilla(p, 0));
    catalog.register(CardDefinition::vanilla(p, 1));
    catalog.register(CardDefinition::vanilla(p, 2).with_middle(RuleBox::passive(
        "+1 to your total in this line for each face-down card here.",
        PassiveRule::AddPerCount {
            unit: CountUnit::FaceDownCardsInLane,
            per: 1,
            target: ValueTarget::OwnTotal,
            scope: PassiveScope::ThisLane,
        },
    )));
    catalog.register(CardDefinition::vanilla(p, 3).with_middle(RuleBox::passive(
        "-2 to your opponent's total in this line.",
        PassiveRule::AddToTotal {
            amount: -2,
            target: ValueTarget::OpponentTotal,
            scope: PassiveScope::ThisLane,
        },
    )));
    catalog.register(
        CardDefinition::vanilla(p, 4)
            .with_middle(RuleBox {
                text: "Your opponent cannot compile.".to_string(),
                abilities: Vec::new(),
            })
            .with_keywords(Keywords {
                blocks_compile: true,
            }),
    );
    catalog.register(CardDefinition::vanilla(p, 5).with_middle(RuleBox::passive(
        "+2 to your total in this line.",
        PassiveRule::AddToTotal {
            amount: 2,
            target: ValueTarget::OwnTotal,
            scope: PassiveScope::ThisLane,
        },
    )));
    catalog.register(CardDefinition::vanilla(p, 6).with_bottom(RuleBox::triggered(
        "End: Discard 1 card.",
        TriggerMoment::EndPhase,
        EffectDef::discard(DiscardCount::Exactly(1)),
    )));
}

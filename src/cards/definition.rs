//! Card templates.
//!
//! A `CardDefinition` is the immutable description of a card: its
//! protocol, numeric value (0-6), three rule boxes, and keyword flags.
//! Rule boxes hold declarative abilities - triggered effects fired at a
//! `TriggerMoment`, or passive rules applied continuously while the
//! card is face-up.

use serde::{Deserialize, Serialize};

use crate::effects::def::EffectDef;
use crate::effects::passive::PassiveRule;

/// A named card family. Each lane is assigned one protocol per player,
/// constraining which cards may be played face-up there.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Protocol(String);

impl Protocol {
    /// Create a protocol name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The protocol name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Protocol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Reference to a card template in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a card ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// When a triggered ability fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerMoment {
    /// The card is played face-up, or an effect fires it as part of a
    /// chain.
    OnPlay,
    /// The card flips from face-down to face-up.
    OnFlipUp,
    /// Another card is placed on top of this card.
    OnCover,
    /// The card above this one is removed.
    OnUncover,
    /// The owner's start phase.
    StartPhase,
    /// The owner's end phase.
    EndPhase,
}

/// One ability inside a rule box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ability {
    /// Fires at a trigger moment while the card is face-up.
    Triggered {
        moment: TriggerMoment,
        effect: EffectDef,
    },
    /// Applies continuously while the card is face-up.
    Passive(PassiveRule),
}

/// One of a card's three rule-text boxes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBox {
    /// Printed rule text, for logs and display.
    pub text: String,
    /// The box's declarative abilities.
    pub abilities: Vec<Ability>,
}

impl RuleBox {
    /// An empty box.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A box with one triggered ability.
    #[must_use]
    pub fn triggered(text: impl Into<String>, moment: TriggerMoment, effect: EffectDef) -> Self {
        Self {
            text: text.into(),
            abilities: vec![Ability::Triggered { moment, effect }],
        }
    }

    /// A box with one passive rule.
    #[must_use]
    pub fn passive(text: impl Into<String>, rule: PassiveRule) -> Self {
        Self {
            text: text.into(),
            abilities: vec![Ability::Passive(rule)],
        }
    }
}

/// Which of the three boxes an ability came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxKind {
    Top,
    Middle,
    Bottom,
}

/// Keyword flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    /// While this card is face-up on the board, its owner's opponent
    /// cannot compile.
    pub blocks_compile: bool,
}

/// An immutable card template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Card family.
    pub protocol: Protocol,
    /// Numeric value, 0-6.
    pub value: u8,
    /// Rule boxes, top to bottom.
    pub top: RuleBox,
    pub middle: RuleBox,
    pub bottom: RuleBox,
    /// Keyword flags.
    pub keywords: Keywords,
}

impl CardDefinition {
    /// A vanilla card with no rule text.
    #[must_use]
    pub fn vanilla(protocol: impl Into<Protocol>, value: u8) -> Self {
        assert!(value <= 6, "card values range 0-6");
        Self {
            protocol: protocol.into(),
            value,
            top: RuleBox::empty(),
            middle: RuleBox::empty(),
            bottom: RuleBox::empty(),
            keywords: Keywords::default(),
        }
    }

    /// Set the top box (builder pattern).
    #[must_use]
    pub fn with_top(mut self, rule_box: RuleBox) -> Self {
        self.top = rule_box;
        self
    }

    /// Set the middle box (builder pattern).
    #[must_use]
    pub fn with_middle(mut self, rule_box: RuleBox) -> Self {
        self.middle = rule_box;
        self
    }

    /// Set the bottom box (builder pattern).
    #[must_use]
    pub fn with_bottom(mut self, rule_box: RuleBox) -> Self {
        self.bottom = rule_box;
        self
    }

    /// Set keywords (builder pattern).
    #[must_use]
    pub fn with_keywords(mut self, keywords: Keywords) -> Self {
        self.keywords = keywords;
        self
    }

    /// Iterate the boxes with their kinds.
    pub fn boxes(&self) -> impl Iterator<Item = (BoxKind, &RuleBox)> {
        [
            (BoxKind::Top, &self.top),
            (BoxKind::Middle, &self.middle),
            (BoxKind::Bottom, &self.bottom),
        ]
        .into_iter()
    }

    /// Triggered effects firing at the given moment, with their boxes.
    pub fn triggered_at(
        &self,
        moment: TriggerMoment,
    ) -> impl Iterator<Item = (BoxKind, &EffectDef)> {
        self.boxes().flat_map(move |(kind, b)| {
            b.abilities.iter().filter_map(move |a| match a {
                Ability::Triggered { moment: m, effect } if *m == moment => Some((kind, effect)),
                _ => None,
            })
        })
    }

    /// All passive rules on this card.
    pub fn passive_rules(&self) -> impl Iterator<Item = &PassiveRule> {
        self.boxes().flat_map(|(_, b)| {
            b.abilities.iter().filter_map(|a| match a {
                Ability::Passive(rule) => Some(rule),
                _ => None,
            })
        })
    }

    /// Whether any box triggers at the given moment.
    #[must_use]
    pub fn has_trigger(&self, moment: TriggerMoment) -> bool {
        self.triggered_at(moment).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::passive::{PassiveRule, PassiveScope};

    #[test]
    fn test_vanilla() {
        let def = CardDefinition::vanilla("Fire", 3);
        assert_eq!(def.protocol.as_str(), "Fire");
        assert_eq!(def.value, 3);
        assert!(def.top.abilities.is_empty());
        assert!(!def.has_trigger(TriggerMoment::OnPlay));
    }

    #[test]
    #[should_panic(expected = "card values range 0-6")]
    fn test_value_range() {
        let _ = CardDefinition::vanilla("Fire", 7);
    }

    #[test]
    fn test_triggered_at() {
        let def = CardDefinition::vanilla("Fire", 2).with_top(RuleBox::triggered(
            "Draw 1.",
            TriggerMoment::OnPlay,
            EffectDef::draw(1),
        ));

        let on_play: Vec<_> = def.triggered_at(TriggerMoment::OnPlay).collect();
        assert_eq!(on_play.len(), 1);
        assert_eq!(on_play[0].0, BoxKind::Top);
        assert!(def.triggered_at(TriggerMoment::EndPhase).next().is_none());
    }

    #[test]
    fn test_passive_rules() {
        let def = CardDefinition::vanilla("Ice", 1).with_middle(RuleBox::passive(
            "Face-down cards in this line count as 4.",
            PassiveRule::FaceDownValue {
                value: 4,
                scope: PassiveScope::ThisLane,
            },
        ));

        assert_eq!(def.passive_rules().count(), 1);
    }

    #[test]
    fn test_serialization() {
        let def = CardDefinition::vanilla("Fire", 2).with_bottom(RuleBox::triggered(
            "End: Draw 1.",
            TriggerMoment::EndPhase,
            EffectDef::draw(1),
        ));

        let json = serde_json::to_string(&def).unwrap();
        let deserialized: CardDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(def, deserialized);
    }
}

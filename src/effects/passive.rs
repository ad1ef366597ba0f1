//! Passive rules and the board scan that activates them.
//!
//! Passive rules live in card rule boxes and apply continuously while
//! their card is face-up on the board. `ActivePassives::scan` is a pure
//! query over the whole state, recomputed on demand; there is no
//! cached rule set to invalidate.
//!
//! The scan feeds two consumers that must agree: the targeting
//! evaluator (value-based filters) and the lane value calculator.

use serde::{Deserialize, Serialize};

use crate::cards::{CardCatalog, CardInstanceId, PlayedCard};
use crate::core::{GameState, PlayerId};

/// Default effective value of a face-down card.
pub const FACE_DOWN_VALUE: i64 = 2;

/// How far a passive rule reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassiveScope {
    /// The source card's own line.
    ThisLane,
    /// The whole board.
    Global,
}

/// Whose lane total a value modifier applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueTarget {
    /// The source card owner's total.
    OwnTotal,
    /// The opponent's total in the same line.
    OpponentTotal,
}

/// What an `AddPerCount` modifier counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountUnit {
    /// Face-down cards in the affected lane.
    FaceDownCardsInLane,
    /// Face-up cards in the affected lane.
    FaceUpCardsInLane,
    /// All cards in the affected lane.
    CardsInLane,
    /// Cards in the source owner's hand.
    CardsInHand,
}

/// A continuously-applied rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassiveRule {
    /// Face-down cards of the source owner count as `value` instead of
    /// the default 2.
    FaceDownValue { value: i64, scope: PassiveScope },

    /// Add `per` for each counted unit to a lane total.
    AddPerCount {
        unit: CountUnit,
        per: i64,
        target: ValueTarget,
        scope: PassiveScope,
    },

    /// Flat bonus (or penalty) to a lane total.
    AddToTotal {
        amount: i64,
        target: ValueTarget,
        scope: PassiveScope,
    },

    /// Cards cannot be flipped face-up anywhere.
    BlockFaceUpFlips,

    /// Protocols cannot be rearranged.
    BlockRearrange,
}

/// One active rule with its source location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePassive {
    pub rule: PassiveRule,
    /// Whose board the source card sits on.
    pub owner: PlayerId,
    /// Line index of the source card.
    pub lane: usize,
    pub source: CardInstanceId,
}

/// The set of passive rules active at a point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePassives {
    entries: Vec<ActivePassive>,
}

impl ActivePassives {
    /// Scan the board for active passive rules.
    ///
    /// Passive abilities apply only while their card is face-up;
    /// face-down cards have no text.
    #[must_use]
    pub fn scan(state: &GameState, catalog: &CardCatalog) -> Self {
        let mut entries = Vec::new();

        for side in PlayerId::both() {
            for (lane, stack) in state.players[side].lanes.iter().enumerate() {
                for card in &stack.stack {
                    if !card.face_up {
                        continue;
                    }
                    let def = catalog.get(card.card);
                    for rule in def.passive_rules() {
                        entries.push(ActivePassive {
                            rule: *rule,
                            owner: side,
                            lane,
                            source: card.instance,
                        });
                    }
                }
            }
        }

        Self { entries }
    }

    /// Iterate active rules.
    pub fn iter(&self) -> impl Iterator<Item = &ActivePassive> {
        self.entries.iter()
    }

    /// Check whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Effective value of a face-down card owned by `owner` in `lane`.
    ///
    /// Default 2; a `FaceDownValue` override from the same owner whose
    /// scope reaches the lane replaces it. With several overrides the
    /// highest wins.
    #[must_use]
    pub fn face_down_value(&self, owner: PlayerId, lane: usize) -> i64 {
        self.entries
            .iter()
            .filter_map(|active| match active.rule {
                PassiveRule::FaceDownValue { value, scope } => {
                    let reaches = active.owner == owner
                        && match scope {
                            PassiveScope::ThisLane => active.lane == lane,
                            PassiveScope::Global => true,
                        };
                    reaches.then_some(value)
                }
                _ => None,
            })
            .max()
            .unwrap_or(FACE_DOWN_VALUE)
    }

    /// Effective value of a board card: intrinsic when face-up,
    /// the (possibly overridden) face-down value otherwise.
    #[must_use]
    pub fn effective_value(
        &self,
        card: &PlayedCard,
        owner: PlayerId,
        lane: usize,
        catalog: &CardCatalog,
    ) -> i64 {
        if card.face_up {
            i64::from(catalog.get(card.card).value)
        } else {
            self.face_down_value(owner, lane)
        }
    }

    /// Whether any active rule forbids flipping cards face-up.
    #[must_use]
    pub fn face_up_flips_blocked(&self) -> bool {
        self.entries
            .iter()
            .any(|a| matches!(a.rule, PassiveRule::BlockFaceUpFlips))
    }

    /// Whether any active rule forbids rearranging protocols.
    #[must_use]
    pub fn rearrange_blocked(&self) -> bool {
        self.entries
            .iter()
            .any(|a| matches!(a.rule, PassiveRule::BlockRearrange))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(rule: PassiveRule, owner: PlayerId, lane: usize) -> ActivePassive {
        ActivePassive {
            rule,
            owner,
            lane,
            source: CardInstanceId(1),
        }
    }

    #[test]
    fn test_face_down_default() {
        let passives = ActivePassives::default();
        assert_eq!(passives.face_down_value(PlayerId::ONE, 0), FACE_DOWN_VALUE);
    }

    #[test]
    fn test_face_down_override_this_lane() {
        let passives = ActivePassives {
            entries: vec![active(
                PassiveRule::FaceDownValue {
                    value: 4,
                    scope: PassiveScope::ThisLane,
                },
                PlayerId::ONE,
                1,
            )],
        };

        assert_eq!(passives.face_down_value(PlayerId::ONE, 1), 4);
        // Other lanes and the other player keep the default.
        assert_eq!(passives.face_down_value(PlayerId::ONE, 0), FACE_DOWN_VALUE);
        assert_eq!(passives.face_down_value(PlayerId::TWO, 1), FACE_DOWN_VALUE);
    }

    #[test]
    fn test_face_down_highest_override_wins() {
        let passives = ActivePassives {
            entries: vec![
                active(
                    PassiveRule::FaceDownValue {
                        value: 3,
                        scope: PassiveScope::Global,
                    },
                    PlayerId::ONE,
                    0,
                ),
                active(
                    PassiveRule::FaceDownValue {
                        value: 4,
                        scope: PassiveScope::ThisLane,
                    },
                    PlayerId::ONE,
                    2,
                ),
            ],
        };

        assert_eq!(passives.face_down_value(PlayerId::ONE, 2), 4);
        assert_eq!(passives.face_down_value(PlayerId::ONE, 0), 3);
    }

    #[test]
    fn test_blocking_queries() {
        let passives = ActivePassives {
            entries: vec![active(PassiveRule::BlockFaceUpFlips, PlayerId::TWO, 0)],
        };
        assert!(passives.face_up_flips_blocked());
        assert!(!passives.rearrange_blocked());
    }
}

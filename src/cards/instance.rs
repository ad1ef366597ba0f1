//! Card instances - cards with runtime identity.
//!
//! A `PlayedCard` is a card template brought into play: it has a
//! match-unique `CardInstanceId`, a face orientation, and an optional
//! revealed marker. Identity is assigned when a card enters play (drawn
//! into hand or placed on the board) and destroyed when it leaves
//! (deleted, discarded, or returned). Piles outside play hold bare
//! `CardId`s, and a card re-entering play gets a fresh id.

use serde::{Deserialize, Serialize};

use super::definition::CardId;

/// Match-unique identity of a card in play.
///
/// Allocated from a monotone counter in the game state; an id is never
/// reused within a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardInstanceId(pub u32);

impl CardInstanceId {
    /// Create an instance ID.
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

impl std::fmt::Display for CardInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card#{}", self.0)
    }
}

/// A card in play (hand or board).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedCard {
    /// Runtime identity.
    pub instance: CardInstanceId,

    /// The template this card instantiates.
    pub card: CardId,

    /// Face orientation on the board. Hand cards are always face-up to
    /// their holder; the flag matters once placed.
    pub face_up: bool,

    /// Visible to both players despite being face-down.
    pub revealed: bool,
}

impl PlayedCard {
    /// Create an instance.
    #[must_use]
    pub fn new(instance: CardInstanceId, card: CardId, face_up: bool) -> Self {
        Self {
            instance,
            card,
            face_up,
            revealed: false,
        }
    }

    /// Flip to the opposite orientation. Flipping face-up clears the
    /// revealed marker (the whole card is now public).
    pub fn flip(&mut self) {
        self.face_up = !self.face_up;
        if self.face_up {
            self.revealed = false;
        }
    }
}

//! The game engine: executors, resolver, phase machine, lane values,
//! and match setup.
//!
//! `GameEngine` pairs the immutable card catalog with the pure step
//! functions. The public surface is small: create an initial state,
//! observe `GameState::pending`, and feed decisions through
//! [`GameEngine::resolve`].

pub mod error;
pub mod executor;
pub mod lane_value;
pub mod pending;
pub mod phases;
pub mod resolver;
pub mod setup;

use crate::cards::CardCatalog;

pub use error::DecisionError;
pub use lane_value::recalculate_lane_values;
pub use pending::{
    Decision, LaneGroup, LaneList, PendingAction, PendingKind, PlayableCard, Selection,
    SelectionCount,
};
pub use phases::COMPILE_THRESHOLD;
pub use setup::{MatchSetup, OPENING_HAND};

/// The engine: a card catalog plus the rules.
///
/// Stateless beyond the catalog; every operation takes a `GameState`
/// and produces a new one.
#[derive(Clone, Debug)]
pub struct GameEngine {
    catalog: CardCatalog,
}

impl GameEngine {
    /// Create an engine over a catalog.
    #[must_use]
    pub fn new(catalog: CardCatalog) -> Self {
        Self { catalog }
    }

    /// The card catalog.
    #[must_use]
    pub fn catalog(&self) -> &CardCatalog {
        &self.catalog
    }
}

//! Decision rejection errors.
//!
//! The resolver boundary is the engine's only fallible public surface.
//! A rejected decision leaves the state untouched; the caller must
//! resubmit. Every other game-rule condition (no valid targets, short
//! hand, stale reference, duplicate trigger) is absorbed into state and
//! log, never raised as an error.

use crate::cards::CardInstanceId;
use crate::core::PlayerId;

/// Why a decision was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecisionError {
    /// No decision is currently required.
    NoPendingAction,

    /// The decision's shape does not match the pending action's kind.
    WrongKind,

    /// The pending action belongs to the other player.
    WrongActor { expected: PlayerId },

    /// A selected card is not among the stored candidates.
    NotACandidate(CardInstanceId),

    /// The selection size violates the stored count.
    WrongCount { got: usize },

    /// The selected lane is not among the stored valid lanes.
    LaneNotAllowed(usize),

    /// The play is not legal for that card, lane, and orientation.
    IllegalPlay,

    /// The protocol ordering is not a permutation of the target's
    /// protocols, or places a forbidden protocol.
    InvalidRearrangement,

    /// The chosen phase effect is not among the stored choices.
    UnknownPhaseEffect,
}

impl std::fmt::Display for DecisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionError::NoPendingAction => write!(f, "no pending action to resolve"),
            DecisionError::WrongKind => write!(f, "decision does not match the pending action"),
            DecisionError::WrongActor { expected } => {
                write!(f, "pending action belongs to {expected}")
            }
            DecisionError::NotACandidate(card) => {
                write!(f, "{card} is not a valid target")
            }
            DecisionError::WrongCount { got } => {
                write!(f, "selection of {got} cards violates the required count")
            }
            DecisionError::LaneNotAllowed(lane) => write!(f, "lane {lane} is not selectable"),
            DecisionError::IllegalPlay => write!(f, "that card cannot be played there"),
            DecisionError::InvalidRearrangement => write!(f, "invalid protocol rearrangement"),
            DecisionError::UnknownPhaseEffect => {
                write!(f, "that phase effect is not among the choices")
            }
        }
    }
}

impl std::error::Error for DecisionError {}

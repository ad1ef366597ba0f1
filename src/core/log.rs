//! The match log.
//!
//! An append-only, ordered list of entries describing everything that
//! happened in a match. The log is part of the game state value itself
//! (not a side channel), so replaying a snapshot reproduces it exactly.
//!
//! Entries carry an indent level so drivers can group nested
//! chained-effect entries under their root trigger, and an optional
//! phase tag naming which trigger moment produced the entry.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use crate::cards::CardInstanceId;

/// Which part of the turn produced a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogPhase {
    /// Start-phase trigger.
    Start,
    /// Mid-turn (on-play, chained) effect.
    Middle,
    /// End-phase trigger.
    End,
    /// Uncover trigger.
    Uncover,
    /// Compile check or compilation.
    Compile,
}

/// A single log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The player the entry is about.
    pub player: PlayerId,

    /// Human-readable message.
    pub message: String,

    /// Nesting depth; chained-effect entries sit under their root trigger.
    pub indent: u8,

    /// Trigger moment that produced the entry, if any.
    pub phase: Option<LogPhase>,

    /// The card whose effect produced the entry, if any.
    pub source: Option<CardInstanceId>,
}

/// Append-only match log.
///
/// Backed by `im::Vector` so cloning the whole game state stays O(1).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    entries: Vector<LogEntry>,
}

impl GameLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
    }

    /// Append a bare message at indent 0 with no phase tag.
    pub fn note(&mut self, player: PlayerId, message: impl Into<String>) {
        self.push(LogEntry {
            player,
            message: message.into(),
            indent: 0,
            phase: None,
            source: None,
        });
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Get the last entry.
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }
}

//! Per-player play statistics.
//!
//! Counters maintained by the effect executors, consumed by the external
//! statistics display. They never influence rules.

use serde::{Deserialize, Serialize};

/// Play counters for one player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Cards played to a lane.
    pub cards_played: u32,
    /// Cards discarded from hand.
    pub cards_discarded: u32,
    /// Cards deleted from the board.
    pub cards_deleted: u32,
    /// Cards flipped (either direction).
    pub cards_flipped: u32,
    /// Cards shifted between lanes.
    pub cards_shifted: u32,
    /// Cards drawn from deck.
    pub cards_drawn: u32,
    /// Hand refreshes taken.
    pub hands_refreshed: u32,
}

impl PlayerStats {
    /// Create zeroed stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero() {
        let stats = PlayerStats::new();
        assert_eq!(stats.cards_played, 0);
        assert_eq!(stats.hands_refreshed, 0);
    }

    #[test]
    fn test_serialization() {
        let stats = PlayerStats {
            cards_played: 3,
            cards_drawn: 8,
            ..PlayerStats::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        let deserialized: PlayerStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, deserialized);
    }
}

//! Core state types: players, RNG, log, statistics, and the match
//! snapshot itself.

pub mod log;
pub mod player;
pub mod rng;
pub mod state;
pub mod stats;

pub use log::{GameLog, LogEntry, LogPhase};
pub use player::{PlayerId, PlayerPair};
pub use rng::{GameRng, GameRngState};
pub use state::{
    AnimationHint, BoardPosition, GameState, InterruptedTurn, Lane, LastTarget, Phase,
    PhaseEffectKey, PlayerState, QueuedEffect, HAND_LIMIT, LANE_COUNT,
};
pub use stats::PlayerStats;

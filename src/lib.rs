//! # protocol-duel
//!
//! Deterministic effect-resolution engine for a two-player protocol
//! card game. Cards carry data-driven rule text that triggers
//! cascading, interruptible effects: deletes, discards, flips, shifts,
//! returns, draws, reveals, and protocol rearrangements.
//!
//! ## Design Principles
//!
//! 1. **Pure state transitions**: the engine is a function
//!    `(state, decision) -> state`. Every operation produces a new
//!    `GameState` snapshot; persistent collections keep that cheap.
//!
//! 2. **Suspension as data**: when an effect needs a choice, the
//!    engine records a single pending action in the state and returns.
//!    All resumption context (chains, queued effects, cross-effect
//!    references) is serialized into the state, so a match restarts
//!    from any snapshot.
//!
//! 3. **One targeting path**: every effect family computes its legal
//!    targets through the same filter evaluator, and the same
//!    passive-rule scan feeds both targeting and lane values.
//!
//! 4. **Determinism**: all randomness flows through one seeded RNG
//!    carried in the state.
//!
//! ## Modules
//!
//! - `core`: players, RNG, log, statistics, the `GameState` model
//! - `cards`: card templates, runtime instances, the catalog
//! - `effects`: effect definitions, targeting, passives, chains
//! - `engine`: executors, resolver, phase machine, lane values, setup
//!
//! ## Driving a match
//!
//! ```
//! use protocol_duel::cards::{CardCatalog, Protocol};
//! use protocol_duel::engine::{Decision, GameEngine, MatchSetup};
//!
//! let engine = GameEngine::new(CardCatalog::demo());
//! let setup = MatchSetup::new(
//!     [Protocol::new("Hearth"), Protocol::new("Decay"), Protocol::new("Veil")],
//!     [Protocol::new("Current"), Protocol::new("Signal"), Protocol::new("Bulwark")],
//! )
//! .with_seed(42);
//!
//! let state = engine.create_initial_state(&setup);
//! assert!(state.pending.is_some());
//!
//! // A driver reads state.pending and answers with a Decision:
//! let next = engine.resolve(&state, Decision::Refresh);
//! // Full hands cannot refresh, so this particular answer is rejected
//! // and the state is unchanged.
//! assert!(next.is_err());
//! ```

pub mod cards;
pub mod core;
pub mod effects;
pub mod engine;

// Re-export commonly used types
pub use crate::cards::{
    CardCatalog, CardDefinition, CardId, CardInstanceId, PlayedCard, Protocol, TriggerMoment,
};

pub use crate::core::{
    AnimationHint, GameLog, GameRng, GameRngState, GameState, Lane, LogEntry, LogPhase, Phase,
    PlayerId, PlayerPair, PlayerState, PlayerStats, HAND_LIMIT, LANE_COUNT,
};

pub use crate::effects::{
    ActivePassives, EffectAction, EffectContext, EffectDef, EffectTarget, FollowUp, FollowUpKind,
    PassiveRule, TargetFilter, TargetScope, ValueCalc,
};

pub use crate::engine::{
    Decision, DecisionError, GameEngine, MatchSetup, PendingAction, PendingKind,
    COMPILE_THRESHOLD, OPENING_HAND,
};

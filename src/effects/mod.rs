//! The effect system: declarative definitions, targeting, passive
//! rules, chain helpers, and the execution context.
//!
//! Effects are data (`EffectDef`); the executors in [`crate::engine`]
//! interpret them against a game state.

pub mod chain;
pub mod context;
pub mod def;
pub mod filter;
pub mod passive;

pub use chain::{flatten_effect_chain, process_conditional};
pub use context::EffectContext;
pub use def::{
    DeleteParams, DiscardCount, DiscardParams, DrawParams, EffectAction, EffectActor, EffectDef,
    EffectTarget, FlipDirection, FlipParams, FollowUp, FollowUpKind, RearrangeParams,
    ReturnDestination, ReturnParams, RevealParams, RevealSource, SelectCount, ShiftParams,
};
pub use filter::{
    find_targets, find_targets_with, FaceFilter, OwnerFilter, PositionFilter, TargetFilter,
    TargetRef, TargetScope, ValueCalc,
};
pub use passive::{
    ActivePassive, ActivePassives, CountUnit, PassiveRule, PassiveScope, ValueTarget,
    FACE_DOWN_VALUE,
};

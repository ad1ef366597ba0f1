//! Card templates, runtime instances, and the catalog.

pub mod catalog;
pub mod definition;
pub mod instance;

pub use catalog::CardCatalog;
pub use definition::{
    Ability, BoxKind, CardDefinition, CardId, Keywords, Protocol, RuleBox, TriggerMoment,
};
pub use instance::{CardInstanceId, PlayedCard};

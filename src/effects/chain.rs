//! Conditional chain helpers.
//!
//! An effect's `follow_up` pointer forms a chain: "discard 1, if you
//! do delete 1, then draw 1". These helpers answer the two questions
//! the resolver asks about a chain: which follow-up (if any) runs next
//! given the predecessor's outcome, and what the full flattened
//! sequence looks like (for diagnostics and tests).
//!
//! The queued-effect FIFO and the single-slot previous-target reference
//! live in `GameState`; they are state, not chain structure.

use super::def::{EffectDef, FollowUp, FollowUpKind};

/// Decide whether a follow-up fires given its predecessor's outcome.
///
/// `IfExecuted` follow-ups fire only when the predecessor executed
/// against at least one target; `Then` follow-ups fire regardless.
#[must_use]
pub fn process_conditional(follow_up: &FollowUp, was_executed: bool) -> Option<&EffectDef> {
    match follow_up.kind {
        FollowUpKind::IfExecuted if !was_executed => None,
        _ => Some(&follow_up.effect),
    }
}

/// Walk a chain's nested follow-up pointers into a flat sequence,
/// root first.
#[must_use]
pub fn flatten_effect_chain(effect: &EffectDef) -> Vec<&EffectDef> {
    let mut out = Vec::new();
    let mut current = Some(effect);
    while let Some(e) = current {
        out.push(e);
        current = e.follow_up.as_deref().map(|f| &f.effect);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::def::DiscardCount;

    #[test]
    fn test_if_executed_gating() {
        let follow = FollowUp {
            kind: FollowUpKind::IfExecuted,
            effect: EffectDef::draw(1),
        };

        assert!(process_conditional(&follow, true).is_some());
        assert!(process_conditional(&follow, false).is_none());
    }

    #[test]
    fn test_then_always_fires() {
        let follow = FollowUp {
            kind: FollowUpKind::Then,
            effect: EffectDef::draw(1),
        };

        assert!(process_conditional(&follow, true).is_some());
        assert!(process_conditional(&follow, false).is_some());
    }

    #[test]
    fn test_flatten_chain() {
        let chain = EffectDef::discard(DiscardCount::Exactly(1))
            .if_executed(EffectDef::draw(2).then(EffectDef::refresh()));

        let flat = flatten_effect_chain(&chain);
        assert_eq!(flat.len(), 3);
        assert!(matches!(
            flat[0].action,
            crate::effects::EffectAction::Discard(_)
        ));
        assert!(matches!(flat[1].action, crate::effects::EffectAction::Draw(_)));
        assert!(matches!(flat[2].action, crate::effects::EffectAction::Refresh));
    }

    #[test]
    fn test_flatten_single() {
        let effect = EffectDef::draw(1);
        assert_eq!(flatten_effect_chain(&effect).len(), 1);
    }
}

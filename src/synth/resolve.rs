//! Ordered, named resolver strategies.
//!
//! Naming conventions in real rule corpora are ambiguous, so several
//! lookups (probability variable, initial mode, sampling interval, clock
//! probability) are a list of strategies tried in order where the first
//! success wins. New heuristics are appended to a list; control flow never
//! changes.

use std::fmt;

use crate::model::{Assignment, Corpus, Guard, GuardValue, Rule, prism_var};

/// One named lookup over a context `C`.
pub struct Strategy<C: ?Sized, T> {
    pub name: &'static str,
    pub run: fn(&C) -> Option<T>,
}

/// Run `strategies` in order and return the first hit with its strategy name.
pub fn first_match<C: ?Sized, T: fmt::Debug>(
    what: &str,
    strategies: &[Strategy<C, T>],
    ctx: &C,
) -> Option<(&'static str, T)> {
    for s in strategies {
        if let Some(found) = (s.run)(ctx) {
            tracing::debug!(what, strategy = s.name, value = ?found, "resolved");
            return Some((s.name, found));
        }
    }
    tracing::debug!(what, tried = strategies.len(), "unresolved");
    None
}

// ---------------------------------------------------------------------------
// Probability variable of a propose/apply pair
// ---------------------------------------------------------------------------

/// What to do with a pair whose probability variable cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedPolicy {
    /// Drop the pair with a diagnostic.
    #[default]
    Skip,
    /// Keep the pair with weight `1.0`.
    Certain,
}

/// Inputs for probability-variable resolution.
pub struct PairContext<'a> {
    pub corpus: &'a Corpus,
    pub propose: &'a Rule,
    pub apply: &'a Rule,
}

/// Probability-variable strategies, in priority order.
pub fn probability_resolvers<'a>() -> [Strategy<PairContext<'a>, String>; 3] {
    [
        Strategy {
            name: "propose-log-alias",
            run: log_alias,
        },
        Strategy {
            name: "apply-assignment-key",
            run: apply_assignment_key,
        },
        Strategy {
            name: "initializer-constant",
            run: initializer_constant,
        },
    ]
}

/// Resolve the probability variable for a pair.
pub fn resolve_probability(ctx: &PairContext<'_>) -> Option<String> {
    first_match("probability variable", &probability_resolvers(), ctx).map(|(_, v)| v)
}

fn is_prob_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    lower.contains("prob") && !lower.contains("log")
}

/// An identifier in the propose rule bound to (or compared with) a path
/// through a `log` structure names the probability, minus the `_log` part.
fn log_alias(ctx: &PairContext<'_>) -> Option<String> {
    let from_bindings = ctx.propose.bindings.values().map(String::as_str);
    let from_guards = ctx.propose.guards.iter().filter_map(|g| match g {
        Guard::Compare {
            value: GuardValue::Variable(other),
            ..
        } => Some(other.as_str()),
        _ => None,
    });
    from_bindings
        .chain(from_guards)
        .find(|q| q.contains("_log"))
        .map(|q| prism_var(&q.replace("_log", "")))
}

fn apply_assignment_key(ctx: &PairContext<'_>) -> Option<String> {
    let keys = || ctx.apply.assignments.keys();
    keys()
        .find(|k| is_prob_key(k))
        .or_else(|| keys().find(|k| k.to_lowercase().contains("log")))
        .map(|k| prism_var(k))
}

fn initializer_constant(ctx: &PairContext<'_>) -> Option<String> {
    ctx.corpus
        .initializer()?
        .assignments
        .iter()
        .find(|(k, a)| is_prob_key(k) && !matches!(a, Assignment::Nil))
        .map(|(k, _)| prism_var(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CorpusBuilder;

    fn pair(propose: Rule, apply: Rule, init: Option<Rule>) -> (Corpus, Rule, Rule) {
        let mut b = CorpusBuilder::new();
        if let Some(init) = init {
            b.push_rule(init);
        }
        b.push_rule(propose.clone());
        b.push_rule(apply.clone());
        (b.freeze(), propose, apply)
    }

    #[test]
    fn log_alias_wins_first() {
        let mut propose = Rule::new("propose*go");
        propose
            .bindings
            .insert("p".into(), "state_low_to_med_log".into());
        let mut apply = Rule::new("apply*go");
        apply
            .assignments
            .insert("state_other_prob".into(), Assignment::Literal("0.2".into()));
        let (corpus, propose, apply) = pair(propose, apply, None);
        let ctx = PairContext {
            corpus: &corpus,
            propose: &propose,
            apply: &apply,
        };
        assert_eq!(resolve_probability(&ctx).as_deref(), Some("state_low_to_med"));
    }

    #[test]
    fn apply_key_prefers_prob_over_log() {
        let propose = Rule::new("propose*go");
        let mut apply = Rule::new("apply*go");
        apply
            .assignments
            .insert("state_log_entry".into(), Assignment::Literal("x".into()));
        apply
            .assignments
            .insert("state_low_to_med_prob".into(), Assignment::Literal("0.2".into()));
        let (corpus, propose, apply) = pair(propose, apply, None);
        let ctx = PairContext {
            corpus: &corpus,
            propose: &propose,
            apply: &apply,
        };
        assert_eq!(
            resolve_probability(&ctx).as_deref(),
            Some("state_low_to_med_prob")
        );
    }

    #[test]
    fn falls_back_to_initializer_then_nothing() {
        let mut init = Rule::new("apply*initialize");
        init.assignments
            .insert("state_p_prob".into(), Assignment::Literal("0.4".into()));
        let (corpus, propose, apply) =
            pair(Rule::new("propose*go"), Rule::new("apply*go"), Some(init));
        let ctx = PairContext {
            corpus: &corpus,
            propose: &propose,
            apply: &apply,
        };
        assert_eq!(resolve_probability(&ctx).as_deref(), Some("state_p_prob"));

        let (corpus, propose, apply) = pair(Rule::new("propose*go"), Rule::new("apply*go"), None);
        let ctx = PairContext {
            corpus: &corpus,
            propose: &propose,
            apply: &apply,
        };
        assert_eq!(resolve_probability(&ctx), None);
    }

    #[test]
    fn first_match_reports_strategy() {
        let strategies: &[Strategy<i64, i64>] = &[
            Strategy {
                name: "negative",
                run: |x| (*x < 0).then_some(-1),
            },
            Strategy {
                name: "double",
                run: |x| Some(x * 2),
            },
        ];
        assert_eq!(first_match("n", strategies, &4), Some(("double", 8)));
        assert_eq!(first_match("n", strategies, &-4), Some(("negative", -1)));
    }
}

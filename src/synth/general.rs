//! General Synthesizer: propose/apply pairs merged into one `user` module.
//!
//! Every `propose*X` is paired with `apply*X`. The pair contributes one
//! weighted outcome under the propose rule's guard; outcomes with identical
//! guard text share a single command. Later commands exclude the states an
//! earlier, overlapping guard already covers, so at most one command is
//! enabled anywhere. A fallback no-op command covers every state no merged
//! guard enables.
//!
//! Proposals guarded on `^superstate` only fire once, on the top state, to
//! seed working memory. Their values are already the variables' initial
//! values, so they contribute no command.

use indexmap::{IndexMap, IndexSet};

use crate::error::Diagnostic;
use crate::infer::{Declaration, TypedCorpus};
use crate::model::{Assignment, CompareOp, Guard, GuardValue, Rule, normalize, prism_var};
use crate::prism::{Branch, Command, ConstDecl, Expr, Model, Module, Update, VarDecl};

use super::resolve::{PairContext, UnresolvedPolicy, resolve_probability};

pub const MODULE_NAME: &str = "user";

/// Translate one guard. Existence tests describe working-memory structure,
/// not model state, so they produce nothing.
pub fn guard_expr(guard: &Guard) -> Option<Expr> {
    if guard.is_existence() {
        return None;
    }
    Some(match guard {
        Guard::Compare { var, op, value } => {
            let rhs = match value {
                GuardValue::Literal(v) => Expr::lit(v),
                GuardValue::Variable(v) => Expr::var(v),
            };
            Expr::cmp(Expr::var(var), *op, rhs)
        }
        Guard::OneOf {
            var,
            values,
            negated,
        } => {
            let any = Expr::or(values.iter().map(|v| Expr::eq(Expr::var(var), Expr::lit(v))));
            if *negated { Expr::not(any) } else { any }
        }
    })
}

/// Conjunction of a rule's guards; an elaboration also requires that its
/// own effect does not already hold.
pub fn rule_guard(rule: &Rule) -> Expr {
    let mut parts: Vec<Expr> = rule.guards.iter().filter_map(guard_expr).collect();
    if rule.is_elaboration {
        for (var, assignment) in &rule.assignments {
            if let Assignment::Literal(v) = assignment {
                parts.push(Expr::ne(Expr::var(var), Expr::lit(v)));
            }
        }
    }
    Expr::and(parts)
}

/// Next-state updates for an apply rule. Operator and name keys are
/// bookkeeping, retractions have no model counterpart, and names in `fixed`
/// are constants that cannot be assigned.
pub fn rule_updates(rule: &Rule, fixed: &IndexSet<String>) -> Vec<Update> {
    rule.assignments
        .iter()
        .filter(|(key, _)| !key.contains("operator") && !key.contains("name"))
        .filter(|(key, _)| !fixed.contains(&prism_var(key)))
        .filter_map(|(key, assignment)| {
            let value = match assignment {
                Assignment::Literal(v) => Expr::lit(v),
                Assignment::Ref(other) => Expr::var(other),
                Assignment::Increment(source) => Expr::add(Expr::var(source), Expr::int(1)),
                Assignment::Nil => return None,
            };
            Some(Update::new(prism_var(key), value))
        })
        .collect()
}

/// `var = literal` conjuncts of a guard.
fn pinned(guard: &Expr) -> Vec<(&str, &str)> {
    let parts = match guard {
        Expr::And(parts) => parts.as_slice(),
        other => std::slice::from_ref(other),
    };
    parts
        .iter()
        .filter_map(|p| match p {
            Expr::Cmp(lhs, CompareOp::Eq, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Var(v), Expr::Lit(x)) => Some((v.as_str(), x.as_str())),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn same_literal(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

/// True when both guards pin one variable to different literals, so no
/// state satisfies both.
fn exclusive(a: &Expr, b: &Expr) -> bool {
    let other = pinned(b);
    pinned(a)
        .iter()
        .any(|(v, x)| other.iter().any(|(w, y)| v == w && !same_literal(x, y)))
}

/// Build the non-temporal model.
pub fn synthesize(typed: &TypedCorpus, policy: UnresolvedPolicy) -> (Model, Vec<Diagnostic>) {
    let corpus = typed.corpus();
    let mut diagnostics = Vec::new();
    let mut model = Model::new("dtmc");
    let mut module = Module::new(MODULE_NAME);
    let mut constants: IndexSet<String> = IndexSet::new();

    for decl in typed.declarations() {
        if !matches!(decl, Declaration::Range { .. }) {
            constants.insert(normalize(decl.name()));
        }
        match decl {
            Declaration::Range {
                name,
                min,
                max,
                init,
            } => module.vars.push(VarDecl::new(
                name,
                Expr::int(min),
                Expr::int(max),
                Expr::int(init),
            )),
            Declaration::IntConst { name, value } => {
                model.constants.push(ConstDecl::int(name, value))
            }
            Declaration::FloatConst { name, value } => {
                model.constants.push(ConstDecl::double(name, Expr::lit(value)))
            }
        }
    }

    // guard text -> (guard, outcomes)
    let mut merged: IndexMap<String, (Expr, Vec<Branch>)> = IndexMap::new();
    let mut pairs = 0usize;
    for propose in corpus.rules() {
        let Some(operator) = propose.proposed_operator() else {
            continue;
        };
        if propose.guards_on("state_superstate").next().is_some() {
            tracing::debug!(rule = %propose.name, "top-state proposal contributes initial values only");
            continue;
        }
        let Some(apply) = corpus.rule(&format!("apply*{operator}")) else {
            let d = Diagnostic::UnpairedPropose {
                rule: propose.name.clone(),
            };
            d.emit();
            diagnostics.push(d);
            continue;
        };

        let ctx = PairContext {
            corpus,
            propose,
            apply,
        };
        let mut fixed = constants.clone();
        let weight = match (resolve_probability(&ctx), policy) {
            (Some(var), _) => {
                fixed.insert(normalize(&var));
                Expr::var(var)
            }
            (None, UnresolvedPolicy::Certain) => Expr::Lit("1.0".into()),
            (None, UnresolvedPolicy::Skip) => {
                let d = Diagnostic::UnresolvedProbability {
                    rule: propose.name.clone(),
                };
                d.emit();
                diagnostics.push(d);
                continue;
            }
        };

        let guard = rule_guard(propose);
        let branch = Branch::weighted(weight, rule_updates(apply, &fixed));
        merged
            .entry(guard.to_string())
            .or_insert_with(|| (guard, Vec::new()))
            .1
            .push(branch);
        pairs += 1;
    }

    // unnarrowed guards, in command order
    let mut earlier: Vec<Expr> = Vec::new();
    for (guard, branches) in merged.into_values() {
        let overlapping: Vec<Expr> = earlier
            .iter()
            .filter(|e| !exclusive(e, &guard))
            .cloned()
            .collect();
        earlier.push(guard.clone());
        let narrowed = if overlapping.is_empty() {
            guard
        } else {
            tracing::debug!(
                guard = %guard,
                earlier = overlapping.len(),
                "overlapping guard narrowed"
            );
            Expr::and([guard, Expr::not(Expr::or(overlapping))])
        };
        if narrowed == Expr::False {
            continue;
        }
        module.push(Command::new(None, narrowed, branches));
    }
    let fallback = Expr::not(Expr::or(earlier));
    if fallback != Expr::False {
        module.push(Command::idle(None, fallback));
    }

    tracing::info!(
        pairs,
        commands = module.commands.len(),
        variables = module.vars.len(),
        constants = model.constants.len(),
        "general model synthesized"
    );
    model.modules.push(module);
    (model, diagnostics)
}

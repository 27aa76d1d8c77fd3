//! Normalized rules: guard list, assignment map and metadata.

use indexmap::{IndexMap, IndexSet};
use std::fmt;

use super::variable::NIL;

/// Priority recorded for a `>` (best/better) preference.
pub const MAX_PRIORITY: f64 = f64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn negate(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Right-hand side of a comparison guard.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardValue {
    Literal(String),
    /// Another qualified variable (structural equality between paths).
    Variable(String),
}

impl fmt::Display for GuardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardValue::Literal(s) | GuardValue::Variable(s) => f.write_str(s),
        }
    }
}

/// One normalized condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Compare {
        var: String,
        op: CompareOp,
        value: GuardValue,
    },
    /// `var` is (or, when `negated`, is not) one of `values`.
    OneOf {
        var: String,
        values: Vec<String>,
        negated: bool,
    },
}

impl Guard {
    pub fn compare(var: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Guard::Compare {
            var: var.into(),
            op,
            value: GuardValue::Literal(value.into()),
        }
    }

    pub fn var(&self) -> &str {
        match self {
            Guard::Compare { var, .. } | Guard::OneOf { var, .. } => var,
        }
    }

    /// `var != nil` or `var = nil`.
    pub fn is_existence(&self) -> bool {
        matches!(
            self,
            Guard::Compare { op: CompareOp::Eq | CompareOp::Ne, value: GuardValue::Literal(v), .. }
                if v == NIL
        )
    }

    /// Literal values this guard compares against (empty for variable refs).
    pub fn literals(&self) -> Vec<&str> {
        match self {
            Guard::Compare {
                value: GuardValue::Literal(v),
                ..
            } => vec![v.as_str()],
            Guard::Compare { .. } => Vec::new(),
            Guard::OneOf { values, .. } => values.iter().map(String::as_str).collect(),
        }
    }

    /// The literal this guard pins `var` to, when it is a positive equality.
    pub fn equals_literal(&self) -> Option<&str> {
        match self {
            Guard::Compare {
                op: CompareOp::Eq,
                value: GuardValue::Literal(v),
                ..
            } if v != NIL => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Compare { var, op, value } => write!(f, "{var} {op} {value}"),
            Guard::OneOf {
                var,
                values,
                negated,
            } => {
                let alts: Vec<String> = values.iter().map(|v| format!("{var} = {v}")).collect();
                if *negated {
                    write!(f, "!({})", alts.join(" | "))
                } else {
                    write!(f, "({})", alts.join(" | "))
                }
            }
        }
    }
}

/// Value written to a variable by a rule's actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Literal(String),
    /// Copy of another qualified variable.
    Ref(String),
    /// `x' = x + 1` for the named qualified variable.
    Increment(String),
    /// Retraction.
    Nil,
}

impl Assignment {
    pub fn literal(&self) -> Option<&str> {
        match self {
            Assignment::Literal(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignment::Literal(v) | Assignment::Ref(v) => f.write_str(v),
            Assignment::Increment(v) => write!(f, "{v} + 1"),
            Assignment::Nil => f.write_str(NIL),
        }
    }
}

/// One production after normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rule {
    pub name: String,
    pub guards: Vec<Guard>,
    /// Qualified variable to assigned value, in action order.
    pub assignments: IndexMap<String, Assignment>,
    /// Rule-local identifier (without brackets) to qualified name.
    pub bindings: IndexMap<String, String>,
    /// Every attribute name mentioned on either side.
    pub referenced_attrs: IndexSet<String>,
    pub is_elaboration: bool,
    pub is_learning: bool,
    pub priority: f64,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            is_elaboration: name.contains("elaborate"),
            name,
            ..Default::default()
        }
    }

    /// `X` for a rule named `propose*X`.
    pub fn proposed_operator(&self) -> Option<&str> {
        self.name.strip_prefix("propose*")
    }

    /// `X` for a rule named `apply*X`.
    pub fn applied_operator(&self) -> Option<&str> {
        self.name.strip_prefix("apply*")
    }

    pub fn guards_on<'a>(&'a self, var: &'a str) -> impl Iterator<Item = &'a Guard> {
        self.guards.iter().filter(move |g| g.var() == var)
    }

    /// Literal assigned to `var`, if any.
    pub fn assigned_literal(&self, var: &str) -> Option<&str> {
        self.assignments.get(var).and_then(Assignment::literal)
    }

    /// The only guard is the top-level "no enclosing context" test.
    pub fn is_top_state_only(&self) -> bool {
        matches!(self.guards.as_slice(),
            [g] if *g == Guard::compare("state_superstate", CompareOp::Eq, NIL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_display_forms() {
        assert_eq!(Guard::compare("state_a", CompareOp::Ne, NIL).to_string(), "state_a != nil");
        let g = Guard::OneOf {
            var: "state_m".into(),
            values: vec!["1".into(), "2".into()],
            negated: true,
        };
        assert_eq!(g.to_string(), "!(state_m = 1 | state_m = 2)");
    }

    #[test]
    fn existence_guard_detection() {
        assert!(Guard::compare("state_a", CompareOp::Eq, NIL).is_existence());
        assert!(!Guard::compare("state_a", CompareOp::Eq, "1").is_existence());
        assert!(!Guard::compare("state_a", CompareOp::Lt, NIL).is_existence());
    }

    #[test]
    fn elaboration_flag_follows_name() {
        assert!(Rule::new("elaborate*top").is_elaboration);
        assert!(!Rule::new("propose*wait").is_elaboration);
        assert_eq!(Rule::new("propose*wait").proposed_operator(), Some("wait"));
    }

    #[test]
    fn top_state_only_rule() {
        let mut r = Rule::new("elaborate*init");
        r.guards.push(Guard::compare("state_superstate", CompareOp::Eq, NIL));
        assert!(r.is_top_state_only());
        r.guards.push(Guard::compare("state_a", CompareOp::Eq, "1"));
        assert!(!r.is_top_state_only());
    }
}

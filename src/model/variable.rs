//! Working-memory variables discovered across the corpus.

use indexmap::IndexSet;
use std::fmt;

/// Sentinel value for "attribute absent" (existence tests, retractions).
pub const NIL: &str = "nil";

/// Concrete scalar type assigned by type inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    SymbolicConstant,
    Integer,
    Float,
    Unresolved,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VarType::SymbolicConstant => "symbolic",
            VarType::Integer => "int",
            VarType::Float => "double",
            VarType::Unresolved => "unresolved",
        };
        f.write_str(s)
    }
}

/// A qualified working-memory path such as `state_operator_name`, with
/// every literal observed for it anywhere in the corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Observed literals in first-seen order.
    pub values: IndexSet<String>,
    /// Value assigned by a top-state elaboration, if any.
    pub declared_init: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: IndexSet::new(),
            declared_init: None,
        }
    }

    /// Observed literals other than [`NIL`].
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str).filter(|v| *v != NIL)
    }

    /// Distinct integer literals, sorted ascending. Non-integers are ignored.
    pub fn int_values(&self) -> Vec<i64> {
        let mut ints: Vec<i64> = self.literals().filter_map(|v| v.parse().ok()).collect();
        ints.sort_unstable();
        ints.dedup();
        ints
    }
}

/// Replace `-` with `_` so a Soar symbol is a legal model identifier.
pub fn normalize(name: &str) -> String {
    name.replace('-', "_")
}

/// Model variable name for a corpus key: normalized and `state_`-prefixed.
pub fn prism_var(key: &str) -> String {
    let clean = normalize(key);
    if clean.starts_with("state_") {
        clean
    } else {
        format!("state_{clean}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_values_skip_nil_and_symbols() {
        let mut v = Variable::new("state_count");
        for s in ["3", "nil", "1", "x", "2", "1"] {
            v.values.insert(s.to_string());
        }
        assert_eq!(v.int_values(), vec![1, 2, 3]);
        assert_eq!(v.literals().count(), 4);
    }

    #[test]
    fn prism_var_is_idempotent() {
        assert_eq!(prism_var("low-to-med-prob"), "state_low_to_med_prob");
        assert_eq!(prism_var("state_low_to_med_prob"), "state_low_to_med_prob");
    }
}

//! Type Inference Engine.
//!
//! Assigns every variable exactly one [`VarType`]:
//! 1. classify each variable from its own literals,
//! 2. propagate concrete types breadth-first over the [`TypeGraph`] into
//!    unresolved neighbours,
//! 3. default whatever is still unresolved to symbolic.
//!
//! [`infer_types`] is a pure function of the frozen corpus, so running it
//! twice yields the same table.
//!
//! [`TypeGraph`]: crate::model::TypeGraph

use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::model::{Corpus, VarType, Variable};

/// Final type of every variable, in variable-table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeTable {
    types: IndexMap<String, VarType>,
}

impl TypeTable {
    pub fn get(&self, name: &str) -> Option<VarType> {
        self.types.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, VarType)> {
        self.types.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn is_int(s: &str) -> bool {
    s.parse::<i64>().is_ok()
}

fn is_real(s: &str) -> bool {
    // rejects `inf`/`nan`, which f64 parsing accepts
    s.parse::<f64>().is_ok() && s.chars().any(|c| c.is_ascii_digit())
}

/// Classify a variable from its own literals (ignoring `nil`).
pub fn base_type(var: &Variable) -> VarType {
    let literals: Vec<&str> = var.literals().collect();
    if literals.is_empty() {
        return VarType::Unresolved;
    }
    if literals.iter().all(|v| is_int(v)) {
        VarType::Integer
    } else if literals.iter().all(|v| is_real(v)) && literals.iter().any(|v| v.contains('.')) {
        VarType::Float
    } else if literals.iter().all(|v| !is_real(v)) {
        VarType::SymbolicConstant
    } else {
        VarType::Unresolved
    }
}

/// Infer the type of every variable in `corpus`.
pub fn infer_types(corpus: &Corpus) -> TypeTable {
    let mut types: IndexMap<String, VarType> = corpus
        .variables()
        .values()
        .map(|v| (v.name.clone(), base_type(v)))
        .collect();

    let graph = corpus.type_graph();
    let names: Vec<String> = types.keys().cloned().collect();
    let mut propagated = 0usize;

    for seed in &names {
        let seed_type = types[seed.as_str()];
        if seed_type == VarType::Unresolved {
            continue;
        }
        let mut queue = VecDeque::from([seed.clone()]);
        while let Some(current) = queue.pop_front() {
            for neighbor in graph.neighbors(&current) {
                if types.get(neighbor) == Some(&VarType::Unresolved) {
                    types.insert(neighbor.to_string(), seed_type);
                    queue.push_back(neighbor.to_string());
                    propagated += 1;
                }
            }
        }
    }

    let mut defaulted = 0usize;
    for ty in types.values_mut() {
        if *ty == VarType::Unresolved {
            *ty = VarType::SymbolicConstant;
            defaulted += 1;
        }
    }

    tracing::info!(
        variables = types.len(),
        propagated,
        defaulted,
        "types inferred"
    );
    TypeTable { types }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// How a typed variable is declared in the output model.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// Mutable bounded integer state.
    Range {
        name: String,
        min: i64,
        max: i64,
        init: i64,
    },
    IntConst { name: String, value: i64 },
    /// Fixed probability parameter.
    FloatConst { name: String, value: String },
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Range { name, .. }
            | Declaration::IntConst { name, .. }
            | Declaration::FloatConst { name, .. } => name,
        }
    }
}

/// Declaration shape for `var`. Symbolic variables are not declared.
pub fn declaration(var: &Variable, ty: VarType) -> Option<Declaration> {
    let name = crate::model::normalize(&var.name);
    match ty {
        VarType::Integer => {
            let ints = var.int_values();
            match ints.as_slice() {
                [] => None,
                [only] => Some(Declaration::IntConst { name, value: *only }),
                [min, .., max] => {
                    let (min, max) = (*min, *max);
                    let init = var
                        .declared_init
                        .as_deref()
                        .and_then(|v| v.parse::<i64>().ok())
                        .filter(|v| (min..=max).contains(v))
                        .unwrap_or(min);
                    Some(Declaration::Range {
                        name,
                        min,
                        max,
                        init,
                    })
                }
            }
        }
        VarType::Float => var
            .literals()
            .find(|v| is_real(v))
            .map(|v| Declaration::FloatConst {
                name,
                value: v.to_string(),
            }),
        VarType::SymbolicConstant | VarType::Unresolved => None,
    }
}

// ---------------------------------------------------------------------------
// TypedCorpus
// ---------------------------------------------------------------------------

/// A frozen corpus paired with its inferred types.
#[derive(Debug, Clone)]
pub struct TypedCorpus {
    corpus: Corpus,
    types: TypeTable,
}

impl TypedCorpus {
    pub fn new(corpus: Corpus) -> Self {
        let types = infer_types(&corpus);
        Self { corpus, types }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn type_of(&self, name: &str) -> Option<VarType> {
        self.types.get(name)
    }

    /// Declarations for every non-symbolic variable, in table order.
    pub fn declarations(&self) -> Vec<Declaration> {
        self.corpus
            .variables()
            .values()
            .filter_map(|v| declaration(v, self.type_of(&v.name)?))
            .collect()
    }
}

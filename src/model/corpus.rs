//! The corpus: rules, the variable table and the type-equivalence graph.
//!
//! Rule building accumulates into a [`CorpusBuilder`]. Once every rule has
//! been walked the builder is frozen into an immutable [`Corpus`], resolving
//! deferred variable references on the way. Type inference and synthesis
//! only ever see the frozen form.

use indexmap::IndexMap;
use petgraph::graph::{NodeIndex, UnGraph};

use super::rule::Rule;
use super::variable::{NIL, Variable};

// ---------------------------------------------------------------------------
// TypeGraph
// ---------------------------------------------------------------------------

/// Undirected graph over variable names; an edge means "same type".
///
/// petgraph's undirected graph makes every edge symmetric, and
/// `update_edge` keeps parallel edges out.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    graph: UnGraph<String, ()>,
    /// Variable name → NodeIndex for O(1) node lookups.
    node_index: IndexMap<String, NodeIndex>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_index.insert(name.to_string(), idx);
        idx
    }

    /// Record that `a` and `b` must share a type. Self-edges are ignored.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        let ia = self.ensure_node(a);
        let ib = self.ensure_node(b);
        self.graph.update_edge(ia, ib, ());
    }

    pub fn contains_edge(&self, a: &str, b: &str) -> bool {
        match (self.node_index.get(a), self.node_index.get(b)) {
            (Some(&ia), Some(&ib)) => self.graph.find_edge(ia, ib).is_some(),
            _ => false,
        }
    }

    /// Names linked to `name` by an edge.
    pub fn neighbors<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        let idx = self.node_index.get(name).copied();
        idx.into_iter()
            .flat_map(move |i| self.graph.neighbors(i))
            .map(move |n| self.graph[n].as_str())
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Mutable accumulation context threaded through rule building.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    rules: Vec<Rule>,
    variables: IndexMap<String, Variable>,
    graph: TypeGraph,
    /// (variable, referenced variable): values of the second flow into the first.
    references: Vec<(String, String)>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a variable exists, returning it.
    pub fn touch(&mut self, name: &str) -> &mut Variable {
        self.variables
            .entry(name.to_string())
            .or_insert_with(|| Variable::new(name))
    }

    pub fn record_value(&mut self, name: &str, value: impl Into<String>) {
        self.touch(name).values.insert(value.into());
    }

    pub fn add_type_edge(&mut self, a: &str, b: &str) {
        self.touch(a);
        self.touch(b);
        self.graph.add_edge(a, b);
    }

    /// `var` takes its values from `referenced`; also links their types.
    pub fn add_reference(&mut self, var: &str, referenced: &str) {
        self.add_type_edge(var, referenced);
        if var != referenced {
            self.references.push((var.to_string(), referenced.to_string()));
        }
    }

    pub fn set_declared_init(&mut self, name: &str, value: impl Into<String>) {
        self.touch(name).declared_init = Some(value.into());
    }

    /// Add a finished rule. A later rule with the same name replaces the
    /// earlier one, matching how re-sourcing a production behaves.
    pub fn push_rule(&mut self, rule: Rule) {
        if let Some(existing) = self.rules.iter_mut().find(|r| r.name == rule.name) {
            tracing::debug!(rule = %rule.name, "production redefined, replacing earlier definition");
            *existing = rule;
        } else {
            self.rules.push(rule);
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Resolve deferred references and produce the immutable corpus.
    ///
    /// References are merged to a fixpoint, so chains `a ← b ← c` carry
    /// `c`'s literals into `a`. Any variable still without values gets
    /// [`NIL`] so every variable has a non-empty value set.
    pub fn freeze(mut self) -> Corpus {
        let mut changed = true;
        while changed {
            changed = false;
            for (var, referenced) in &self.references {
                let incoming: Vec<String> = match self.variables.get(referenced) {
                    Some(src) => src.values.iter().cloned().collect(),
                    None => continue,
                };
                if let Some(dst) = self.variables.get_mut(var) {
                    for v in incoming {
                        changed |= dst.values.insert(v);
                    }
                }
            }
        }

        for var in self.variables.values_mut() {
            if var.values.is_empty() {
                var.values.insert(NIL.to_string());
            }
        }

        tracing::info!(
            rules = self.rules.len(),
            variables = self.variables.len(),
            type_edges = self.graph.edge_count(),
            "corpus built"
        );

        Corpus {
            rules: self.rules,
            variables: self.variables,
            graph: self.graph,
        }
    }
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

/// Frozen rules + variable table + type graph.
#[derive(Debug, Clone)]
pub struct Corpus {
    rules: Vec<Rule>,
    variables: IndexMap<String, Variable>,
    graph: TypeGraph,
}

impl Corpus {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn variables(&self) -> &IndexMap<String, Variable> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn type_graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// The single `apply*initialize` rule, if present.
    pub fn initializer(&self) -> Option<&Rule> {
        self.rule("apply*initialize")
    }
}

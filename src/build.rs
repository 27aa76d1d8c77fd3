//! Rule Model Builder: production syntax → normalized [`Rule`]s.
//!
//! Each production is processed in two passes. Pass 1 collects every
//! identifier binding (iterated to a fixpoint, since a group may be written
//! before the group that binds its identifier). Pass 2 walks conditions and
//! actions resolving identifiers against those bindings, emitting guards and
//! assignments and updating the shared [`CorpusBuilder`].
//!
//! Nothing here is fatal. An unresolvable group, identifier or value is
//! dropped and reported as a [`Diagnostic`].

use crate::error::Diagnostic;
use crate::model::{
    Assignment, CompareOp, Corpus, CorpusBuilder, Guard, GuardValue, MAX_PRIORITY, NIL, Rule,
    normalize,
};
use crate::syntax::ast::*;

/// Qualified name of the root identifier.
const ROOT: &str = "state";

/// Build every production into a frozen corpus.
pub fn build_corpus(productions: &[Production]) -> (Corpus, Vec<Diagnostic>) {
    let mut builder = CorpusBuilder::new();
    let mut diagnostics = Vec::new();
    for production in productions {
        diagnostics.extend(build_rule(production, &mut builder));
    }
    (builder.freeze(), diagnostics)
}

/// Build one production into `corpus`, returning its diagnostics.
pub fn build_rule(production: &Production, corpus: &mut CorpusBuilder) -> Vec<Diagnostic> {
    let mut state = RuleBuildState {
        rule: Rule::new(production.name.clone()),
        corpus,
        diagnostics: Vec::new(),
    };

    state.collect_bindings(production);
    for condition in &production.conditions {
        state.condition(condition, false);
    }
    for action in &production.actions {
        state.action(action);
    }
    state.finish()
}

/// Everything mutated while one rule is being walked.
struct RuleBuildState<'c> {
    rule: Rule,
    corpus: &'c mut CorpusBuilder,
    diagnostics: Vec<Diagnostic>,
}

fn qualify(parent: &str, path: &[String]) -> String {
    let mut name = parent.to_string();
    for elem in path {
        name.push('_');
        name.push_str(elem.trim_start_matches('<').trim_end_matches('>'));
    }
    normalize(&name)
}

fn constant_text(c: &Constant) -> String {
    c.to_string()
}

fn compare_op(relation: Relation) -> Option<CompareOp> {
    match relation {
        Relation::NotEqual => Some(CompareOp::Ne),
        Relation::Less => Some(CompareOp::Lt),
        Relation::LessEqual => Some(CompareOp::Le),
        Relation::Greater => Some(CompareOp::Gt),
        Relation::GreaterEqual => Some(CompareOp::Ge),
        Relation::SameType => None,
    }
}

/// Every `( ... )` group in source order, descending into negations.
fn groups(conditions: &[Condition]) -> Vec<&IdConditions> {
    let mut out = Vec::new();
    for c in conditions {
        match c {
            Condition::Positive(g) | Condition::Negated(g) => out.push(g),
            Condition::NegatedConjunction(inner) => out.extend(groups(inner)),
        }
    }
    out
}

impl RuleBuildState<'_> {
    fn name(&self) -> String {
        self.rule.name.clone()
    }

    fn binding(&self, identifier: &str) -> Option<String> {
        self.rule.bindings.get(identifier).cloned()
    }

    fn unresolved(&mut self, identifier: &str) {
        let d = Diagnostic::UnresolvedIdentifier {
            rule: self.name(),
            identifier: format!("<{identifier}>"),
        };
        d.emit();
        self.diagnostics.push(d);
    }

    fn reference_attrs(&mut self, path: &[String]) {
        for elem in path {
            self.rule.referenced_attrs.insert(elem.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Pass 1: bindings
    // -----------------------------------------------------------------------

    fn collect_bindings(&mut self, production: &Production) {
        let groups = groups(&production.conditions);
        if let Some(root) = groups.first().and_then(|g| g.id.bound_variable()) {
            self.rule
                .bindings
                .insert(root.to_string(), ROOT.to_string());
        }

        loop {
            let before = self.rule.bindings.len();

            for g in &groups {
                let Some(parent) = g.id.bound_variable().and_then(|id| self.binding(id)) else {
                    continue;
                };
                for attr in &g.attrs {
                    let qname = qualify(&parent, &attr.path);
                    for value in &attr.values {
                        if let Some(v) = value.bound_variable() {
                            self.rule
                                .bindings
                                .entry(v.to_string())
                                .or_insert_with(|| qname.clone());
                        }
                    }
                }
            }

            for action in &production.actions {
                let Action::Make { id, attrs } = action else {
                    continue;
                };
                let Some(parent) = self.binding(id) else {
                    continue;
                };
                for attr in attrs {
                    let qname = qualify(&parent, &attr.path);
                    for vm in &attr.values {
                        if let RhsValue::Variable(v) = &vm.value {
                            self.rule
                                .bindings
                                .entry(v.clone())
                                .or_insert_with(|| qname.clone());
                        }
                    }
                }
            }

            if self.rule.bindings.len() == before {
                break;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pass 2: conditions
    // -----------------------------------------------------------------------

    fn condition(&mut self, condition: &Condition, inherited: bool) {
        match condition {
            Condition::Positive(g) => self.group(g, inherited),
            Condition::Negated(g) => self.group(g, !inherited),
            Condition::NegatedConjunction(inner) => {
                for c in inner {
                    self.condition(c, !inherited);
                }
            }
        }
    }

    fn group(&mut self, g: &IdConditions, inherited: bool) {
        let id = g.id.bound_variable().unwrap_or("?");
        let Some(parent) = self.binding(id) else {
            let d = Diagnostic::UnresolvedContext {
                rule: self.name(),
                identifier: format!("<{id}>"),
            };
            d.emit();
            self.diagnostics.push(d);
            return;
        };

        for attr in &g.attrs {
            self.reference_attrs(&attr.path);
            let var = qualify(&parent, &attr.path);
            let negated = attr.negated ^ inherited;

            if attr.values.is_empty() {
                let op = if negated { CompareOp::Eq } else { CompareOp::Ne };
                self.corpus.record_value(&var, NIL);
                self.rule.guards.push(Guard::compare(&var, op, NIL));
                continue;
            }
            for test in &attr.values {
                self.test(&var, test, negated);
            }
        }
    }

    fn test(&mut self, var: &str, test: &Test, negated: bool) {
        self.corpus.touch(var);
        match test {
            Test::Equal(Operand::Variable(v)) => self.equal_variable(var, v, negated),
            Test::Equal(Operand::Constant(c)) => self.equal_literal(var, &constant_text(c), negated),
            Test::Relational(Relation::NotEqual, Operand::Constant(c)) => {
                self.equal_literal(var, &constant_text(c), !negated)
            }
            Test::Relational(_, Operand::Variable(v)) => match self.binding(v) {
                // comparing two paths constrains their domain, not a value
                Some(other) if other != var => self.corpus.add_type_edge(var, &other),
                Some(_) => {}
                None => self.unresolved(v),
            },
            Test::Relational(relation, Operand::Constant(c)) => {
                let Some(op) = compare_op(*relation) else {
                    return;
                };
                let op = if negated { op.negate() } else { op };
                let literal = constant_text(c);
                self.corpus.record_value(var, literal.clone());
                self.rule.guards.push(Guard::compare(var, op, literal));
            }
            Test::Disjunction(constants) => {
                let values: Vec<String> = constants.iter().map(constant_text).collect();
                for v in &values {
                    self.corpus.record_value(var, v.clone());
                }
                self.rule.guards.push(Guard::OneOf {
                    var: var.to_string(),
                    values,
                    negated,
                });
            }
            Test::Conjunction(tests) => {
                for t in tests {
                    self.test(var, t, negated);
                }
            }
        }
    }

    fn equal_literal(&mut self, var: &str, literal: &str, negated: bool) {
        let op = if negated { CompareOp::Ne } else { CompareOp::Eq };
        self.corpus.record_value(var, literal);
        self.rule.guards.push(Guard::compare(var, op, literal));
    }

    fn equal_variable(&mut self, var: &str, identifier: &str, negated: bool) {
        match self.binding(identifier) {
            // binding site: the identifier *is* this path
            Some(bound) if bound == var => {}
            Some(other) => {
                self.corpus.add_reference(var, &other);
                self.rule.guards.push(Guard::Compare {
                    var: var.to_string(),
                    op: if negated { CompareOp::Ne } else { CompareOp::Eq },
                    value: GuardValue::Variable(other),
                });
            }
            None => self.unresolved(identifier),
        }
    }

    // -----------------------------------------------------------------------
    // Pass 2: actions
    // -----------------------------------------------------------------------

    fn action(&mut self, action: &Action) {
        let Action::Make { id, attrs } = action else {
            return;
        };
        let Some(parent) = self.binding(id) else {
            self.unresolved(id);
            return;
        };
        for attr in attrs {
            self.reference_attrs(&attr.path);
            let var = qualify(&parent, &attr.path);
            for vm in &attr.values {
                self.value_make(&var, vm);
            }
        }
    }

    fn value_make(&mut self, var: &str, vm: &ValueMake) {
        let mut retract = false;
        for pref in &vm.preferences {
            match pref {
                Preference::Reject => retract = true,
                Preference::Indifferent(weight) => {
                    self.rule.is_learning = true;
                    if let Some(p) = weight.as_ref().and_then(numeric) {
                        self.rule.priority = p;
                    }
                }
                Preference::Best | Preference::Better(_) => {
                    self.rule.is_learning = true;
                    self.rule.priority = MAX_PRIORITY;
                }
                _ => {}
            }
        }

        self.corpus.touch(var);
        if retract {
            // removing the old value never hides a new one written alongside it
            self.corpus.record_value(var, NIL);
            self.rule
                .assignments
                .entry(var.to_string())
                .or_insert(Assignment::Nil);
            return;
        }

        let assignment = match &vm.value {
            RhsValue::Constant(c) => {
                let literal = constant_text(c);
                self.corpus.record_value(var, literal.clone());
                Assignment::Literal(literal)
            }
            RhsValue::Variable(v) => match self.binding(v) {
                // creates a new identifier here
                Some(bound) if bound == var => return,
                Some(other) => {
                    self.corpus.add_reference(var, &other);
                    Assignment::Ref(other)
                }
                None => {
                    self.unresolved(v);
                    return;
                }
            },
            RhsValue::Call(call) => match call.increment_of().map(|v| (v, self.binding(v))) {
                Some((_, Some(source))) => {
                    self.corpus.add_type_edge(var, &source);
                    Assignment::Increment(source)
                }
                Some((v, None)) => {
                    self.unresolved(v);
                    return;
                }
                None => {
                    let d = Diagnostic::UnsupportedValue {
                        rule: self.name(),
                        variable: var.to_string(),
                        value: format!("({} ...)", call.name),
                    };
                    d.emit();
                    self.diagnostics.push(d);
                    return;
                }
            },
        };
        self.rule.assignments.insert(var.to_string(), assignment);
    }

    fn finish(self) -> Vec<Diagnostic> {
        let RuleBuildState {
            rule,
            corpus,
            diagnostics,
        } = self;

        if rule.is_elaboration && rule.is_top_state_only() {
            for (var, assignment) in &rule.assignments {
                if let Assignment::Literal(v) = assignment {
                    corpus.set_declared_init(var, v.clone());
                }
            }
        }

        tracing::debug!(
            rule = %rule.name,
            guards = rule.guards.len(),
            assignments = rule.assignments.len(),
            "rule built"
        );
        corpus.push_rule(rule);
        diagnostics
    }
}

fn numeric(value: &RhsValue) -> Option<f64> {
    match value {
        RhsValue::Constant(Constant::Int(i)) => Some(*i as f64),
        RhsValue::Constant(Constant::Float(x)) => Some(*x),
        RhsValue::Constant(Constant::Symbol(s)) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_productions;

    fn build(src: &str) -> (Corpus, Vec<Diagnostic>) {
        let out = parse_productions(src, "test.soar");
        assert!(out.errors.is_empty(), "parse errors: {:?}", out.errors);
        build_corpus(&out.productions)
    }

    fn guards(corpus: &Corpus, rule: &str) -> Vec<String> {
        corpus
            .rule(rule)
            .unwrap()
            .guards
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn nested_groups_flatten_to_qualified_names() {
        let (corpus, diags) = build(
            "sp {propose*go (state <s> ^io <io>) (<io> ^input-link <il>) (<il> ^light.color red) \
             --> (<s> ^operator <o> +) (<o> ^name go)}",
        );
        assert!(diags.is_empty());
        assert_eq!(guards(&corpus, "propose*go"), vec!["state_io_input_link_light_color = red"]);
        let rule = corpus.rule("propose*go").unwrap();
        assert_eq!(
            rule.assignments.get("state_operator_name"),
            Some(&Assignment::Literal("go".into()))
        );
        assert!(!rule.assignments.contains_key("state_operator"));
    }

    #[test]
    fn existence_tests_follow_negation_marker() {
        let (corpus, _) = build("sp {r (state <s> ^present -^absent) --> (<s> ^x 1)}");
        assert_eq!(
            guards(&corpus, "r"),
            vec!["state_present != nil", "state_absent = nil"]
        );
        assert!(corpus.variable("state_absent").unwrap().values.contains(NIL));
    }

    #[test]
    fn negation_xor_cancels_to_equality() {
        let (corpus, _) = build(
            "sp {r (state <s> ^x 1) -(<s> ^a <> 1) -(<s> -^b 2) -(<s> ^c 3) --> (<s> ^y 1)}",
        );
        assert_eq!(
            guards(&corpus, "r"),
            vec!["state_x = 1", "state_a = 1", "state_b = 2", "state_c != 3"]
        );
    }

    #[test]
    fn negated_conjunction_negates_members() {
        let (corpus, _) = build("sp {r (state <s> ^x 1) -{ (<s> ^a 1) (<s> ^b 2) } --> (<s> ^y 1)}");
        assert_eq!(
            guards(&corpus, "r"),
            vec!["state_x = 1", "state_a != 1", "state_b != 2"]
        );
    }

    #[test]
    fn relational_between_variables_adds_type_edge_only() {
        let (corpus, _) = build("sp {r (state <s> ^a <x> ^b { <y> > <x> }) --> (<s> ^c 1)}");
        assert!(guards(&corpus, "r").is_empty());
        assert!(corpus.type_graph().contains_edge("state_a", "state_b"));
    }

    #[test]
    fn relational_literal_and_disjunction_guards() {
        let (corpus, _) = build("sp {r (state <s> ^t > 5 ^m << 1 2 >>) -(<s> ^u < 3) --> (<s> ^c 1)}");
        assert_eq!(
            guards(&corpus, "r"),
            vec!["state_t > 5", "(state_m = 1 | state_m = 2)", "state_u >= 3"]
        );
        let m = corpus.variable("state_m").unwrap();
        assert!(m.values.contains("1") && m.values.contains("2"));
    }

    #[test]
    fn shared_identifier_becomes_reference_guard() {
        let (corpus, _) = build(
            "sp {r (state <s> ^a <v> ^b <v>) --> (<s> ^c <v>)}\n\
             sp {init (state <s> ^superstate nil) --> (<s> ^a 4)}",
        );
        assert_eq!(guards(&corpus, "r"), vec!["state_b = state_a"]);
        assert_eq!(
            corpus.rule("r").unwrap().assignments.get("state_c"),
            Some(&Assignment::Ref("state_a".into()))
        );
        // reference values are merged at freeze
        assert!(corpus.variable("state_c").unwrap().values.contains("4"));
        assert!(corpus.variable("state_b").unwrap().values.contains("4"));
    }

    #[test]
    fn preferences_set_priority_and_learning() {
        let (corpus, _) = build(
            "sp {a (state <s> ^x 1) --> (<s> ^operator <o> + = 0.25)}\n\
             sp {b (state <s> ^x 1) --> (<s> ^operator <o> + >)}\n\
             sp {c (state <s> ^x 1) --> (<s> ^old 3 -)}",
        );
        let a = corpus.rule("a").unwrap();
        assert!(a.is_learning);
        assert_eq!(a.priority, 0.25);
        let b = corpus.rule("b").unwrap();
        assert!(b.is_learning);
        assert_eq!(b.priority, MAX_PRIORITY);
        let c = corpus.rule("c").unwrap();
        assert!(!c.is_learning);
        assert_eq!(c.assignments.get("state_old"), Some(&Assignment::Nil));
    }

    #[test]
    fn increment_is_deferred_marker() {
        let (corpus, _) = build(
            "sp {apply*tick (state <s> ^operator.name tick ^time-counter <t>) \
             --> (<s> ^time-counter (+ <t> 1) ^time-counter <t> -)}",
        );
        let rule = corpus.rule("apply*tick").unwrap();
        assert_eq!(
            rule.assignments.get("state_time_counter"),
            Some(&Assignment::Increment("state_time_counter".into()))
        );

        let (corpus, _) = build(
            "sp {apply*tick (state <s> ^operator.name tick ^count <c>) --> (<s> ^next (+ <c> 1))}",
        );
        assert_eq!(
            corpus.rule("apply*tick").unwrap().assignments.get("state_next"),
            Some(&Assignment::Increment("state_count".into()))
        );
        assert!(corpus.type_graph().contains_edge("state_next", "state_count"));
    }

    #[test]
    fn top_state_elaboration_declares_initial_value() {
        let (corpus, _) = build("sp {elaborate*init (state <s> ^superstate nil) --> (<s> ^level 2)}");
        assert_eq!(
            corpus.variable("state_level").unwrap().declared_init.as_deref(),
            Some("2")
        );
        let (corpus, _) = build(
            "sp {elaborate*other (state <s> ^superstate nil ^x 1) --> (<s> ^level 2)}",
        );
        assert_eq!(corpus.variable("state_level").unwrap().declared_init, None);
    }

    #[test]
    fn unbound_context_is_diagnosed_not_fatal() {
        let (corpus, diags) = build("sp {r (state <s> ^a 1) (<zz> ^b 2) --> (<q> ^c 3)}");
        assert_eq!(guards(&corpus, "r"), vec!["state_a = 1"]);
        assert!(diags.iter().any(|d| matches!(d, Diagnostic::UnresolvedContext { .. })));
        assert!(diags.iter().any(|d| matches!(d, Diagnostic::UnresolvedIdentifier { .. })));
    }

    #[test]
    fn every_guard_and_assignment_variable_is_in_table() {
        let (corpus, _) = build(
            "sp {propose*x (state <s> ^a <v> ^b { <w> > <v> } -^c ^d << x y >>) \
             --> (<s> ^operator <o> +) (<o> ^name x ^e <w>)}",
        );
        for rule in corpus.rules() {
            for g in &rule.guards {
                let var = corpus.variable(g.var()).unwrap();
                assert!(!var.values.is_empty());
            }
            for key in rule.assignments.keys() {
                assert!(!corpus.variable(key).unwrap().values.is_empty());
            }
        }
    }

    #[test]
    fn referenced_attributes_are_recorded() {
        let (corpus, _) = build("sp {propose*a (state <s> ^pdf-ss <p> ^mode 1) --> (<s> ^operator <o> +)}");
        let attrs = &corpus.rule("propose*a").unwrap().referenced_attrs;
        assert!(attrs.contains("pdf-ss"));
        assert!(attrs.contains("operator"));
    }
}

//! Output model IR: expressions, guarded commands, modules and rewards.
//!
//! Synthesizers build a [`Model`] value; `Display` renders it as model
//! text. Expressions can also be evaluated against a variable assignment,
//! which is how tests check that every module's commands partition its
//! state space.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexSet;

use crate::model::{CompareOp, normalize};

/// Variable/constant valuation used by [`Expr::eval_num`] and friends.
pub type Env = HashMap<String, f64>;

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    True,
    False,
    /// A variable or named constant.
    Var(String),
    /// Literal text: a number or a normalized symbol.
    Lit(String),
    Cmp(Box<Expr>, CompareOp, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Min(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(name: impl AsRef<str>) -> Self {
        Expr::Var(normalize(name.as_ref()))
    }

    /// Literal; non-numeric text is normalized to a legal identifier.
    pub fn lit(text: impl AsRef<str>) -> Self {
        let text = text.as_ref();
        if text.parse::<f64>().is_ok() {
            Expr::Lit(text.to_string())
        } else {
            Expr::Lit(normalize(text))
        }
    }

    pub fn int(value: i64) -> Self {
        Expr::Lit(value.to_string())
    }

    /// A probability literal with six decimals.
    pub fn prob(p: f64) -> Self {
        Expr::Lit(format!("{p:.6}"))
    }

    pub fn cmp(lhs: Expr, op: CompareOp, rhs: Expr) -> Self {
        Expr::Cmp(Box::new(lhs), op, Box::new(rhs))
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Self::cmp(lhs, CompareOp::Eq, rhs)
    }

    pub fn ne(lhs: Expr, rhs: Expr) -> Self {
        Self::cmp(lhs, CompareOp::Ne, rhs)
    }

    pub fn lt(lhs: Expr, rhs: Expr) -> Self {
        Self::cmp(lhs, CompareOp::Lt, rhs)
    }

    pub fn gt(lhs: Expr, rhs: Expr) -> Self {
        Self::cmp(lhs, CompareOp::Gt, rhs)
    }

    /// `var = value` for an integer value.
    pub fn var_is(name: impl AsRef<str>, value: i64) -> Self {
        Self::eq(Self::var(name), Self::int(value))
    }

    /// Conjunction, flattened; `True` operands vanish and any `False` wins.
    pub fn and(parts: impl IntoIterator<Item = Expr>) -> Self {
        let mut out = Vec::new();
        for p in parts {
            match p {
                Expr::True => {}
                Expr::False => return Expr::False,
                Expr::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Expr::True,
            1 => out.remove(0),
            _ => Expr::And(out),
        }
    }

    /// Disjunction, flattened; `False` operands vanish and any `True` wins.
    pub fn or(parts: impl IntoIterator<Item = Expr>) -> Self {
        let mut out = Vec::new();
        for p in parts {
            match p {
                Expr::False => {}
                Expr::True => return Expr::True,
                Expr::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Expr::False,
            1 => out.remove(0),
            _ => Expr::Or(out),
        }
    }

    pub fn not(e: Expr) -> Self {
        match e {
            Expr::True => Expr::False,
            Expr::False => Expr::True,
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Expr::Sub(Box::new(lhs), Box::new(rhs))
    }

    pub fn min(lhs: Expr, rhs: Expr) -> Self {
        Expr::Min(Box::new(lhs), Box::new(rhs))
    }

    /// `1 - e`.
    pub fn complement(e: Expr) -> Self {
        Self::sub(Self::int(1), e)
    }

    /// Every variable or constant name mentioned.
    pub fn collect_vars(&self, out: &mut IndexSet<String>) {
        match self {
            Expr::Var(v) => {
                out.insert(v.clone());
            }
            Expr::True | Expr::False | Expr::Lit(_) => {}
            Expr::Cmp(a, _, b) | Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Min(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Expr::And(parts) | Expr::Or(parts) => {
                for p in parts {
                    p.collect_vars(out);
                }
            }
            Expr::Not(e) => e.collect_vars(out),
        }
    }

    /// Numeric value, or `None` for booleans, symbols and unbound names.
    pub fn eval_num(&self, env: &Env) -> Option<f64> {
        match self {
            Expr::Var(v) => env.get(v).copied(),
            Expr::Lit(s) => s.parse().ok(),
            Expr::Add(a, b) => Some(a.eval_num(env)? + b.eval_num(env)?),
            Expr::Sub(a, b) => Some(a.eval_num(env)? - b.eval_num(env)?),
            Expr::Min(a, b) => Some(a.eval_num(env)?.min(b.eval_num(env)?)),
            _ => None,
        }
    }

    /// Truth value, or `None` if something could not be evaluated.
    pub fn eval_bool(&self, env: &Env) -> Option<bool> {
        match self {
            Expr::True => Some(true),
            Expr::False => Some(false),
            Expr::Cmp(a, op, b) => {
                let (a, b) = (a.eval_num(env)?, b.eval_num(env)?);
                Some(match op {
                    CompareOp::Eq => a == b,
                    CompareOp::Ne => a != b,
                    CompareOp::Lt => a < b,
                    CompareOp::Le => a <= b,
                    CompareOp::Gt => a > b,
                    CompareOp::Ge => a >= b,
                })
            }
            Expr::And(parts) => {
                let mut all = true;
                for p in parts {
                    all &= p.eval_bool(env)?;
                }
                Some(all)
            }
            Expr::Or(parts) => {
                let mut any = false;
                for p in parts {
                    any |= p.eval_bool(env)?;
                }
                Some(any)
            }
            Expr::Not(e) => Some(!e.eval_bool(env)?),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(_) => 1,
            Expr::And(_) => 2,
            Expr::Not(_) => 3,
            Expr::Cmp(..) => 4,
            Expr::Add(..) | Expr::Sub(..) => 5,
            _ => 6,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::True => f.write_str("true"),
            Expr::False => f.write_str("false"),
            Expr::Var(s) | Expr::Lit(s) => f.write_str(s),
            Expr::Cmp(a, op, b) => {
                a.fmt_child(f, 5)?;
                write!(f, " {op} ")?;
                b.fmt_child(f, 5)
            }
            Expr::And(parts) | Expr::Or(parts) => {
                let (sep, min) = if matches!(self, Expr::And(_)) {
                    (" & ", 3)
                } else {
                    (" | ", 2)
                };
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    p.fmt_child(f, min)?;
                }
                Ok(())
            }
            Expr::Not(e) => {
                f.write_str("!")?;
                e.fmt_child(f, 6)
            }
            Expr::Add(a, b) => {
                a.fmt_child(f, 5)?;
                f.write_str(" + ")?;
                b.fmt_child(f, 6)
            }
            Expr::Sub(a, b) => {
                a.fmt_child(f, 5)?;
                f.write_str("-")?;
                b.fmt_child(f, 6)
            }
            Expr::Min(a, b) => write!(f, "min({a}, {b})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// `(var'=value)`
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub var: String,
    pub value: Expr,
}

impl Update {
    pub fn new(var: impl AsRef<str>, value: Expr) -> Self {
        Self {
            var: normalize(var.as_ref()),
            value,
        }
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}'={})", self.var, self.value)
    }
}

/// One probabilistic alternative. A missing probability means 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub prob: Option<Expr>,
    pub updates: Vec<Update>,
}

impl Branch {
    pub fn certain(updates: Vec<Update>) -> Self {
        Self {
            prob: None,
            updates,
        }
    }

    pub fn weighted(prob: Expr, updates: Vec<Update>) -> Self {
        Self {
            prob: Some(prob),
            updates,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.prob {
            write!(f, "{p}: ")?;
        }
        if self.updates.is_empty() {
            return f.write_str("true");
        }
        for (i, u) in self.updates.iter().enumerate() {
            if i > 0 {
                f.write_str(" & ")?;
            }
            write!(f, "{u}")?;
        }
        Ok(())
    }
}

/// `[label] guard -> branch + branch;`
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub label: Option<String>,
    pub guard: Expr,
    pub branches: Vec<Branch>,
}

impl Command {
    pub fn new(label: Option<&str>, guard: Expr, branches: Vec<Branch>) -> Self {
        Self {
            label: label.map(str::to_string),
            guard,
            branches,
        }
    }

    /// A command that changes nothing.
    pub fn idle(label: Option<&str>, guard: Expr) -> Self {
        Self::new(label, guard, vec![Branch::certain(Vec::new())])
    }

    /// Sum of branch probabilities under `env`.
    pub fn probability_sum(&self, env: &Env) -> Option<f64> {
        let mut sum = 0.0;
        for b in &self.branches {
            sum += match &b.prob {
                Some(p) => p.eval_num(env)?,
                None => 1.0,
            };
        }
        Some(sum)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} -> ",
            self.label.as_deref().unwrap_or(""),
            self.guard
        )?;
        for (i, b) in self.branches.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{b}")?;
        }
        f.write_str(";")
    }
}

// ---------------------------------------------------------------------------
// Declarations, modules, rewards
// ---------------------------------------------------------------------------

/// `name : [low..high] init value;`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub low: Expr,
    pub high: Expr,
    pub init: Expr,
}

impl VarDecl {
    pub fn new(name: impl AsRef<str>, low: Expr, high: Expr, init: Expr) -> Self {
        Self {
            name: normalize(name.as_ref()),
            low,
            high,
            init,
        }
    }

    /// `[0..high] init init` with integer bounds.
    pub fn range(name: impl AsRef<str>, high: i64, init: i64) -> Self {
        Self::new(name, Expr::int(0), Expr::int(high), Expr::int(init))
    }
}

impl fmt::Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : [{}..{}] init {};",
            self.name, self.low, self.high, self.init
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstKind {
    Int,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub kind: ConstKind,
    pub name: String,
    pub value: Expr,
}

impl ConstDecl {
    pub fn int(name: impl AsRef<str>, value: i64) -> Self {
        Self {
            kind: ConstKind::Int,
            name: normalize(name.as_ref()),
            value: Expr::int(value),
        }
    }

    pub fn double(name: impl AsRef<str>, value: Expr) -> Self {
        Self {
            kind: ConstKind::Double,
            name: normalize(name.as_ref()),
            value,
        }
    }
}

impl fmt::Display for ConstDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ConstKind::Int => "int",
            ConstKind::Double => "double",
        };
        write!(f, "const {kind} {} = {};", self.name, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub name: String,
    pub vars: Vec<VarDecl>,
    pub commands: Vec<Command>,
}

impl Module {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: normalize(name.as_ref()),
            ..Default::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Commands whose guard holds under `env`.
    pub fn enabled_commands(&self, env: &Env) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| c.guard.eval_bool(env) == Some(true))
            .collect()
    }

    /// Names mentioned in any guard.
    pub fn guard_vars(&self) -> IndexSet<String> {
        let mut out = IndexSet::new();
        for c in &self.commands {
            c.guard.collect_vars(&mut out);
        }
        out
    }

    /// Disjunction of every guard, for synthesizing a fallback command.
    pub fn guard_union(&self) -> Expr {
        Expr::or(self.commands.iter().map(|c| c.guard.clone()))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for v in &self.vars {
            writeln!(f, "    {v}")?;
        }
        if !self.vars.is_empty() && !self.commands.is_empty() {
            writeln!(f)?;
        }
        for c in &self.commands {
            writeln!(f, "    {c}")?;
        }
        f.write_str("endmodule")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewardItem {
    pub guard: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rewards {
    pub name: String,
    pub items: Vec<RewardItem>,
}

impl Rewards {
    pub fn single(name: &str, guard: Expr, value: Expr) -> Self {
        Self {
            name: name.to_string(),
            items: vec![RewardItem { guard, value }],
        }
    }
}

impl fmt::Display for Rewards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rewards \"{}\"", self.name)?;
        for item in &self.items {
            writeln!(f, "    {} : {};", item.guard, item.value)?;
        }
        f.write_str("endrewards")
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// `dtmc`, `mdp`, ...
    pub model_type: String,
    /// Rendered as `//` lines under the header.
    pub comments: Vec<String>,
    pub constants: Vec<ConstDecl>,
    pub modules: Vec<Module>,
    pub rewards: Vec<Rewards>,
}

/// A state in which a module's commands do not partition the state space.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionViolation {
    pub module: String,
    pub state: Vec<(String, i64)>,
    pub enabled: usize,
}

impl fmt::Display for PartitionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state: Vec<String> = self.state.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(
            f,
            "module {}: {} commands enabled at {}",
            self.module,
            self.enabled,
            state.join(", ")
        )
    }
}

impl Model {
    pub fn new(model_type: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            comments: Vec::new(),
            constants: Vec::new(),
            modules: Vec::new(),
            rewards: Vec::new(),
        }
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstDecl> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Numeric constants, resolved in declaration order.
    pub fn constant_env(&self) -> Env {
        let mut env = Env::new();
        for c in &self.constants {
            if let Some(v) = c.value.eval_num(&env) {
                env.insert(c.name.clone(), v);
            }
        }
        env
    }

    /// Every declared variable across all modules.
    pub fn var_decl(&self, name: &str) -> Option<&VarDecl> {
        self.modules
            .iter()
            .flat_map(|m| m.vars.iter())
            .find(|v| v.name == name)
    }

    /// Enumerate every combination of the variables `module` reads or owns
    /// and report states where other than exactly one command is enabled,
    /// or where an enabled command's probabilities do not sum to 1.
    pub fn partition_violations(&self, module: &str) -> Vec<PartitionViolation> {
        let Some(m) = self.module(module) else {
            return Vec::new();
        };
        let consts = self.constant_env();

        let mut names: IndexSet<String> = m.vars.iter().map(|v| v.name.clone()).collect();
        names.extend(m.guard_vars());
        let mut dims: Vec<(String, i64, i64)> = Vec::new();
        for name in &names {
            if consts.contains_key(name) {
                continue;
            }
            let Some(decl) = self.var_decl(name) else {
                continue;
            };
            let (Some(lo), Some(hi)) = (decl.low.eval_num(&consts), decl.high.eval_num(&consts))
            else {
                continue;
            };
            dims.push((name.clone(), lo as i64, hi as i64));
        }

        let mut violations = Vec::new();
        let mut current: Vec<i64> = dims.iter().map(|d| d.1).collect();
        loop {
            let mut env = consts.clone();
            for (d, v) in dims.iter().zip(&current) {
                env.insert(d.0.clone(), *v as f64);
            }
            let enabled = m.enabled_commands(&env);
            let well_formed = enabled.len() == 1
                && enabled[0]
                    .probability_sum(&env)
                    .is_some_and(|s| (s - 1.0).abs() < 1e-9);
            if !well_formed {
                violations.push(PartitionViolation {
                    module: m.name.clone(),
                    state: dims.iter().map(|d| d.0.clone()).zip(current.clone()).collect(),
                    enabled: enabled.len(),
                });
            }

            // odometer increment
            let mut i = 0;
            loop {
                if i == dims.len() {
                    return violations;
                }
                if current[i] < dims[i].2 {
                    current[i] += 1;
                    break;
                }
                current[i] = dims[i].1;
                i += 1;
            }
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.model_type)?;
        writeln!(f)?;
        for c in &self.comments {
            writeln!(f, "// {c}")?;
        }
        if !self.comments.is_empty() {
            writeln!(f)?;
        }
        for c in &self.constants {
            writeln!(f, "{c}")?;
        }
        if !self.constants.is_empty() {
            writeln!(f)?;
        }
        for m in &self.modules {
            writeln!(f, "{m}")?;
            writeln!(f)?;
        }
        for r in &self.rewards {
            writeln!(f, "{r}")?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_or_simplify() {
        assert_eq!(Expr::and([Expr::True, Expr::True]), Expr::True);
        assert_eq!(Expr::and([Expr::var("a"), Expr::False]), Expr::False);
        assert_eq!(Expr::or([]), Expr::False);
        assert_eq!(Expr::not(Expr::not(Expr::var("a"))), Expr::var("a"));
        let nested = Expr::and([Expr::and([Expr::var("a"), Expr::var("b")]), Expr::var("c")]);
        assert!(matches!(nested, Expr::And(ref v) if v.len() == 3));
    }

    #[test]
    fn rendering_respects_precedence() {
        let e = Expr::and([
            Expr::lt(Expr::var("time_counter"), Expr::var("TOTAL_TIME")),
            Expr::or([Expr::var_is("m", 1), Expr::var_is("m", 2)]),
            Expr::not(Expr::var_is("x", 0)),
        ]);
        assert_eq!(
            e.to_string(),
            "time_counter < TOTAL_TIME & (m = 1 | m = 2) & !(x = 0)"
        );
        assert_eq!(Expr::complement(Expr::var("pdf1")).to_string(), "1-pdf1");
        assert_eq!(
            Expr::add(Expr::var("t"), Expr::int(1)).to_string(),
            "t + 1"
        );
    }

    #[test]
    fn command_rendering() {
        let c = Command::new(
            None,
            Expr::eq(Expr::var("a"), Expr::lit("1")),
            vec![Branch::weighted(
                Expr::var("state_p"),
                vec![Update::new("state_b", Expr::lit("2"))],
            )],
        );
        assert_eq!(c.to_string(), "[] a = 1 -> state_p: (state_b'=2);");
        let idle = Command::idle(Some("step"), Expr::True);
        assert_eq!(idle.to_string(), "[step] true -> true;");
    }

    #[test]
    fn symbolic_literals_are_normalized() {
        assert_eq!(Expr::lit("do-it").to_string(), "do_it");
        assert_eq!(Expr::lit("-3").to_string(), "-3");
    }

    #[test]
    fn evaluation() {
        let mut env = Env::new();
        env.insert("t".into(), 3.0);
        env.insert("pdf1".into(), 0.25);
        assert_eq!(Expr::add(Expr::var("t"), Expr::int(1)).eval_num(&env), Some(4.0));
        assert_eq!(Expr::complement(Expr::var("pdf1")).eval_num(&env), Some(0.75));
        assert_eq!(Expr::var_is("t", 3).eval_bool(&env), Some(true));
        assert_eq!(Expr::var_is("missing", 3).eval_bool(&env), None);
        assert_eq!(Expr::lit("yes").eval_num(&env), None);
    }

    #[test]
    fn partition_check_finds_gaps_and_overlaps() {
        let mut m = Module::new("m");
        m.vars.push(VarDecl::range("x", 2, 0));
        m.push(Command::idle(Some("s"), Expr::var_is("x", 0)));
        m.push(Command::idle(Some("s"), Expr::lt(Expr::var("x"), Expr::int(2))));
        let mut model = Model::new("dtmc");
        model.modules.push(m);
        let v = model.partition_violations("m");
        // x=0 overlaps, x=2 is uncovered
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].enabled, 2);
        assert_eq!(v[1].enabled, 0);
    }

    #[test]
    fn model_rendering_layout() {
        let mut model = Model::new("dtmc");
        model.constants.push(ConstDecl::int("TOTAL_TIME", 10));
        let mut m = Module::new("time");
        m.vars.push(VarDecl::new(
            "time_counter",
            Expr::int(0),
            Expr::var("TOTAL_TIME"),
            Expr::int(0),
        ));
        m.push(Command::idle(Some("step"), Expr::True));
        model.modules.push(m);
        model
            .rewards
            .push(Rewards::single("time_cost", Expr::True, Expr::int(1)));
        let text = model.to_string();
        assert!(text.starts_with("dtmc\n\nconst int TOTAL_TIME = 10;\n\nmodule time\n"));
        assert!(text.contains("    time_counter : [0..TOTAL_TIME] init 0;\n\n    [step] true -> true;\nendmodule"));
        assert!(text.contains("rewards \"time_cost\"\n    true : 1;\nendrewards"));
        assert_eq!(model.constant_env().get("TOTAL_TIME"), Some(&10.0));
    }
}

//! Production syntax tree.
//!
//! One [`Production`] per `sp {...}` block. The tree keeps the shape of the
//! source (condition groups, attribute tests, preference annotations) and
//! leaves every semantic decision to the rule model builder.

use std::fmt;

/// A single `sp {name ... --> ...}` production. Documentation strings and
/// `:flag` annotations are consumed by the parser but not kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

// ---------------------------------------------------------------------------
// Left-hand side
// ---------------------------------------------------------------------------

/// One top-level or nested condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `(<id> ^attr value ...)`
    Positive(IdConditions),
    /// `-(<id> ^attr value ...)`
    Negated(IdConditions),
    /// `-{ (cond) (cond) ... }`
    NegatedConjunction(Vec<Condition>),
}

/// The body of a parenthesized condition: an identifier test followed by
/// attribute/value tests.
#[derive(Debug, Clone, PartialEq)]
pub struct IdConditions {
    pub id: Test,
    pub attrs: Vec<AttrValueTest>,
}

/// `-^attr.path value value ...`
#[derive(Debug, Clone, PartialEq)]
pub struct AttrValueTest {
    pub negated: bool,
    /// Dotted attribute path, one element per segment.
    pub path: Vec<String>,
    /// Zero values means an existence test.
    pub values: Vec<Test>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Test {
    /// Bare operand, or `= operand`.
    Equal(Operand),
    /// `<> x`, `< x`, `>= x`, `<=> x`, ...
    Relational(Relation, Operand),
    /// `<< a b c >>`
    Disjunction(Vec<Constant>),
    /// `{ <x> > 3 <> 7 }`
    Conjunction(Vec<Test>),
}

impl Test {
    /// The first variable this test binds or mentions in equality position.
    pub fn bound_variable(&self) -> Option<&str> {
        match self {
            Test::Equal(Operand::Variable(v)) => Some(v),
            Test::Conjunction(tests) => tests.iter().find_map(Test::bound_variable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    SameType,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relation::NotEqual => "<>",
            Relation::Less => "<",
            Relation::LessEqual => "<=",
            Relation::Greater => ">",
            Relation::GreaterEqual => ">=",
            Relation::SameType => "<=>",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Variable name without the angle brackets.
    Variable(String),
    Constant(Constant),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Symbol(String),
    /// `|quoted text|`
    Quoted(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{i}"),
            Constant::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Constant::Symbol(s) | Constant::Quoted(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Right-hand side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `(<id> ^attr value pref ...)`
    Make { id: String, attrs: Vec<AttrValueMake> },
    /// `(write ...)`, `(halt)`, `(interrupt)`, ...
    Call(FuncCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrValueMake {
    pub path: Vec<String>,
    pub values: Vec<ValueMake>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueMake {
    pub value: RhsValue,
    pub preferences: Vec<Preference>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RhsValue {
    Variable(String),
    Constant(Constant),
    Call(FuncCall),
}

/// `(name arg arg ...)` on the right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    pub name: String,
    pub args: Vec<RhsValue>,
}

impl FuncCall {
    /// Matches `(+ <v> 1)` or `(+ 1 <v>)`, returning the variable.
    pub fn increment_of(&self) -> Option<&str> {
        if self.name != "+" || self.args.len() != 2 {
            return None;
        }
        match (&self.args[0], &self.args[1]) {
            (RhsValue::Variable(v), RhsValue::Constant(Constant::Int(1)))
            | (RhsValue::Constant(Constant::Int(1)), RhsValue::Variable(v)) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Preference {
    Acceptable,
    Reject,
    Require,
    Prohibit,
    Best,
    Worst,
    Better(Option<RhsValue>),
    Worse(Option<RhsValue>),
    /// `=` optionally followed by a numeric indifference value.
    Indifferent(Option<RhsValue>),
    Parallel,
    Reconsider,
}

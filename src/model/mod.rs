//! Corpus data model: variables, normalized rules, the type graph.

pub mod corpus;
pub mod rule;
pub mod variable;

pub use corpus::{Corpus, CorpusBuilder, TypeGraph};
pub use rule::{Assignment, CompareOp, Guard, GuardValue, MAX_PRIORITY, Rule};
pub use variable::{NIL, VarType, Variable, normalize, prism_var};

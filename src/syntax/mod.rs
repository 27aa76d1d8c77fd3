//! Production syntax: tokenizer, tree and recovering parser.
//!
//! Input is the flattened production text emitted by the rule loader
//! (`sp {name ... --> ...}` blocks with file inclusion and scripting
//! already resolved).

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::Production;
pub use parser::{ParseOutput, parse_productions};

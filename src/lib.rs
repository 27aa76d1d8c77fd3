// Diagnostic and error variants read some fields only from their derived
// `#[error]` messages, which rustc flags as unused assignments.
#![allow(unused_assignments)]

//! # soar-prism
//!
//! Translates a corpus of Soar production rules into a discrete-time Markov
//! chain in PRISM's modeling language.
//!
//! ## Architecture
//!
//! - **Syntax** (`syntax`): tokenizer and recovering parser for flattened `sp {...}` text
//! - **Rule model** (`model`, `build`): variables, guards, assignments and the type graph
//! - **Type inference** (`infer`): propagation over type-graph components
//! - **Output IR** (`prism`): expressions, guarded commands, modules, rewards
//! - **Synthesis** (`synth`): general propose/apply model or the time-windowed model
//! - **Configuration** (`config`): optional JSON constants and distributions
//!
//! ## Library usage
//!
//! ```no_run
//! use soar_prism::pipeline::Translator;
//!
//! let src = std::fs::read_to_string("rules.soar").unwrap();
//! let translation = Translator::new(None).translate_str(&src, "rules.soar").unwrap();
//! println!("{translation}");
//! ```

pub mod build;
pub mod config;
pub mod error;
pub mod infer;
pub mod model;
pub mod pipeline;
pub mod prism;
pub mod synth;
pub mod syntax;

//! Model synthesis from a typed corpus.
//!
//! A detector picks the output shape: corpora that reference the time
//! counter get the temporal multi-module model, everything else the
//! general propose/apply model.

pub mod general;
pub mod resolve;
pub mod temporal;

use std::fmt;

use crate::config::{DEFAULT_TIME_VARIABLE, PrismConfig};
use crate::error::{Diagnostic, SynthesisResult};
use crate::infer::TypedCorpus;
use crate::model::{Corpus, normalize};
use crate::prism::Model;

pub use resolve::UnresolvedPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    General,
    Temporal,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::General => f.write_str("general"),
            ModelKind::Temporal => f.write_str("temporal"),
        }
    }
}

/// Whether `text` mentions `name` in its dash or underscore spelling.
pub fn contains_name_variant(text: &str, name: &str) -> bool {
    text.contains(&name.replace('_', "-")) || text.contains(&normalize(name))
}

/// The corpus references the time counter in a guard, an assignment or a
/// rule name, or initializes a total time.
pub fn detect(corpus: &Corpus, time_variable: &str) -> ModelKind {
    let mentions = |text: &str| contains_name_variant(text, time_variable);
    let temporal = corpus.rules().iter().any(|rule| {
        mentions(&rule.name)
            || rule.guards.iter().any(|g| mentions(g.var()))
            || rule
                .assignments
                .keys()
                .any(|k| mentions(k) || k.contains("total_time"))
    });
    let kind = if temporal {
        ModelKind::Temporal
    } else {
        ModelKind::General
    };
    tracing::info!(%kind, time_variable, "model shape detected");
    kind
}

/// Output of one synthesizer run.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub kind: ModelKind,
    pub model: Model,
    pub diagnostics: Vec<Diagnostic>,
}

/// Detect the model shape and run the matching synthesizer.
pub fn synthesize(
    typed: &TypedCorpus,
    config: Option<&PrismConfig>,
    policy: UnresolvedPolicy,
) -> SynthesisResult<Synthesis> {
    let time_variable = config.map_or(DEFAULT_TIME_VARIABLE, PrismConfig::time_variable);
    let kind = detect(typed.corpus(), time_variable);
    let (model, diagnostics) = match kind {
        ModelKind::General => general::synthesize(typed, policy),
        ModelKind::Temporal => temporal::synthesize(typed, config)?,
    };
    Ok(Synthesis {
        kind,
        model,
        diagnostics,
    })
}

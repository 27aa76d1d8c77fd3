//! Translation pipeline: parse, build, freeze, infer, detect, synthesize.
//!
//! [`Translator`] owns the optional configuration and runs the stages in
//! order. Recoverable problems from every stage are gathered into
//! [`Translation::diagnostics`]; only the fatal tier and I/O failures
//! surface as errors.

use std::fmt;
use std::path::Path;

use crate::build::build_corpus;
use crate::config::PrismConfig;
use crate::error::{Diagnostic, TranslateError, TranslateResult};
use crate::infer::TypedCorpus;
use crate::prism::Model;
use crate::synth::{self, ModelKind, UnresolvedPolicy};
use crate::syntax::parse_productions;

/// Result of one translation run.
#[derive(Debug, Clone)]
pub struct Translation {
    pub kind: ModelKind,
    pub model: Model,
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model)
    }
}

/// Runs rule text through every stage.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    config: Option<PrismConfig>,
    policy: UnresolvedPolicy,
}

impl Translator {
    pub fn new(config: Option<PrismConfig>) -> Self {
        Self {
            config,
            policy: UnresolvedPolicy::default(),
        }
    }

    /// What the general synthesizer does with pairs whose probability
    /// variable cannot be resolved.
    pub fn with_unresolved_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> Option<&PrismConfig> {
        self.config.as_ref()
    }

    /// Translate flattened production text. `origin` names the source in
    /// diagnostics.
    pub fn translate_str(&self, src: &str, origin: &str) -> TranslateResult<Translation> {
        let parsed = parse_productions(src, origin);
        let mut diagnostics: Vec<Diagnostic> = parsed
            .errors
            .into_iter()
            .map(|e| {
                let d = Diagnostic::MalformedRule {
                    rule: e.production,
                    message: e.message,
                };
                d.emit();
                d
            })
            .collect();

        let (corpus, build_diagnostics) = build_corpus(&parsed.productions);
        diagnostics.extend(build_diagnostics);

        let typed = TypedCorpus::new(corpus);
        let synthesis = synth::synthesize(&typed, self.config.as_ref(), self.policy)?;
        diagnostics.extend(synthesis.diagnostics);

        tracing::info!(
            origin,
            kind = %synthesis.kind,
            rules = typed.corpus().rules().len(),
            modules = synthesis.model.modules.len(),
            diagnostics = diagnostics.len(),
            "translation finished"
        );
        Ok(Translation {
            kind: synthesis.kind,
            model: synthesis.model,
            diagnostics,
        })
    }

    /// Read a rule file and translate it.
    pub fn translate_path(&self, rules: impl AsRef<Path>) -> TranslateResult<Translation> {
        let rules = rules.as_ref();
        let src = std::fs::read_to_string(rules).map_err(|source| TranslateError::Read {
            path: rules.display().to_string(),
            source,
        })?;
        self.translate_str(&src, &rules.display().to_string())
    }
}

/// Load the optional config, then translate `rules`.
pub fn translate_file(
    rules: impl AsRef<Path>,
    config: Option<&Path>,
) -> TranslateResult<Translation> {
    let config = config.map(PrismConfig::load).transpose()?;
    Translator::new(config).translate_path(rules)
}

/// Write the rendered model to `path`.
pub fn write_model(translation: &Translation, path: impl AsRef<Path>) -> TranslateResult<()> {
    let path = path.as_ref();
    std::fs::write(path, translation.to_string()).map_err(|source| TranslateError::Write {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), "model written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_rules_are_reported_and_skipped() {
        let src = r#"
sp {propose*go
   (state <s> ^level 1)
-->
   (<s> ^operator <o> +) (<o> ^name go)
}
sp {broken
   (state <s> ^level
}
sp {apply*go
   (state <s> ^operator.name go)
-->
   (<s> ^level 2 ^go-prob 0.5)
}
"#;
        let t = Translator::default().translate_str(src, "inline").unwrap();
        assert_eq!(t.kind, ModelKind::General);
        assert!(
            t.diagnostics
                .iter()
                .any(|d| matches!(d, Diagnostic::MalformedRule { rule, .. } if rule == "broken"))
        );
        let text = t.to_string();
        assert!(text.contains("state_go_prob: (state_level'=2)"), "{text}");
    }

    #[test]
    fn unresolved_policy_is_applied() {
        let src = r#"
sp {propose*go (state <s> ^level 1) --> (<s> ^operator <o> +) (<o> ^name go)}
sp {apply*go (state <s> ^operator.name go) --> (<s> ^level 2)}
"#;
        let skipped = Translator::default().translate_str(src, "inline").unwrap();
        assert!(
            skipped
                .diagnostics
                .contains(&Diagnostic::UnresolvedProbability {
                    rule: "propose*go".into()
                })
        );
        let kept = Translator::default()
            .with_unresolved_policy(UnresolvedPolicy::Certain)
            .translate_str(src, "inline")
            .unwrap();
        assert!(kept.to_string().contains("1.0: (state_level'=2)"));
    }

    #[test]
    fn missing_rule_file_is_a_read_error() {
        let err = translate_file("/nonexistent/rules.soar", None).unwrap_err();
        assert!(matches!(err, TranslateError::Read { .. }));
    }
}

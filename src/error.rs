//! Rich diagnostic error types for the translator.
//!
//! Errors come in two tiers. Fatal conditions are `thiserror` enums with
//! miette `#[diagnostic]` derives carrying a code and help text. Recoverable
//! conditions (a rule, pair or module that had to be dropped) are
//! [`Diagnostic`] values collected alongside the translated model so a large,
//! imperfect corpus still yields partial output.

use miette::{NamedSource, SourceSpan};
use thiserror::Error;

/// Top-level error type for a translation run.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain through to the CLI report.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum TranslateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("failed to read rule corpus {path}: {source}")]
    #[diagnostic(
        code(soar::io::read),
        help("Check that the rule corpus path exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write model to {path}: {source}")]
    #[diagnostic(
        code(soar::io::write),
        help("Check that the output directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for whole-pipeline operations.
pub type TranslateResult<T> = std::result::Result<T, TranslateError>;

// ---------------------------------------------------------------------------
// Syntax errors
// ---------------------------------------------------------------------------

/// A malformed production. The parser recovers at the next `sp {`.
#[derive(Debug, Error, miette::Diagnostic)]
#[error("syntax error in {production}: {message}")]
#[diagnostic(
    code(soar::syntax::malformed),
    help(
        "Productions must have the shape `sp {{name (conditions) --> (actions)}}`. \
         The production was skipped and translation continued."
    )
)]
pub struct SyntaxError {
    /// Name of the production being parsed, or `<top level>`.
    pub production: String,
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: SourceSpan,
}

impl SyntaxError {
    pub fn new(
        production: impl Into<String>,
        message: impl Into<String>,
        origin: &str,
        source: &str,
        span: std::ops::Range<usize>,
    ) -> Self {
        Self {
            production: production.into(),
            message: message.into(),
            src: NamedSource::new(origin, source.to_string()),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
        }
    }
}

/// Result type for syntax operations.
pub type SyntaxResult<T> = std::result::Result<T, SyntaxError>;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, miette::Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    #[diagnostic(
        code(soar::config::io),
        help("Check that the configuration path exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration JSON: {source}")]
    #[diagnostic(
        code(soar::config::json),
        help(
            "The configuration must be a JSON object with optional keys \
             `model`, `constants`, `sicknessProbabilityTable`, `responseSelect`, \
             `responseDecide`, `decisionErrorDistributions` and `modules`."
        )
    )]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid rule pattern '{pattern}' in module '{module}': {source}")]
    #[diagnostic(
        code(soar::config::pattern),
        help("`soarRulePatterns` entries are regular expressions matched against whole rule names.")
    )]
    Pattern {
        module: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Synthesis errors (fatal tier)
// ---------------------------------------------------------------------------

/// Conditions under which any default would silently produce a
/// probabilistically wrong model, so translation refuses to emit one.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum SynthesisError {
    #[error("cannot determine the sampling interval for the temporal model")]
    #[diagnostic(
        code(soar::synth::no_sampling_interval),
        help(
            "No literal time values were found in rules guarded on `{time_variable}`, \
             and no `model.sicknessSamplingInterval` was configured. Add time-counter \
             comparisons to the rules or pass a configuration file that sets the interval."
        )
    )]
    NoSamplingInterval { time_variable: String },

    #[error("cannot find the clock-progression probability constant `pdf1`")]
    #[diagnostic(
        code(soar::synth::no_clock_probability),
        help(
            "Provide one of: a `pdf1` value or a `*thres*` threshold in the rules, \
             a `pdf1` entry in the configuration `constants`, or a \
             `sicknessProbabilityTable` with entries like \"0,0,0\" (time,current,next)."
        )
    )]
    NoClockProbability,

    #[error("cannot find the initial value of the mode variable `{variable}`")]
    #[diagnostic(
        code(soar::synth::no_initial_mode),
        help(
            "Tried, in order: the `apply*initialize` assignment, the configuration \
             constant `initialAction`, and inference from transition rules (max mode + 1). \
             Provide the initial mode in one of these places."
        )
    )]
    NoInitialMode { variable: String },
}

/// Result type for synthesis operations.
pub type SynthesisResult<T> = std::result::Result<T, SynthesisError>;

// ---------------------------------------------------------------------------
// Recoverable diagnostics
// ---------------------------------------------------------------------------

/// A recoverable problem: the affected rule, pair or module was dropped and
/// translation continued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("{rule}: production skipped: {message}")]
    MalformedRule { rule: String, message: String },

    #[error("{rule}: identifier {identifier} is never bound to a working-memory path")]
    UnresolvedIdentifier { rule: String, identifier: String },

    #[error("{rule}: condition on {identifier} has no enclosing context")]
    UnresolvedContext { rule: String, identifier: String },

    #[error("{rule}: unsupported value for {variable}: {value}")]
    UnsupportedValue {
        rule: String,
        variable: String,
        value: String,
    },

    #[error("{rule}: no matching apply rule")]
    UnpairedPropose { rule: String },

    #[error("{rule}: no probability variable could be resolved")]
    UnresolvedProbability { rule: String },

    #[error("transition family {family} skipped: {reason}")]
    SkippedFamily { family: String, reason: String },

    #[error("module {module} skipped: {reason}")]
    SkippedModule { module: String, reason: String },
}

impl Diagnostic {
    /// Log this diagnostic at `warn` level.
    pub fn emit(&self) {
        tracing::warn!(diagnostic = %self, "recoverable translation problem");
    }
}

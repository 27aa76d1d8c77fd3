//! Optional JSON configuration: supplementary constants, distributions and
//! time parameters for the temporal synthesizer.
//!
//! Every key is optional. Accessors apply the documented defaults, except
//! for the sampling interval, whose absence is meaningful: the temporal
//! synthesizer refuses to guess it.

use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::model::prism_var;

pub const DEFAULT_MODEL_TYPE: &str = "dtmc";
pub const DEFAULT_MAX_ERROR_COUNT: i64 = 5;
pub const DEFAULT_EXPERIMENT_DURATION: i64 = 1200;
pub const DEFAULT_SICKNESS_LEVELS: i64 = 2;
pub const DEFAULT_TIME_VARIABLE: &str = "time-counter";

/// `model { ... }` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    #[serde(rename = "type")]
    pub model_type: Option<String>,
    pub max_error_count: Option<i64>,
    pub experiment_duration: Option<i64>,
    pub sickness_sampling_interval: Option<i64>,
    pub sickness_levels: Option<i64>,
    pub time_variable: Option<String>,
}

/// A `constants` entry: JSON number or string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ConstantValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstantValue::Int(i) => Some(*i as f64),
            ConstantValue::Float(x) => Some(*x),
            ConstantValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstantValue::Int(i) => Some(*i),
            ConstantValue::Float(_) => None,
            ConstantValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StateProb {
    pub state: i64,
    pub probability: f64,
}

/// Response-latency distribution over discrete response states.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Distribution {
    pub probabilities: Vec<StateProb>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDistribution {
    pub correct_probability: f64,
    pub error_probability: f64,
}

/// A module variable entry; overrides the range and initial value of the
/// temporal state variable with the same name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VariableConfig {
    pub name: String,
    /// `"lo..hi"`, optionally bracketed.
    pub range: Option<String>,
    pub init: Option<String>,
}

impl VariableConfig {
    pub fn upper_bound(&self) -> Option<i64> {
        let range = self.range.as_deref()?.trim();
        let range = range.trim_start_matches('[').trim_end_matches(']');
        let (_, hi) = range.split_once("..")?;
        hi.trim().parse().ok()
    }
}

/// A named group of rules, selected by whole-name regex patterns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleConfig {
    pub name: String,
    pub soar_rule_patterns: Vec<String>,
    pub variables: Vec<VariableConfig>,
    #[serde(skip)]
    compiled: Vec<Regex>,
}

impl ModuleConfig {
    fn compile(&mut self) -> ConfigResult<()> {
        self.compiled = self
            .soar_rule_patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{p})$")).map_err(|source| ConfigError::Pattern {
                    module: self.name.clone(),
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<ConfigResult<_>>()?;
        Ok(())
    }

    pub fn matches_rule(&self, rule: &str) -> bool {
        self.compiled.iter().any(|re| re.is_match(rule))
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrismConfig {
    pub model: ModelSettings,
    pub constants: IndexMap<String, ConstantValue>,
    /// `"time,current,next"` → probability.
    pub sickness_probability_table: IndexMap<String, f64>,
    pub response_select: IndexMap<String, Distribution>,
    pub response_decide: IndexMap<String, Distribution>,
    pub decision_error_distributions: IndexMap<String, ErrorDistribution>,
    pub modules: Vec<ModuleConfig>,
}

impl PrismConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::info!(
            path = %path.display(),
            constants = config.constants.len(),
            modules = config.modules.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let mut config: PrismConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Json { source })?;
        for module in &mut config.modules {
            module.compile()?;
        }
        Ok(config)
    }

    pub fn model_type(&self) -> &str {
        self.model.model_type.as_deref().unwrap_or(DEFAULT_MODEL_TYPE)
    }

    pub fn max_error_count(&self) -> i64 {
        self.model.max_error_count.unwrap_or(DEFAULT_MAX_ERROR_COUNT)
    }

    /// No default: `None` means "not configured".
    pub fn sampling_interval(&self) -> Option<i64> {
        self.model.sickness_sampling_interval.filter(|i| *i > 0)
    }

    pub fn sickness_levels(&self) -> i64 {
        self.model.sickness_levels.unwrap_or(DEFAULT_SICKNESS_LEVELS)
    }

    pub fn time_variable(&self) -> &str {
        self.model
            .time_variable
            .as_deref()
            .unwrap_or(DEFAULT_TIME_VARIABLE)
    }

    pub fn constant(&self, name: &str) -> Option<&ConstantValue> {
        self.constants.get(name)
    }

    /// First module whose patterns match the whole rule name.
    pub fn module_for_rule(&self, rule: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.matches_rule(rule))
    }

    /// Variable entry of any module, matched on its model name.
    pub fn variable(&self, name: &str) -> Option<&VariableConfig> {
        let wanted = prism_var(name);
        self.modules
            .iter()
            .flat_map(|m| &m.variables)
            .find(|v| prism_var(&v.name) == wanted)
    }

    /// Probability of moving from level `current` to `next` at `time`.
    pub fn sickness_probability(&self, time: i64, current: i64, next: i64) -> Option<f64> {
        self.sickness_probability_table
            .get(&format!("{time},{current},{next}"))
            .copied()
    }
}

/// Window starts `0, interval, ..` not exceeding `total`.
pub fn time_windows(total: i64, interval: i64) -> Vec<i64> {
    if interval <= 0 {
        return vec![0];
    }
    (0..=total).step_by(interval as usize).collect()
}

/// The step before each following window: `t + interval - 1` for every
/// window `t` whose successor still fits inside `total`.
pub fn commit_times(total: i64, interval: i64) -> Vec<i64> {
    time_windows(total, interval)
        .into_iter()
        .filter(|t| t + interval <= total)
        .map(|t| t + interval - 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "model": {
            "type": "dtmc",
            "experimentDuration": 1200,
            "sicknessSamplingInterval": 300,
            "timeVariable": "time-counter"
        },
        "constants": { "pdf1": 0.95, "initialAction": 3, "label": "x" },
        "sicknessProbabilityTable": { "0,0,0": 0.9, "300,0,1": 0.2 },
        "responseSelect": {
            "sickness0": {
                "type": "discrete",
                "states": 3,
                "probabilities": [
                    { "state": 1, "probability": 0.5 },
                    { "state": 2, "probability": 0.5 }
                ]
            }
        },
        "decisionErrorDistributions": {
            "sickness0": { "correctProbability": 0.9, "errorProbability": 0.1 }
        },
        "modules": [
            { "name": "scan", "type": "transition", "soarRulePatterns": ["apply\\*apply-SS-.*"] },
            { "name": "monitor", "variables": [
                { "name": "sickness-checked", "type": "int", "range": "[0..2]", "init": "no" }
            ] }
        ]
    }"#;

    #[test]
    fn parses_all_sections() {
        let c = PrismConfig::from_json(SAMPLE).unwrap();
        assert_eq!(c.model_type(), "dtmc");
        assert_eq!(c.sampling_interval(), Some(300));
        assert_eq!(c.constant("pdf1").and_then(ConstantValue::as_f64), Some(0.95));
        assert_eq!(c.constant("initialAction").and_then(ConstantValue::as_i64), Some(3));
        assert_eq!(c.constant("label"), Some(&ConstantValue::Text("x".into())));
        assert_eq!(c.response_select["sickness0"].probabilities.len(), 2);
        assert!(c.response_decide.is_empty());
        assert_eq!(
            c.decision_error_distributions["sickness0"].error_probability,
            0.1
        );
    }

    #[test]
    fn defaults_apply_to_missing_keys() {
        let c = PrismConfig::from_json("{}").unwrap();
        assert_eq!(c.model_type(), DEFAULT_MODEL_TYPE);
        assert_eq!(c.max_error_count(), 5);
        assert_eq!(c.sickness_levels(), 2);
        assert_eq!(c.time_variable(), "time-counter");
        assert_eq!(c.sampling_interval(), None);
        assert!(c.variable("sick").is_none());
    }

    #[test]
    fn unused_keys_are_accepted() {
        let c = PrismConfig::from_json(
            r#"{"model": {"modelResolution": 0.5, "responseDuration": 30}, "extra": 1}"#,
        )
        .unwrap();
        assert_eq!(c.model, ModelSettings::default());
    }

    #[test]
    fn module_variables_match_model_names() {
        let c = PrismConfig::from_json(SAMPLE).unwrap();
        let v = c.variable("state_sickness_checked").unwrap();
        assert_eq!(v.upper_bound(), Some(2));
        assert_eq!(v.init.as_deref(), Some("no"));
        assert_eq!(c.variable("sickness_checked"), Some(v));
        let open = VariableConfig {
            range: Some("0..".into()),
            ..Default::default()
        };
        assert_eq!(open.upper_bound(), None);
    }

    #[test]
    fn rule_patterns_match_whole_names() {
        let c = PrismConfig::from_json(SAMPLE).unwrap();
        assert_eq!(
            c.module_for_rule("apply*apply-SS-transition").map(|m| m.name.as_str()),
            Some("scan")
        );
        assert!(c.module_for_rule("xapply*apply-SS-transition").is_none());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = PrismConfig::from_json(r#"{"modules":[{"name":"m","soarRulePatterns":["("]}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { ref module, .. } if module == "m"));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = PrismConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn probability_table_lookup() {
        let c = PrismConfig::from_json(SAMPLE).unwrap();
        assert_eq!(c.sickness_probability(300, 0, 1), Some(0.2));
        assert_eq!(c.sickness_probability(600, 0, 1), None);
    }

    #[test]
    fn windows_and_commits() {
        assert_eq!(time_windows(1200, 300), vec![0, 300, 600, 900, 1200]);
        assert_eq!(commit_times(1200, 300), vec![299, 599, 899, 1199]);
        assert_eq!(time_windows(10, 0), vec![0]);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();
        assert!(PrismConfig::load(&path).is_ok());
        let missing = PrismConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}

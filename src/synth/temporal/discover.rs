//! Discovery of everything the temporal model is parameterized by: state
//! variable names and ranges, transition families, the clock bound, the
//! sampling interval, the clock-progression probability and the initial
//! mode.

use crate::config::{ConstantValue, DEFAULT_EXPERIMENT_DURATION, PrismConfig};
use crate::error::{Diagnostic, SynthesisError, SynthesisResult};
use crate::model::{Assignment, Corpus, Guard, Rule, normalize, prism_var};
use crate::synth::resolve::{Strategy, first_match};

pub const DEFAULT_MODE: &str = "action";
pub const DEFAULT_MONITORED: &str = "sick";
pub const DEFAULT_ROLE: &str = "name";
pub const DEFAULT_SAMPLE: &str = "ts";
pub const DEFAULT_CHECKED: &str = "sickness_checked";

/// Mode range used when no transition family constrains it.
const DEFAULT_MODE_MAX: i64 = 3;

// ---------------------------------------------------------------------------
// State variables
// ---------------------------------------------------------------------------

/// One top-state variable taken from the initializer rule.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVar {
    /// Model name, e.g. `sickness_checked`.
    pub name: String,
    /// Corpus key, e.g. `state_sickness_checked`.
    pub key: String,
    pub max: i64,
    pub init: i64,
}

impl StateVar {
    fn fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key: prism_var(name),
            max: 1,
            init: 0,
        }
    }
}

/// The five roles the temporal model needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVars {
    pub mode: StateVar,
    pub monitored: StateVar,
    pub role: StateVar,
    pub sample: StateVar,
    pub checked: StateVar,
}

/// Initial value of an initializer literal.
pub fn parse_init_value(value: &str) -> Option<i64> {
    match value.to_lowercase().as_str() {
        "yes" | "true" => Some(1),
        "no" | "false" => Some(0),
        "mission-monitor" | "mission_monitor" => Some(0),
        "sickness-monitor" | "sickness_monitor" => Some(1),
        other => other.parse().ok(),
    }
}

/// Initializer variables in assignment order, without the clock ones.
pub fn initializer_vars(corpus: &Corpus, time_key: &str) -> Vec<StateVar> {
    let Some(init) = corpus.initializer() else {
        return Vec::new();
    };
    init.assignments
        .iter()
        .filter(|(key, _)| !key.contains("total_time") && key.as_str() != time_key)
        .filter_map(|(key, assignment)| {
            let init = parse_init_value(assignment.literal()?)?;
            let seen = corpus
                .variable(key)
                .and_then(|v| v.int_values().last().copied())
                .unwrap_or(init);
            let max = seen.max(init).max(1);
            let name = key.strip_prefix("state_").unwrap_or(key).to_string();
            Some(StateVar {
                name,
                key: key.clone(),
                max,
                init,
            })
        })
        .collect()
}

/// Assign roles by name conventions. Every variable is checked against
/// every role and the last match wins.
pub fn assign_roles(vars: &[StateVar]) -> StateVars {
    let mut mode = None;
    let mut monitored = None;
    let mut role = None;
    let mut sample = None;
    let mut checked = None;
    for v in vars {
        let n = v.name.as_str();
        if n.contains("action") {
            mode = Some(v);
        }
        if n.contains("sick") && !n.contains("checked") {
            monitored = Some(v);
        }
        if n.contains("name") {
            role = Some(v);
        }
        if n.contains("ts") || (n.contains("temp") && n.contains("sick")) {
            sample = Some(v);
        }
        if n.contains("checked") || (n.contains("sickness") && n.contains("check")) {
            checked = Some(v);
        }
    }
    let mode = mode.or_else(|| vars.iter().find(|v| v.max > 1));

    let pick = |found: Option<&StateVar>, default: &str| {
        found
            .cloned()
            .unwrap_or_else(|| StateVar::fallback(default))
    };
    let mut out = StateVars {
        mode: pick(mode, DEFAULT_MODE),
        monitored: pick(monitored, DEFAULT_MONITORED),
        role: pick(role, DEFAULT_ROLE),
        sample: pick(sample, DEFAULT_SAMPLE),
        checked: pick(checked, DEFAULT_CHECKED),
    };

    // one variable cannot fill two roles
    let mut taken = vec![out.mode.name.clone()];
    for (slot, default) in [
        (&mut out.monitored, DEFAULT_MONITORED),
        (&mut out.role, DEFAULT_ROLE),
        (&mut out.sample, DEFAULT_SAMPLE),
        (&mut out.checked, DEFAULT_CHECKED),
    ] {
        if taken.contains(&slot.name) {
            *slot = StateVar::fallback(default);
        }
        taken.push(slot.name.clone());
    }
    out
}

/// Config adjustments: level ranges widen to `sicknessLevels`, and a module
/// variable entry replaces a role's upper bound and initial value.
pub fn apply_config(vars: &mut StateVars, config: &PrismConfig) {
    let top_level = config.sickness_levels() - 1;
    for slot in [&mut vars.monitored, &mut vars.sample] {
        slot.max = slot.max.max(top_level);
    }
    for slot in [
        &mut vars.mode,
        &mut vars.monitored,
        &mut vars.role,
        &mut vars.sample,
        &mut vars.checked,
    ] {
        let Some(entry) = config.variable(&slot.key) else {
            continue;
        };
        if let Some(max) = entry.upper_bound() {
            slot.max = max.max(1);
        }
        if let Some(init) = entry.init.as_deref().and_then(parse_init_value) {
            slot.init = init;
        }
        tracing::debug!(variable = %slot.name, max = slot.max, init = slot.init, "config override");
    }
}

// ---------------------------------------------------------------------------
// Transition families
// ---------------------------------------------------------------------------

/// One `apply*apply-<X>-transition` rule with its propose rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Family {
    /// `<X>`, e.g. `SS`.
    pub label: String,
    /// Module name, e.g. `ss_transition`.
    pub module: String,
    pub apply_rule: String,
    pub propose_rule: Option<String>,
    pub sources: Vec<i64>,
    pub target: i64,
    /// Completion probability parameter and its value.
    pub probability: Option<(String, f64)>,
}

impl Family {
    pub fn done_var(&self) -> String {
        format!("{}_done", self.module)
    }

    pub fn ing_var(&self) -> String {
        format!("{}_ing", self.module)
    }
}

/// Conventional targets when the apply rule does not assign the mode.
fn conventional_target(label: &str) -> Option<i64> {
    match label {
        "SS" => Some(0),
        "D" => Some(1),
        "DD" => Some(2),
        _ => None,
    }
}

fn propose_rule_for<'a>(corpus: &'a Corpus, label: &str) -> Option<&'a Rule> {
    corpus
        .rule(&format!("propose*apply-{label}-transition"))
        .or_else(|| corpus.rule(&format!("propose*{label}-transition")))
}

/// Source modes from the propose rule's guard on the mode variable.
fn source_modes(propose: &Rule, mode_key: &str) -> Vec<i64> {
    for guard in propose.guards_on(mode_key) {
        match guard {
            Guard::OneOf {
                values,
                negated: false,
                ..
            } => return values.iter().filter_map(|v| v.parse().ok()).collect(),
            g => {
                if let Some(v) = g.equals_literal().and_then(|v| v.parse().ok()) {
                    return vec![v];
                }
            }
        }
    }
    Vec::new()
}

/// Value of a probability parameter from corpus literals, then config.
pub fn parameter_value(corpus: &Corpus, config: Option<&PrismConfig>, name: &str) -> Option<f64> {
    let suffix = format!("_{}", normalize(name));
    let from_corpus = corpus
        .variables()
        .values()
        .filter(|v| v.name.ends_with(&suffix))
        .flat_map(|v| v.literals())
        .find_map(|v| v.parse::<f64>().ok());
    from_corpus.or_else(|| config?.constant(name).and_then(ConstantValue::as_f64))
}

/// Every transition family in rule order; families that cannot be modeled
/// are dropped with a diagnostic.
pub fn families(
    corpus: &Corpus,
    config: Option<&PrismConfig>,
    mode_key: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Family> {
    let mut out = Vec::new();
    for apply in corpus.rules() {
        let Some(label) = apply
            .name
            .strip_prefix("apply*apply-")
            .and_then(|rest| rest.strip_suffix("-transition"))
        else {
            continue;
        };
        let mut skip = |reason: &str| {
            let d = Diagnostic::SkippedFamily {
                family: label.to_string(),
                reason: reason.to_string(),
            };
            d.emit();
            diagnostics.push(d);
        };

        let target = apply
            .assigned_literal(mode_key)
            .and_then(|v| v.parse().ok())
            .or_else(|| conventional_target(label));
        let Some(target) = target else {
            skip("the apply rule does not set the mode and the label has no conventional target");
            continue;
        };

        let propose = propose_rule_for(corpus, label);
        let sources = propose.map(|p| source_modes(p, mode_key)).unwrap_or_default();
        if sources.is_empty() {
            skip("no propose rule tests the mode variable");
            continue;
        }

        let pdf = propose.and_then(|p| {
            p.referenced_attrs
                .iter()
                .find(|a| a.starts_with("pdf"))
                .cloned()
        });
        let probability = match pdf {
            Some(name) => match parameter_value(corpus, config, &name) {
                Some(p) if p > 0.0 && p <= 1.0 => Some((name, p)),
                _ => {
                    let d = Diagnostic::UnresolvedProbability {
                        rule: propose.map_or(apply.name.clone(), |p| p.name.clone()),
                    };
                    d.emit();
                    diagnostics.push(d);
                    None
                }
            },
            None => None,
        };

        let module = config
            .and_then(|c| c.module_for_rule(&apply.name))
            .map(|m| normalize(&m.name))
            .unwrap_or_else(|| format!("{}_transition", normalize(&label.to_lowercase())));

        tracing::debug!(
            family = label,
            module = %module,
            ?sources,
            target,
            probabilistic = probability.is_some(),
            "transition family discovered"
        );
        out.push(Family {
            label: label.to_string(),
            module,
            apply_rule: apply.name.clone(),
            propose_rule: propose.map(|p| p.name.clone()),
            sources,
            target,
            probability,
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Resolver chains
// ---------------------------------------------------------------------------

/// Inputs shared by the temporal resolver chains.
pub struct Facts<'a> {
    pub corpus: &'a Corpus,
    pub config: Option<&'a PrismConfig>,
    /// Qualified clock variable, e.g. `state_time_counter`.
    pub time_key: String,
    pub total_time: i64,
    pub mode_key: String,
    pub families: &'a [Family],
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 { a.abs() } else { gcd(b, a % b) }
}

/// Greatest common divisor of the gaps between distinct literal times.
pub fn interval_from_times(mut times: Vec<i64>) -> Option<i64> {
    times.sort_unstable();
    times.dedup();
    let g = times.windows(2).fold(0, |acc, w| gcd(acc, w[1] - w[0]));
    (g > 0).then_some(g)
}

fn corpus_time_literals(f: &Facts<'_>) -> Option<i64> {
    let mut times = Vec::new();
    for rule in f.corpus.rules() {
        for g in rule.guards_on(&f.time_key) {
            times.extend(g.literals().iter().filter_map(|v| v.parse::<i64>().ok()));
        }
        if let Some(v) = rule.assigned_literal(&f.time_key).and_then(|v| v.parse().ok()) {
            times.push(v);
        }
    }
    times.retain(|t| *t > 0 && *t <= f.total_time);
    interval_from_times(times)
}

fn configured_interval(f: &Facts<'_>) -> Option<i64> {
    f.config?.sampling_interval()
}

pub fn interval_strategies<'a>() -> [Strategy<Facts<'a>, i64>; 2] {
    [
        Strategy {
            name: "corpus-time-literals",
            run: corpus_time_literals,
        },
        Strategy {
            name: "config-interval",
            run: configured_interval,
        },
    ]
}

fn corpus_pdf1(f: &Facts<'_>) -> Option<f64> {
    parameter_value(f.corpus, None, "pdf1")
}

fn corpus_threshold(f: &Facts<'_>) -> Option<f64> {
    f.corpus
        .variables()
        .values()
        .filter(|v| v.name.contains("thres"))
        .flat_map(|v| v.literals())
        .find_map(|v| v.parse::<f64>().ok())
        .map(|t| 1.0 - t)
}

fn configured_pdf1(f: &Facts<'_>) -> Option<f64> {
    f.config?.constant("pdf1").and_then(ConstantValue::as_f64)
}

fn table_origin(f: &Facts<'_>) -> Option<f64> {
    f.config?.sickness_probability(0, 0, 0)
}

fn table_first_healthy(f: &Facts<'_>) -> Option<f64> {
    f.config?
        .sickness_probability_table
        .iter()
        .find(|(k, _)| k.ends_with(",0,0"))
        .map(|(_, p)| *p)
}

pub fn clock_probability_strategies<'a>() -> [Strategy<Facts<'a>, f64>; 5] {
    [
        Strategy {
            name: "corpus-pdf1",
            run: corpus_pdf1,
        },
        Strategy {
            name: "corpus-threshold",
            run: corpus_threshold,
        },
        Strategy {
            name: "config-pdf1",
            run: configured_pdf1,
        },
        Strategy {
            name: "config-table-origin",
            run: table_origin,
        },
        Strategy {
            name: "config-table-first-healthy",
            run: table_first_healthy,
        },
    ]
}

fn initializer_mode(f: &Facts<'_>) -> Option<i64> {
    f.corpus
        .initializer()?
        .assigned_literal(&f.mode_key)
        .and_then(parse_init_value)
}

fn configured_mode(f: &Facts<'_>) -> Option<i64> {
    let config = f.config?;
    config
        .constant("initialAction")
        .and_then(ConstantValue::as_i64)
        .or_else(|| {
            config
                .variable(&f.mode_key)?
                .init
                .as_deref()
                .and_then(parse_init_value)
        })
}

fn after_max_transition_mode(f: &Facts<'_>) -> Option<i64> {
    f.families
        .iter()
        .flat_map(|fam| fam.sources.iter().copied().chain([fam.target]))
        .max()
        .map(|m| m + 1)
}

pub fn initial_mode_strategies<'a>() -> [Strategy<Facts<'a>, i64>; 3] {
    [
        Strategy {
            name: "initializer",
            run: initializer_mode,
        },
        Strategy {
            name: "config-initial-action",
            run: configured_mode,
        },
        Strategy {
            name: "max-transition-mode",
            run: after_max_transition_mode,
        },
    ]
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Inclusive mode range plus initial value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRange {
    pub low: i64,
    pub high: i64,
    pub init: i64,
}

/// Everything the module builders need, discovered once.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Model name of the clock, e.g. `time_counter`.
    pub time_var: String,
    pub total_time: i64,
    pub interval: i64,
    pub interval_source: &'static str,
    pub windows: Vec<i64>,
    pub commits: Vec<i64>,
    pub vars: StateVars,
    pub mode: ModeRange,
    pub families: Vec<Family>,
    pub clock_probability: f64,
    pub select_trigger: i64,
    pub decide_trigger: Option<i64>,
}

/// Explicit config duration, then a corpus `total-time`, then the default.
pub fn total_time(corpus: &Corpus, config: Option<&PrismConfig>) -> i64 {
    if let Some(d) = config.and_then(|c| c.model.experiment_duration) {
        return d;
    }
    corpus
        .rules()
        .iter()
        .flat_map(|r| r.assignments.iter())
        .find_map(|(k, a)| match a {
            Assignment::Literal(v) if k.contains("total_time") => v.parse().ok(),
            _ => None,
        })
        .unwrap_or(DEFAULT_EXPERIMENT_DURATION)
}

fn is_decide_label(label: &str) -> bool {
    let l = label.to_lowercase();
    (l == "d" || l.starts_with("d-")) && !l.contains("dd")
}

fn is_select_label(label: &str) -> bool {
    let l = label.to_lowercase();
    l == "ss" || l.contains("scan")
}

pub fn discover(
    corpus: &Corpus,
    config: Option<&PrismConfig>,
    time_variable: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> SynthesisResult<Plan> {
    let time_key = prism_var(time_variable);
    let time_var = normalize(time_variable);
    let total_time = total_time(corpus, config);

    let mut vars = assign_roles(&initializer_vars(corpus, &time_key));
    if let Some(config) = config {
        apply_config(&mut vars, config);
    }
    let families = families(corpus, config, &vars.mode.key, diagnostics);

    let facts = Facts {
        corpus,
        config,
        time_key,
        total_time,
        mode_key: vars.mode.key.clone(),
        families: &families,
    };

    let (interval_source, interval) = first_match("sampling interval", &interval_strategies(), &facts)
        .ok_or_else(|| SynthesisError::NoSamplingInterval {
            time_variable: time_variable.to_string(),
        })?;
    let (_, clock_probability) =
        first_match("clock probability", &clock_probability_strategies(), &facts)
            .ok_or(SynthesisError::NoClockProbability)?;
    let (_, init) = first_match("initial mode", &initial_mode_strategies(), &facts).ok_or_else(
        || SynthesisError::NoInitialMode {
            variable: vars.mode.name.clone(),
        },
    )?;

    let modes: Vec<i64> = families
        .iter()
        .flat_map(|f| f.sources.iter().copied().chain([f.target]))
        .collect();
    let (low, high) = match (modes.iter().min(), modes.iter().max()) {
        (Some(lo), Some(hi)) => (*lo, *hi),
        _ => (0, vars.mode.max.max(DEFAULT_MODE_MAX)),
    };
    let mode = ModeRange {
        low: low.min(init),
        high: high.max(init),
        init,
    };

    let select_trigger = families
        .iter()
        .find(|f| is_select_label(&f.label))
        .and_then(|f| f.sources.first().copied())
        .unwrap_or(mode.high);
    let decide_trigger = families
        .iter()
        .find(|f| is_decide_label(&f.label))
        .and_then(|f| f.sources.iter().copied().find(|s| *s >= 0));

    let windows = crate::config::time_windows(total_time, interval);
    let commits: Vec<i64> = crate::config::commit_times(total_time, interval)
        .into_iter()
        .filter(|c| !windows.contains(c))
        .collect();

    tracing::info!(
        total_time,
        interval,
        interval_source,
        windows = windows.len(),
        families = families.len(),
        mode_low = mode.low,
        mode_high = mode.high,
        mode_init = mode.init,
        "temporal plan discovered"
    );

    Ok(Plan {
        time_var,
        total_time,
        interval,
        interval_source,
        windows,
        commits,
        vars,
        mode,
        families,
        clock_probability,
        select_trigger,
        decide_trigger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_corpus;
    use crate::syntax::parse_productions;

    fn corpus(src: &str) -> Corpus {
        let out = parse_productions(src, "test.soar");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        build_corpus(&out.productions).0
    }

    const INIT: &str = r#"
sp {propose*initialize
   (state <s> ^superstate nil -^name)
-->
   (<s> ^operator <o> +) (<o> ^name initialize)
}
sp {apply*initialize
   (state <s> ^operator.name initialize)
-->
   (<s> ^name mission-monitor ^action 3 ^sick 0 ^ts 0 ^sickness-checked no
        ^time-counter 0 ^total-time 1200 ^pdf1 0.95)
}
"#;

    const FAMILIES: &str = r#"
sp {propose*apply-SS-transition
   (state <s> ^action << 3 2 >> ^io.input-link <il>)
   (<il> ^pdf2 <p>)
-->
   (<s> ^operator <o> +) (<o> ^name apply-SS-transition)
}
sp {apply*apply-SS-transition
   (state <s> ^operator.name apply-SS-transition ^action <a>)
-->
   (<s> ^action <a> - 0 +)
}
sp {propose*D-transition
   (state <s> ^action 0)
-->
   (<s> ^operator <o> +) (<o> ^name apply-D-transition)
}
sp {apply*apply-D-transition
   (state <s> ^operator.name apply-D-transition)
-->
   (<s> ^action 1)
}
sp {propose*tick
   (state <s> ^time-counter { <t> < 1200 })
-->
   (<s> ^operator <o> +) (<o> ^name tick)
}
sp {elaborate*window
   (state <s> ^time-counter << 300 600 900 >>)
-->
   (<s> ^window yes)
}
"#;

    #[test]
    fn init_values() {
        assert_eq!(parse_init_value("yes"), Some(1));
        assert_eq!(parse_init_value("False"), Some(0));
        assert_eq!(parse_init_value("mission-monitor"), Some(0));
        assert_eq!(parse_init_value("sickness-monitor"), Some(1));
        assert_eq!(parse_init_value("7"), Some(7));
        assert_eq!(parse_init_value("other"), None);
    }

    #[test]
    fn roles_from_initializer() {
        let c = corpus(INIT);
        let vars = initializer_vars(&c, "state_time_counter");
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        // `pdf1` is a real number, not mode state
        assert_eq!(names, vec!["name", "action", "sick", "ts", "sickness_checked"]);
        let roles = assign_roles(&vars);
        assert_eq!(roles.mode.name, "action");
        assert_eq!(roles.mode.init, 3);
        assert_eq!(roles.monitored.name, "sick");
        assert_eq!(roles.role.name, "name");
        assert_eq!(roles.sample.name, "ts");
        assert_eq!(roles.checked.name, "sickness_checked");
        assert_eq!(roles.checked.max, 1);
    }

    #[test]
    fn roles_default_without_initializer() {
        let roles = assign_roles(&[]);
        assert_eq!(roles.mode.name, DEFAULT_MODE);
        assert_eq!(roles.checked.key, "state_sickness_checked");
    }

    #[test]
    fn config_overrides_role_ranges() {
        let c = corpus(INIT);
        let mut roles = assign_roles(&initializer_vars(&c, "state_time_counter"));
        let config = PrismConfig::from_json(
            r#"{
              "model": {"sicknessLevels": 4},
              "modules": [{"name": "monitor", "variables": [
                {"name": "ts", "range": "0..5", "init": "2"},
                {"name": "sickness-checked", "init": "yes"}
              ]}]
            }"#,
        )
        .unwrap();
        apply_config(&mut roles, &config);
        assert_eq!(roles.monitored.max, 3);
        assert_eq!((roles.sample.max, roles.sample.init), (5, 2));
        assert_eq!((roles.checked.max, roles.checked.init), (1, 1));
        assert_eq!(roles.mode.init, 3);
    }

    #[test]
    fn configured_variable_supplies_initial_mode() {
        let c = corpus(FAMILIES);
        let config = PrismConfig::from_json(
            r#"{"modules": [{"name": "m", "variables": [{"name": "action", "init": "2"}]}]}"#,
        )
        .unwrap();
        let mut diags = Vec::new();
        let fams = families(&c, Some(&config), "state_action", &mut diags);
        let facts = Facts {
            corpus: &c,
            config: Some(&config),
            time_key: "state_time_counter".into(),
            total_time: 1200,
            mode_key: "state_action".into(),
            families: &fams,
        };
        assert_eq!(configured_mode(&facts), Some(2));
    }

    #[test]
    fn families_from_rules() {
        let c = corpus(&format!("{INIT}{FAMILIES}"));
        let mut diags = Vec::new();
        let fams = families(&c, None, "state_action", &mut diags);
        assert_eq!(
            diags,
            vec![Diagnostic::UnresolvedProbability {
                rule: "propose*apply-SS-transition".into()
            }]
        );
        assert_eq!(fams.len(), 2);
        assert_eq!(fams[0].label, "SS");
        assert_eq!(fams[0].module, "ss_transition");
        assert_eq!(fams[0].sources, vec![3, 2]);
        assert_eq!(fams[0].target, 0);
        assert_eq!(fams[1].label, "D");
        assert_eq!(fams[1].sources, vec![0]);
        assert_eq!(fams[1].target, 1);
        assert_eq!(fams[1].propose_rule.as_deref(), Some("propose*D-transition"));
    }

    #[test]
    fn pdf_without_value_degrades_to_deterministic() {
        let c = corpus(&format!("{INIT}{FAMILIES}"));
        let mut diags = Vec::new();
        let fams = families(&c, None, "state_action", &mut diags);
        assert_eq!(fams[0].probability, None);

        let config = PrismConfig::from_json(r#"{"constants":{"pdf2":0.4}}"#).unwrap();
        let mut diags = Vec::new();
        let fams = families(&c, Some(&config), "state_action", &mut diags);
        assert_eq!(fams[0].probability, Some(("pdf2".to_string(), 0.4)));
    }

    #[test]
    fn interval_is_gcd_of_gaps() {
        assert_eq!(interval_from_times(vec![300, 600, 900, 1200]), Some(300));
        assert_eq!(interval_from_times(vec![600, 200, 1000]), Some(400));
        assert_eq!(interval_from_times(vec![300]), None);
        assert_eq!(interval_from_times(vec![]), None);
    }

    #[test]
    fn plan_from_corpus() {
        let c = corpus(&format!("{INIT}{FAMILIES}"));
        let mut diags = Vec::new();
        let plan = discover(&c, None, "time-counter", &mut diags).unwrap();
        assert_eq!(plan.total_time, 1200);
        assert_eq!(plan.interval, 300);
        assert_eq!(plan.interval_source, "corpus-time-literals");
        assert_eq!(plan.windows, vec![0, 300, 600, 900, 1200]);
        assert_eq!(plan.commits, vec![299, 599, 899, 1199]);
        assert_eq!(plan.clock_probability, 0.95);
        assert_eq!(plan.mode, ModeRange { low: 0, high: 3, init: 3 });
        assert_eq!(plan.select_trigger, 3);
        assert_eq!(plan.decide_trigger, Some(0));
        assert_eq!(plan.time_var, "time_counter");
    }

    #[test]
    fn missing_interval_is_fatal() {
        let c = corpus(INIT);
        let mut diags = Vec::new();
        let err = discover(&c, None, "time-counter", &mut diags).unwrap_err();
        assert!(matches!(err, SynthesisError::NoSamplingInterval { .. }));

        let config = PrismConfig::from_json(
            r#"{"model":{"sicknessSamplingInterval":300},"constants":{"initialAction":3}}"#,
        )
        .unwrap();
        let plan = discover(&c, Some(&config), "time-counter", &mut diags).unwrap();
        assert_eq!(plan.interval_source, "config-interval");
    }

    #[test]
    fn clock_probability_chain() {
        let thres = corpus(
            r#"
sp {apply*initialize
   (state <s> ^operator.name initialize)
-->
   (<s> ^action 1 ^sick-thres 0.2 ^time-counter 0)
}
sp {elaborate*w (state <s> ^time-counter << 5 10 >>) --> (<s> ^w 1)}
"#,
        );
        let mut diags = Vec::new();
        let plan = discover(&thres, None, "time-counter", &mut diags).unwrap();
        assert!((plan.clock_probability - 0.8).abs() < 1e-12);

        let bare = corpus(
            r#"
sp {apply*initialize
   (state <s> ^operator.name initialize)
-->
   (<s> ^action 1 ^time-counter 0)
}
sp {elaborate*w (state <s> ^time-counter << 5 10 >>) --> (<s> ^w 1)}
"#,
        );
        let err = discover(&bare, None, "time-counter", &mut diags).unwrap_err();
        assert!(matches!(err, SynthesisError::NoClockProbability));

        let table = PrismConfig::from_json(
            r#"{"sicknessProbabilityTable":{"5,0,1":0.1,"5,0,0":0.9}}"#,
        )
        .unwrap();
        let plan = discover(&bare, Some(&table), "time-counter", &mut diags).unwrap();
        assert_eq!(plan.clock_probability, 0.9);
    }

    #[test]
    fn missing_initial_mode_is_fatal() {
        let c = corpus(
            r#"
sp {elaborate*w (state <s> ^time-counter << 5 10 >> ^pdf1 0.9) --> (<s> ^w 1)}
"#,
        );
        let mut diags = Vec::new();
        let err = discover(&c, None, "time-counter", &mut diags).unwrap_err();
        assert!(matches!(err, SynthesisError::NoInitialMode { ref variable } if variable == "action"));
    }
}

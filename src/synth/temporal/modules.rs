//! Module builders for the temporal model.
//!
//! Each builder returns a module whose commands are mutually exclusive;
//! [`close`] then appends the no-op command for every remaining state, so
//! the module partitions its local state space.

use crate::config::{Distribution, ErrorDistribution, PrismConfig};
use crate::error::Diagnostic;
use crate::prism::{Branch, Command, Expr, Module, RewardItem, Rewards, Update, VarDecl};

use super::discover::{Family, Plan};

/// Shared synchronization label.
pub const SYNC: &str = "sync";
pub const TOTAL_TIME: &str = "TOTAL_TIME";
pub const MISSION_MONITOR: &str = "mission_monitor";
pub const SICKNESS_MONITOR: &str = "sickness_monitor";
pub const CLOCK_PROBABILITY: &str = "pdf1";

const RESPONSE_STATE: &str = "response_state";
const RESPONSE_TYPE: &str = "response_type";
const DECISION_CORRECT: &str = "decision_correct";
const ERROR_COUNT: &str = "error_count";
const ERROR_PENALTY: i64 = 10;

fn sync(guard: Expr, branches: Vec<Branch>) -> Command {
    Command::new(Some(SYNC), guard, branches)
}

fn set(updates: Vec<Update>) -> Vec<Branch> {
    vec![Branch::certain(updates)]
}

/// Append the no-op command for every state no other command covers.
pub fn close(mut module: Module) -> Module {
    let rest = Expr::not(module.guard_union());
    module.push(Command::idle(Some(SYNC), rest));
    module
}

fn time(plan: &Plan) -> Expr {
    Expr::var(&plan.time_var)
}

fn time_is(plan: &Plan, t: i64) -> Expr {
    Expr::eq(time(plan), Expr::int(t))
}

/// Probabilities rounded to six decimals with the last one taking the
/// remainder, so the rendered values sum to exactly 1.
pub fn normalized(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 || weights.iter().any(|w| *w < 0.0) {
        return None;
    }
    let round = |p: f64| (p * 1e6).round() / 1e6;
    let mut out: Vec<f64> = weights[..weights.len() - 1]
        .iter()
        .map(|w| round(w / total))
        .collect();
    let used: f64 = out.iter().sum();
    out.push(round((1.0 - used).max(0.0)));
    Some(out)
}

// ---------------------------------------------------------------------------
// Clock and mode
// ---------------------------------------------------------------------------

/// Step counter clamped at `TOTAL_TIME`.
pub fn clock(plan: &Plan) -> Module {
    let mut m = Module::new("time");
    m.vars.push(VarDecl::new(
        &plan.time_var,
        Expr::int(0),
        Expr::var(TOTAL_TIME),
        Expr::int(0),
    ));
    m.push(sync(
        Expr::lt(time(plan), Expr::var(TOTAL_TIME)),
        set(vec![Update::new(
            &plan.time_var,
            Expr::add(time(plan), Expr::int(1)),
        )]),
    ));
    m.push(Command::idle(
        Some(SYNC),
        Expr::eq(time(plan), Expr::var(TOTAL_TIME)),
    ));
    m
}

/// The mode variable moves to a family's target when exactly that family
/// is in progress.
pub fn mode(plan: &Plan) -> Module {
    let var = &plan.vars.mode.name;
    let mut m = Module::new("action_state");
    m.vars.push(VarDecl::new(
        var,
        Expr::int(plan.mode.low),
        Expr::int(plan.mode.high),
        Expr::int(plan.mode.init),
    ));
    for fam in &plan.families {
        let others = plan
            .families
            .iter()
            .filter(|o| o.module != fam.module)
            .map(|o| Expr::not(Expr::var_is(o.ing_var(), 1)));
        let guard = Expr::and(std::iter::once(Expr::var_is(fam.ing_var(), 1)).chain(others));
        m.push(sync(
            guard,
            set(vec![Update::new(var, Expr::int(fam.target))]),
        ));
    }
    close(m)
}

// ---------------------------------------------------------------------------
// Transition families
// ---------------------------------------------------------------------------

/// In-progress/done flags for one family.
pub fn family(plan: &Plan, fam: &Family) -> Module {
    let (done, ing) = (fam.done_var(), fam.ing_var());
    let mut m = Module::new(&fam.module);
    m.vars.push(VarDecl::range(&done, 1, 0));
    m.vars.push(VarDecl::range(&ing, 1, 0));

    let from = Expr::or(
        fam.sources
            .iter()
            .map(|s| Expr::var_is(&plan.vars.mode.name, *s)),
    );
    m.push(sync(
        Expr::and([
            Expr::lt(time(plan), Expr::var(TOTAL_TIME)),
            from,
            Expr::var_is(&done, 0),
            Expr::var_is(&ing, 0),
        ]),
        set(vec![Update::new(&ing, Expr::int(1))]),
    ));

    let finished = vec![
        Update::new(&done, Expr::int(1)),
        Update::new(&ing, Expr::int(0)),
    ];
    let completion = match &fam.probability {
        Some((_, p)) => vec![
            Branch::weighted(Expr::prob(*p), finished),
            Branch::weighted(
                Expr::prob(1.0 - *p),
                vec![Update::new(&ing, Expr::int(0))],
            ),
        ],
        None => set(finished),
    };
    m.push(sync(Expr::var_is(&ing, 1), completion));

    m.push(sync(
        Expr::and([Expr::var_is(&done, 1), Expr::var_is(&ing, 0)]),
        set(vec![Update::new(&done, Expr::int(0))]),
    ));
    close(m)
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Switches to the sampling role at each window start, samples the
/// monitored value once per visit, commits it before the next window and
/// returns to the mission role.
pub fn sampling(plan: &Plan) -> Module {
    let v = &plan.vars;
    let (role, sick, ts, checked) = (
        v.role.name.as_str(),
        v.monitored.name.as_str(),
        v.sample.name.as_str(),
        v.checked.name.as_str(),
    );
    // the sample is committed into the monitored value and back
    let level_max = v.monitored.max.max(v.sample.max);

    let mut m = Module::new("sickness");
    m.vars.push(VarDecl::new(
        role,
        Expr::int(0),
        Expr::int(1),
        Expr::var(MISSION_MONITOR),
    ));
    m.vars.push(VarDecl::range(sick, level_max, v.monitored.init.min(level_max)));
    m.vars.push(VarDecl::range(ts, level_max, v.sample.init.min(level_max)));
    m.vars.push(VarDecl::range(checked, 1, v.checked.init.min(1)));

    let role_is = |r: &str| Expr::eq(Expr::var(role), Expr::var(r));

    for &w in &plan.windows {
        m.push(sync(
            Expr::and([time_is(plan, w), role_is(MISSION_MONITOR)]),
            set(vec![Update::new(role, Expr::var(SICKNESS_MONITOR))]),
        ));
    }

    for &c in &plan.commits {
        m.push(sync(
            time_is(plan, c),
            set(vec![Update::new(sick, Expr::var(ts))]),
        ));
    }

    for &w in &plan.windows {
        // The role switch above fires on the same synchronized step at
        // `t = w`, and the clock has already left `w` once the role reads
        // sickness_monitor. A visit therefore matches at the following window,
        // so each sample lands one interval late. Emitted models keep this
        // timing.
        let visit = || {
            vec![
                time_is(plan, w),
                role_is(SICKNESS_MONITOR),
                Expr::var_is(checked, 0),
            ]
        };
        m.push(sync(
            Expr::and(visit().into_iter().chain([Expr::var_is(sick, 0)])),
            vec![
                Branch::weighted(
                    Expr::var(CLOCK_PROBABILITY),
                    vec![Update::new(ts, Expr::int(0)), Update::new(checked, Expr::int(1))],
                ),
                Branch::weighted(
                    Expr::complement(Expr::var(CLOCK_PROBABILITY)),
                    vec![Update::new(ts, Expr::int(1)), Update::new(checked, Expr::int(1))],
                ),
            ],
        ));
        m.push(sync(
            Expr::and(visit().into_iter().chain([Expr::gt(Expr::var(sick), Expr::int(0))])),
            set(vec![
                Update::new(ts, Expr::var(sick)),
                Update::new(checked, Expr::int(1)),
            ]),
        ));
    }

    let off_boundary = plan
        .windows
        .iter()
        .chain(&plan.commits)
        .map(|t| Expr::ne(time(plan), Expr::int(*t)));
    m.push(sync(
        Expr::and(
            [role_is(SICKNESS_MONITOR), Expr::var_is(checked, 1)]
                .into_iter()
                .chain(off_boundary),
        ),
        set(vec![
            Update::new(role, Expr::var(MISSION_MONITOR)),
            Update::new(checked, Expr::int(0)),
        ]),
    ));
    close(m)
}

// ---------------------------------------------------------------------------
// Optional modules
// ---------------------------------------------------------------------------

/// `sickness<level>` keys, in config order, for levels the monitored
/// variable can take.
fn by_level<'a, T>(
    table: &'a indexmap::IndexMap<String, T>,
    max_level: i64,
) -> impl Iterator<Item = (i64, &'a T)> + 'a {
    table.iter().filter_map(move |(key, value)| {
        let level: i64 = key.strip_prefix("sickness")?.parse().ok()?;
        (0..=max_level).contains(&level).then_some((level, value))
    })
}

fn skipped(diagnostics: &mut Vec<Diagnostic>, module: &str, reason: &str) {
    let d = Diagnostic::SkippedModule {
        module: module.to_string(),
        reason: reason.to_string(),
    };
    d.emit();
    diagnostics.push(d);
}

/// Response latency sampled from the configured distributions when the
/// mode reaches the select or decide trigger.
pub fn response(
    plan: &Plan,
    config: &PrismConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Module> {
    if config.response_select.is_empty() && config.response_decide.is_empty() {
        return None;
    }
    let mode = &plan.vars.mode.name;
    let sick = &plan.vars.monitored.name;
    let level_max = plan.vars.monitored.max.max(plan.vars.sample.max);

    let mut triggers: Vec<(i64, i64, Vec<(i64, &Distribution)>)> = Vec::new();
    if !config.response_select.is_empty() {
        triggers.push((
            plan.select_trigger,
            1,
            by_level(&config.response_select, level_max).collect(),
        ));
    }
    if !config.response_decide.is_empty() {
        match plan.decide_trigger {
            Some(t) if t != plan.select_trigger => triggers.push((
                t,
                2,
                by_level(&config.response_decide, level_max).collect(),
            )),
            Some(_) => skipped(
                diagnostics,
                "response_time (decide)",
                "the decide trigger coincides with the select trigger",
            ),
            None => skipped(
                diagnostics,
                "response_time (decide)",
                "no decide transition family with a source mode",
            ),
        }
    }

    let max_state = triggers
        .iter()
        .flat_map(|(_, _, dists)| dists.iter())
        .flat_map(|(_, d)| d.probabilities.iter().map(|sp| sp.state))
        .max()
        .unwrap_or(0)
        .max(1);

    let mut m = Module::new("response_time");
    m.vars.push(VarDecl::range(RESPONSE_STATE, max_state, 0));
    m.vars.push(VarDecl::range(RESPONSE_TYPE, 2, 0));

    for (trigger, kind, dists) in &triggers {
        for (level, dist) in dists {
            let states: Vec<i64> = dist.probabilities.iter().map(|sp| sp.state).collect();
            if states.iter().any(|s| *s < 0) {
                skipped(diagnostics, "response_time", "negative response state");
                continue;
            }
            let weights: Vec<f64> = dist.probabilities.iter().map(|sp| sp.probability).collect();
            let Some(probs) = normalized(&weights) else {
                skipped(diagnostics, "response_time", "distribution has no positive mass");
                continue;
            };
            let branches = states
                .iter()
                .zip(probs)
                .map(|(s, p)| {
                    Branch::weighted(
                        Expr::prob(p),
                        vec![
                            Update::new(RESPONSE_STATE, Expr::int(*s)),
                            Update::new(RESPONSE_TYPE, Expr::int(*kind)),
                        ],
                    )
                })
                .collect();
            m.push(sync(
                Expr::and([
                    Expr::var_is(mode, *trigger),
                    Expr::var_is(RESPONSE_STATE, 0),
                    Expr::var_is(sick, *level),
                ]),
                branches,
            ));
        }
    }

    m.push(sync(
        Expr::gt(Expr::var(RESPONSE_STATE), Expr::int(0)),
        set(vec![Update::new(
            RESPONSE_STATE,
            Expr::sub(Expr::var(RESPONSE_STATE), Expr::int(1)),
        )]),
    ));

    let away = triggers
        .iter()
        .map(|(t, _, _)| Expr::ne(Expr::var(mode), Expr::int(*t)));
    m.push(sync(
        Expr::and(
            [
                Expr::var_is(RESPONSE_STATE, 0),
                Expr::gt(Expr::var(RESPONSE_TYPE), Expr::int(0)),
            ]
            .into_iter()
            .chain(away),
        ),
        set(vec![
            Update::new(RESPONSE_STATE, Expr::int(0)),
            Update::new(RESPONSE_TYPE, Expr::int(0)),
        ]),
    ));
    Some(close(m))
}

/// Decision correctness sampled when a decide response completes.
pub fn decision_errors(
    plan: &Plan,
    config: &PrismConfig,
    has_response: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Module> {
    if config.decision_error_distributions.is_empty() {
        return None;
    }
    let trigger = match (has_response, plan.decide_trigger) {
        (true, Some(t)) if t != plan.select_trigger => t,
        (false, _) => {
            skipped(diagnostics, "decision_errors", "requires the response_time module");
            return None;
        }
        _ => {
            skipped(diagnostics, "decision_errors", "no usable decide trigger");
            return None;
        }
    };
    let mode = &plan.vars.mode.name;
    let sick = &plan.vars.monitored.name;
    let level_max = plan.vars.monitored.max.max(plan.vars.sample.max);
    let max_errors = config.max_error_count().max(1);

    let mut m = Module::new("decision_errors");
    m.vars.push(VarDecl::range(DECISION_CORRECT, 1, 1));
    m.vars.push(VarDecl::range(ERROR_COUNT, max_errors, 0));

    for (level, dist) in by_level(&config.decision_error_distributions, level_max) {
        let ErrorDistribution {
            correct_probability,
            error_probability,
        } = *dist;
        let Some(probs) = normalized(&[correct_probability, error_probability]) else {
            skipped(diagnostics, "decision_errors", "distribution has no positive mass");
            continue;
        };
        m.push(sync(
            Expr::and([
                Expr::var_is(mode, trigger),
                Expr::var_is(RESPONSE_STATE, 1),
                Expr::var_is(sick, level),
            ]),
            vec![
                Branch::weighted(
                    Expr::prob(probs[0]),
                    vec![Update::new(DECISION_CORRECT, Expr::int(1))],
                ),
                Branch::weighted(
                    Expr::prob(probs[1]),
                    vec![
                        Update::new(DECISION_CORRECT, Expr::int(0)),
                        Update::new(
                            ERROR_COUNT,
                            Expr::min(
                                Expr::add(Expr::var(ERROR_COUNT), Expr::int(1)),
                                Expr::int(max_errors),
                            ),
                        ),
                    ],
                ),
            ],
        ));
    }
    Some(close(m))
}

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

pub fn rewards(plan: &Plan, has_response: bool, has_errors: bool) -> Vec<Rewards> {
    let mut out = vec![Rewards::single(
        "mission_completion",
        Expr::eq(time(plan), Expr::var(TOTAL_TIME)),
        Expr::int(1),
    )];
    if has_errors {
        out.push(Rewards {
            name: "decision_quality".into(),
            items: vec![
                RewardItem {
                    guard: Expr::var_is(DECISION_CORRECT, 1),
                    value: Expr::int(1),
                },
                RewardItem {
                    guard: Expr::var_is(DECISION_CORRECT, 0),
                    value: Expr::int(0),
                },
            ],
        });
        out.push(Rewards::single(
            "error_penalty",
            Expr::var_is(DECISION_CORRECT, 0),
            Expr::int(ERROR_PENALTY),
        ));
    }
    out.push(Rewards::single(
        "time_cost",
        Expr::lt(time(plan), Expr::var(TOTAL_TIME)),
        Expr::int(1),
    ));
    if has_response {
        out.push(Rewards::single(
            "response_efficiency",
            Expr::gt(Expr::var(RESPONSE_STATE), Expr::int(0)),
            Expr::int(1),
        ));
    }
    out.push(Rewards::single(
        "sickness_penalty",
        Expr::gt(Expr::var(&plan.vars.monitored.name), Expr::int(0)),
        Expr::int(1),
    ));
    out
}

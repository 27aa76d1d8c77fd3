//! Time-Windowed Synthesizer.
//!
//! Produces a multi-module model: a bounded clock, the mode variable, one
//! module per transition family, the periodic sampling process, optional
//! response-time and decision-error modules, and a fixed set of reward
//! structures. All commands share one synchronization label so every
//! module steps together.

pub mod discover;
pub mod modules;

use crate::config::{ConstantValue, DEFAULT_MODEL_TYPE, DEFAULT_TIME_VARIABLE, PrismConfig};
use crate::error::{Diagnostic, SynthesisResult};
use crate::infer::TypedCorpus;
use crate::model::normalize;
use crate::prism::{ConstDecl, Expr, Model};

use discover::{Plan, discover};
use modules::{CLOCK_PROBABILITY, MISSION_MONITOR, SICKNESS_MONITOR, TOTAL_TIME};

/// Constants the synthesizer declares itself.
const RESERVED: [&str; 4] = [TOTAL_TIME, MISSION_MONITOR, SICKNESS_MONITOR, CLOCK_PROBABILITY];

fn constants(model: &mut Model, plan: &Plan, config: Option<&PrismConfig>) {
    model.constants.push(ConstDecl::int(TOTAL_TIME, plan.total_time));
    model.constants.push(ConstDecl::int(MISSION_MONITOR, 0));
    model.constants.push(ConstDecl::int(SICKNESS_MONITOR, 1));
    model.constants.push(ConstDecl::double(
        CLOCK_PROBABILITY,
        Expr::prob(plan.clock_probability),
    ));

    let Some(config) = config else {
        return;
    };
    for (name, value) in &config.constants {
        let name = normalize(name);
        if RESERVED.contains(&name.as_str())
            || model.constant(&name).is_some()
            || model.var_decl(&name).is_some()
        {
            continue;
        }
        match value {
            ConstantValue::Int(v) => model.constants.push(ConstDecl::int(&name, *v)),
            ConstantValue::Float(v) => model
                .constants
                .push(ConstDecl::double(&name, Expr::lit(v.to_string()))),
            ConstantValue::Text(_) => {}
        }
    }
}

/// Build the temporal model for `typed`.
pub fn synthesize(
    typed: &TypedCorpus,
    config: Option<&PrismConfig>,
) -> SynthesisResult<(Model, Vec<Diagnostic>)> {
    let corpus = typed.corpus();
    let time_variable = config.map_or(DEFAULT_TIME_VARIABLE, PrismConfig::time_variable);
    let mut diagnostics = Vec::new();
    let plan = discover(corpus, config, time_variable, &mut diagnostics)?;

    let mut model = Model::new(config.map_or(DEFAULT_MODEL_TYPE, PrismConfig::model_type));
    model.comments = vec![
        format!("translated from {} rules", corpus.rules().len()),
        format!("experiment duration {} steps", plan.total_time),
        format!(
            "sampling interval {} ({})",
            plan.interval, plan.interval_source
        ),
        format!("transition families: {}", plan.families.len()),
    ];

    model.modules.push(modules::clock(&plan));
    model.modules.push(modules::mode(&plan));
    for fam in &plan.families {
        model.modules.push(modules::family(&plan, fam));
    }
    model.modules.push(modules::sampling(&plan));

    let response = config.and_then(|c| modules::response(&plan, c, &mut diagnostics));
    let has_response = response.is_some();
    model.modules.extend(response);
    let errors =
        config.and_then(|c| modules::decision_errors(&plan, c, has_response, &mut diagnostics));
    let has_errors = errors.is_some();
    model.modules.extend(errors);

    constants(&mut model, &plan, config);
    model.rewards = modules::rewards(&plan, has_response, has_errors);

    tracing::info!(
        modules = model.modules.len(),
        constants = model.constants.len(),
        rewards = model.rewards.len(),
        diagnostics = diagnostics.len(),
        "temporal model synthesized"
    );
    Ok((model, diagnostics))
}

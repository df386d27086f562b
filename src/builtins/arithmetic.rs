//! Per-observation arithmetic: each output observation is its input plus one
//! computed field.

use crate::builtins::{parse_config, resolve_config};
use crate::error::{EngineError, Result};
use crate::manifest::Observation;
use crate::manifest::observation::{number, number_value};
use crate::plugin::ExecutePlugin;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FoldConfig {
    input_parameters: Vec<String>,
    output_parameter: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CoefficientConfig {
    input_parameter: String,
    coefficient: f64,
    output_parameter: String,
}

fn require_number(input: &Observation, param: &str, idx: usize) -> Result<f64> {
    number(input, param).ok_or_else(|| {
        EngineError::Validation(format!(
            "{} is missing from the input array, or has nullish value (inputs[{}]).",
            param, idx
        ))
    })
}

fn fold_inputs(
    plugin: &str,
    inputs: &[Observation],
    config: &Value,
    init: f64,
    op: fn(f64, f64) -> f64,
) -> Result<Vec<Observation>> {
    let config: FoldConfig = parse_config(plugin, config)?;
    if config.output_parameter.is_empty() {
        return Err(EngineError::Configuration(format!(
            "{} config: `output-parameter` must not be empty",
            plugin
        )));
    }

    inputs
        .iter()
        .enumerate()
        .map(|(idx, input)| {
            let mut acc = init;
            for param in &config.input_parameters {
                acc = op(acc, require_number(input, param, idx)?);
            }
            let mut output = input.clone();
            output.insert(config.output_parameter.clone(), number_value(acc));
            Ok(output)
        })
        .collect()
}

/// Adds `input-parameters` into `output-parameter`.
#[derive(Debug, Clone, Default)]
pub struct Sum {
    global_config: Option<Value>,
}

impl Sum {
    pub fn new(global_config: Option<Value>) -> Self {
        Self { global_config }
    }
}

impl ExecutePlugin for Sum {
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Vec<Observation>> {
        let config = resolve_config(config, self.global_config.as_ref())?;
        fold_inputs("Sum", inputs, config, 0.0, |a, b| a + b)
    }
}

/// Multiplies `input-parameters` into `output-parameter`.
#[derive(Debug, Clone, Default)]
pub struct Multiply {
    global_config: Option<Value>,
}

impl Multiply {
    pub fn new(global_config: Option<Value>) -> Self {
        Self { global_config }
    }
}

impl ExecutePlugin for Multiply {
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Vec<Observation>> {
        let config = resolve_config(config, self.global_config.as_ref())?;
        fold_inputs("Multiply", inputs, config, 1.0, |a, b| a * b)
    }
}

/// `output-parameter = input-parameter * coefficient`.
#[derive(Debug, Clone, Default)]
pub struct Coefficient {
    global_config: Option<Value>,
}

impl Coefficient {
    pub fn new(global_config: Option<Value>) -> Self {
        Self { global_config }
    }
}

impl ExecutePlugin for Coefficient {
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Vec<Observation>> {
        let config = resolve_config(config, self.global_config.as_ref())?;
        let config: CoefficientConfig = parse_config("Coefficient", config)?;

        inputs
            .iter()
            .enumerate()
            .map(|(idx, input)| {
                let value = require_number(input, &config.input_parameter, idx)?;
                let mut output = input.clone();
                output.insert(
                    config.output_parameter.clone(),
                    number_value(value * config.coefficient),
                );
                Ok(output)
            })
            .collect()
    }
}

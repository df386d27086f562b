//! Regex extraction: copy the matching parts of a string parameter into an
//! output parameter.
//!
//! config: { "parameter": "physical-processor", "match": "^[^,]+", "output": "cpu/name" }
//!
//! Patterns use `regex` crate syntax, so look-around is not available.

use crate::builtins::{parse_config, resolve_config};
use crate::error::{EngineError, Result};
use crate::manifest::Observation;
use crate::plugin::ExecutePlugin;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
struct RegexConfig {
    parameter: String,
    #[serde(rename = "match")]
    pattern: String,
    output: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegexMatch {
    global_config: Option<Value>,
}

impl RegexMatch {
    pub fn new(global_config: Option<Value>) -> Self {
        Self { global_config }
    }
}

/// Accept both `expr` and the slash-delimited `/expr/g` form.
fn strip_delimiters(pattern: &str) -> &str {
    let inner = pattern
        .strip_prefix('/')
        .and_then(|rest| rest.strip_suffix("/g").or_else(|| rest.strip_suffix('/')));
    inner.unwrap_or(pattern)
}

impl ExecutePlugin for RegexMatch {
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Vec<Observation>> {
        let config = resolve_config(config, self.global_config.as_ref())?;
        let config: RegexConfig = parse_config("Regex", config)?;
        let regex = Regex::new(strip_delimiters(&config.pattern)).map_err(|e| {
            EngineError::Configuration(format!("Regex config: invalid `match` pattern: {}", e))
        })?;

        inputs
            .iter()
            .enumerate()
            .map(|(idx, input)| {
                let text = input
                    .get(&config.parameter)
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        EngineError::Validation(format!(
                            "`{}` is missing from inputs[{}] or is not a string.",
                            config.parameter, idx
                        ))
                    })?;

                let matches: Vec<&str> = regex.find_iter(text).map(|m| m.as_str()).collect();
                if matches.is_empty() {
                    return Err(EngineError::Validation(format!(
                        "`{}` does not match the {} regex expression.",
                        text, config.pattern
                    )));
                }

                let mut output = input.clone();
                output.insert(config.output.clone(), Value::String(matches.join(" ")));
                Ok(output)
            })
            .collect()
    }
}

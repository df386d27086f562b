//! Parameter registry: how each named parameter combines across time and
//! across components.
//!
//! The registry is built once (built-in table plus manifest-declared
//! parameters) and then shared read-only by time-sync and the aggregator.

mod builtin;

use crate::diagnostics::WarnOnce;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Rule for combining several values of one parameter into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    Sum,
    Avg,
    None,
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregationMethod::Sum => "sum",
            AggregationMethod::Avg => "avg",
            AggregationMethod::None => "none",
        })
    }
}

/// One parameter declaration, as found in a manifest `parameters` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(alias = "aggregation")]
    pub aggregation_method: AggregationMethod,
}

#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    params: HashMap<String, ParameterSpec>,
    unknown: WarnOnce,
}

impl ParameterRegistry {
    /// Empty registry: every lookup falls back to `sum`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in parameter table.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for spec in builtin::builtin_parameters() {
            registry.params.insert(spec.name.clone(), spec);
        }
        registry
    }

    /// Add or replace a single parameter.
    pub fn define(&mut self, spec: ParameterSpec) {
        self.params.insert(spec.name.clone(), spec);
    }

    /// Builder form of [`define`](Self::define).
    pub fn with(mut self, name: &str, method: AggregationMethod) -> Self {
        self.define(ParameterSpec {
            name: name.to_string(),
            description: None,
            unit: None,
            aggregation_method: method,
        });
        self
    }

    /// Merge manifest-declared parameters. A declaration that would override
    /// a known parameter is rejected with a warning. Returns how many were added.
    pub fn combine<I>(&mut self, specs: I) -> usize
    where
        I: IntoIterator<Item = ParameterSpec>,
    {
        let mut added = 0;
        for spec in specs {
            if self.params.contains_key(&spec.name) {
                tracing::warn!(
                    "Rejecting override of existing parameter `{}`; keeping the known definition",
                    spec.name
                );
                continue;
            }
            self.params.insert(spec.name.clone(), spec);
            added += 1;
        }
        added
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Aggregation method for `name`. Unknown parameters default to `sum`,
    /// with a warning the first time each one is seen.
    pub fn lookup(&self, name: &str) -> AggregationMethod {
        match self.params.get(name) {
            Some(spec) => spec.aggregation_method,
            None => {
                self.unknown.warn(name, || {
                    format!("Unknown parameter: {}. Aggregating it with `sum`.", name)
                });
                AggregationMethod::Sum
            }
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

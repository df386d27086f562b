//! Temporal normalizer ("time-sync").
//!
//! Re-grids irregular, duration-scoped observations onto a uniform axis of
//! `interval`-second buckets covering `[start-time, end-time)`. Sum-type
//! parameters are redistributed so totals are preserved, avg-type ones are
//! averaged, and constants pass through unchanged. The aggregator relies on
//! this grid when it pairs sibling outputs by index.

mod config;
mod resample;

pub use config::{TimeSyncConfig, format_timestamp, parse_timestamp};

use crate::error::{EngineError, Result};
use crate::manifest::Observation;
use crate::params::ParameterRegistry;
use crate::plugin::ExecutePlugin;

use resample::Resampler;
use serde_json::Value;
use std::sync::Arc;

/// Execute plugin wrapping the resampler.
///
/// A node-level `config["time-sync"]` wins over the global config given at
/// construction.
#[derive(Debug, Clone)]
pub struct TimeSync {
    global_config: Option<Value>,
    params: Arc<ParameterRegistry>,
}

impl TimeSync {
    pub fn new(global_config: Option<Value>, params: Arc<ParameterRegistry>) -> Self {
        Self {
            global_config,
            params,
        }
    }

    /// Resample with an already validated config.
    pub fn normalize(&self, inputs: &[Observation], config: &TimeSyncConfig) -> Result<Vec<Observation>> {
        Resampler::new(config, &self.params).run(inputs)
    }
}

impl ExecutePlugin for TimeSync {
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Vec<Observation>> {
        let raw = config
            .or(self.global_config.as_ref())
            .ok_or_else(|| EngineError::Configuration("Config is not provided.".to_string()))?;
        // Config is validated before any observation is looked at.
        let config = TimeSyncConfig::from_value(raw)?;
        self.normalize(inputs, &config)
    }
}

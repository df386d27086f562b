//! Manifest computation engine.
//!
//! A manifest describes a tree of components. Leaves carry time-series
//! observations and a pipeline of named plugins; [`compute`] runs every
//! pipeline, [`aggregate`] rolls the configured metrics up over time and
//! across the tree. [`TimeSync`] is the built-in plugin that puts every leaf
//! on the same time grid so the two can be combined.

pub mod aggregate;
pub mod builtins;
pub mod compute;
pub mod diagnostics;
pub mod error;
pub mod manifest;
pub mod params;
pub mod plugin;
pub mod time_sync;

pub use aggregate::{Aggregator, aggregate};
pub use builtins::registry_from_manifest;
pub use compute::{Context, PipelineExecutor, compute};
pub use error::{EngineError, Result, ResultExt};
pub use manifest::{
    AggregationSpec, AggregationType, Children, Manifest, Node, NodeKind, Observation,
};
pub use params::{AggregationMethod, ParameterRegistry, ParameterSpec};
pub use plugin::{ExecutePlugin, GroupByPlugin, Plugin, PluginKind, PluginRegistry};
pub use time_sync::{TimeSync, TimeSyncConfig};

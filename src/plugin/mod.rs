//! Plugin contract.
//!
//! All transformation logic, time-sync included, sits behind one of two
//! capabilities:
//! - **Execute**: observation series in, observation series out.
//! - **GroupBy**: observation series in, new child nodes out.
//!
//! `Plugin` tags which capability an instance provides so the executor can
//! dispatch without probing the instance.

mod registry;

pub use registry::PluginRegistry;

use crate::error::Result;
use crate::manifest::{Children, Observation};

use serde_json::Value;
use std::fmt;

/// Transform from an observation series to an augmented or replaced series.
pub trait ExecutePlugin: Send + Sync {
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Vec<Observation>>;
}

/// Transform partitioning a flat series into new child nodes.
pub trait GroupByPlugin: Send + Sync {
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Children>;
}

impl<F> ExecutePlugin for F
where
    F: Fn(&[Observation], Option<&Value>) -> Result<Vec<Observation>> + Send + Sync,
{
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Vec<Observation>> {
        self(inputs, config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Execute,
    GroupBy,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PluginKind::Execute => "execute",
            PluginKind::GroupBy => "groupby",
        })
    }
}

pub enum Plugin {
    Execute(Box<dyn ExecutePlugin>),
    GroupBy(Box<dyn GroupByPlugin>),
}

impl Plugin {
    pub fn execute(plugin: impl ExecutePlugin + 'static) -> Self {
        Plugin::Execute(Box::new(plugin))
    }

    pub fn group_by(plugin: impl GroupByPlugin + 'static) -> Self {
        Plugin::GroupBy(Box::new(plugin))
    }

    pub fn kind(&self) -> PluginKind {
        match self {
            Plugin::Execute(_) => PluginKind::Execute,
            Plugin::GroupBy(_) => PluginKind::GroupBy,
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Plugin").field(&self.kind()).finish()
    }
}

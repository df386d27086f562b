//! Manifest document: the JSON shape handed to (and returned from) the engine.
//!
//! {
//!   "name": "my-app",
//!   "initialize": {
//!     "plugins": {
//!       "sum-energy": { "method": "Sum", "path": "builtin", "config": { ... } }
//!     }
//!   },
//!   "parameters": [ { "name": "requests", "aggregation-method": "sum" } ],
//!   "aggregation": { "metrics": ["carbon"], "type": "both" },
//!   "tree": { "children": { ... } }
//! }

use crate::manifest::node::Node;
use crate::params::ParameterSpec;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    #[serde(alias = "time")]
    Horizontal,
    #[serde(alias = "component")]
    Vertical,
    Both,
}

impl AggregationType {
    pub fn is_horizontal(self) -> bool {
        matches!(self, AggregationType::Horizontal | AggregationType::Both)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, AggregationType::Vertical | AggregationType::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub metrics: Vec<String>,
    #[serde(rename = "type")]
    pub kind: AggregationType,
}

impl AggregationSpec {
    pub fn new<I, S>(metrics: I, kind: AggregationType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metrics: metrics.into_iter().map(Into::into).collect(),
            kind,
        }
    }
}

/// How one pipeline name maps onto a plugin implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDeclaration {
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, alias = "global-config", skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Initialize {
    #[serde(default)]
    pub plugins: Map<String, Value>,
}

impl Initialize {
    /// Plugin declarations in document order.
    pub fn declarations(&self) -> Result<Vec<(String, PluginDeclaration)>, serde_json::Error> {
        self.plugins
            .iter()
            .map(|(name, raw)| {
                serde_json::from_value::<PluginDeclaration>(raw.clone()).map(|d| (name.clone(), d))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub initialize: Initialize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationSpec>,

    pub tree: Node,

    /// name, description, tags and anything else the engine does not read.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

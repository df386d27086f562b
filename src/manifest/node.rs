//! Component tree nodes.
//!
//! JSON shape (every key optional):
//! {
//!   "pipeline": ["sum", "time-sync"],
//!   "config":   { "sum": { ... } },
//!   "defaults": { "grid-carbon-intensity": 800 },
//!   "children": { "server-1": { ... } },     // branch
//!   "inputs":   [ { "timestamp": ..., ... } ], // leaf
//!   "outputs":  [ ... ],
//!   "aggregated": { "carbon": 12.5 }
//! }
//!
//! We deserialize into `RawNode`, then validate into `Node`: a node is a branch
//! or a leaf, never both.

use crate::manifest::observation::Observation;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Plugin name -> plugin-specific configuration.
pub type NodeConfig = Map<String, Value>;

/// Either observations waiting for (or done with) a pipeline, or sub-components
/// that carry the pipeline on.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf { inputs: Vec<Observation> },
    Branch { children: Children },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    pub pipeline: Option<Vec<String>>,
    pub config: Option<NodeConfig>,
    pub defaults: Option<Observation>,
    pub kind: NodeKind,
    /// Leaf: result of the last Execute plugin. Branch: recombined series
    /// written by vertical aggregation.
    pub outputs: Option<Vec<Observation>>,
    pub aggregated: Option<Observation>,
    /// Descriptive keys (name, description, tags, ...) kept verbatim.
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn leaf(inputs: Vec<Observation>) -> Self {
        Self::with_kind(NodeKind::Leaf { inputs })
    }

    pub fn branch(children: Children) -> Self {
        Self::with_kind(NodeKind::Branch { children })
    }

    fn with_kind(kind: NodeKind) -> Self {
        Self {
            pipeline: None,
            config: None,
            defaults: None,
            kind,
            outputs: None,
            aggregated: None,
            extra: Map::new(),
        }
    }

    pub fn with_pipeline<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pipeline = Some(plugins.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_defaults(mut self, defaults: Observation) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn inputs(&self) -> Option<&[Observation]> {
        match &self.kind {
            NodeKind::Leaf { inputs } => Some(inputs),
            NodeKind::Branch { .. } => None,
        }
    }

    pub fn children(&self) -> Option<&Children> {
        match &self.kind {
            NodeKind::Branch { children } => Some(children),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match &mut self.kind {
            NodeKind::Branch { children } => Some(children),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Turn a leaf into a branch holding `children`. Observations on the node
    /// are dropped; they now live in the children.
    pub fn expand(&mut self, children: Children) {
        self.kind = NodeKind::Branch { children };
        self.outputs = None;
    }

    /// Every leaf below (or at) this node, depth-first in insertion order.
    pub fn leaves(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Node>) {
        match &self.kind {
            NodeKind::Leaf { .. } => out.push(self),
            NodeKind::Branch { children } => {
                for (_, child) in children.iter() {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// Children in manifest insertion order.
///
/// Vertical aggregation pairs siblings positionally, so the order in which
/// children were declared (or created by a group-by) is part of the result.
/// Lookups scan the list, so building `n` distinct children costs O(n²).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Children(Vec<(String, Node)>);

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`; a replaced child keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, node: Node) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = node,
            None => self.0.push((name, node)),
        }
    }

    /// Child called `name`, created from `init` if it does not exist yet.
    pub fn get_or_insert_with(&mut self, name: &str, init: impl FnOnce() -> Node) -> &mut Node {
        let idx = match self.0.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.0.push((name.to_string(), init()));
                self.0.len() - 1
            }
        };
        &mut self.0[idx].1
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.0
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.0.iter().map(|(n, node)| (n.as_str(), node))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Node)> {
        self.0.iter_mut().map(|(n, node)| (n.as_str(), node))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Node)> for Children {
    fn from_iter<T: IntoIterator<Item = (String, Node)>>(iter: T) -> Self {
        let mut children = Children::new();
        for (name, node) in iter {
            children.insert(name, node);
        }
        children
    }
}

impl Serialize for Children {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, node) in &self.0 {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Children {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChildrenVisitor;

        impl<'de> Visitor<'de> for ChildrenVisitor {
            type Value = Children;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of child name to node")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Children, A::Error> {
                let mut out = Vec::new();
                while let Some((name, node)) = access.next_entry::<String, Node>()? {
                    if out.iter().any(|(n, _): &(String, Node)| *n == name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate child name: {}",
                            name
                        )));
                    }
                    out.push((name, node));
                }
                Ok(Children(out))
            }
        }

        deserializer.deserialize_map(ChildrenVisitor)
    }
}

/// Raw node shape as it appears in the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pipeline: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    config: Option<NodeConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    defaults: Option<Observation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Children>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    inputs: Option<Vec<Observation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    outputs: Option<Vec<Observation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    aggregated: Option<Observation>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let kind = match (raw.children, raw.inputs) {
            (Some(_), Some(_)) => {
                return Err("node has both `children` and `inputs`; a node is either a \
                            branch or a leaf"
                    .to_string());
            }
            (Some(children), None) => NodeKind::Branch { children },
            (None, inputs) => NodeKind::Leaf {
                inputs: inputs.unwrap_or_default(),
            },
        };

        Ok(Node {
            pipeline: raw.pipeline,
            config: raw.config,
            defaults: raw.defaults,
            kind,
            outputs: raw.outputs,
            aggregated: raw.aggregated,
            extra: raw.extra,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let (children, inputs) = match node.kind {
            NodeKind::Branch { children } => (Some(children), None),
            NodeKind::Leaf { inputs } => (None, Some(inputs)),
        };
        RawNode {
            pipeline: node.pipeline,
            config: node.config,
            defaults: node.defaults,
            children,
            inputs,
            outputs: node.outputs,
            aggregated: node.aggregated,
            extra: node.extra,
        }
    }
}

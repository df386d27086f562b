//! Data model: observations, the component tree, and the manifest document
//! that carries them across the engine boundary.
//!
//! The tree is owned top-down (each node owns its children), so it cannot
//! contain cycles and a `clone()` of the root is a full deep copy.

pub mod document;
pub mod node;
pub mod observation;

pub use document::{AggregationSpec, AggregationType, Initialize, Manifest, PluginDeclaration};
pub use node::{Children, Node, NodeConfig, NodeKind};
pub use observation::Observation;

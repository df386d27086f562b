//! Aggregation engine: reduce the computed tree into per-node summaries.
//!
//! Traversal is depth-first, post-order, children in insertion order:
//! - **horizontal** (a.k.a. `time`): a node's outputs collapse into one scalar
//!   per metric (`aggregated`).
//! - **vertical** (a.k.a. `component`): a branch's children are combined index
//!   by index into a new output series on the branch. Siblings are assumed to
//!   share a time grid (time-sync establishes it), so index `i` of every child
//!   is the same bucket.
//! - **both**: vertical first, then horizontal over the recombined series.
//!
//! Each metric combines with its registry method: `sum` adds, `avg` adds then
//! divides by the number of values. `none` metrics cannot be aggregated.

use crate::error::{EngineError, Result, ResultExt};
use crate::manifest::observation::{DURATION, TIMESTAMP, number, number_value};
use crate::manifest::{AggregationSpec, Children, Node, NodeKind, Observation};
use crate::params::{AggregationMethod, ParameterRegistry};

/// Grid fields carried into vertically combined outputs.
const GRID_FIELDS: [&str; 2] = [TIMESTAMP, DURATION];

pub struct Aggregator<'a> {
    spec: &'a AggregationSpec,
    methods: Vec<(&'a str, AggregationMethod)>,
}

impl<'a> Aggregator<'a> {
    /// Resolve every metric's method up front; a `none` metric fails here,
    /// before any node is visited.
    pub fn new(spec: &'a AggregationSpec, params: &ParameterRegistry) -> Result<Self> {
        let mut methods = Vec::with_capacity(spec.metrics.len());
        for metric in &spec.metrics {
            let method = params.lookup(metric);
            if method == AggregationMethod::None {
                return Err(EngineError::Aggregation(format!(
                    "Aggregation is not possible for given {} since method is 'none'.",
                    metric
                )));
            }
            methods.push((metric.as_str(), method));
        }
        Ok(Self { spec, methods })
    }

    /// Aggregate a copy of `tree`. The input tree is left as it was.
    pub fn run(&self, tree: &Node) -> Result<Node> {
        let mut copy = tree.clone();
        self.aggregate_node(&mut copy, "tree")?;
        Ok(copy)
    }

    fn aggregate_node(&self, node: &mut Node, path: &str) -> Result<()> {
        let horizontal = self.spec.kind.is_horizontal();
        let vertical = self.spec.kind.is_vertical();

        match &mut node.kind {
            NodeKind::Leaf { .. } => {
                if horizontal {
                    let outputs = node.outputs.as_deref().ok_or_else(|| {
                        EngineError::Aggregation(format!("node {} has no outputs to aggregate", path))
                    })?;
                    node.aggregated = Some(self.reduce(outputs, false).context(format!("node {}", path))?);
                }
            }
            NodeKind::Branch { children } => {
                for (name, child) in children.iter_mut() {
                    let child_path = format!("{}.children.{}", path, name);
                    tracing::debug!("Aggregating node {}", child_path);
                    self.aggregate_node(child, &child_path)?;
                }

                if vertical {
                    let outputs = self.combine_children(children).context(format!("node {}", path))?;
                    if horizontal {
                        node.aggregated =
                            Some(self.reduce(&outputs, false).context(format!("node {}", path))?);
                    }
                    node.outputs = Some(outputs);
                }
            }
        }

        Ok(())
    }

    /// Column-wise combination of the children's output series.
    fn combine_children(&self, children: &Children) -> Result<Vec<Observation>> {
        let mut series: Vec<(&str, &[Observation])> = Vec::with_capacity(children.len());
        for (name, child) in children.iter() {
            let outputs = child.outputs.as_deref().ok_or_else(|| {
                EngineError::Aggregation(format!("child `{}` has no outputs to combine", name))
            })?;
            series.push((name, outputs));
        }

        let Some(length) = series.first().map(|(_, outputs)| outputs.len()) else {
            return Ok(Vec::new());
        };

        let mut combined = Vec::with_capacity(length);
        for idx in 0..length {
            let mut column: Vec<Observation> = Vec::with_capacity(series.len());
            for (name, outputs) in &series {
                let output = outputs.get(idx).ok_or_else(|| {
                    EngineError::Aggregation(format!(
                        "child `{}` has no output at index {}; siblings must share a time grid",
                        name, idx
                    ))
                })?;
                column.push(output.clone());
            }
            combined.push(self.reduce(&column, true)?);
        }
        Ok(combined)
    }

    /// Collapse `outputs` into one observation holding a value per metric.
    /// With `carry_grid`, the shared timestamp/duration are kept when present.
    fn reduce(&self, outputs: &[Observation], carry_grid: bool) -> Result<Observation> {
        let mut result = Observation::new();

        if carry_grid {
            for field in GRID_FIELDS {
                if let Some(value) = outputs.iter().find_map(|output| output.get(field)) {
                    result.insert(field.to_string(), value.clone());
                }
            }
        }

        for (metric, method) in &self.methods {
            let mut total = 0.0;
            for (idx, output) in outputs.iter().enumerate() {
                if !output.contains_key(*metric) {
                    return Err(missing_metric(metric, idx));
                }
                total += number(output, metric).ok_or_else(|| {
                    EngineError::Aggregation(format!(
                        "Aggregation metric {} is not a number in inputs[{}].",
                        metric, idx
                    ))
                })?;
            }
            if *method == AggregationMethod::Avg && !outputs.is_empty() {
                total /= outputs.len() as f64;
            }
            result.insert(metric.to_string(), number_value(total));
        }

        Ok(result)
    }
}

fn missing_metric(metric: &str, idx: usize) -> EngineError {
    EngineError::Aggregation(format!(
        "Aggregation metric {} is not found in inputs[{}].",
        metric, idx
    ))
}

/// Aggregate a private copy of `tree` according to `spec`.
pub fn aggregate(tree: &Node, spec: &AggregationSpec, params: &ParameterRegistry) -> Result<Node> {
    tracing::debug!("Aggregating outputs ({:?})", spec.kind);
    Aggregator::new(spec, params)?.run(tree)
}

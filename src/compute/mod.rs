//! Pipeline executor.
//!
//! Walks the tree depth-first, pre-order, in child insertion order. Branch
//! nodes only hand their effective pipeline/config/defaults down; leaf nodes
//! run their observations through the pipeline one plugin at a time. A
//! group-by plugin turns the leaf into a branch and the *remaining* pipeline
//! continues on each new child.
//!
//! The caller's tree is never touched: the executor works on its own clone,
//! and any plugin error aborts the whole run.

use crate::error::{Result, ResultExt};
use crate::manifest::observation::merge_defaults;
use crate::manifest::{Node, NodeConfig, NodeKind, Observation};
use crate::plugin::{Plugin, PluginRegistry};

use std::collections::VecDeque;

/// What a node inherits from its ancestors when it sets nothing itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub pipeline: Option<Vec<String>>,
    pub config: Option<NodeConfig>,
    pub defaults: Option<Observation>,
}

impl Context {
    /// Node's own values where present, inherited ones otherwise.
    fn resolve(&self, node: &Node) -> Context {
        Context {
            pipeline: node.pipeline.clone().or_else(|| self.pipeline.clone()),
            config: node.config.clone().or_else(|| self.config.clone()),
            defaults: node.defaults.clone().or_else(|| self.defaults.clone()),
        }
    }

    fn plugin_config(&self, name: &str) -> Option<&serde_json::Value> {
        self.config.as_ref().and_then(|config| config.get(name))
    }
}

pub struct PipelineExecutor<'a> {
    plugins: &'a PluginRegistry,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(plugins: &'a PluginRegistry) -> Self {
        Self { plugins }
    }

    /// Compute a copy of `tree`. The input tree is left as it was.
    pub fn run(&self, tree: &Node, inherited: &Context) -> Result<Node> {
        let mut copy = tree.clone();
        self.compute_node(&mut copy, inherited, "tree")?;
        Ok(copy)
    }

    fn compute_node(&self, node: &mut Node, inherited: &Context, path: &str) -> Result<()> {
        let context = inherited.resolve(node);

        let working = match &mut node.kind {
            NodeKind::Branch { children } => {
                for (name, child) in children.iter_mut() {
                    let child_path = format!("{}.children.{}", path, name);
                    self.compute_node(child, &context, &child_path)?;
                }
                return Ok(());
            }
            NodeKind::Leaf { inputs } => inputs.clone(),
        };

        let queue: VecDeque<String> = context.pipeline.clone().unwrap_or_default().into();
        self.run_pipeline(node, working, queue, &context, path)
    }

    fn run_pipeline(
        &self,
        node: &mut Node,
        mut working: Vec<Observation>,
        mut queue: VecDeque<String>,
        context: &Context,
        path: &str,
    ) -> Result<()> {
        tracing::debug!("Computing node {} ({} plugins queued)", path, queue.len());

        if working.is_empty() {
            if let Some(defaults) = &context.defaults {
                tracing::debug!("Node {} has no inputs; using its defaults as the only input", path);
                working.push(defaults.clone());
            }
        }

        while let Some(name) = queue.pop_front() {
            if let Some(defaults) = &context.defaults {
                working = working
                    .iter()
                    .map(|input| merge_defaults(defaults, input))
                    .collect();
            }

            let plugin = self
                .plugins
                .get(&name)
                .with_context(|| format!("node {}", path))?;
            let config = context.plugin_config(&name);

            tracing::debug!("Running {} plugin `{}` on {}", plugin.kind(), name, path);

            match plugin {
                Plugin::Execute(plugin) => {
                    working = plugin
                        .execute(&working, config)
                        .with_context(|| format!("node {}, plugin `{}`", path, name))?;
                    node.outputs = Some(working.clone());
                }
                Plugin::GroupBy(plugin) => {
                    let children = plugin
                        .execute(&working, config)
                        .with_context(|| format!("node {}, plugin `{}`", path, name))?;
                    node.expand(children);

                    // The new children carry on with whatever is left of the queue.
                    let remaining = Context {
                        pipeline: Some(queue.into_iter().collect()),
                        config: context.config.clone(),
                        defaults: context.defaults.clone(),
                    };
                    if let Some(children) = node.children_mut() {
                        for (child_name, child) in children.iter_mut() {
                            let child_path = format!("{}.children.{}", path, child_name);
                            self.compute_node(child, &remaining, &child_path)?;
                        }
                    }
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

/// Run every leaf's pipeline over a private copy of `tree`.
pub fn compute(tree: &Node, plugins: &PluginRegistry, inherited: &Context) -> Result<Node> {
    PipelineExecutor::new(plugins).run(tree, inherited)
}

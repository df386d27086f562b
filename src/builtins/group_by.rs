//! Group-by: split a flat series into child components keyed by the values
//! of the configured parameters, one nesting level per key.
//!
//! config: { "group": ["cloud/region", "cloud/instance-type"] }

use crate::builtins::{parse_config, resolve_config};
use crate::error::{EngineError, Result};
use crate::manifest::observation::key_string;
use crate::manifest::{Children, Node, NodeKind, Observation};
use crate::plugin::GroupByPlugin;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
struct GroupByConfig {
    group: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupBy {
    global_config: Option<Value>,
}

impl GroupBy {
    pub fn new(global_config: Option<Value>) -> Self {
        Self { global_config }
    }
}

impl GroupByPlugin for GroupBy {
    fn execute(&self, inputs: &[Observation], config: Option<&Value>) -> Result<Children> {
        let config = resolve_config(config, self.global_config.as_ref())?;
        let config: GroupByConfig = parse_config("GroupBy", config)?;
        if config.group.is_empty() {
            return Err(EngineError::Configuration(
                "GroupBy config: `group` should contain at least one key".to_string(),
            ));
        }

        let mut children = Children::new();
        for (idx, input) in inputs.iter().enumerate() {
            let keys = config
                .group
                .iter()
                .map(|group| {
                    input.get(group).and_then(key_string).ok_or_else(|| {
                        EngineError::Grouping(format!("Invalid group {} in inputs[{}].", group, idx))
                    })
                })
                .collect::<Result<Vec<String>>>()?;
            place(&mut children, &keys, input.clone());
        }

        Ok(children)
    }
}

/// Route `input` down the path named by `keys`, creating nodes as needed.
fn place(children: &mut Children, keys: &[String], input: Observation) {
    match keys {
        [] => {}
        [last] => {
            let node = children.get_or_insert_with(last, || Node::leaf(Vec::new()));
            if let NodeKind::Leaf { inputs } = &mut node.kind {
                inputs.push(input);
            }
        }
        [first, rest @ ..] => {
            let node = children.get_or_insert_with(first, || Node::branch(Children::new()));
            if let Some(grandchildren) = node.children_mut() {
                place(grandchildren, rest, input);
            }
        }
    }
}

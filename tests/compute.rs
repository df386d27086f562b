use impact_engine::error::EngineError;
use impact_engine::{
    Children, Context, ExecutePlugin, Node, Observation, Plugin, PluginRegistry, Result, compute,
};
use impact_engine::builtins::GroupBy;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn obs(value: Value) -> Observation {
    serde_json::from_value(value).unwrap()
}

fn config(value: Value) -> serde_json::Map<String, Value> {
    serde_json::from_value(value).unwrap()
}

/// `b = a * factor`, with `factor` from the node config (default 2).
fn scale(inputs: &[Observation], config: Option<&Value>) -> Result<Vec<Observation>> {
    let factor = config
        .and_then(|c| c.get("factor"))
        .and_then(Value::as_f64)
        .unwrap_or(2.0);
    inputs
        .iter()
        .map(|input| {
            let a = input
                .get("a")
                .and_then(Value::as_f64)
                .ok_or_else(|| EngineError::Validation("a is missing".to_string()))?;
            let mut out = input.clone();
            out.insert("b".to_string(), json!(a * factor));
            Ok(out)
        })
        .collect()
}

/// Adds one to `b`.
fn bump(inputs: &[Observation], _config: Option<&Value>) -> Result<Vec<Observation>> {
    Ok(inputs
        .iter()
        .map(|input| {
            let mut out = input.clone();
            let b = input.get("b").and_then(Value::as_f64).unwrap_or(0.0);
            out.insert("b".to_string(), json!(b + 1.0));
            out
        })
        .collect())
}

fn fail(_inputs: &[Observation], _config: Option<&Value>) -> Result<Vec<Observation>> {
    Err(EngineError::Validation("boom".to_string()))
}

fn registry() -> PluginRegistry {
    PluginRegistry::new()
        .with("scale", Plugin::execute(scale))
        .with("bump", Plugin::execute(bump))
        .with("fail", Plugin::execute(fail))
        .with("group-by", Plugin::group_by(GroupBy::new(None)))
}

fn b_values(node: &Node) -> Vec<f64> {
    node.outputs
        .as_ref()
        .unwrap()
        .iter()
        .map(|o| o["b"].as_f64().unwrap())
        .collect()
}

#[test]
fn leaf_inherits_pipeline_and_config_from_ancestors() {
    let tree = Node::branch(
        [
            ("inherits".to_string(), Node::leaf(vec![obs(json!({"a": 1}))])),
            (
                "overrides".to_string(),
                Node::leaf(vec![obs(json!({"a": 1}))])
                    .with_config(config(json!({"scale": {"factor": 10}}))),
            ),
        ]
        .into_iter()
        .collect(),
    )
    .with_pipeline(["scale", "bump"])
    .with_config(config(json!({"scale": {"factor": 3}})));

    let computed = compute(&tree, &registry(), &Context::default()).unwrap();
    let children = computed.children().unwrap();

    assert_eq!(b_values(children.get("inherits").unwrap()), vec![4.0]);
    assert_eq!(b_values(children.get("overrides").unwrap()), vec![11.0]);
    assert_eq!(computed.outputs, None);
}

#[test]
fn input_tree_is_left_untouched() {
    let tree = Node::leaf(vec![obs(json!({"a": 1}))]).with_pipeline(["scale"]);
    let before = tree.clone();

    let computed = compute(&tree, &registry(), &Context::default()).unwrap();

    assert_eq!(tree, before);
    assert_eq!(b_values(&computed), vec![2.0]);
    assert_eq!(computed.inputs(), before.inputs());
}

#[test]
fn execute_plugins_keep_cardinality() {
    let inputs: Vec<Observation> = (0..5).map(|a| obs(json!({"a": a}))).collect();
    let tree = Node::leaf(inputs).with_pipeline(["scale", "bump"]);

    let computed = compute(&tree, &registry(), &Context::default()).unwrap();

    assert_eq!(b_values(&computed), vec![1.0, 3.0, 5.0, 7.0, 9.0]);
}

#[test]
fn defaults_fill_missing_values_before_every_plugin() {
    let tree = Node::leaf(vec![obs(json!({"a": 4})), obs(json!({"a": null}))])
        .with_pipeline(["scale"])
        .with_defaults(obs(json!({"a": 1, "region": "uk-west"})));

    let computed = compute(&tree, &registry(), &Context::default()).unwrap();
    let outputs = computed.outputs.unwrap();

    assert_eq!(outputs[0]["a"].as_f64(), Some(4.0));
    assert_eq!(outputs[1]["a"].as_f64(), Some(1.0));
    assert_eq!(outputs[1]["region"], json!("uk-west"));
}

#[test]
fn leaf_without_inputs_runs_on_its_defaults() {
    let tree = Node::leaf(Vec::new())
        .with_pipeline(["scale"])
        .with_defaults(obs(json!({"a": 5})));

    let computed = compute(&tree, &registry(), &Context::default()).unwrap();

    assert_eq!(b_values(&computed), vec![10.0]);
}

#[test]
fn unknown_plugin_aborts_the_run() {
    let tree = Node::leaf(vec![obs(json!({"a": 1}))]).with_pipeline(["scale", "missing"]);

    let err = compute(&tree, &registry(), &Context::default()).unwrap_err();

    assert!(matches!(err.root(), EngineError::PluginResolution(msg) if msg.contains("missing")));
}

#[test]
fn plugin_failure_aborts_with_node_context() {
    let children: Children = [
        ("ok".to_string(), Node::leaf(vec![obs(json!({"a": 1}))]).with_pipeline(["scale"])),
        ("broken".to_string(), Node::leaf(vec![obs(json!({"a": 1}))]).with_pipeline(["fail"])),
    ]
    .into_iter()
    .collect();
    let tree = Node::branch(children);

    let err = compute(&tree, &registry(), &Context::default()).unwrap_err();

    assert!(err.to_string().contains("tree.children.broken"));
    assert!(matches!(err.root(), EngineError::Validation(msg) if msg == "boom"));
}

#[test]
fn group_by_hands_the_remaining_pipeline_to_new_children() {
    let tree = Node::leaf(vec![
        obs(json!({"region": "east", "a": 1})),
        obs(json!({"region": "west", "a": 2})),
        obs(json!({"region": "east", "a": 3})),
    ])
    .with_pipeline(["group-by", "scale"])
    .with_config(config(json!({"group-by": {"group": ["region"]}})));

    let computed = compute(&tree, &registry(), &Context::default()).unwrap();

    assert!(!computed.is_leaf());
    assert_eq!(computed.outputs, None);
    let children = computed.children().unwrap();
    assert_eq!(children.names().collect::<Vec<_>>(), vec!["east", "west"]);
    assert_eq!(b_values(children.get("east").unwrap()), vec![2.0, 6.0]);
    assert_eq!(b_values(children.get("west").unwrap()), vec![4.0]);
}

#[test]
fn branch_context_reaches_the_root_from_the_caller() {
    let tree = Node::leaf(vec![obs(json!({"a": 2}))]);
    let inherited = Context {
        pipeline: Some(vec!["scale".to_string()]),
        ..Context::default()
    };

    let computed = compute(&tree, &registry(), &inherited).unwrap();

    assert_eq!(b_values(&computed), vec![4.0]);
}

#[test]
fn trait_objects_can_be_registered_directly() {
    struct Constant;

    impl ExecutePlugin for Constant {
        fn execute(&self, inputs: &[Observation], _config: Option<&Value>) -> Result<Vec<Observation>> {
            Ok(inputs
                .iter()
                .map(|_| serde_json::from_value(json!({"b": 42})).unwrap())
                .collect())
        }
    }

    let plugins = PluginRegistry::new().with("constant", Plugin::execute(Constant));
    let tree = Node::leaf(vec![obs(json!({})), obs(json!({}))]).with_pipeline(["constant"]);

    let computed = compute(&tree, &plugins, &Context::default()).unwrap();

    assert_eq!(b_values(&computed), vec![42.0, 42.0]);
}

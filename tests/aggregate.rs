use impact_engine::error::EngineError;
use impact_engine::{
    AggregationMethod, AggregationSpec, AggregationType, Children, Node, Observation,
    ParameterRegistry, aggregate,
};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn obs(value: Value) -> Observation {
    serde_json::from_value(value).unwrap()
}

/// A computed leaf: no pipeline left to run, outputs already in place.
fn computed_leaf(outputs: Vec<Value>) -> Node {
    let mut node = Node::leaf(Vec::new());
    node.outputs = Some(outputs.into_iter().map(obs).collect());
    node
}

fn branch(children: Vec<(&str, Node)>) -> Node {
    Node::branch(
        children
            .into_iter()
            .map(|(name, node)| (name.to_string(), node))
            .collect::<Children>(),
    )
}

fn grid(timestamp: &str, carbon: f64, utilization: f64) -> Value {
    json!({
        "timestamp": timestamp,
        "duration": 5,
        "carbon": carbon,
        "cpu/utilization": utilization
    })
}

#[test]
fn both_sums_leaf_totals_into_the_parent() {
    let carbon = 4000.0000020256216;
    let tree = branch(vec![
        ("server-a", computed_leaf(vec![json!({"timestamp": "2023-12-12T00:00:00.000Z", "duration": 10, "carbon": carbon})])),
        ("server-b", computed_leaf(vec![json!({"timestamp": "2023-12-12T00:00:00.000Z", "duration": 10, "carbon": carbon})])),
    ]);
    let spec = AggregationSpec::new(["carbon"], AggregationType::Both);

    let result = aggregate(&tree, &spec, &ParameterRegistry::with_builtins()).unwrap();

    let total = result.aggregated.as_ref().unwrap()["carbon"].as_f64().unwrap();
    assert_eq!(total, 2.0 * carbon);
    assert!((total - 8000.000004051243).abs() < 1e-9);
    for (_, child) in result.children().unwrap().iter() {
        assert_eq!(child.aggregated.as_ref().unwrap()["carbon"].as_f64(), Some(carbon));
    }
}

#[test]
fn horizontal_reduces_each_leaf_over_time() {
    let tree = computed_leaf(vec![
        grid("2023-12-12T00:00:00.000Z", 1.0, 20.0),
        grid("2023-12-12T00:00:05.000Z", 2.0, 40.0),
        grid("2023-12-12T00:00:10.000Z", 3.0, 60.0),
    ]);
    let spec = AggregationSpec::new(["carbon", "cpu/utilization"], AggregationType::Horizontal);

    let result = aggregate(&tree, &spec, &ParameterRegistry::with_builtins()).unwrap();
    let aggregated = result.aggregated.unwrap();

    assert_eq!(aggregated["carbon"].as_f64(), Some(6.0));
    assert_eq!(aggregated["cpu/utilization"].as_f64(), Some(40.0));
    assert_eq!(aggregated.len(), 2);
}

#[test]
fn horizontal_leaves_branches_without_outputs() {
    let tree = branch(vec![("leaf", computed_leaf(vec![grid("2023-12-12T00:00:00.000Z", 1.0, 10.0)]))]);
    let spec = AggregationSpec::new(["carbon"], AggregationType::Horizontal);

    let result = aggregate(&tree, &spec, &ParameterRegistry::with_builtins()).unwrap();

    assert_eq!(result.aggregated, None);
    assert_eq!(result.outputs, None);
}

#[test]
fn vertical_combines_siblings_per_time_index() {
    let tree = branch(vec![
        (
            "a",
            computed_leaf(vec![
                grid("2023-12-12T00:00:00.000Z", 1.0, 10.0),
                grid("2023-12-12T00:00:05.000Z", 2.0, 30.0),
            ]),
        ),
        (
            "b",
            computed_leaf(vec![
                grid("2023-12-12T00:00:00.000Z", 3.0, 50.0),
                grid("2023-12-12T00:00:05.000Z", 4.0, 70.0),
            ]),
        ),
    ]);
    let spec = AggregationSpec::new(["carbon", "cpu/utilization"], AggregationType::Vertical);

    let result = aggregate(&tree, &spec, &ParameterRegistry::with_builtins()).unwrap();
    let outputs = result.outputs.unwrap();

    assert_eq!(result.aggregated, None);
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0]["timestamp"], json!("2023-12-12T00:00:00.000Z"));
    assert_eq!(outputs[1]["timestamp"], json!("2023-12-12T00:00:05.000Z"));
    assert_eq!(outputs[0]["carbon"].as_f64(), Some(4.0));
    assert_eq!(outputs[1]["carbon"].as_f64(), Some(6.0));
    assert_eq!(outputs[0]["cpu/utilization"].as_f64(), Some(30.0));
    assert_eq!(outputs[1]["cpu/utilization"].as_f64(), Some(50.0));
}

#[test]
fn nested_branches_roll_up_bottom_first() {
    let tree = branch(vec![
        (
            "region",
            branch(vec![
                ("a", computed_leaf(vec![grid("2023-12-12T00:00:00.000Z", 1.0, 0.0)])),
                ("b", computed_leaf(vec![grid("2023-12-12T00:00:00.000Z", 2.0, 0.0)])),
            ]),
        ),
        ("c", computed_leaf(vec![grid("2023-12-12T00:00:00.000Z", 4.0, 0.0)])),
    ]);
    let spec = AggregationSpec::new(["carbon"], AggregationType::Both);

    let result = aggregate(&tree, &spec, &ParameterRegistry::with_builtins()).unwrap();

    let region = result.children().unwrap().get("region").unwrap();
    assert_eq!(region.aggregated.as_ref().unwrap()["carbon"].as_f64(), Some(3.0));
    assert_eq!(result.aggregated.as_ref().unwrap()["carbon"].as_f64(), Some(7.0));
}

#[test]
fn none_method_metrics_fail_before_any_node_is_visited() {
    // This leaf has no outputs and would fail on its own.
    let tree = Node::leaf(Vec::new());
    let spec = AggregationSpec::new(["carbon", "resources-total"], AggregationType::Both);

    let err = aggregate(&tree, &spec, &ParameterRegistry::with_builtins()).unwrap_err();

    assert!(matches!(
        err,
        EngineError::Aggregation(msg)
            if msg == "Aggregation is not possible for given resources-total since method is 'none'."
    ));
}

#[test]
fn missing_metric_reports_its_index() {
    let tree = computed_leaf(vec![
        grid("2023-12-12T00:00:00.000Z", 1.0, 0.0),
        json!({"timestamp": "2023-12-12T00:00:05.000Z", "duration": 5}),
    ]);
    let spec = AggregationSpec::new(["carbon"], AggregationType::Horizontal);

    let err = aggregate(&tree, &spec, &ParameterRegistry::with_builtins()).unwrap_err();

    assert!(matches!(
        err.root(),
        EngineError::Aggregation(msg) if msg == "Aggregation metric carbon is not found in inputs[1]."
    ));
}

#[test]
fn manifest_declared_methods_drive_the_reduction() {
    let params = ParameterRegistry::new().with("requests-per-user", AggregationMethod::Avg);
    let tree = computed_leaf(vec![
        json!({"requests-per-user": 10}),
        json!({"requests-per-user": 20}),
    ]);
    let spec = AggregationSpec::new(["requests-per-user"], AggregationType::Horizontal);

    let result = aggregate(&tree, &spec, &params).unwrap();

    assert_eq!(result.aggregated.unwrap()["requests-per-user"].as_f64(), Some(15.0));
}

#[test]
fn input_tree_is_left_untouched() {
    let tree = branch(vec![("a", computed_leaf(vec![grid("2023-12-12T00:00:00.000Z", 1.0, 0.0)]))]);
    let before = tree.clone();
    let spec = AggregationSpec::new(["carbon"], AggregationType::Both);

    aggregate(&tree, &spec, &ParameterRegistry::with_builtins()).unwrap();

    assert_eq!(tree, before);
}

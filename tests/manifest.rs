use impact_engine::{
    Context, Manifest, ParameterRegistry, aggregate, compute, registry_from_manifest,
};

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn run(document: serde_json::Value) -> impact_engine::Result<Manifest> {
    let mut manifest: Manifest = serde_json::from_value(document).unwrap();
    let mut params = ParameterRegistry::with_builtins();
    params.combine(manifest.parameters.iter().cloned());
    let params = Arc::new(params);

    let plugins = registry_from_manifest(&manifest.initialize, &params)?;
    let mut tree = compute(&manifest.tree, &plugins, &Context::default())?;
    if let Some(spec) = &manifest.aggregation {
        tree = aggregate(&tree, spec, &params)?;
    }
    manifest.tree = tree;
    Ok(manifest)
}

#[test]
fn grouped_and_synced_manifest_aggregates_per_region() {
    let manifest = run(json!({
        "name": "demo",
        "initialize": {
            "plugins": {
                "carbon-from-energy": {
                    "method": "Coefficient",
                    "path": "builtin",
                    "config": {"input-parameter": "energy", "coefficient": 100, "output-parameter": "carbon"}
                },
                "time-sync": {
                    "method": "TimeSync",
                    "path": "builtin",
                    "config": {
                        "start-time": "2023-12-12T00:00:00.000Z",
                        "end-time": "2023-12-12T00:00:10.000Z",
                        "interval": 5,
                        "allow-padding": true
                    }
                }
            }
        },
        "aggregation": {"metrics": ["carbon"], "type": "both"},
        "tree": {
            "pipeline": ["group-by", "time-sync", "carbon-from-energy"],
            "config": {"group-by": {"group": ["cloud/region"]}},
            "inputs": [
                {"timestamp": "2023-12-12T00:00:00.000Z", "duration": 10, "cloud/region": "uk-west", "energy": 0.2},
                {"timestamp": "2023-12-12T00:00:00.000Z", "duration": 10, "cloud/region": "uk-east", "energy": 0.4}
            ]
        }
    }))
    .unwrap();

    let tree = &manifest.tree;
    let children = tree.children().unwrap();
    assert_eq!(children.names().collect::<Vec<_>>(), vec!["uk-west", "uk-east"]);

    let west = children.get("uk-west").unwrap();
    let west_outputs = west.outputs.as_ref().unwrap();
    assert_eq!(west_outputs.len(), 2);
    assert!((west_outputs[0]["carbon"].as_f64().unwrap() - 10.0).abs() < 1e-9);

    let total = tree.aggregated.as_ref().unwrap()["carbon"].as_f64().unwrap();
    assert!((total - 60.0).abs() < 1e-9);
    assert_eq!(tree.outputs.as_ref().map(|outputs| outputs.len()), Some(2));
    assert_eq!(manifest.extra["name"], json!("demo"));
}

#[test]
fn computed_manifest_serializes_back_to_the_document_shape() {
    let manifest = run(json!({
        "initialize": {
            "plugins": {
                "double": {
                    "method": "Multiply",
                    "config": {"input-parameters": ["a", "b"], "output-parameter": "c"}
                }
            }
        },
        "tree": {
            "children": {
                "child": {
                    "pipeline": ["double"],
                    "inputs": [{"timestamp": "2023-12-12T00:00:00.000Z", "duration": 1, "a": 2, "b": 3}]
                }
            }
        }
    }))
    .unwrap();

    let rendered = serde_json::to_value(&manifest).unwrap();
    let child = &rendered["tree"]["children"]["child"];

    assert_eq!(child["inputs"][0]["a"], json!(2));
    assert_eq!(child["outputs"][0]["c"].as_f64(), Some(6.0));
    assert!(rendered.get("aggregation").is_none());
    assert!(rendered["tree"].get("aggregated").is_none());
}

#[test]
fn undeclared_plugin_in_pipeline_is_reported_with_its_node() {
    let err = run(json!({
        "tree": {
            "children": {
                "server": {"pipeline": ["teads-curve"], "inputs": [{"cpu/utilization": 10}]}
            }
        }
    }))
    .unwrap_err();

    assert!(err.to_string().contains("tree.children.server"));
    assert!(err.to_string().contains("Not initialized plugin: teads-curve"));
}

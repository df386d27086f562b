//! Built-in plugins and registry population.
//!
//! Pipelines refer to plugins by the names declared in
//! `initialize.plugins`; each declaration names a built-in `method`.
//! `time-sync` and `group-by` are always available under those names.

mod arithmetic;
mod group_by;
mod regex_match;

pub use arithmetic::{Coefficient, Multiply, Sum};
pub use group_by::GroupBy;
pub use regex_match::RegexMatch;

use crate::error::{EngineError, Result, ResultExt};
use crate::manifest::Initialize;
use crate::params::ParameterRegistry;
use crate::plugin::{Plugin, PluginRegistry};
use crate::time_sync::TimeSync;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

const BUILTIN_PATHS: [&str; 2] = ["builtin", "builtins"];

/// Build the plugin for a built-in `method`.
pub fn instantiate(
    method: &str,
    global_config: Option<Value>,
    params: &Arc<ParameterRegistry>,
) -> Result<Plugin> {
    let plugin = match method {
        "TimeSync" | "time-sync" => Plugin::execute(TimeSync::new(global_config, Arc::clone(params))),
        "GroupBy" | "group-by" => Plugin::group_by(GroupBy::new(global_config)),
        "Sum" | "sum" => Plugin::execute(Sum::new(global_config)),
        "Multiply" | "multiply" => Plugin::execute(Multiply::new(global_config)),
        "Coefficient" | "coefficient" => Plugin::execute(Coefficient::new(global_config)),
        "Regex" | "regex" => Plugin::execute(RegexMatch::new(global_config)),
        other => {
            return Err(EngineError::PluginResolution(format!(
                "Unknown built-in method `{}`",
                other
            )));
        }
    };
    Ok(plugin)
}

/// Registry holding `time-sync`, `group-by`, and every plugin declared in
/// `initialize.plugins`.
pub fn registry_from_manifest(
    initialize: &Initialize,
    params: &Arc<ParameterRegistry>,
) -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    registry
        .register("time-sync", instantiate("TimeSync", None, params)?)
        .register("group-by", instantiate("GroupBy", None, params)?);

    let declarations = initialize
        .declarations()
        .map_err(|e| EngineError::Configuration(format!("initialize.plugins: {}", e)))?;

    for (name, declaration) in declarations {
        if let Some(path) = declaration.path.as_deref() {
            if !BUILTIN_PATHS.contains(&path) {
                return Err(EngineError::PluginResolution(format!(
                    "Provided module `{}` for plugin `{}` is not a built-in; external modules \
                     must be registered by the host application",
                    path, name
                )));
            }
        }

        let plugin = instantiate(&declaration.method, declaration.config, params)
            .with_context(|| format!("initialize.plugins.{}", name))?;
        tracing::debug!("Registered {} plugin `{}` ({})", plugin.kind(), name, declaration.method);
        registry.register(name, plugin);
    }

    Ok(registry)
}

/// Node-level config wins over the global one; one of them must be present.
pub(crate) fn resolve_config<'a>(
    node: Option<&'a Value>,
    global: Option<&'a Value>,
) -> Result<&'a Value> {
    let present = |value: &&Value| value.as_object().is_some_and(|map| !map.is_empty());
    node.filter(present)
        .or(global.filter(present))
        .ok_or_else(|| EngineError::Configuration("Config is not provided.".to_string()))
}

pub(crate) fn parse_config<T: DeserializeOwned>(plugin: &str, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| EngineError::Configuration(format!("{} config: {}", plugin, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginKind;
    use serde_json::json;

    #[test]
    fn registers_declared_plugins() {
        let initialize: Initialize = serde_json::from_value(json!({
            "plugins": {
                "sum-energy": {"method": "Sum", "path": "builtin"},
                "grouping": {"method": "GroupBy", "path": "builtin"}
            }
        }))
        .unwrap();
        let params = Arc::new(ParameterRegistry::with_builtins());

        let registry = registry_from_manifest(&initialize, &params).unwrap();

        assert_eq!(registry.names(), vec!["group-by", "grouping", "sum-energy", "time-sync"]);
        assert_eq!(registry.get("grouping").unwrap().kind(), PluginKind::GroupBy);
    }

    #[test]
    fn external_modules_are_not_loaded() {
        let initialize: Initialize = serde_json::from_value(json!({
            "plugins": {"teads": {"method": "TeadsCurve", "path": "@grnsft/if-unofficial-plugins"}}
        }))
        .unwrap();
        let params = Arc::new(ParameterRegistry::new());

        let err = registry_from_manifest(&initialize, &params).unwrap_err();
        assert!(matches!(err.root(), EngineError::PluginResolution(_)));
    }

    #[test]
    fn node_config_overrides_global() {
        let global = json!({"a": 1});
        let node = json!({"a": 2});
        assert_eq!(resolve_config(Some(&node), Some(&global)).unwrap(), &node);
        assert_eq!(resolve_config(None, Some(&global)).unwrap(), &global);
        assert!(resolve_config(None, None).is_err());
        assert!(resolve_config(Some(&json!({})), None).is_err());
        assert_eq!(resolve_config(Some(&json!({})), Some(&global)).unwrap(), &global);
    }
}

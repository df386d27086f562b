use crate::error::{EngineError, Result};
use crate::plugin::Plugin;

use std::collections::HashMap;

/// Plugins addressable by the names pipelines refer to them with.
///
/// Population (built-ins, or anything a host application loads) happens
/// before a run; the executor only reads.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` under `name`, replacing any previous holder.
    pub fn register(&mut self, name: impl Into<String>, plugin: Plugin) -> &mut Self {
        let name = name.into();
        if self.plugins.insert(name.clone(), plugin).is_some() {
            tracing::debug!("Plugin `{}` re-registered", name);
        }
        self
    }

    pub fn with(mut self, name: impl Into<String>, plugin: Plugin) -> Self {
        self.register(name, plugin);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Plugin> {
        self.plugins.get(name).ok_or_else(|| {
            EngineError::PluginResolution(format!(
                "Not initialized plugin: {}. Check if {} is in 'initialize.plugins'.",
                name, name
            ))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

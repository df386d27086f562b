//! Error taxonomy for the computation engine.
//!
//! Every failure unwinds to the caller of `compute` / `aggregate`; nothing is
//! retried and no partial tree is ever returned.

use thiserror::Error;

/// Errors raised while executing or aggregating a manifest tree.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing or invalid plugin / aggregation configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed observation: missing, mistyped or out-of-range field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Time-sync overlap, divisibility or padding violation.
    #[error("Temporal alignment error: {0}")]
    TemporalAlignment(String),

    /// A pipeline names a plugin the registry does not hold.
    #[error("Plugin resolution error: {0}")]
    PluginResolution(String),

    /// `none`-method metric requested, or metric missing from an output.
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// Group-by key absent from an observation.
    #[error("Grouping error: {0}")]
    Grouping(String),

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, with every layer of context peeled off.
    pub fn root(&self) -> &EngineError {
        match self {
            EngineError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

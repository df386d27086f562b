//! Logging setup and warning helpers shared by the engine and the CLI.

use std::collections::HashSet;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Logs go to stderr so stdout stays
/// free for the output document.
pub fn init_logging(debug: bool) {
    let default = if debug {
        "info,impact_engine=debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Emits each distinct warning once.
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: Mutex<HashSet<String>>,
}

impl WarnOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` at warn level unless `key` was already reported.
    /// Returns true if the warning was emitted.
    pub fn warn(&self, key: &str, message: impl FnOnce() -> String) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !seen.insert(key.to_string()) {
            return false;
        }
        tracing::warn!("{}", message());
        true
    }
}

impl Clone for WarnOnce {
    fn clone(&self) -> Self {
        let seen = match self.seen.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Self {
            seen: Mutex::new(seen),
        }
    }
}

//! Publishing connection parameters for the application under test

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Publishes fixture connection parameters as process environment variables
/// and remembers what was published.
///
/// Environment variables are the process-wide channel the application under
/// test reads its configuration from, so publishing is deliberately
/// process-global; the sink itself is owned by one session.
#[derive(Debug, Default)]
pub struct PropertySink {
    published: Mutex<BTreeMap<String, String>>,
}

impl PropertySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the given pairs, overwriting earlier values for equal keys.
    pub fn publish(&self, properties: Vec<(String, String)>) {
        let mut published = self
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (key, value) in properties {
            tracing::debug!(key = %key, "publishing fixture property");
            std::env::set_var(&key, &value);
            published.insert(key, value);
        }
    }

    /// Value published under `key`, if any
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Keys published so far
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

//! Registry of buttons whose proxy state is being monitored

use crate::{ContextId, DesiredProxyConfig};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Concurrent map from button context to its desired proxy configuration.
///
/// Written by surface event handlers and read by the reconciliation loop.
/// Readers only ever get a copy, taken under the lock, so an entry is never
/// seen half-written. Last writer wins per context.
#[derive(Debug, Default)]
pub struct MonitoringRegistry {
    entries: RwLock<HashMap<ContextId, DesiredProxyConfig>>,
}

impl MonitoringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `config.context`
    pub fn upsert(&self, config: DesiredProxyConfig) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(config.context.clone(), config);
    }

    pub fn remove(&self, context: &ContextId) -> Option<DesiredProxyConfig> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(context)
    }

    pub fn get(&self, context: &ContextId) -> Option<DesiredProxyConfig> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(context)
            .cloned()
    }

    /// True when `config` is exactly what is registered for its context
    pub fn is_current(&self, config: &DesiredProxyConfig) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&config.context)
            == Some(config)
    }

    /// Point-in-time copy of all entries, ordered by context
    pub fn snapshot(&self) -> Vec<DesiredProxyConfig> {
        let mut entries: Vec<DesiredProxyConfig> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.context.cmp(&b.context));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// src/mutator.rs
// Harness-side copy of the forum's runtime configuration

use crate::backend::{BackendError, ForumBackend};
use crate::routes::ConfigOverrides;
use std::collections::BTreeMap;

/// What the harness last pushed. `version` increases once per push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigState {
    pub version: u64,
    pub values: BTreeMap<String, String>,
}

/// Applies a case's required configuration by pushing only what differs
/// from the last known state.
#[derive(Debug, Default)]
pub struct ConfigMutator {
    state: ConfigState,
}

impl ConfigMutator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConfigState {
        &self.state
    }

    /// Keys in `wanted` whose value is unknown or different.
    pub fn diff(&self, wanted: &ConfigOverrides) -> BTreeMap<String, String> {
        wanted
            .iter()
            .filter(|(key, value)| self.state.values.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns whether anything was pushed. On error the known state is left
    /// untouched, so the next apply pushes the same keys again.
    pub async fn apply<B: ForumBackend>(
        &mut self,
        backend: &B,
        wanted: &ConfigOverrides,
    ) -> Result<bool, BackendError> {
        let changes = self.diff(wanted);
        if changes.is_empty() {
            return Ok(false);
        }

        log::debug!("pushing configuration {:?}", changes);
        backend.set_config(&changes).await?;

        self.state.values.extend(changes);
        self.state.version += 1;
        Ok(true)
    }

    /// Forget everything pushed. Called once the forum has been wiped.
    pub fn clear(&mut self) {
        self.state.values.clear();
        self.state.version += 1;
    }
}

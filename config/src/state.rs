use std::sync::Arc;

use serde_json::Value;

use comfort_types::{Configuration, ExtensionState, SessionStats};

use crate::store::{MemoryStorage, StorageBackend, StorageScope, StoreError};

/// Local key holding the settings UI's blob. The value is a JSON *string* that
/// itself contains the serialized [`ExtensionState`].
pub const STATE_KEY: &str = "mimo_research_v3";
/// Last selection, mirrored for surfaces that want to show it.
pub const SELECTED_TEXT_KEY: &str = "selectedText";
/// Number of tool clicks.
pub const SELECTION_COUNT_KEY: &str = "selectionCount";
/// Popup quick-stats counters.
pub const SESSION_STATS_KEY: &str = "sessionStats";

/// Typed view over the durable store. Cheap to clone; every clone talks to the
/// same backend.
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore").finish_non_exhaustive()
    }
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Current extension state. A missing blob reads as the defaults; so does a
    /// blob that no longer parses (logged at warn).
    pub fn load_state(&self) -> Result<ExtensionState, StoreError> {
        let Some(value) = self.backend.get(StorageScope::Local, STATE_KEY)? else {
            return Ok(ExtensionState::default());
        };

        let parsed = match value {
            Value::String(encoded) => serde_json::from_str::<ExtensionState>(&encoded),
            // Tolerate a blob written as a plain object.
            other => serde_json::from_value::<ExtensionState>(other),
        };

        Ok(parsed.unwrap_or_else(|e| {
            tracing::warn!(key = STATE_KEY, "Stored extension state is unreadable: {e}");
            ExtensionState::default()
        }))
    }

    /// Configuration snapshot for one routed request.
    pub fn configuration(&self) -> Result<Configuration, StoreError> {
        self.load_state().map(|state| state.config)
    }

    pub fn save_state(&self, state: &ExtensionState) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(state).map_err(|source| StoreError::Encode {
            key: STATE_KEY.to_string(),
            source,
        })?;
        self.backend
            .set(StorageScope::Local, STATE_KEY, Value::String(encoded))
    }

    /// Write the default state unless one is already stored. Returns whether
    /// anything was written.
    pub fn seed_defaults(&self) -> Result<bool, StoreError> {
        if self.backend.get(StorageScope::Local, STATE_KEY)?.is_some() {
            return Ok(false);
        }
        self.save_state(&ExtensionState::default())?;
        Ok(true)
    }

    /// Read-modify-write of the configuration part of the blob.
    pub fn update_configuration(
        &self,
        update: impl FnOnce(&mut Configuration),
    ) -> Result<(), StoreError> {
        let mut state = self.load_state()?;
        update(&mut state.config);
        self.save_state(&state)
    }

    pub fn set_selected_text(&self, text: &str) -> Result<(), StoreError> {
        self.backend.set(
            StorageScope::Local,
            SELECTED_TEXT_KEY,
            Value::String(text.to_string()),
        )
    }

    pub fn selected_text(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .backend
            .get(StorageScope::Local, SELECTED_TEXT_KEY)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    /// Not atomic across contexts: concurrent increments can lose updates.
    pub fn increment_selection_count(&self) -> Result<u64, StoreError> {
        let current = self.selection_count()?;
        let next = current.saturating_add(1);
        self.backend
            .set(StorageScope::Local, SELECTION_COUNT_KEY, Value::from(next))?;
        Ok(next)
    }

    pub fn selection_count(&self) -> Result<u64, StoreError> {
        Ok(self
            .backend
            .get(StorageScope::Local, SELECTION_COUNT_KEY)?
            .and_then(|value| value.as_u64())
            .unwrap_or(0))
    }

    pub fn session_stats(&self) -> Result<SessionStats, StoreError> {
        Ok(self
            .backend
            .get(StorageScope::Local, SESSION_STATS_KEY)?
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default())
    }

    /// Same lost-update caveat as [`Self::increment_selection_count`].
    pub fn record_stats(
        &self,
        update: impl FnOnce(&mut SessionStats),
    ) -> Result<SessionStats, StoreError> {
        let mut stats = self.session_stats()?;
        update(&mut stats);
        let value = serde_json::to_value(stats).map_err(|source| StoreError::Encode {
            key: SESSION_STATS_KEY.to_string(),
            source,
        })?;
        self.backend.set(StorageScope::Local, SESSION_STATS_KEY, value)?;
        Ok(stats)
    }
}

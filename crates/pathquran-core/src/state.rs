//! UI-agnostic application state
//!
//! Preferences live here rather than in any one screen. Screens get the
//! state passed in and change it through setters, which persist each change
//! to the store as it happens.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::last_read::LastRead;
use crate::settings::{keys, Preferences, Script, TranslationSource};
use crate::store::{self, KeyValueStore};

pub struct AppState {
    store: Arc<dyn KeyValueStore>,
    preferences: Preferences,
}

impl AppState {
    /// Load preferences from the store, keeping defaults for anything absent.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let preferences = Preferences::load(store.as_ref());
        Self { store, preferences }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    pub fn last_read(&self) -> LastRead {
        LastRead::load(self.store.as_ref())
    }

    pub fn set_script(&mut self, script: Script) {
        self.preferences.script = script;
        self.persist(keys::SCRIPT, &script);
    }

    pub fn set_show_transliteration(&mut self, show: bool) {
        self.preferences.show_transliteration = show;
        self.persist(keys::SHOW_TRANSLITERATION, &show);
    }

    pub fn set_translation(&mut self, source: TranslationSource) {
        self.preferences.translation = source;
        self.persist(keys::TRANSLATION_SOURCE, &source);
    }

    pub fn step_translation_font(&mut self, delta: i32) {
        self.preferences.step_translation_font(delta);
        let size = self.preferences.translation_font_size;
        self.persist(keys::TRANSLATION_FONT_SIZE, &size);
    }

    pub fn step_script_font(&mut self, delta: i32) {
        self.preferences.step_script_font(delta);
        let size = self.preferences.script_font_size;
        self.persist(keys::SCRIPT_FONT_SIZE, &size);
    }

    /// Clear everything stored and return to defaults, including the
    /// last-read position.
    pub fn reset(&mut self) {
        match self.store.clear() {
            Ok(()) => {
                self.preferences = Preferences::default();
                info!("all stored data cleared");
            }
            Err(e) => warn!(error = %e, "failed to clear stored data"),
        }
    }

    // The in-memory value stays as set even if the write fails
    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = store::set_as(self.store.as_ref(), key, value) {
            warn!(key, error = %e, "failed to save preference");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use anyhow::anyhow;
    use serde_json::{json, Value};

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: Value) -> anyhow::Result<()> {
            Err(anyhow!("read-only"))
        }
        fn clear(&self) -> anyhow::Result<()> {
            Err(anyhow!("read-only"))
        }
    }

    #[test]
    fn test_setters_persist_each_change() {
        let store = Arc::new(MemoryStore::new());
        let mut state = AppState::load(store.clone());

        state.set_script(Script::IndoPak);
        state.set_show_transliteration(true);
        state.set_translation(TranslationSource::ClearQuran);
        state.step_translation_font(2);
        state.step_script_font(-1);

        assert_eq!(store.get(keys::SCRIPT).unwrap(), Some(json!("indopak")));
        assert_eq!(store.get(keys::SHOW_TRANSLITERATION).unwrap(), Some(json!(true)));
        assert_eq!(store.get(keys::TRANSLATION_SOURCE).unwrap(), Some(json!("clear-quran")));
        assert_eq!(store.get(keys::TRANSLATION_FONT_SIZE).unwrap(), Some(json!(20)));
        assert_eq!(store.get(keys::SCRIPT_FONT_SIZE).unwrap(), Some(json!(29)));

        let reloaded = AppState::load(store);
        assert_eq!(reloaded.preferences(), state.preferences());
    }

    #[test]
    fn test_reset_clears_preferences_and_last_read() {
        let store = Arc::new(MemoryStore::new());
        LastRead::new(2, 255).save(store.as_ref()).unwrap();
        let mut state = AppState::load(store.clone());
        state.set_script(Script::Off);

        state.reset();

        assert_eq!(*state.preferences(), Preferences::default());
        assert!(state.last_read().is_start());
        assert_eq!(store.get(keys::SCRIPT).unwrap(), None);
    }

    #[test]
    fn test_failed_write_keeps_in_memory_value() {
        let mut state = AppState::load(Arc::new(ReadOnlyStore));
        state.set_script(Script::IndoPak);
        assert_eq!(state.preferences().script, Script::IndoPak);

        state.reset();
        assert_eq!(state.preferences().script, Script::IndoPak);
    }
}

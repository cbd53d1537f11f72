//! Persists the Settings document (§6.1) as a single JSON value through
//! `KvStore`, applying the defaults-merge rule on every load.

use mnemo_index::KvStore;
use mnemo_types::settings::Settings;

use crate::error::Result;

const COLLECTION: &str = "settings";
const DOC_KEY: &str = "document";

pub struct SettingsStore<'a> {
    kv: &'a dyn KvStore,
}

impl<'a> SettingsStore<'a> {
    pub fn new(kv: &'a dyn KvStore) -> Self {
        Self { kv }
    }

    /// Loads the stored document and merges it against `defaults`. A
    /// missing document is treated as an empty one, so a fresh workspace
    /// simply adopts `defaults` wholesale.
    pub fn load(&self, defaults: &Settings) -> Result<Settings> {
        let stored: Settings = self
            .kv
            .get(COLLECTION, DOC_KEY)?
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_else(|| Settings {
                registry: Vec::new(),
                enabled: Default::default(),
                approvals: Default::default(),
                script_options: Default::default(),
                connectors: Default::default(),
                ..defaults.clone()
            });
        Ok(stored.merge_defaults(defaults))
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        self.kv.put(COLLECTION, DOC_KEY, &serde_json::to_value(settings)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_index::InMemoryKvStore;
    use mnemo_types::settings::ScriptRegistryEntry;

    fn entry(id: &str) -> ScriptRegistryEntry {
        ScriptRegistryEntry {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: None,
            matches: vec!["https://chatgpt.com/*".to_string()],
            run_at: "document_idle".to_string(),
            permissions: vec![],
            entry: format!("{}.js", id),
            default_enabled: true,
            default_options: serde_json::json!({}),
        }
    }

    #[test]
    fn fresh_workspace_adopts_defaults() {
        let kv = InMemoryKvStore::new();
        let store = SettingsStore::new(&kv);
        let mut defaults = Settings::default();
        defaults.registry.push(entry("autosave"));

        let loaded = store.load(&defaults).unwrap();
        assert_eq!(loaded.registry.len(), 1);
    }

    #[test]
    fn saved_settings_roundtrip_through_merge() {
        let kv = InMemoryKvStore::new();
        let store = SettingsStore::new(&kv);
        let mut defaults = Settings::default();
        defaults.registry.push(entry("autosave"));

        let mut settings = store.load(&defaults).unwrap();
        settings.global_enabled = false;
        store.save(&settings).unwrap();

        let reloaded = store.load(&defaults).unwrap();
        assert!(!reloaded.global_enabled);
        assert_eq!(reloaded.registry.len(), 1);
    }
}

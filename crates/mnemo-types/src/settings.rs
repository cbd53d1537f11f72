use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::connector::ConnectorDocument;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRegistryEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub matches: Vec<String>,
    #[serde(default = "default_run_at")]
    pub run_at: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub entry: String,
    pub default_enabled: bool,
    #[serde(default)]
    pub default_options: serde_json::Value,
}

fn default_run_at() -> String {
    "document_idle".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_export_format")]
    pub default_export_format: String,
}

fn default_theme() -> String {
    "system".to_string()
}

fn default_export_format() -> String {
    "markdown".to_string()
}

pub const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub version: u32,
    pub global_enabled: bool,
    pub registry: Vec<ScriptRegistryEntry>,
    pub enabled: HashMap<String, bool>,
    pub approvals: HashMap<String, HashMap<String, bool>>,
    pub script_options: HashMap<String, serde_json::Value>,
    pub connectors: ConnectorDocument,
    pub ui: UiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            global_enabled: true,
            registry: Vec::new(),
            enabled: HashMap::new(),
            approvals: HashMap::new(),
            script_options: HashMap::new(),
            connectors: ConnectorDocument::default(),
            ui: UiSettings::default(),
        }
    }
}

impl Settings {
    /// Merge `self` (loaded, possibly stale) with `defaults` (shipped with
    /// this build), per §6.1: union registry by id; union enabled/approvals/
    /// scriptOptions/ui; preserve existing connectors; preserve an explicit
    /// `globalEnabled = false`.
    pub fn merge_defaults(mut self, defaults: &Settings) -> Self {
        let explicit_disabled = !self.global_enabled;

        let mut by_id: HashMap<String, ScriptRegistryEntry> = self
            .registry
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();
        for entry in &defaults.registry {
            by_id.entry(entry.id.clone()).or_insert_with(|| entry.clone());
        }
        let mut registry: Vec<ScriptRegistryEntry> = by_id.into_values().collect();
        registry.sort_by(|a, b| a.id.cmp(&b.id));

        let mut enabled = defaults.enabled.clone();
        enabled.extend(self.enabled.drain());

        let mut approvals = defaults.approvals.clone();
        approvals.extend(self.approvals.drain());

        let mut script_options = defaults.script_options.clone();
        script_options.extend(self.script_options.drain());

        Self {
            version: SETTINGS_VERSION,
            global_enabled: if explicit_disabled { false } else { true },
            registry,
            enabled,
            approvals,
            script_options,
            connectors: self.connectors,
            ui: self.ui,
        }
    }

    /// A script is enabled for a URL iff globalEnabled, enabled[id]=true, and
    /// the URL matches at least one of its glob patterns (exact or `<prefix>/*`).
    pub fn is_enabled_for_url(&self, script_id: &str, url: &str) -> bool {
        if !self.global_enabled {
            return false;
        }
        if !*self.enabled.get(script_id).unwrap_or(&false) {
            return false;
        }
        let Some(entry) = self.registry.iter().find(|e| e.id == script_id) else {
            return false;
        };
        entry.matches.iter().any(|pattern| url_matches(pattern, url))
    }

    pub fn enabled_scripts_for_url(&self, url: &str) -> Vec<String> {
        self.registry
            .iter()
            .filter(|e| self.is_enabled_for_url(&e.id, url))
            .map(|e| e.id.clone())
            .collect()
    }
}

/// Supports exact matches and a single trailing `/*` wildcard (glob-lite).
pub fn url_matches(pattern: &str, url: &str) -> bool {
    if pattern == url {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return url == prefix || url.starts_with(&format!("{}/", prefix));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(url_matches("https://chatgpt.com/", "https://chatgpt.com/"));
    }

    #[test]
    fn prefix_wildcard_match() {
        assert!(url_matches(
            "https://chatgpt.com/*",
            "https://chatgpt.com/c/abc"
        ));
        assert!(url_matches("https://chatgpt.com/*", "https://chatgpt.com"));
        assert!(!url_matches(
            "https://chatgpt.com/*",
            "https://notchatgpt.com/c/abc"
        ));
    }

    #[test]
    fn merge_preserves_explicit_disable() {
        let mut defaults = Settings::default();
        defaults.registry.push(ScriptRegistryEntry {
            id: "autosave".to_string(),
            name: "Autosave".to_string(),
            description: "".to_string(),
            icon: None,
            matches: vec!["https://chatgpt.com/*".to_string()],
            run_at: "document_idle".to_string(),
            permissions: vec![],
            entry: "autosave.js".to_string(),
            default_enabled: true,
            default_options: serde_json::json!({}),
        });

        let mut loaded = Settings::default();
        loaded.global_enabled = false;

        let merged = loaded.merge_defaults(&defaults);
        assert!(!merged.global_enabled);
        assert_eq!(merged.registry.len(), 1);
    }
}

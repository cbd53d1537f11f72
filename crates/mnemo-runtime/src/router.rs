//! The single command-surface entry point described by §4.8: every request
//! a browser popup/options UI/content script would send is a method here,
//! operating over one workspace's graph, conversation store, job queue, and
//! settings document. The CLI (`mnemo-cli`) is the only caller in this
//! repository, driving the same surface a browser host would.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mnemo_engine::{ConversationStore, MemoryGraph};
use mnemo_index::{GraphStore, KvStore};
use mnemo_types::connector::ConnectorDocument;
use mnemo_types::conversation::{Conversation, ConversationInput, ConversationMetaPatch, SearchQuery};
use mnemo_types::job::Job;
use mnemo_types::settings::Settings;
use mnemo_types::RouterError;
use mnemo_webhook::{JobStore, PermissionOracle, PumpReport};

use crate::error::Result;
use crate::settings_store::SettingsStore;

const USAGE_COLLECTION: &str = "usage_stats";
const USAGE_KEY: &str = "document";
const NOTES_COLLECTION: &str = "notes";
const NOTES_KEY: &str = "global";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UsageStats {
    exports: u64,
    saves: u64,
}

/// Ties together the stores and the in-memory graph behind one command
/// surface. Holds its own `MemoryGraph`; callers are responsible for calling
/// [`Router::persist_graph`] after a batch of mutations, the way the sync
/// layer debounces its own writes (§5).
pub struct Router<'a> {
    kv: &'a dyn KvStore,
    graph_store: &'a dyn GraphStore,
    oracle: &'a dyn PermissionOracle,
    client: reqwest::Client,
    defaults: Settings,
    graph: MemoryGraph,
}

impl<'a> Router<'a> {
    pub fn new(
        kv: &'a dyn KvStore,
        graph_store: &'a dyn GraphStore,
        oracle: &'a dyn PermissionOracle,
        client: reqwest::Client,
        defaults: Settings,
    ) -> Result<Self> {
        let (nodes, edges, sessions) = graph_store.load_graph()?;
        let graph = MemoryGraph::from_parts(nodes, edges, sessions);
        Ok(Self { kv, graph_store, oracle, client, defaults, graph })
    }

    pub fn graph(&self) -> &MemoryGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut MemoryGraph {
        &mut self.graph
    }

    /// Writes the live graph's nodes, edges and sessions through to the
    /// `GraphStore`, mirroring the leader's debounced persist in §5.
    pub fn persist_graph(&self) -> Result<()> {
        let (nodes, edges, sessions) = self.graph.snapshot();
        self.graph_store.save_graph(&nodes, &edges, &sessions, &self.graph.stats())?;
        Ok(())
    }

    fn settings_store(&self) -> SettingsStore<'_> {
        SettingsStore::new(self.kv)
    }

    fn conversations(&self) -> ConversationStore<'_> {
        ConversationStore::new(self.kv)
    }

    fn jobs(&self) -> JobStore<'_> {
        JobStore::new(self.kv)
    }

    fn load_usage(&self) -> Result<UsageStats> {
        Ok(self
            .kv
            .get(USAGE_COLLECTION, USAGE_KEY)?
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default())
    }

    fn save_usage(&self, usage: &UsageStats) -> Result<()> {
        self.kv.put(USAGE_COLLECTION, USAGE_KEY, &serde_json::to_value(usage)?)?;
        Ok(())
    }

    fn bump_exports(&self) -> Result<UsageStats> {
        let mut usage = self.load_usage()?;
        usage.exports += 1;
        self.save_usage(&usage)?;
        Ok(usage)
    }

    fn bump_saves(&self) -> Result<UsageStats> {
        let mut usage = self.load_usage()?;
        usage.saves += 1;
        self.save_usage(&usage)?;
        Ok(usage)
    }

    // ---- Settings -----------------------------------------------------

    pub fn get_settings(&self) -> Result<(Settings, Value)> {
        let settings = self.settings_store().load(&self.defaults)?;
        let usage = self.load_usage()?;
        Ok((settings, serde_json::to_value(usage)?))
    }

    pub fn reset_settings(&self) -> Result<Settings> {
        self.settings_store().save(&self.defaults)?;
        Ok(self.defaults.clone())
    }

    pub fn set_theme(&self, theme: &str) -> Result<Settings> {
        let mut settings = self.settings_store().load(&self.defaults)?;
        settings.ui.theme = theme.to_string();
        self.settings_store().save(&settings)?;
        Ok(settings)
    }

    pub fn set_default_export_format(&self, format: &str) -> Result<Settings> {
        let mut settings = self.settings_store().load(&self.defaults)?;
        settings.ui.default_export_format = format.to_string();
        self.settings_store().save(&settings)?;
        Ok(settings)
    }

    pub fn toggle_global(&self) -> Result<Settings> {
        let mut settings = self.settings_store().load(&self.defaults)?;
        settings.global_enabled = !settings.global_enabled;
        self.settings_store().save(&settings)?;
        Ok(settings)
    }

    pub fn set_script_enabled(&self, script_id: &str, enabled: bool) -> Result<Settings> {
        let mut settings = self.settings_store().load(&self.defaults)?;
        settings.enabled.insert(script_id.to_string(), enabled);
        self.settings_store().save(&settings)?;
        Ok(settings)
    }

    pub fn get_enabled_for_url(&self, url: &str) -> Result<Vec<String>> {
        let settings = self.settings_store().load(&self.defaults)?;
        Ok(settings.enabled_scripts_for_url(url))
    }

    // ---- Downloads / stats ---------------------------------------------

    /// The browser Downloads API is out of scope (§1); this repository only
    /// records the `exports` stat a real `download_text` call would bump.
    pub fn download_text(&self, _filename: &str, _text: &str, _mime: &str) -> Result<Value> {
        let usage = self.bump_exports()?;
        Ok(serde_json::to_value(usage)?)
    }

    // ---- Conversations --------------------------------------------------

    pub fn save_conversation(&self, input: ConversationInput, now: DateTime<Utc>) -> Result<Conversation> {
        let saved = self.conversations().save_conversation(input, now)?;
        self.bump_saves()?;
        Ok(saved)
    }

    pub fn list_conversations(&self, query: &SearchQuery, now: DateTime<Utc>) -> Result<Vec<Conversation>> {
        Ok(self.conversations().search(query, now)?)
    }

    pub fn get_conversation_by_id(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations().get(id)?)
    }

    pub fn get_conversation_id_for_url(&self, url: &str) -> Result<Option<String>> {
        Ok(self.conversations().get_id_for_url(url)?)
    }

    pub fn delete_conversation(&self, id: &str) -> Result<bool> {
        Ok(self.conversations().delete(id)?)
    }

    pub fn update_conversation_meta(
        &self,
        id: &str,
        patch: ConversationMetaPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Conversation>> {
        Ok(self.conversations().update_conversation_meta(id, patch, now)?)
    }

    pub fn get_global_notes(&self) -> Result<String> {
        Ok(self
            .kv
            .get(NOTES_COLLECTION, NOTES_KEY)?
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }

    pub fn set_global_notes(&self, text: &str) -> Result<()> {
        self.kv.put(NOTES_COLLECTION, NOTES_KEY, &Value::String(text.to_string()))?;
        Ok(())
    }

    // ---- Connectors / jobs ----------------------------------------------

    pub fn get_connectors(&self) -> Result<ConnectorDocument> {
        let settings = self.settings_store().load(&self.defaults)?;
        Ok(settings.connectors)
    }

    pub fn set_connectors(&self, connectors: ConnectorDocument) -> Result<()> {
        let mut settings = self.settings_store().load(&self.defaults)?;
        settings.connectors = connectors;
        self.settings_store().save(&settings)?;
        Ok(())
    }

    pub fn connector_send(
        &self,
        connector_id: &str,
        payload: Value,
        headers: Option<HashMap<String, String>>,
        kind: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Job> {
        let settings = self.settings_store().load(&self.defaults)?;
        let connector = settings.connectors.get(connector_id).ok_or(RouterError::NoConnector)?;
        if !connector.enabled {
            return Err(RouterError::ConnectorDisabled.into());
        }
        Ok(self.jobs().enqueue(connector_id.to_string(), payload, headers.unwrap_or_default(), kind, now)?)
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.jobs().list()?)
    }

    /// Drives at most `MAX_JOBS_PER_PUMP` runnable jobs through delivery,
    /// per §4.7.
    pub async fn pump_jobs(&self, now: DateTime<Utc>) -> Result<PumpReport> {
        let settings = self.settings_store().load(&self.defaults)?;
        let report = mnemo_webhook::pump(&self.jobs(), &settings.connectors, self.oracle, &self.client, now).await?;
        Ok(report)
    }

    // ---- Content-side -----------------------------------------------------
    //
    // These commands require an active browser tab running a content script
    // (§1, out of scope). There is no such tab in this headless repository,
    // so they always answer `no_active_tab` — the same answer a browser host
    // would give when no content script has registered a receiver.

    pub fn run_now(&self) -> Result<()> {
        Err(RouterError::NoActiveTab.into())
    }

    pub fn export_current(&self, _format: &str) -> Result<()> {
        Err(RouterError::NoActiveTab.into())
    }

    pub fn save_current(&self, _autosave: bool) -> Result<()> {
        Err(RouterError::NoActiveTab.into())
    }

    pub fn copy_current(&self, _format: &str) -> Result<()> {
        Err(RouterError::NoActiveTab.into())
    }

    pub fn invoke_script_action(&self, _script_id: &str, _action: &str, _payload: Value) -> Result<Value> {
        Err(RouterError::NoActiveTab.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_index::InMemoryKvStore;
    use mnemo_index::SqliteGraphStore;
    use mnemo_types::conversation::Message;
    use mnemo_webhook::AllowAll;

    fn router(kv: &InMemoryKvStore, store: &SqliteGraphStore) -> Router<'_> {
        Router::new(kv, store, &AllowAll, reqwest::Client::new(), Settings::default()).unwrap()
    }

    #[test]
    fn settings_roundtrip_through_theme_and_toggle() {
        let kv = InMemoryKvStore::new();
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let router = router(&kv, &store);

        let settings = router.set_theme("dark").unwrap();
        assert_eq!(settings.ui.theme, "dark");

        let toggled = router.toggle_global().unwrap();
        assert!(!toggled.global_enabled);
    }

    #[test]
    fn save_conversation_bumps_saves_stat() {
        let kv = InMemoryKvStore::new();
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let router = router(&kv, &store);

        let input = ConversationInput {
            id: "tmp_1".to_string(),
            title: "Title".to_string(),
            url: "https://chatgpt.com/c/abc".to_string(),
            ts: None,
            messages: vec![Message { role: "user".to_string(), text: "hello".to_string() }],
            text: "hello".to_string(),
            hash: None,
            tags: None,
            pinned: None,
            notes: None,
        };
        router.save_conversation(input, Utc::now()).unwrap();

        let (_, stats) = router.get_settings().unwrap();
        assert_eq!(stats["saves"], 1);
    }

    #[test]
    fn connector_send_rejects_unknown_connector() {
        let kv = InMemoryKvStore::new();
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let router = router(&kv, &store);

        let err = router
            .connector_send("ghost", serde_json::json!({}), None, None, Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("no_connector"));
    }

    #[test]
    fn content_side_commands_report_no_active_tab() {
        let kv = InMemoryKvStore::new();
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let router = router(&kv, &store);

        let err = router.run_now().unwrap_err();
        assert!(err.to_string().contains("no_active_tab"));
    }
}

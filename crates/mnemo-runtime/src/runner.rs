//! Ties a `ConversationSource` to extraction and autosave, per §4.9: for
//! each settled capture, checks whether a script is enabled for its URL,
//! restarts the session on platform/URL change, feeds the text to the
//! extractor, and autosaves the conversation.

use chrono::{DateTime, Utc};

use mnemo_engine::{ConversationStore, Extractor, MemoryGraph};
use mnemo_types::conversation::ConversationInput;
use mnemo_types::session::SessionMeta;
use mnemo_types::settings::Settings;
use mnemo_types::Conversation;

use crate::error::Result;
use crate::source::CapturedConversation;

fn platform_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

pub struct Runner {
    last_session_key: Option<(Option<String>, String)>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self { last_session_key: None }
    }

    /// Returns `None` when no registry script is enabled for the capture's
    /// URL — the capture is discarded without extraction or autosave.
    pub fn process(
        &mut self,
        graph: &mut MemoryGraph,
        conversations: &ConversationStore<'_>,
        settings: &Settings,
        captured: CapturedConversation,
        now: DateTime<Utc>,
    ) -> Result<Option<Conversation>> {
        if settings.enabled_scripts_for_url(&captured.url).is_empty() {
            tracing::debug!(url = %captured.url, "capture ignored: no script enabled for url");
            return Ok(None);
        }

        let platform = platform_from_url(&captured.url);
        let key = (platform.clone(), captured.url.clone());
        if self.last_session_key.as_ref() != Some(&key) {
            graph.end_session(now);
            graph.start_session(
                SessionMeta {
                    platform: platform.clone(),
                    url: Some(captured.url.clone()),
                    title: Some(captured.title.clone()),
                    ..Default::default()
                },
                now,
            );
            self.last_session_key = Some(key);
        }

        Extractor::extract(graph, &captured.text, platform.as_deref(), now);

        let lines: Vec<String> = captured.messages.iter().map(|m| m.text.clone()).collect();
        let hash = Some(mnemo_core::conversation_hash(&lines));

        let input = ConversationInput {
            id: captured.id,
            title: captured.title,
            url: captured.url,
            ts: Some(captured.ts),
            messages: captured.messages,
            text: captured.text,
            hash,
            tags: None,
            pinned: None,
            notes: None,
        };

        let saved = conversations.save_conversation(input, now)?;
        tracing::debug!(id = %saved.id, "conversation autosaved");
        Ok(Some(saved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_index::InMemoryKvStore;
    use mnemo_types::conversation::Message;

    fn capture(id: &str, url: &str, text: &str) -> CapturedConversation {
        CapturedConversation {
            id: id.to_string(),
            title: "Conversation".to_string(),
            url: url.to_string(),
            ts: Utc::now(),
            messages: vec![Message { role: "user".to_string(), text: text.to_string() }],
            text: text.to_string(),
        }
    }

    fn enabled_settings() -> Settings {
        let mut settings = Settings::default();
        settings.registry.push(mnemo_types::settings::ScriptRegistryEntry {
            id: "autosave".to_string(),
            name: "Autosave".to_string(),
            description: String::new(),
            icon: None,
            matches: vec!["https://chatgpt.com/*".to_string()],
            run_at: "document_idle".to_string(),
            permissions: vec![],
            entry: "autosave.js".to_string(),
            default_enabled: true,
            default_options: serde_json::json!({}),
        });
        settings.enabled.insert("autosave".to_string(), true);
        settings
    }

    #[test]
    fn disabled_url_is_skipped() {
        let mut graph = MemoryGraph::new();
        let kv = InMemoryKvStore::new();
        let conversations = ConversationStore::new(&kv);
        let settings = Settings::default();
        let mut runner = Runner::new();

        let result = runner
            .process(&mut graph, &conversations, &settings, capture("tmp_1", "https://other.example/", "hello world this is long enough"), Utc::now())
            .unwrap();
        assert!(result.is_none());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn enabled_capture_starts_session_extracts_and_saves() {
        let mut graph = MemoryGraph::new();
        let kv = InMemoryKvStore::new();
        let conversations = ConversationStore::new(&kv);
        let settings = enabled_settings();
        let mut runner = Runner::new();

        let saved = runner
            .process(
                &mut graph,
                &conversations,
                &settings,
                capture("tmp_1", "https://chatgpt.com/c/abc", "I want to build a rate limiter in rust using axum"),
                Utc::now(),
            )
            .unwrap()
            .unwrap();

        assert_eq!(saved.id, "c_abc");
        assert!(graph.active_session().is_some());
        assert!(graph.node_count() > 0);
    }

    #[test]
    fn same_platform_and_url_does_not_restart_session() {
        let mut graph = MemoryGraph::new();
        let kv = InMemoryKvStore::new();
        let conversations = ConversationStore::new(&kv);
        let settings = enabled_settings();
        let mut runner = Runner::new();
        let now = Utc::now();

        runner
            .process(&mut graph, &conversations, &settings, capture("tmp_1", "https://chatgpt.com/c/abc", "discussing rust and axum web framework"), now)
            .unwrap();
        let first_session = graph.active_session().unwrap().id.clone();

        runner
            .process(&mut graph, &conversations, &settings, capture("tmp_1", "https://chatgpt.com/c/abc", "discussing rust and axum again here"), now)
            .unwrap();
        let second_session = graph.active_session().unwrap().id.clone();

        assert_eq!(first_session, second_session);
    }
}

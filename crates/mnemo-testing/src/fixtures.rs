//! Sample data builders for the memory graph, conversation store and
//! webhook queue, so integration tests don't hand-roll the same JSON
//! documents over and over.

use chrono::{DateTime, Utc};

use mnemo_types::connector::{Connector, ConnectorDocument};
use mnemo_types::conversation::{ConversationInput, Message};
use mnemo_types::settings::Settings;

/// A short but realistic transcript, long enough to clear the extractor's
/// minimum input length and trip a handful of its detectors.
pub fn sample_conversation_text() -> &'static str {
    "I'm getting a TypeError: cannot read property 'map' of undefined in my React \
     component. I think it's related to how useEffect fetches data from \
     /api/users.rs. Goal: fix the null check before the next release. \
     ```rust\nfn load_users() -> Vec<User> { Vec::new() }\n```"
}

/// Builds a ready-to-save [`ConversationInput`] with the given id, pointed
/// at a plausible chat-platform URL.
pub fn sample_conversation_input(id: &str) -> ConversationInput {
    ConversationInput {
        id: id.to_string(),
        title: "Debugging a null users list".to_string(),
        url: format!("https://chatgpt.com/c/{}", id),
        ts: None,
        messages: vec![
            Message { role: "user".to_string(), text: "Why is users undefined?".to_string() },
            Message { role: "assistant".to_string(), text: sample_conversation_text().to_string() },
        ],
        text: sample_conversation_text().to_string(),
        hash: None,
        tags: Some(vec!["react".to_string(), "bug".to_string()]),
        pinned: Some(false),
        notes: None,
    }
}

/// A connector document with one enabled and one disabled connector, for
/// exercising `connector_send`'s enabled-check and unknown-id rejection.
pub fn sample_connectors(now: DateTime<Utc>) -> ConnectorDocument {
    let mut doc = ConnectorDocument::default();
    doc.by_id.insert(
        "primary".to_string(),
        Connector {
            id: "primary".to_string(),
            name: "Primary webhook".to_string(),
            url: "https://hooks.example.com/primary".to_string(),
            secret: Some("shh".to_string()),
            headers: Default::default(),
            enabled: true,
            created_at: now,
            updated_at: now,
        },
    );
    doc.by_id.insert(
        "retired".to_string(),
        Connector {
            id: "retired".to_string(),
            name: "Retired webhook".to_string(),
            url: "https://hooks.example.com/retired".to_string(),
            secret: None,
            headers: Default::default(),
            enabled: false,
            created_at: now,
            updated_at: now,
        },
    );
    doc.order = vec!["primary".to_string(), "retired".to_string()];
    doc
}

/// Settings seeded with [`sample_connectors`], leaving everything else at
/// its default.
pub fn sample_settings(now: DateTime<Utc>) -> Settings {
    Settings { connectors: sample_connectors(now), ..Settings::default() }
}

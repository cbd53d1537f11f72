//! Independent, bounded store for full conversation payloads. Persists a
//! single `{byId, order, urlToId}` document through the same `KvStore`
//! abstraction the graph store uses.

use chrono::{DateTime, Utc};
use regex::Regex;

use mnemo_index::KvStore;
use mnemo_types::conversation::{
    Conversation, ConversationDocument, ConversationInput, ConversationMetaPatch, SearchFilters,
    SearchQuery, SearchSort,
};

use crate::error::Result;

const COLLECTION: &str = "conversations";
const DOC_KEY: &str = "document";
const DEFAULT_MAX_ITEMS: usize = 80;
const DEFAULT_MAX_BYTES: usize = 8 * 1024 * 1024;
const TWO_WEEKS_SECONDS: f64 = 14.0 * 24.0 * 3600.0;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "for", "is", "it", "this", "that",
    "with", "as", "at", "by", "be", "are", "was", "were", "from",
];

pub struct ConversationStore<'a> {
    kv: &'a dyn KvStore,
    max_items: usize,
    max_bytes: usize,
}

impl<'a> ConversationStore<'a> {
    pub fn new(kv: &'a dyn KvStore) -> Self {
        Self { kv, max_items: DEFAULT_MAX_ITEMS, max_bytes: DEFAULT_MAX_BYTES }
    }

    fn load(&self) -> Result<ConversationDocument> {
        Ok(self
            .kv
            .get(COLLECTION, DOC_KEY)?
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default())
    }

    fn persist(&self, doc: &ConversationDocument) -> Result<()> {
        self.kv.put(COLLECTION, DOC_KEY, &serde_json::to_value(doc)?)?;
        Ok(())
    }

    pub fn save_conversation(&self, input: ConversationInput, now: DateTime<Utc>) -> Result<Conversation> {
        let mut doc = self.load()?;
        let canonical_id = canonical_id(&input);
        let normalized_url = normalize_url(&input.url);

        if let Some(prev_id) = doc.url_to_id.get(&normalized_url).cloned() {
            if prev_id != canonical_id {
                if let Some(prev) = doc.by_id.remove(&prev_id) {
                    doc.order.retain(|id| id != &prev_id);
                    doc.by_id.entry(canonical_id.clone()).or_insert(prev);
                }
            }
        }

        let existing = doc.by_id.get(&canonical_id).cloned();
        let merged = merge_conversation(existing, &input, &canonical_id, now);

        doc.by_id.insert(canonical_id.clone(), merged.clone());
        doc.order.retain(|id| id != &canonical_id);
        doc.order.insert(0, canonical_id.clone());
        doc.url_to_id.insert(normalized_url, canonical_id);

        evict(&mut doc, self.max_items, self.max_bytes);
        self.persist(&doc)?;
        Ok(merged)
    }

    pub fn update_conversation_meta(
        &self,
        id: &str,
        patch: ConversationMetaPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Conversation>> {
        let mut doc = self.load()?;
        let Some(conv) = doc.by_id.get_mut(id) else {
            return Ok(None);
        };

        if let Some(tags) = patch.tags {
            conv.tags = tags;
        }
        if let Some(pinned) = patch.pinned {
            conv.pinned = pinned;
        }
        if let Some(notes) = patch.notes {
            conv.notes = notes;
        }
        conv.updated_at = now;
        let updated = conv.clone();

        doc.order.retain(|existing| existing != id);
        doc.order.insert(0, id.to_string());

        self.persist(&doc)?;
        Ok(Some(updated))
    }

    pub fn get(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.load()?.by_id.get(id).cloned())
    }

    pub fn get_id_for_url(&self, url: &str) -> Result<Option<String>> {
        let doc = self.load()?;
        Ok(doc.url_to_id.get(&normalize_url(url)).cloned())
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut doc = self.load()?;
        let existed = doc.by_id.remove(id).is_some();
        if existed {
            doc.order.retain(|existing| existing != id);
            doc.url_to_id.retain(|_, v| v != id);
            self.persist(&doc)?;
        }
        Ok(existed)
    }

    pub fn search(&self, query: &SearchQuery, now: DateTime<Utc>) -> Result<Vec<Conversation>> {
        let doc = self.load()?;
        let limit = query.limit.unwrap_or(20);

        let mut candidates: Vec<&Conversation> = doc
            .order
            .iter()
            .filter_map(|id| doc.by_id.get(id))
            .filter(|conv| passes_filters(conv, &query.filters))
            .collect();

        if query.query.trim().is_empty() {
            candidates.sort_by(|a, b| b.pinned.cmp(&a.pinned).then(b.updated_at.cmp(&a.updated_at)));
            return Ok(candidates.into_iter().take(limit).cloned().collect());
        }

        let q = query.query.to_lowercase();
        let tokens = tokenize(&q);

        let mut scored: Vec<(f64, &Conversation)> = candidates
            .into_iter()
            .filter_map(|conv| score_conversation(conv, &q, &tokens, now).map(|score| (score, conv)))
            .collect();

        match query.sort {
            SearchSort::Relevance => {
                scored.sort_by(|(score_a, a), (score_b, b)| {
                    score_b
                        .partial_cmp(score_a)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(b.pinned.cmp(&a.pinned))
                        .then(b.updated_at.cmp(&a.updated_at))
                });
            }
            SearchSort::Recency => {
                scored.sort_by(|(_, a), (_, b)| b.pinned.cmp(&a.pinned).then(b.updated_at.cmp(&a.updated_at)));
            }
        }

        Ok(scored.into_iter().take(limit).map(|(_, conv)| conv.clone()).collect())
    }
}

fn canonical_id(input: &ConversationInput) -> String {
    if let Some(hash) = extract_hash_from_url(&input.url) {
        format!("c_{}", hash)
    } else {
        input.id.clone()
    }
}

fn extract_hash_from_url(url: &str) -> Option<String> {
    let re = Regex::new(r"/c/([A-Za-z0-9_-]+)").expect("valid regex");
    re.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn merge_conversation(
    existing: Option<Conversation>,
    input: &ConversationInput,
    canonical_id: &str,
    now: DateTime<Utc>,
) -> Conversation {
    let created_at = existing.as_ref().map(|e| e.created_at).unwrap_or(now);
    let tags = input
        .tags
        .clone()
        .or_else(|| existing.as_ref().map(|e| e.tags.clone()))
        .unwrap_or_default();
    let pinned = input.pinned.or_else(|| existing.as_ref().map(|e| e.pinned)).unwrap_or(false);
    let notes = input
        .notes
        .clone()
        .or_else(|| existing.as_ref().map(|e| e.notes.clone()))
        .unwrap_or_default();

    Conversation {
        id: canonical_id.to_string(),
        title: non_empty_or(&input.title, existing.as_ref().map(|e| e.title.clone())),
        url: non_empty_or(&input.url, existing.as_ref().map(|e| e.url.clone())),
        ts: input.ts.unwrap_or_else(|| existing.as_ref().map(|e| e.ts).unwrap_or(now)),
        messages: if input.messages.is_empty() {
            existing.as_ref().map(|e| e.messages.clone()).unwrap_or_default()
        } else {
            input.messages.clone()
        },
        text: non_empty_or(&input.text, existing.as_ref().map(|e| e.text.clone())),
        hash: input.hash.clone().or_else(|| existing.as_ref().and_then(|e| e.hash.clone())),
        tags,
        pinned,
        notes,
        created_at,
        updated_at: now,
    }
}

fn non_empty_or(incoming: &str, fallback: Option<String>) -> String {
    if incoming.is_empty() {
        fallback.unwrap_or_default()
    } else {
        incoming.to_string()
    }
}

fn approx_size(doc: &ConversationDocument) -> usize {
    serde_json::to_string(doc).map(|s| s.len()).unwrap_or(0)
}

fn evict(doc: &mut ConversationDocument, max_items: usize, max_bytes: usize) {
    while doc.order.len() > max_items {
        pop_tail(doc);
    }
    while approx_size(doc) > max_bytes && doc.order.len() > 1 {
        pop_tail(doc);
    }
}

fn pop_tail(doc: &mut ConversationDocument) {
    if let Some(id) = doc.order.pop() {
        doc.by_id.remove(&id);
        doc.url_to_id.retain(|_, v| v != &id);
    }
}

fn passes_filters(conv: &Conversation, filters: &SearchFilters) -> bool {
    if filters.pinned_only && !conv.pinned {
        return false;
    }
    if filters.has_code {
        let has_code_block = conv.text.contains("```");
        let looks_like_trace = Regex::new(r"(?i)stack trace|traceback|exception")
            .map(|re| re.is_match(&conv.text))
            .unwrap_or(false);
        if !has_code_block && !looks_like_trace {
            return false;
        }
    }
    if let Some(tag) = &filters.tag {
        if !conv.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if !filters.tags.is_empty() && !filters.tags.iter().all(|t| conv.tags.contains(t)) {
        return false;
    }
    if let Some(since) = filters.since {
        if conv.updated_at < since {
            return false;
        }
    }
    if let Some(until) = filters.until {
        if conv.updated_at > until {
            return false;
        }
    }
    true
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

fn word_start_hit(haystack: &str, token: &str) -> bool {
    Regex::new(&format!(r"(?i)\b{}", regex::escape(token)))
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

fn score_conversation(conv: &Conversation, q: &str, tokens: &[String], now: DateTime<Utc>) -> Option<f64> {
    let title = conv.title.to_lowercase();
    let text = conv.text.to_lowercase();
    let url = conv.url.to_lowercase();
    let tags: Vec<String> = conv.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut score = 0.0;
    let mut hit = false;

    if title.contains(q) {
        score += 40.0;
        hit = true;
    }
    if text.contains(q) {
        score += 10.0;
        hit = true;
    }

    for token in tokens {
        let mut token_hit = false;
        if title.contains(token.as_str()) {
            score += 18.0;
            token_hit = true;
        }
        if tags.iter().any(|t| t.contains(token.as_str())) {
            score += 14.0;
            token_hit = true;
        }
        if url.contains(token.as_str()) {
            score += 4.0;
            token_hit = true;
        }
        if text.contains(token.as_str()) {
            score += 4.0;
            token_hit = true;
        }
        if token.len() >= 3 {
            if word_start_hit(&title, token) {
                score += 6.0;
            }
            if word_start_hit(&text, token) {
                score += 2.0;
            }
        }
        hit = hit || token_hit;
    }

    if !hit {
        return None;
    }

    let age_seconds = (now - conv.updated_at).num_seconds().max(0) as f64;
    let boost = ((TWO_WEEKS_SECONDS - age_seconds) / TWO_WEEKS_SECONDS * 0.2).clamp(0.0, 0.2);
    score *= 1.0 + boost;

    if conv.pinned {
        score += 5.0;
    }

    Some(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_index::InMemoryKvStore;
    use mnemo_types::conversation::Message;

    fn base_input(id: &str, url: &str, title: &str, text: &str) -> ConversationInput {
        ConversationInput {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            ts: None,
            messages: vec![Message { role: "user".to_string(), text: text.to_string() }],
            text: text.to_string(),
            hash: None,
            tags: None,
            pinned: None,
            notes: None,
        }
    }

    #[test]
    fn canonical_id_from_url_hash() {
        let kv = InMemoryKvStore::new();
        let store = ConversationStore::new(&kv);
        let conv = store
            .save_conversation(base_input("tmp_1", "https://chat.example.com/c/abc123", "Title", "hello"), Utc::now())
            .unwrap();
        assert_eq!(conv.id, "c_abc123");
    }

    #[test]
    fn merge_preserves_tags_unless_overridden() {
        let kv = InMemoryKvStore::new();
        let store = ConversationStore::new(&kv);
        let mut first = base_input("tmp_1", "https://chat.example.com/c/abc", "Title", "hello world");
        first.tags = Some(vec!["rust".to_string()]);
        store.save_conversation(first, Utc::now()).unwrap();

        let second = base_input("tmp_1", "https://chat.example.com/c/abc", "Title updated", "hello world updated");
        let merged = store.save_conversation(second, Utc::now()).unwrap();
        assert_eq!(merged.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn eviction_respects_max_items() {
        let kv = InMemoryKvStore::new();
        let store = ConversationStore { kv: &kv, max_items: 2, max_bytes: DEFAULT_MAX_BYTES };
        for i in 0..5 {
            store
                .save_conversation(
                    base_input(&format!("tmp_{}", i), &format!("https://chat.example.com/c/h{}", i), "t", "hello"),
                    Utc::now(),
                )
                .unwrap();
        }
        let doc = store.load().unwrap();
        assert_eq!(doc.order.len(), 2);
    }

    #[test]
    fn search_requires_a_hit() {
        let kv = InMemoryKvStore::new();
        let store = ConversationStore::new(&kv);
        store
            .save_conversation(
                base_input("tmp_1", "https://chat.example.com/c/abc", "Rust memory graph", "discussing rust and axum"),
                Utc::now(),
            )
            .unwrap();

        let hits = store
            .search(&SearchQuery { query: "rust".to_string(), ..Default::default() }, Utc::now())
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .search(&SearchQuery { query: "kubernetes".to_string(), ..Default::default() }, Utc::now())
            .unwrap();
        assert!(misses.is_empty());
    }
}

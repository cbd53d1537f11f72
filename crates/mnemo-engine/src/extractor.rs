//! Pattern-based transformation of a raw text blob into graph mutations.
//! No learned models — every detector here scores against the tables in
//! [`crate::patterns`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use regex::Regex;

use mnemo_types::graph::{EdgeType, NodeId, NodeType};
use mnemo_types::session::SessionId;

use crate::graph::{MemoryGraph, NewNode};
use crate::patterns::{self, ERROR_SIGNATURES, FRAMEWORKS, GOAL_PATTERNS, LANGUAGES, TOPICS};

const MIN_INPUT_LEN: usize = 20;

#[derive(Debug, Clone)]
pub struct DetectedLanguage {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct DetectedFramework {
    pub name: String,
    pub language: String,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct DetectedError {
    pub name: String,
    pub message: String,
    pub context: String,
    pub importance: f64,
}

#[derive(Debug, Clone)]
pub struct DetectedTopic {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DetectedEntities {
    pub files: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DetectedCodeBlock {
    pub language: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct DetectedGoal {
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub languages: Vec<DetectedLanguage>,
    pub frameworks: Vec<DetectedFramework>,
    pub errors: Vec<DetectedError>,
    pub topics: Vec<DetectedTopic>,
    pub entities: DetectedEntities,
    pub goals: Vec<DetectedGoal>,
    pub code_blocks: Vec<DetectedCodeBlock>,
    pub node_ids: Vec<NodeId>,
}

pub struct Extractor;

impl Extractor {
    /// Runs the full detection pipeline against `text`, materializing nodes
    /// and edges directly into `graph`. Returns `None` if `text` is shorter
    /// than the minimum input length.
    pub fn extract(
        graph: &mut MemoryGraph,
        text: &str,
        platform: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<ExtractionReport> {
        if text.chars().count() < MIN_INPUT_LEN {
            return None;
        }

        let mut report = ExtractionReport::default();

        let languages = detect_languages(text, true);
        let code_blocks = detect_code_blocks(text);
        let frameworks = detect_frameworks(text);
        let errors = detect_errors(text);
        let topics = detect_topics(text);
        let entities = detect_entities(text);
        let goals = detect_goals(text);

        let mut language_nodes: Vec<(String, NodeId)> = Vec::new();
        for lang in &languages {
            let node = graph.add_node(
                NodeType::Language,
                lang.name.as_str(),
                NewNode { confidence: Some(lang.confidence), platform: platform.map(str::to_string), ..Default::default() },
                now,
            );
            language_nodes.push((lang.name.clone(), node.id.clone()));
            report.node_ids.push(node.id);
        }

        let mut framework_nodes: Vec<(String, NodeId)> = Vec::new();
        for fw in &frameworks {
            let node = graph.add_node(
                NodeType::Framework,
                fw.name.as_str(),
                NewNode { confidence: Some(fw.confidence), platform: platform.map(str::to_string), ..Default::default() },
                now,
            );
            framework_nodes.push((fw.name.clone(), node.id.clone()));
            report.node_ids.push(node.id.clone());

            if let Some((_, lang_id)) = language_nodes.iter().find(|(name, _)| name == &fw.language) {
                graph.add_edge(&node.id, lang_id, EdgeType::PartOf, false, now);
            }
        }

        let mut last_code_block_id: Option<NodeId> = None;
        for block in &code_blocks {
            let truncated: String = block.content.chars().take(500).collect();
            let node = graph.add_node(
                NodeType::CodeBlock,
                truncated.as_str(),
                NewNode {
                    platform: platform.map(str::to_string),
                    extra: [("fullLength".to_string(), serde_json::json!(block.content.chars().count()))]
                        .into_iter()
                        .collect(),
                    ..Default::default()
                },
                now,
            );
            report.node_ids.push(node.id.clone());
            if let Some((_, lang_id)) = language_nodes.iter().find(|(name, _)| name == &block.language) {
                graph.add_edge(&node.id, lang_id, EdgeType::Uses, false, now);
            }
            last_code_block_id = Some(node.id.clone());
        }

        for err in &errors {
            let node = graph.add_node(
                NodeType::Error,
                err.message.as_str(),
                NewNode {
                    platform: platform.map(str::to_string),
                    importance: Some(err.importance),
                    extra: [("context".to_string(), serde_json::json!(err.context))].into_iter().collect(),
                    ..Default::default()
                },
                now,
            );
            report.node_ids.push(node.id.clone());
            if let Some(block_id) = &last_code_block_id {
                graph.add_edge(&node.id, block_id, EdgeType::RelatedTo, false, now);
            }
        }

        let mut topic_nodes: Vec<(String, NodeId)> = Vec::new();
        for topic in &topics {
            let node = graph.add_node(
                NodeType::Topic,
                topic.name.as_str(),
                NewNode { confidence: Some(topic.confidence), platform: platform.map(str::to_string), ..Default::default() },
                now,
            );
            topic_nodes.push((topic.name.clone(), node.id.clone()));
            report.node_ids.push(node.id);
        }
        if let Some((_, primary_lang_id)) = language_nodes.first() {
            for (_, topic_id) in &topic_nodes {
                graph.add_edge(topic_id, primary_lang_id, EdgeType::RelatedTo, false, now);
            }
        }

        for file in &entities.files {
            let node = graph.add_node(NodeType::File, file.as_str(), NewNode { platform: platform.map(str::to_string), ..Default::default() }, now);
            report.node_ids.push(node.id.clone());
            if let Some(ext_lang) = file.rsplit_once('.').and_then(|(_, ext)| patterns::language_by_extension(&format!(".{}", ext))) {
                if let Some((_, lang_id)) = language_nodes.iter().find(|(name, _)| name == ext_lang.name) {
                    graph.add_edge(&node.id, lang_id, EdgeType::Uses, false, now);
                }
            }
        }
        for func in &entities.functions {
            let node = graph.add_node(NodeType::Function, func.as_str(), NewNode { platform: platform.map(str::to_string), ..Default::default() }, now);
            report.node_ids.push(node.id);
        }
        for class in &entities.classes {
            let node = graph.add_node(NodeType::Class, class.as_str(), NewNode { platform: platform.map(str::to_string), ..Default::default() }, now);
            report.node_ids.push(node.id);
        }

        let mut goal_nodes: Vec<NodeId> = Vec::new();
        for goal in &goals {
            let node = graph.add_node(NodeType::Goal, goal.text.as_str(), NewNode { platform: platform.map(str::to_string), ..Default::default() }, now);
            goal_nodes.push(node.id.clone());
            report.node_ids.push(node.id);
        }
        for goal_id in &goal_nodes {
            for (_, topic_id) in &topic_nodes {
                graph.add_edge(goal_id, topic_id, EdgeType::RelatedTo, true, now);
            }
        }

        if let Some(session) = graph.active_session().map(|s| s.id.clone()) {
            apply_session_side_effects(graph, &session, &code_blocks, &errors, &languages, &frameworks, &topics);
        }

        report.languages = languages;
        report.frameworks = frameworks;
        report.errors = errors;
        report.topics = topics;
        report.entities = entities;
        report.goals = goals;
        report.code_blocks = code_blocks;

        Some(report)
    }
}

fn apply_session_side_effects(
    graph: &mut MemoryGraph,
    session_id: &SessionId,
    code_blocks: &[DetectedCodeBlock],
    errors: &[DetectedError],
    languages: &[DetectedLanguage],
    frameworks: &[DetectedFramework],
    topics: &[DetectedTopic],
) {
    if let Some(session) = graph.session_mut(session_id) {
        session.counters.code_block_count += code_blocks.len() as u32;
        session.counters.error_count += errors.len() as u32;
        if let Some(lang) = languages.first() {
            session.primary_language = Some(lang.name.clone());
        }
        if let Some(fw) = frameworks.first() {
            session.primary_framework = Some(fw.name.clone());
        }
        if let Some(topic) = topics.first() {
            session.primary_topic = Some(topic.name.clone());
        }
    }
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.to_lowercase().matches(&needle.to_lowercase()).count()
}

/// Name-mention weight, tuned so a lone prose reference to a language name
/// ("I'm using Python...") clears `detect_languages`'s confidence floor on
/// its own, the same way a single framework indicator clears `detect_frameworks`'s.
const NAME_MENTION_WEIGHT: f64 = 10.0;

fn mentions_name(text: &str, name: &str) -> bool {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name))).map(|re| re.is_match(text)).unwrap_or(false)
}

fn score_language(text: &str, with_extension_bonus: bool) -> Vec<(String, f64)> {
    let mut scores: Vec<(String, f64)> = Vec::new();
    for lang in LANGUAGES {
        let keyword_hits: usize = lang.keywords.iter().map(|k| count_occurrences(text, k)).sum();
        let pattern_hits: usize = lang
            .patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .map(|re| re.find_iter(text).count())
            .sum();
        let extension_hits: usize = if with_extension_bonus {
            lang.extensions.iter().map(|e| count_occurrences(text, e)).sum()
        } else {
            0
        };
        let name_bonus = if mentions_name(text, lang.name) { NAME_MENTION_WEIGHT } else { 0.0 };

        let score = 2.0 * keyword_hits as f64 + 3.0 * pattern_hits as f64 + 5.0 * extension_hits as f64 + name_bonus;
        if score > 0.0 {
            scores.push((lang.name.to_string(), score));
        }
    }
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

fn detect_languages(text: &str, with_extension_bonus: bool) -> Vec<DetectedLanguage> {
    score_language(text, with_extension_bonus)
        .into_iter()
        .map(|(name, score)| DetectedLanguage { name, confidence: (score / 30.0).min(1.0) })
        .filter(|d| d.confidence >= 0.3)
        .take(3)
        .collect()
}

fn detect_code_blocks(text: &str) -> Vec<DetectedCodeBlock> {
    let re = Regex::new(r"```([A-Za-z0-9_+-]*)\n([\s\S]*?)```").expect("valid regex");
    let mut blocks = Vec::new();

    for cap in re.captures_iter(text) {
        let declared = cap.get(1).map(|m| m.as_str()).unwrap_or("").trim().to_string();
        let content = cap.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
        if content.chars().count() < 10 {
            continue;
        }

        let language = if declared.is_empty() || declared.eq_ignore_ascii_case("unknown") {
            score_language(&content, false)
                .into_iter()
                .next()
                .map(|(name, _)| name)
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            declared
        };

        blocks.push(DetectedCodeBlock { language, content });
    }
    blocks
}

fn detect_frameworks(text: &str) -> Vec<DetectedFramework> {
    let mut out: Vec<DetectedFramework> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for fw in FRAMEWORKS {
        if seen.contains(fw.name) {
            continue;
        }
        let hits = fw.indicators.iter().filter(|ind| count_occurrences(text, ind) > 0).count();
        if hits == 0 {
            continue;
        }
        let confidence = (hits as f64 / fw.indicators.len() as f64 + 0.3).min(1.0);
        out.push(DetectedFramework { name: fw.name.to_string(), language: fw.language.to_string(), confidence });
        seen.insert(fw.name);
    }

    out.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    out.truncate(5);
    out.retain(|f| f.confidence >= 0.4);
    out
}

fn detect_errors(text: &str) -> Vec<DetectedError> {
    let mut out: Vec<DetectedError> = Vec::new();
    let mut seen_messages: HashSet<String> = HashSet::new();

    for sig in ERROR_SIGNATURES {
        let Ok(re) = Regex::new(sig.pattern) else { continue };
        for m in re.find_iter(text).take(3) {
            let message = m.as_str().to_string();
            if !seen_messages.insert(message.clone()) {
                continue;
            }
            let start = m.start().saturating_sub(100);
            let end = (m.end() + 200).min(text.len());
            let context = safe_slice(text, start, end);
            out.push(DetectedError { name: sig.name.to_string(), message, context, importance: sig.importance });
        }
    }

    out.truncate(5);
    out
}

fn safe_slice(text: &str, start: usize, end: usize) -> String {
    let mut start = start;
    let mut end = end.max(start);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}

fn detect_topics(text: &str) -> Vec<DetectedTopic> {
    let mut out: Vec<DetectedTopic> = Vec::new();
    for topic in TOPICS {
        let hits = topic.keywords.iter().filter(|k| count_occurrences(text, k) > 0).count();
        if hits < 2 {
            continue;
        }
        let confidence = (hits as f64 / topic.keywords.len() as f64 + 0.2).min(1.0);
        out.push(DetectedTopic { name: topic.name.to_string(), confidence });
    }
    out.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    out.truncate(3);
    out
}

fn detect_entities(text: &str) -> DetectedEntities {
    let mut files: Vec<String> = Vec::new();
    let mut seen_files: HashSet<String> = HashSet::new();
    let file_re = Regex::new(r"\b[\w.\-/]+(\.[A-Za-z0-9]+)\b").expect("valid regex");
    for cap in file_re.find_iter(text) {
        let candidate = cap.as_str();
        let ext = candidate.rsplit_once('.').map(|(_, e)| format!(".{}", e)).unwrap_or_default();
        if patterns::FILE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(&ext)) && seen_files.insert(candidate.to_string()) {
            files.push(candidate.to_string());
        }
        if files.len() >= 10 {
            break;
        }
    }

    let mut functions: Vec<String> = Vec::new();
    let mut seen_functions: HashSet<String> = HashSet::new();
    let func_re = Regex::new(r"(?:def|fn|func|fun|function)\s+([A-Za-z_]\w*)\s*\(").expect("valid regex");
    for cap in func_re.captures_iter(text) {
        if let Some(name) = cap.get(1) {
            let name = name.as_str().to_string();
            if seen_functions.insert(name.clone()) {
                functions.push(name);
            }
        }
        if functions.len() >= 10 {
            break;
        }
    }

    let mut classes: Vec<String> = Vec::new();
    let mut seen_classes: HashSet<String> = HashSet::new();
    let class_re = Regex::new(r"\b[A-Z][a-zA-Z0-9]*\b").expect("valid regex");
    for m in class_re.find_iter(text) {
        let candidate = m.as_str();
        let has_lower = candidate.chars().any(|c| c.is_ascii_lowercase());
        if !has_lower || patterns::CLASS_STOP_LIST.contains(&candidate) {
            continue;
        }
        if seen_classes.insert(candidate.to_string()) {
            classes.push(candidate.to_string());
        }
        if classes.len() >= 10 {
            break;
        }
    }

    let mut urls: Vec<String> = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let url_re = Regex::new(r"https?://\S+").expect("valid regex");
    for m in url_re.find_iter(text) {
        let candidate = m.as_str().trim_end_matches(['.', ',', ')', ']']).to_string();
        if seen_urls.insert(candidate.clone()) {
            urls.push(candidate);
        }
        if urls.len() >= 10 {
            break;
        }
    }

    DetectedEntities { files, functions, classes, urls }
}

fn detect_goals(text: &str) -> Vec<DetectedGoal> {
    let mut out: Vec<DetectedGoal> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for pattern in GOAL_PATTERNS {
        let Ok(re) = Regex::new(pattern) else { continue };
        for cap in re.captures_iter(text) {
            if let Some(tail) = cap.get(1) {
                let trimmed: String = tail.as_str().chars().take(100).collect();
                if trimmed.chars().count() < 5 {
                    continue;
                }
                if seen.insert(trimmed.clone()) {
                    out.push(DetectedGoal { text: trimmed });
                }
            }
        }
    }

    out.truncate(3);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_input() {
        let mut graph = MemoryGraph::new();
        assert!(Extractor::extract(&mut graph, "too short", None, Utc::now()).is_none());
    }

    #[test]
    fn detects_language_and_creates_node() {
        let mut graph = MemoryGraph::new();
        let text = "fn main() { let mut x = 1; } impl Foo { fn bar(&self) {} } file.rs";
        let report = Extractor::extract(&mut graph, text, Some("chatgpt"), Utc::now()).unwrap();
        assert!(report.languages.iter().any(|l| l.name == "rust"));
        assert!(graph.node_count() > 0);
    }

    #[test]
    fn detects_fenced_code_block_and_links_language() {
        let mut graph = MemoryGraph::new();
        let text = "Here is my code:\n```rust\nfn main() {\n    println!(\"hello world, this is a test\");\n}\n```\nDoes this compile?";
        let report = Extractor::extract(&mut graph, text, None, Utc::now()).unwrap();
        assert_eq!(report.code_blocks.len(), 1);
        assert_eq!(report.code_blocks[0].language, "rust");
    }

    #[test]
    fn detects_error_and_links_to_recent_code_block() {
        let mut graph = MemoryGraph::new();
        let text = "```python\ndef broken():\n    return 1/0\n```\nTraceback (most recent call last):\n  File \"a.py\", line 2\nZeroDivisionError: division by zero";
        let report = Extractor::extract(&mut graph, text, None, Utc::now()).unwrap();
        assert!(!report.errors.is_empty());
    }

    #[test]
    fn detects_goal() {
        let mut graph = MemoryGraph::new();
        let text = "I want to build a rate limiter for my API that handles bursts gracefully";
        let report = Extractor::extract(&mut graph, text, None, Utc::now()).unwrap();
        assert!(!report.goals.is_empty());
    }

    #[test]
    fn detects_entities() {
        let mut graph = MemoryGraph::new();
        let text = "See main.rs and function parse_args() inside class HttpClient, more at https://example.com/docs.";
        let report = Extractor::extract(&mut graph, text, None, Utc::now()).unwrap();
        assert!(report.entities.files.iter().any(|f| f == "main.rs"));
        assert!(report.entities.functions.iter().any(|f| f == "parse_args"));
        assert!(report.entities.classes.iter().any(|c| c == "HttpClient"));
        assert!(!report.entities.urls.is_empty());
    }
}

//! Renders a compact textual summary of the graph's recent contents,
//! suitable for injection into a prompt, under a platform-specific token
//! budget.

use chrono::{DateTime, Utc};
use serde_json::json;

use mnemo_types::graph::{Node, NodeType};

use crate::graph::{MemoryGraph, NodeQuery, QuerySort};

const PLATFORM_TOKEN_BUDGETS: &[(&str, usize)] = &[
    ("chatgpt", 1500),
    ("claude", 2000),
    ("perplexity", 1000),
    ("gemini", 1500),
    ("poe", 1000),
    ("copilot", 800),
    ("bing", 600),
    ("you", 800),
    ("huggingface", 500),
    ("grok", 1000),
];
const DEFAULT_TOKEN_BUDGET: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Minimal,
    Structured,
    Narrative,
    System,
    Custom(String),
}

impl Strategy {
    fn as_str(&self) -> &str {
        match self {
            Strategy::Minimal => "minimal",
            Strategy::Structured => "structured",
            Strategy::Narrative => "narrative",
            Strategy::System => "system",
            Strategy::Custom(_) => "custom",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextPayload {
    pub text: String,
    pub tokens: usize,
    pub strategy: String,
    pub platform: String,
    pub node_count: usize,
    pub generated_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

pub struct ContextGenerator;

fn token_budget(platform: Option<&str>) -> usize {
    platform
        .and_then(|p| PLATFORM_TOKEN_BUDGETS.iter().find(|(name, _)| name.eq_ignore_ascii_case(p)))
        .map(|(_, budget)| *budget)
        .unwrap_or(DEFAULT_TOKEN_BUDGET)
}

fn truncate_to_budget(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens * 4;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    let cut = truncated.rfind(char::is_whitespace).unwrap_or(truncated.len());
    format!("{}...", &truncated[..cut])
}

fn top_by_type(graph: &MemoryGraph, node_type: NodeType, limit: usize, now: DateTime<Utc>) -> Vec<Node> {
    let mut types = std::collections::HashSet::new();
    types.insert(node_type);
    graph.query(
        &NodeQuery { types: Some(types), sort: QuerySort::Relevance, limit: Some(limit), ..Default::default() },
        now,
    )
}

fn recent_by_type(graph: &MemoryGraph, node_type: NodeType, limit: usize, within_hours: Option<f64>, now: DateTime<Utc>) -> Vec<Node> {
    let mut types = std::collections::HashSet::new();
    types.insert(node_type);
    graph.query(
        &NodeQuery { types: Some(types), sort: QuerySort::Created, limit: Some(limit), within_hours, ..Default::default() },
        now,
    )
}

struct Buckets {
    languages: Vec<Node>,
    frameworks: Vec<Node>,
    errors: Vec<Node>,
    goals: Vec<Node>,
    topics: Vec<Node>,
    files: Vec<Node>,
    code: Vec<Node>,
}

fn gather(graph: &MemoryGraph, now: DateTime<Utc>) -> Buckets {
    Buckets {
        languages: top_by_type(graph, NodeType::Language, 3, now),
        frameworks: top_by_type(graph, NodeType::Framework, 3, now),
        errors: recent_by_type(graph, NodeType::Error, 5, None, now),
        goals: top_by_type(graph, NodeType::Goal, 3, now),
        topics: top_by_type(graph, NodeType::Topic, 3, now),
        files: top_by_type(graph, NodeType::File, 5, now),
        code: recent_by_type(graph, NodeType::CodeBlock, 3, None, now),
    }
}

fn node_text(node: &Node) -> String {
    node.content.stable_string()
}

impl ContextGenerator {
    pub fn generate(
        graph: &MemoryGraph,
        strategy: Strategy,
        platform: Option<&str>,
        now: DateTime<Utc>,
    ) -> ContextPayload {
        let buckets = gather(graph, now);
        let budget = token_budget(platform);

        let (text, metadata) = match &strategy {
            Strategy::Minimal => render_minimal(&buckets, now),
            Strategy::Structured => render_structured(&buckets),
            Strategy::Narrative => render_narrative(&buckets, now),
            Strategy::System => render_system(&buckets),
            Strategy::Custom(template) => render_custom(&buckets, template),
        };

        let text = truncate_to_budget(&text, budget);
        let node_count = buckets.languages.len()
            + buckets.frameworks.len()
            + buckets.errors.len()
            + buckets.goals.len()
            + buckets.topics.len()
            + buckets.files.len()
            + buckets.code.len();

        ContextPayload {
            tokens: text.chars().count() / 4,
            text,
            strategy: strategy.as_str().to_string(),
            platform: platform.unwrap_or("default").to_string(),
            node_count,
            generated_at: now,
            metadata,
        }
    }
}

fn render_minimal(buckets: &Buckets, now: DateTime<Utc>) -> (String, serde_json::Value) {
    let language = buckets.languages.first().map(node_text);
    let framework = buckets.frameworks.first().map(node_text);
    let error = recent_within(&buckets.errors, 2.0, now).map(node_text);
    let goal = buckets.goals.first().map(node_text);

    let value = json!({
        "language": language,
        "framework": framework,
        "error": error,
        "goal": goal,
    });
    (value.to_string(), value)
}

fn recent_within(nodes: &[Node], hours: f64, now: DateTime<Utc>) -> Option<Node> {
    nodes.iter().find(|n| n.age_hours(now) <= hours).cloned()
}

fn render_structured(buckets: &Buckets) -> (String, serde_json::Value) {
    let value = json!({
        "languages": buckets.languages.iter().map(node_text).collect::<Vec<_>>(),
        "frameworks": buckets.frameworks.iter().map(node_text).collect::<Vec<_>>(),
        "errors": buckets.errors.iter().take(2).map(|n| truncate_chars(&node_text(n), 100)).collect::<Vec<_>>(),
        "goals": buckets.goals.iter().take(2).map(node_text).collect::<Vec<_>>(),
        "topics": buckets.topics.iter().take(3).map(node_text).collect::<Vec<_>>(),
        "files": buckets.files.iter().take(5).map(node_text).collect::<Vec<_>>(),
    });
    (value.to_string(), value)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

fn render_narrative(buckets: &Buckets, now: DateTime<Utc>) -> (String, serde_json::Value) {
    let mut clauses: Vec<String> = Vec::new();

    if let Some(lang) = buckets.languages.first() {
        clauses.push(format!("The user is working in {}", node_text(lang)));
    }
    if let Some(fw) = buckets.frameworks.first() {
        clauses.push(format!("using {}", node_text(fw)));
    }
    if let Some(goal) = buckets.goals.first() {
        clauses.push(format!("with the goal of {}", node_text(goal)));
    }
    if let Some(topic) = buckets.topics.first() {
        clauses.push(format!("discussing {}", node_text(topic)));
    }
    if let Some(error) = recent_within(&buckets.errors, 4.0, now) {
        clauses.push(format!("and recently hit an error: {}", node_text(&error)));
    }

    let text = if clauses.is_empty() {
        "No recent context available.".to_string()
    } else {
        format!("{}.", clauses.join(", "))
    };
    (text, serde_json::Value::Null)
}

fn render_system(buckets: &Buckets) -> (String, serde_json::Value) {
    let mut lines = vec!["<work_context>".to_string()];
    if let Some(lang) = buckets.languages.first() {
        lines.push(format!("  <primary_language>{}</primary_language>", node_text(lang)));
    }
    if !buckets.frameworks.is_empty() {
        let stack = buckets.frameworks.iter().map(node_text).collect::<Vec<_>>().join(", ");
        lines.push(format!("  <tech_stack>{}</tech_stack>", stack));
    }
    if let Some(goal) = buckets.goals.first() {
        lines.push(format!("  <current_task>{}</current_task>", node_text(goal)));
    }
    if !buckets.files.is_empty() {
        let files = buckets.files.iter().map(node_text).collect::<Vec<_>>().join(", ");
        lines.push(format!("  <working_files>{}</working_files>", files));
    }
    if let Some(code) = buckets.code.first() {
        lines.push(format!("  <recent_code>{}</recent_code>", truncate_chars(&node_text(code), 300)));
    }
    if let Some(error) = buckets.errors.first() {
        lines.push(format!("  <issue>{}</issue>", node_text(error)));
    }
    lines.push("</work_context>".to_string());
    (lines.join("\n"), serde_json::Value::Null)
}

fn render_custom(buckets: &Buckets, template: &str) -> (String, serde_json::Value) {
    let languages = buckets.languages.iter().map(node_text).collect::<Vec<_>>();
    let frameworks = buckets.frameworks.iter().map(node_text).collect::<Vec<_>>();
    let topics = buckets.topics.iter().map(node_text).collect::<Vec<_>>();
    let goals = buckets.goals.iter().map(node_text).collect::<Vec<_>>();
    let files = buckets.files.iter().map(node_text).collect::<Vec<_>>();

    let replacements: &[(&str, String)] = &[
        ("{{language}}", languages.first().cloned().unwrap_or_default()),
        ("{{languages}}", languages.join(", ")),
        ("{{framework}}", frameworks.first().cloned().unwrap_or_default()),
        ("{{frameworks}}", frameworks.join(", ")),
        ("{{error}}", buckets.errors.first().map(node_text).unwrap_or_default()),
        ("{{goal}}", goals.first().cloned().unwrap_or_default()),
        ("{{goals}}", goals.join(", ")),
        ("{{topic}}", topics.first().cloned().unwrap_or_default()),
        ("{{topics}}", topics.join(", ")),
        ("{{files}}", files.join(", ")),
        ("{{code}}", buckets.code.first().map(node_text).unwrap_or_default()),
    ];

    let mut rendered = template.to_string();
    for (token, value) in replacements {
        rendered = rendered.replace(token, value);
    }
    (rendered, serde_json::Value::Null)
}

/// Equivalence classes used by `mapToVariables`.
const VARIABLE_CLASSES: &[(&str, &[&str])] = &[
    ("language", &["language", "lang"]),
    ("framework", &["framework", "library", "stack", "tech"]),
    ("error", &["error", "exception", "bug", "issue"]),
    ("code", &["code", "snippet", "source"]),
    ("goal", &["goal", "task", "objective"]),
    ("topic", &["topic", "context", "domain"]),
    ("file", &["file", "filename", "path"]),
    ("function", &["function", "method", "func"]),
    ("class", &["class", "component"]),
];

#[derive(Debug, Clone, serde::Serialize)]
pub struct MappedVariable {
    pub value: String,
    pub confidence: f64,
    pub source: &'static str,
    pub auto_detected: bool,
}

/// Maps requested variable names to recent graph values via a 24h window
/// query, per §4.3's equivalence classes.
pub fn map_to_variables(
    graph: &MemoryGraph,
    names: &[String],
    now: DateTime<Utc>,
) -> std::collections::HashMap<String, MappedVariable> {
    let buckets = gather_within(graph, 24.0, now);
    let mut out = std::collections::HashMap::new();

    for name in names {
        let lowered = name.to_lowercase();
        let class = VARIABLE_CLASSES.iter().find(|(_, names)| names.contains(&lowered.as_str()));
        let Some((class_name, _)) = class else { continue };

        let picked = match *class_name {
            "language" => buckets.languages.first(),
            "framework" => buckets.frameworks.first(),
            "error" => buckets.errors.first(),
            "code" => buckets.code.first(),
            "goal" => buckets.goals.first(),
            "topic" => buckets.topics.first(),
            "file" => buckets.files.first(),
            _ => None,
        };

        if let Some(node) = picked {
            out.insert(
                name.clone(),
                MappedVariable {
                    value: node_text(node),
                    confidence: node.confidence,
                    source: "memory_graph",
                    auto_detected: true,
                },
            );
        }
    }
    out
}

fn gather_within(graph: &MemoryGraph, hours: f64, now: DateTime<Utc>) -> Buckets {
    let mut types = std::collections::HashSet::new();
    types.insert(NodeType::Language);
    let mut b = gather(graph, now);
    for nodes in [
        &mut b.languages,
        &mut b.frameworks,
        &mut b.errors,
        &mut b.goals,
        &mut b.topics,
        &mut b.files,
        &mut b.code,
    ] {
        nodes.retain(|n| n.age_hours(now) <= hours);
    }
    let _ = types;
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NewNode;
    use mnemo_types::graph::NodeType;

    fn build_graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let now = Utc::now();
        graph.add_node(NodeType::Language, "rust", NewNode::default(), now);
        graph.add_node(NodeType::Framework, "axum", NewNode::default(), now);
        graph.add_node(NodeType::Goal, "ship the memory core", NewNode::default(), now);
        graph
    }

    #[test]
    fn minimal_strategy_has_no_prose() {
        let graph = build_graph();
        let payload = ContextGenerator::generate(&graph, Strategy::Minimal, Some("chatgpt"), Utc::now());
        assert!(payload.text.contains("rust"));
        assert_eq!(payload.platform, "chatgpt");
    }

    #[test]
    fn unknown_platform_falls_back_to_default_budget() {
        let graph = build_graph();
        let payload = ContextGenerator::generate(&graph, Strategy::Structured, Some("unknown-platform"), Utc::now());
        assert!(payload.tokens <= DEFAULT_TOKEN_BUDGET);
    }

    #[test]
    fn custom_strategy_substitutes_template() {
        let graph = build_graph();
        let payload = ContextGenerator::generate(
            &graph,
            Strategy::Custom("Language: {{language}}, Framework: {{framework}}".to_string()),
            None,
            Utc::now(),
        );
        assert_eq!(payload.text, "Language: rust, Framework: axum");
    }

    #[test]
    fn truncation_respects_word_boundary() {
        let long = "word ".repeat(2000);
        let truncated = truncate_to_budget(&long, 10);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 41);
    }

    #[test]
    fn map_to_variables_resolves_equivalence_classes() {
        let graph = build_graph();
        let names = vec!["lang".to_string(), "stack".to_string(), "objective".to_string()];
        let mapped = map_to_variables(&graph, &names, Utc::now());
        assert_eq!(mapped.get("lang").unwrap().value, "rust");
        assert_eq!(mapped.get("stack").unwrap().value, "axum");
        assert!(mapped.get("objective").unwrap().value.contains("memory core"));
    }
}

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use mnemo_engine::context::{ContextGenerator, Strategy};
use mnemo_engine::extractor::{Extractor, ExtractionReport};
use mnemo_engine::graph::{NodeQuery, QuerySort};
use mnemo_index::{SqliteGraphStore, SqliteKvStore};
use mnemo_sync::{Hub, SyncAgent, TabId};
use mnemo_types::connector::Connector;
use mnemo_types::conversation::{ConversationInput, SearchFilters, SearchQuery, SearchSort};
use mnemo_types::graph::NodeType;
use mnemo_types::settings::Settings;
use mnemo_webhook::AllowListOracle;
use mnemo_runtime::{Config, Router};

use crate::args::{Cli, Commands, ConnectorCommand, ContextCommand, ConversationCommand, GraphCommand, JobCommand, SyncCommand};

pub fn run(cli: Cli) -> Result<()> {
    init_logging(&cli.log_level);

    let config = Config::resolve(cli.data_dir.as_deref()).context("resolving workspace data directory")?;
    config.ensure_dirs().context("creating workspace directories")?;

    let kv = SqliteKvStore::open(&config.kv_db_path()).context("opening key/value store")?;
    let graph_store = SqliteGraphStore::open(&config.graph_db_path()).context("opening graph store")?;
    let oracle = AllowListOracle::load(&config.permissions_path()).context("loading permission allow-list")?;
    let client = reqwest::Client::new();

    let mut router = Router::new(&kv, &graph_store, &oracle, client, Settings::default())
        .context("constructing router")?;

    match cli.command {
        Commands::Graph { command } => run_graph(&mut router, command)?,
        Commands::Conversation { command } => run_conversation(&router, command)?,
        Commands::Connector { command } => run_connector(&router, command)?,
        Commands::Job { command } => run_job(&router, command)?,
        Commands::Sync { command } => run_sync(command)?,
        Commands::Context { command } => run_context(&router, command)?,
    }

    router.persist_graph().context("persisting graph")?;
    Ok(())
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn print_json(value: impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn run_graph(router: &mut Router<'_>, command: GraphCommand) -> Result<()> {
    match command {
        GraphCommand::Extract { file, platform } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file))?;
            let now = Utc::now();
            let report = Extractor::extract(router.graph_mut(), &text, platform.as_deref(), now);
            match report {
                Some(report) => print_json(extraction_summary(&report))?,
                None => println!("text too short to extract (minimum 20 characters)"),
            }
        }
        GraphCommand::Query { node_type, platform, min_relevance, within_hours, limit } => {
            let types = node_type
                .map(|t| parse_node_type(&t))
                .transpose()?
                .map(|t| {
                    let mut set = HashSet::new();
                    set.insert(t);
                    set
                });
            let query = NodeQuery {
                types,
                platform,
                session_id: None,
                content_contains: None,
                min_relevance,
                within_hours,
                sort: QuerySort::Relevance,
                limit: Some(limit),
            };
            let nodes = router.graph().query(&query, Utc::now());
            print_json(nodes)?;
        }
        GraphCommand::Stats => print_json(router.graph().stats())?,
    }
    Ok(())
}

fn parse_node_type(raw: &str) -> Result<NodeType> {
    NodeType::ALL
        .iter()
        .copied()
        .find(|t| t.as_str() == raw)
        .ok_or_else(|| anyhow::anyhow!("unknown node type '{}'", raw))
}

fn extraction_summary(report: &ExtractionReport) -> serde_json::Value {
    serde_json::json!({
        "languages": report.languages.iter().map(|l| serde_json::json!({"name": l.name, "confidence": l.confidence})).collect::<Vec<_>>(),
        "frameworks": report.frameworks.iter().map(|f| serde_json::json!({"name": f.name, "language": f.language, "confidence": f.confidence})).collect::<Vec<_>>(),
        "errors": report.errors.iter().map(|e| serde_json::json!({"name": e.name, "message": e.message})).collect::<Vec<_>>(),
        "topics": report.topics.iter().map(|t| serde_json::json!({"name": t.name, "confidence": t.confidence})).collect::<Vec<_>>(),
        "goals": report.goals.iter().map(|g| g.text.clone()).collect::<Vec<_>>(),
        "codeBlocks": report.code_blocks.len(),
        "entities": {
            "files": report.entities.files,
            "functions": report.entities.functions,
            "classes": report.entities.classes,
            "urls": report.entities.urls,
        },
        "nodesTouched": report.node_ids.len(),
    })
}

fn run_conversation(router: &Router<'_>, command: ConversationCommand) -> Result<()> {
    match command {
        ConversationCommand::Save { file } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file))?;
            let input: ConversationInput = serde_json::from_str(&raw).context("parsing conversation input")?;
            let saved = router.save_conversation(input, Utc::now())?;
            print_json(saved)?;
        }
        ConversationCommand::List { limit } => {
            let query = SearchQuery { query: String::new(), limit: Some(limit), ..Default::default() };
            print_json(router.list_conversations(&query, Utc::now())?)?;
        }
        ConversationCommand::Search { query, limit } => {
            let query = SearchQuery {
                query,
                limit: Some(limit),
                filters: SearchFilters::default(),
                sort: SearchSort::Relevance,
            };
            print_json(router.list_conversations(&query, Utc::now())?)?;
        }
    }
    Ok(())
}

fn run_connector(router: &Router<'_>, command: ConnectorCommand) -> Result<()> {
    match command {
        ConnectorCommand::Add { id, name, url, secret } => {
            let mut connectors = router.get_connectors()?;
            let now = Utc::now();
            let created_at = connectors.get(&id).map(|c| c.created_at).unwrap_or(now);
            connectors.by_id.insert(
                id.clone(),
                Connector {
                    id: id.clone(),
                    name,
                    url,
                    secret,
                    headers: Default::default(),
                    enabled: true,
                    created_at,
                    updated_at: now,
                },
            );
            if !connectors.order.contains(&id) {
                connectors.order.push(id);
            }
            router.set_connectors(connectors)?;
            println!("connector saved");
        }
        ConnectorCommand::List => print_json(router.get_connectors()?)?,
        ConnectorCommand::Send { connector_id, payload, kind } => {
            let payload: serde_json::Value = serde_json::from_str(&payload).context("parsing payload JSON")?;
            let job = router.connector_send(&connector_id, payload, None, kind, Utc::now())?;
            print_json(job)?;
        }
    }
    Ok(())
}

fn run_job(router: &Router<'_>, command: JobCommand) -> Result<()> {
    match command {
        JobCommand::List => print_json(router.list_jobs()?)?,
        JobCommand::Pump => {
            let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
            let report = runtime.block_on(router.pump_jobs(Utc::now()))?;
            print_json(report_json(&report))?;
        }
    }
    Ok(())
}

fn report_json(report: &mnemo_webhook::PumpReport) -> serde_json::Value {
    serde_json::json!({
        "attempted": report.attempted,
        "succeeded": report.succeeded,
        "failed": report.failed,
        "retried": report.retried,
    })
}

fn run_sync(command: SyncCommand) -> Result<()> {
    match command {
        SyncCommand::Demo => sync_demo(),
    }
}

/// Drives two in-process tabs through election and a full-sync exchange,
/// narrating each step — a CLI-visible version of `mnemo-sync`'s own tests.
fn sync_demo() -> Result<()> {
    let hub = Hub::new();
    let t0 = Utc::now();

    let mut leader = SyncAgent::new(hub.join(TabId("tab_a".into())));
    let mut follower = SyncAgent::new(hub.join(TabId("tab_b".into())));

    let mut leader_graph = mnemo_engine::MemoryGraph::new();
    leader_graph.add_node(NodeType::Goal, "ship the sync layer", mnemo_engine::NewNode::default(), t0);
    println!("tab_a: seeded graph with 1 node");

    leader.start_election(t0);
    follower.start_election(t0);
    leader.pump(&mut leader_graph, t0);
    let mut follower_graph = mnemo_engine::MemoryGraph::new();
    follower.pump(&mut follower_graph, t0);

    let t1 = t0 + chrono::Duration::milliseconds(250);
    leader.pump(&mut leader_graph, t1);
    follower.pump(&mut follower_graph, t1);
    println!(
        "tab_a leader={} tab_b leader={}",
        leader.is_leader(),
        follower.is_leader()
    );

    follower.request_full_sync();
    leader.pump(&mut leader_graph, t1);
    let mutated = follower.pump(&mut follower_graph, t1);

    println!(
        "full sync applied: {} (tab_b now has {} node(s))",
        mutated > 0,
        follower_graph.node_count()
    );
    Ok(())
}

fn run_context(router: &Router<'_>, command: ContextCommand) -> Result<()> {
    match command {
        ContextCommand::Render { platform, strategy } => {
            let strategy = parse_strategy(&strategy)?;
            let payload = ContextGenerator::generate(router.graph(), strategy, Some(&platform), Utc::now());
            println!("{}", payload.text);
            eprintln!("-- {} tokens, {} nodes", payload.tokens, payload.node_count);
        }
    }
    Ok(())
}

fn parse_strategy(raw: &str) -> Result<Strategy> {
    if let Some(template) = raw.strip_prefix("custom:") {
        return Ok(Strategy::Custom(template.to_string()));
    }
    match raw {
        "minimal" => Ok(Strategy::Minimal),
        "structured" => Ok(Strategy::Structured),
        "narrative" => Ok(Strategy::Narrative),
        "system" => Ok(Strategy::System),
        other => bail!("unknown strategy '{}' (expected minimal/structured/narrative/system/custom:<template>)", other),
    }
}

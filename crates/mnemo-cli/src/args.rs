use clap::{Parser, Subcommand};

/// Local-first memory graph and automation core, exercised from the command
/// line instead of a browser extension host.
#[derive(Debug, Parser)]
#[command(name = "mnemo", version, about, long_about = None)]
pub struct Cli {
    /// Overrides the workspace data directory (`MNEMO_PATH`, then the XDG
    /// data directory, then `~/.mnemo`, per §4.10).
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// `tracing-subscriber` `EnvFilter` directive, e.g. `debug` or
    /// `mnemo_engine=debug,info`.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Memory graph: extraction and querying.
    Graph {
        #[command(subcommand)]
        command: GraphCommand,
    },
    /// Conversation store: save, list, search.
    Conversation {
        #[command(subcommand)]
        command: ConversationCommand,
    },
    /// Webhook connectors.
    Connector {
        #[command(subcommand)]
        command: ConnectorCommand,
    },
    /// Webhook job queue.
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },
    /// Cross-tab sync.
    Sync {
        #[command(subcommand)]
        command: SyncCommand,
    },
    /// Context generator.
    Context {
        #[command(subcommand)]
        command: ContextCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum GraphCommand {
    /// Feeds a text file's contents through the pattern extractor.
    Extract {
        file: String,
        #[arg(long)]
        platform: Option<String>,
    },
    /// Queries the graph, printing matching nodes as JSON.
    Query {
        #[arg(long = "type")]
        node_type: Option<String>,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        min_relevance: Option<f64>,
        #[arg(long)]
        within_hours: Option<f64>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Prints the graph's `{nodeCount, edgeCount, sessionCount, lastModified}` stats.
    Stats,
}

#[derive(Debug, Subcommand)]
pub enum ConversationCommand {
    /// Saves a `ConversationInput` JSON document (see §3.3/§6.6).
    Save { file: String },
    /// Lists recent conversations.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Full-text searches conversations.
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConnectorCommand {
    /// Registers or updates a connector.
    Add {
        id: String,
        name: String,
        url: String,
        #[arg(long)]
        secret: Option<String>,
    },
    /// Lists registered connectors.
    List,
    /// Enqueues a webhook job against a connector.
    Send {
        connector_id: String,
        /// JSON payload, e.g. `'{"hello":"world"}'`.
        payload: String,
        #[arg(long)]
        kind: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Lists every job, newest first.
    List,
    /// Drives the job queue once (at most 3 runnable jobs, per §4.7).
    Pump,
}

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Spins up two in-process tabs and demonstrates leader election and a
    /// full-sync snapshot exchange.
    Demo,
}

#[derive(Debug, Subcommand)]
pub enum ContextCommand {
    /// Renders a context payload for one platform/strategy pair.
    Render {
        platform: String,
        /// `minimal`, `structured`, `narrative`, `system`, or
        /// `custom:<template with {{token}} placeholders>`.
        strategy: String,
    },
}

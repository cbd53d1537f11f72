mod args;
mod commands;

pub use args::{
    Cli, Commands, ConnectorCommand, ContextCommand, ConversationCommand, GraphCommand,
    JobCommand, SyncCommand,
};
pub use commands::run;

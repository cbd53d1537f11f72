//! Ties the memory core together for a process with no browser host: the
//! on-disk workspace layout, the settings document, conversation capture,
//! and the command router the CLI drives.

pub mod config;
pub mod error;
pub mod router;
pub mod runner;
pub mod settings_store;
pub mod source;

pub use config::Config;
pub use error::{Error, Result};
pub use router::Router;
pub use runner::Runner;
pub use settings_store::SettingsStore;
pub use source::{CapturedConversation, ConversationSource, FsConversationSource, InMemoryConversationSource};

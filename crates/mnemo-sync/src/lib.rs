//! Cross-tab broadcast transport, leader election, and conflict resolution
//! for keeping each tab's in-memory graph converged with its peers.

pub mod agent;
pub mod conflict;
pub mod election;
pub mod error;
pub mod message;
pub mod transport;

pub use agent::SyncAgent;
pub use conflict::apply_remote_message;
pub use election::LeaderElection;
pub use error::{Error, Result};
pub use message::{Message, TabId};
pub use transport::{Hub, InProcessTransport, Transport};

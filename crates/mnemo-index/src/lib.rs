//! Durable, indexed persistence for the memory core.
//!
//! Two primitives live here: [`KvStore`], a generic namespaced key-value
//! store standing in for the browser's IndexedDB, and [`GraphStore`], a
//! SQLite realization of the graph's four collections with real secondary
//! indices for the range queries the in-memory graph can't answer alone.
//! Both ship a SQLite-backed implementation and an in-memory one for tests.
//! Domain-level stores built on top of `KvStore` (conversations, jobs,
//! settings) live in the crates that own that domain logic.

pub mod error;
pub mod graph_store;
pub mod kv;

pub use error::{Error, Result};
pub use graph_store::{GraphStore, SqliteGraphStore, SCHEMA_VERSION};
pub use kv::{InMemoryKvStore, KvStore, SqliteKvStore};

//! Durable at-least-once delivery of JSON webhook calls: a job queue
//! persisted through `mnemo-index`'s `KvStore`, HMAC request signing, and
//! exponential backoff up to a fixed attempt cap.

pub mod dispatcher;
pub mod error;
pub mod permission;
pub mod signing;
pub mod store;

pub use dispatcher::{pump, PumpReport};
pub use error::{Error, Result};
pub use permission::{AllowAll, AllowListOracle, PermissionOracle};
pub use store::JobStore;

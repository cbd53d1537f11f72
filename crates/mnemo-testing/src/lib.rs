//! Testing infrastructure shared across the workspace's integration tests.
//!
//! - [`fixtures`]: sample nodes, conversations, jobs and settings documents.
//! - [`world`]: [`TestWorld`], a fluent wrapper around an isolated workspace
//!   directory plus the `mnemo` binary, for CLI-level integration tests.

pub mod fixtures;
pub mod world;

pub use world::TestWorld;

//! Sherpa daemon library - exposes modules for testing.

pub mod chat;
pub mod credentials;
pub mod enrichment;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod stage;

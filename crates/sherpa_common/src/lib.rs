//! Sherpa Common - shared types for the Sherpa travel assistant.
//!
//! Wire shapes for the chat surface, the travel profile and conversation
//! stages, normalized enrichment results, diagnostics payloads, the error
//! taxonomy, and the TOML configuration layer. Both the daemon (`sherpad`)
//! and the CLI (`sherpactl`) depend on this crate so the two sides can
//! never drift apart on the wire.

pub mod chat;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod profile;
pub mod service;
pub mod status;

pub use chat::*;
pub use config::*;
pub use enrichment::*;
pub use error::*;
pub use profile::*;
pub use service::*;
pub use status::*;

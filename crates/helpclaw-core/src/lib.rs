//! # HelpClaw Core
//!
//! Shared foundation for the HelpClaw tiered retrieval engine:
//! error type, configuration, domain types, collaborator traits, and the
//! lexical/semantic scoring primitives used by both the knowledge index
//! and the content cache.

pub mod config;
pub mod error;
pub mod scoring;
pub mod traits;
pub mod types;

pub use config::HelpClawConfig;
pub use error::{HelpClawError, Result};

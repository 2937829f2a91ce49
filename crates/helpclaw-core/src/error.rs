//! HelpClaw error types.

use thiserror::Error;

/// Convenience result alias used across all HelpClaw crates.
pub type Result<T> = std::result::Result<T, HelpClawError>;

/// Unified error type for the retrieval engine.
///
/// Provider and fetch errors are caught at tier/category boundaries and
/// converted to zero-confidence or stale-retained outcomes; they should
/// never escape through the cascade's public entry point.
#[derive(Error, Debug)]
pub enum HelpClawError {
    #[error("Config error: {0}")]
    Config(String),

    /// Embedding or generative backend unreachable or erroring.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),

    /// One category's content fetch failed.
    #[error("Fetch error for category '{category}': {message}")]
    Fetch { category: String, message: String },

    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    #[error("Cache error: {0}")]
    Cache(String),

    /// A refresh cycle is already in flight; the request was rejected.
    #[error("A cache refresh is already in progress")]
    RefreshInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HelpClawError {
    /// Shorthand for a per-category fetch failure.
    pub fn fetch(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            category: category.into(),
            message: message.into(),
        }
    }
}

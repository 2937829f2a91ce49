//! # HelpClaw Providers
//!
//! Concrete implementations of the collaborator traits: a single
//! OpenAI-compatible HTTP provider that covers both embeddings and
//! generative completions (different deployments are distinguished only
//! by base URL, models, and API key), and an HTTP content extractor for
//! the cache's refresh cycle.

pub mod extractor;
pub mod openai_compatible;

pub use extractor::HttpExtractor;
pub use openai_compatible::OpenAiCompatibleProvider;

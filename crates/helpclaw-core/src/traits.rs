//! Collaborator traits at the engine's external seams.
//!
//! The engine never talks to the network directly; it goes through these
//! object-safe traits so tests can inject doubles and deployments can swap
//! backends without touching retrieval logic.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ExtractedDoc;

/// Turns texts into fixed-dimension embedding vectors. May fail or time
/// out; callers degrade to lexical-only behavior on failure.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Embed a batch of texts. One vector per input text, all the same
    /// dimension.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Generates a free-form answer from a prompt plus retrieved context. The
/// most expensive tier; only consulted when the cheaper tiers miss.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, context: &str) -> Result<String>;
}

/// Fetches and extracts structured text from an external content source.
/// Network and HTML-parsing concerns live entirely behind this boundary.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, category: &str, url: &str) -> Result<Vec<ExtractedDoc>>;
}

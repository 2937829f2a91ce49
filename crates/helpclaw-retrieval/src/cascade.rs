//! The three-tier priority cascade.
//!
//! Stateless per query: given unchanged index/cache state, the chosen
//! tier and confidence are deterministic. Tier-internal errors are caught
//! and treated as confidence 0 — `respond` never fails.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use helpclaw_cache::ContentCache;
use helpclaw_core::config::RetrievalConfig;
use helpclaw_core::traits::GenerativeProvider;
use helpclaw_core::types::{RetrievalResult, Tier};
use helpclaw_knowledge::KnowledgeIndex;

/// Minimum confidence for a tier to answer outright.
pub const MIN_CONFIDENCE: f32 = 0.5;
/// In quick mode, a cache match above this is good enough to skip the
/// slow generative tier.
pub const QUICK_CONFIDENCE: f32 = 0.3;
/// Confidence assigned to a successful generative fallback answer.
pub const FALLBACK_CONFIDENCE: f32 = 0.8;
/// Confidence assigned to the fixed handoff message.
pub const FALLBACK_ERROR_CONFIDENCE: f32 = 0.5;
/// Multiplier applied to a cache match whose category has outlived its
/// TTL. Staleness discounts confidence; it never blocks serving.
pub const STALE_DISCOUNT: f32 = 0.85;

/// Fixed response when the generative fallback itself fails or times out.
pub const HANDOFF_TEXT: &str = "I'm currently unable to process your request \
through our standard channels. I've recorded your message and our support \
team will follow up with you shortly. Thank you for your patience!";

/// Context note used when no tier contributed any retrieval context.
const NO_CONTEXT_NOTE: &str = "No specific knowledge base information available. \
Provide a general, helpful response based on your knowledge.";

/// Per-query orchestrator across dataset, cache, and fallback tiers.
pub struct RetrievalCascade {
    index: Arc<KnowledgeIndex>,
    cache: Arc<ContentCache>,
    generator: Arc<dyn GenerativeProvider>,
    top_k: usize,
    fallback_timeout: Duration,
}

impl RetrievalCascade {
    pub fn new(
        index: Arc<KnowledgeIndex>,
        cache: Arc<ContentCache>,
        generator: Arc<dyn GenerativeProvider>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            index,
            cache,
            generator,
            top_k: config.top_k,
            fallback_timeout: Duration::from_secs(config.fallback_timeout_secs),
        }
    }

    /// Answer one query. Infallible: the worst case is the fixed handoff
    /// message tagged [`Tier::FallbackError`].
    pub async fn respond(&self, query: &str, quick_mode: bool) -> RetrievalResult {
        // Tier 1: curated dataset — fast, no external calls on the
        // common (lexical) path.
        if let Some(result) = self.try_dataset(query).await {
            if result.confidence >= MIN_CONFIDENCE {
                tracing::info!(
                    "✅ Tier 1 (dataset): answered with confidence {:.2}",
                    result.confidence
                );
                return result;
            }
            tracing::info!(
                "⚠️ Tier 1 (dataset): confidence too low ({:.2}), trying tier 2",
                result.confidence
            );
        }

        // Tier 2: content cache.
        if let Some(result) = self.try_cache(query).await {
            if result.confidence >= MIN_CONFIDENCE {
                tracing::info!(
                    "✅ Tier 2 (cache): answered with confidence {:.2}",
                    result.confidence
                );
                return result;
            }
            // Quick mode: a moderate cache match beats waiting on the
            // slow generative tier.
            if quick_mode && result.confidence > QUICK_CONFIDENCE {
                tracing::info!(
                    "⚡ Quick mode: returning cache result (confidence {:.2}) instead of fallback",
                    result.confidence
                );
                return result;
            }
            tracing::info!("⚠️ Tier 2 (cache): no good match, falling back to tier 3");
            return self.try_fallback(query, Some(result)).await;
        }

        tracing::info!("⚠️ Tier 2 (cache): no match, falling back to tier 3");
        self.try_fallback(query, None).await
    }

    async fn try_dataset(&self, query: &str) -> Option<RetrievalResult> {
        let hits = self.index.search(query, self.top_k).await;
        let top = hits.first()?;
        let mut metadata = serde_json::Map::new();
        metadata.insert("title".into(), json!(top.item.title));
        metadata.insert("category".into(), json!(top.item.category.as_str()));
        Some(RetrievalResult {
            tier: Tier::Dataset,
            confidence: top.score.clamp(0.0, 1.0),
            text: top.item.answer.clone(),
            metadata,
        })
    }

    async fn try_cache(&self, query: &str) -> Option<RetrievalResult> {
        let hits = self.cache.search(query, self.top_k).await;
        let top = hits.first()?;
        let fresh = self.cache.is_fresh(&top.entry.category);
        let confidence = if fresh {
            top.score
        } else {
            top.score * STALE_DISCOUNT
        };

        let mut metadata = serde_json::Map::new();
        metadata.insert("title".into(), json!(top.entry.title));
        metadata.insert("category".into(), json!(top.entry.category));
        metadata.insert("stale".into(), json!(!fresh));
        Some(RetrievalResult {
            tier: Tier::Cache,
            confidence: confidence.clamp(0.0, 1.0),
            text: top.entry.content.clone(),
            metadata,
        })
    }

    /// Tier 3: the generative fallback, with any retrieval context the
    /// earlier tiers accumulated. Failure or timeout yields the fixed
    /// handoff message — never an error to the caller.
    async fn try_fallback(
        &self,
        query: &str,
        cache_result: Option<RetrievalResult>,
    ) -> RetrievalResult {
        let mut context = self.index.build_context(query, self.top_k).await;
        if let Some(cached) = &cache_result {
            if !cached.text.is_empty() {
                if !context.is_empty() {
                    context.push_str("\n---\n\n");
                }
                context.push_str(&cached.text);
            }
        }
        if context.is_empty() {
            context = NO_CONTEXT_NOTE.to_string();
        }

        match tokio::time::timeout(self.fallback_timeout, self.generator.generate(query, &context))
            .await
        {
            Ok(Ok(text)) => {
                tracing::info!("✅ Tier 3 (fallback): generated response");
                let mut metadata = serde_json::Map::new();
                metadata.insert("model".into(), json!(self.generator.name()));
                RetrievalResult {
                    tier: Tier::Fallback,
                    confidence: FALLBACK_CONFIDENCE,
                    text,
                    metadata,
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Fallback generation failed: {e}");
                self.handoff(&e.to_string())
            }
            Err(_) => {
                tracing::error!(
                    "Fallback generation timed out after {:?}",
                    self.fallback_timeout
                );
                self.handoff("timed out")
            }
        }
    }

    fn handoff(&self, error: &str) -> RetrievalResult {
        let mut metadata = serde_json::Map::new();
        metadata.insert("error".into(), json!(error));
        RetrievalResult {
            tier: Tier::FallbackError,
            confidence: FALLBACK_ERROR_CONFIDENCE,
            text: HANDOFF_TEXT.to_string(),
            metadata,
        }
    }
}

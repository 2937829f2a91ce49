//! The engine context: one explicit object, constructed at process
//! start, owning the knowledge index, content cache, and refresh
//! scheduler. Request handlers get an `Arc<EngineContext>` — there are
//! no module-level singletons anywhere in the engine.

use std::path::Path;
use std::sync::Arc;

use helpclaw_cache::ContentCache;
use helpclaw_core::config::HelpClawConfig;
use helpclaw_core::error::Result;
use helpclaw_core::traits::{ContentExtractor, EmbeddingProvider, GenerativeProvider};
use helpclaw_core::types::{
    KnowledgeItem, RefreshReport, RetrievalResult, SchedulerStatus, TierStats,
};
use helpclaw_knowledge::{load_items, KnowledgeIndex};
use helpclaw_scheduler::RefreshScheduler;

use crate::cascade::RetrievalCascade;

/// Owns the three tiers and the background scheduler for the process
/// lifetime. Safe to share across arbitrary concurrent request handlers:
/// queries only read (immutable index, snapshot reads on the cache) and
/// the scheduler is the sole writer.
pub struct EngineContext {
    index: Arc<KnowledgeIndex>,
    cache: Arc<ContentCache>,
    scheduler: RefreshScheduler,
    cascade: RetrievalCascade,
}

impl EngineContext {
    /// Build the engine from configuration, loading the curated dataset
    /// from disk. Degrades rather than fails: an empty dataset or a dead
    /// embedding provider still yields a servable engine.
    pub async fn new(
        config: &HelpClawConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerativeProvider>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Self {
        let items = load_items(Path::new(&config.knowledge.data_dir), &config.knowledge.files);
        Self::with_items(config, items, embedder, generator, extractor).await
    }

    /// Build the engine from an in-memory item collection.
    pub async fn with_items(
        config: &HelpClawConfig,
        items: Vec<KnowledgeItem>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerativeProvider>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Self {
        let index = Arc::new(KnowledgeIndex::build(items, embedder.clone()).await);
        let cache = Arc::new(ContentCache::new(&config.cache, extractor, embedder));
        let scheduler = RefreshScheduler::new(cache.clone(), &config.scheduler);
        let cascade = RetrievalCascade::new(
            index.clone(),
            cache.clone(),
            generator,
            &config.retrieval,
        );
        tracing::info!(
            "🚀 Engine ready: {} dataset items, {} cached entries",
            index.len(),
            cache.entry_count()
        );
        Self {
            index,
            cache,
            scheduler,
            cascade,
        }
    }

    /// Answer one query through the cascade. Never fails.
    pub async fn respond(&self, query: &str, quick_mode: bool) -> RetrievalResult {
        self.cascade.respond(query, quick_mode).await
    }

    /// Manually trigger a content refresh. Shares the scheduler's
    /// in-progress guard, so it can never overlap a scheduled cycle.
    pub async fn refresh(&self, force: bool) -> Result<RefreshReport> {
        self.cache.refresh(force).await
    }

    /// Launch the background refresh loop.
    pub fn start_scheduler(&self) {
        self.scheduler.start();
    }

    /// Stop the background loop; in-flight fetches complete first.
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }

    pub fn status(&self) -> SchedulerStatus {
        self.scheduler.status()
    }

    /// Data availability across the tiers.
    pub fn tier_stats(&self) -> TierStats {
        TierStats {
            dataset_items: self.index.len(),
            cache_entries: self.cache.entry_count(),
            fallback_available: true,
        }
    }

    pub fn index(&self) -> &Arc<KnowledgeIndex> {
        &self.index
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }
}

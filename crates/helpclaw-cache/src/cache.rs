//! The content cache: snapshot reads, guarded refresh, ranked search.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};

use helpclaw_core::config::{CacheConfig, CategorySource};
use helpclaw_core::error::{HelpClawError, Result};
use helpclaw_core::scoring;
use helpclaw_core::traits::{ContentExtractor, EmbeddingProvider};
use helpclaw_core::types::{CacheEntry, CacheSnapshot, RefreshReport, RefreshStatus};

use crate::snapshot::SnapshotStore;

/// One ranked match from the cache.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entry: CacheEntry,
    pub score: f32,
}

/// Clears the in-progress flag when a refresh ends, success or failure.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// TTL-aware cache over externally sourced content.
pub struct ContentCache {
    snapshot: RwLock<Arc<CacheSnapshot>>,
    store: SnapshotStore,
    extractor: Arc<dyn ContentExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    categories: Vec<CategorySource>,
    ttl: Duration,
    /// In-progress refresh flag. Shared by scheduled and manual refresh:
    /// the loser of the compare-and-swap is rejected, never run twice.
    refreshing: AtomicBool,
    /// Set on the first embedding failure; the semantic search pass is
    /// skipped afterwards.
    embeddings_unavailable: AtomicBool,
}

impl ContentCache {
    /// Create the cache, loading a prior durable snapshot if one exists.
    /// A stale snapshot is still usable — staleness only discounts
    /// confidence downstream, it never blocks serving.
    pub fn new(
        config: &CacheConfig,
        extractor: Arc<dyn ContentExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let store = SnapshotStore::new(&config.resolved_dir());
        let snapshot = store.load().unwrap_or_default();

        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            store,
            extractor,
            embedder,
            categories: config.categories.clone(),
            ttl: Duration::hours(config.ttl_hours as i64),
            refreshing: AtomicBool::new(false),
            embeddings_unavailable: AtomicBool::new(false),
        }
    }

    /// The current snapshot. Cheap: clones the `Arc`, not the entries.
    pub fn current(&self) -> Arc<CacheSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn swap(&self, snapshot: CacheSnapshot) {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(snapshot);
    }

    /// Refresh all configured categories, best effort per category.
    ///
    /// Returns [`HelpClawError::RefreshInProgress`] if another refresh —
    /// scheduled or manual — is already in flight. When `forced` is false
    /// and the snapshot is still within its TTL, no fetch happens and a
    /// `Skipped` report is returned.
    pub async fn refresh(&self, forced: bool) -> Result<RefreshReport> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::warn!("⚠️ Refresh requested while another is in flight — rejected");
            return Err(HelpClawError::RefreshInProgress);
        }
        let _guard = RefreshGuard(&self.refreshing);

        let previous = self.current();

        if !forced {
            if let Some(at) = previous.last_refreshed_at {
                if Utc::now() - at < self.ttl {
                    tracing::info!("✅ Snapshot still fresh, skipping refresh");
                    return Ok(RefreshReport {
                        status: RefreshStatus::Skipped,
                        per_category: self.count_per_category(&previous),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        tracing::info!("🔄 Refreshing {} content categories...", self.categories.len());
        let now = Utc::now();
        let mut entries: Vec<CacheEntry> = Vec::new();

        for source in &self.categories {
            match self.extractor.extract(&source.name, &source.url).await {
                Ok(docs) => {
                    tracing::info!("  ✓ Fetched {} docs for '{}'", docs.len(), source.name);
                    entries.extend(docs.into_iter().map(|doc| CacheEntry {
                        category: source.name.clone(),
                        title: doc.title,
                        content: doc.content,
                        scraped_at: now,
                    }));
                }
                Err(e) => {
                    // Partial-failure tolerance: keep whatever this
                    // category had before, previous scraped_at and all.
                    let retained: Vec<CacheEntry> =
                        previous.entries_for(&source.name).cloned().collect();
                    tracing::warn!(
                        "⚠️ Fetch failed for '{}' ({e}) — retaining {} previous entries",
                        source.name,
                        retained.len()
                    );
                    entries.extend(retained);
                }
            }
        }

        let snapshot = CacheSnapshot {
            entries,
            last_refreshed_at: Some(now),
        };
        let per_category = self.count_per_category(&snapshot);

        // Swap first so readers see the new data even if persistence
        // fails; a failed save only costs durability, not correctness.
        self.swap(snapshot);
        if let Err(e) = self.store.save(&self.current()) {
            tracing::warn!("⚠️ Failed to persist snapshot: {e}");
        }

        Ok(RefreshReport {
            status: RefreshStatus::Completed,
            per_category,
            timestamp: now,
        })
    }

    fn count_per_category(&self, snapshot: &CacheSnapshot) -> BTreeMap<String, usize> {
        self.categories
            .iter()
            .map(|c| (c.name.clone(), snapshot.entries_for(&c.name).count()))
            .collect()
    }

    /// Ranked search over the current snapshot, lexical-first with an
    /// embedding fallback — the same strategy as the knowledge index.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<CacheHit> {
        let snapshot = self.current();
        if snapshot.is_empty() || top_k == 0 {
            return vec![];
        }

        let query_words = scoring::tokenize(query);
        let lexical: Vec<f32> = snapshot
            .entries
            .iter()
            .map(|e| scoring::lexical_score(&query_words, &e.title, &e.content))
            .collect();

        let ranked = scoring::rank_top_k(&lexical, top_k);
        if !ranked.is_empty() {
            return ranked
                .into_iter()
                .map(|(i, score)| CacheHit {
                    entry: snapshot.entries[i].clone(),
                    score,
                })
                .collect();
        }

        self.semantic_search(&snapshot, query, top_k).await
    }

    /// Cache entries carry no precomputed embeddings (they churn on every
    /// refresh), so the semantic pass embeds query + entries in one batch.
    async fn semantic_search(
        &self,
        snapshot: &CacheSnapshot,
        query: &str,
        top_k: usize,
    ) -> Vec<CacheHit> {
        if self.embeddings_unavailable.load(Ordering::Relaxed) {
            return vec![];
        }

        let mut texts: Vec<String> = Vec::with_capacity(snapshot.entries.len() + 1);
        texts.push(query.to_string());
        texts.extend(
            snapshot
                .entries
                .iter()
                .map(|e| format!("{}\n{}", e.title, e.content)),
        );

        let vectors = match self.embedder.embed(&texts).await {
            Ok(v) if v.len() == texts.len() => v,
            Ok(_) | Err(_) => {
                tracing::warn!("⚠️ Cache embedding failed — semantic pass disabled");
                self.embeddings_unavailable.store(true, Ordering::Relaxed);
                return vec![];
            }
        };

        let Some((query_vec, entry_vecs)) = vectors.split_first() else {
            return vec![];
        };
        let scores: Vec<f32> = entry_vecs
            .iter()
            .map(|v| scoring::cosine_similarity(v, query_vec).clamp(0.0, 1.0))
            .collect();

        scoring::rank_top_k(&scores, top_k)
            .into_iter()
            .map(|(i, score)| CacheHit {
                entry: snapshot.entries[i].clone(),
                score,
            })
            .collect()
    }

    /// Whether a category's newest entry is within the TTL. A category
    /// with no entries is never fresh.
    pub fn is_fresh(&self, category: &str) -> bool {
        match self.current().newest_for(category) {
            Some(at) => Utc::now() - at < self.ttl,
            None => false,
        }
    }

    /// Empty the in-memory snapshot and remove the durable file.
    pub fn clear(&self) {
        self.swap(CacheSnapshot::default());
        self.store.remove();
        tracing::info!("✅ Cleared content cache");
    }

    pub fn entry_count(&self) -> usize {
        self.current().entries.len()
    }

    pub fn last_refreshed_at(&self) -> Option<chrono::DateTime<Utc>> {
        self.current().last_refreshed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use helpclaw_core::types::ExtractedDoc;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct StubExtractor {
        fetches: AtomicUsize,
        failing: Mutex<HashSet<String>>,
        delay_ms: u64,
    }

    impl StubExtractor {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                failing: Mutex::new(HashSet::new()),
                delay_ms: 0,
            }
        }

        fn fail_category(&self, name: &str) {
            self.failing.lock().unwrap().insert(name.to_string());
        }
    }

    #[async_trait]
    impl ContentExtractor for StubExtractor {
        async fn extract(&self, category: &str, _url: &str) -> Result<Vec<ExtractedDoc>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }
            if self.failing.lock().unwrap().contains(category) {
                return Err(HelpClawError::fetch(category, "stub outage"));
            }
            Ok(vec![ExtractedDoc {
                title: format!("{category} page"),
                content: format!("content about {category}"),
            }])
        }
    }

    struct NoEmbedder;

    #[async_trait]
    impl EmbeddingProvider for NoEmbedder {
        fn name(&self) -> &str {
            "none"
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(HelpClawError::Provider("disabled".into()))
        }
    }

    fn config(dir: &str) -> CacheConfig {
        CacheConfig {
            dir: std::env::temp_dir().join(dir).to_string_lossy().into_owned(),
            ttl_hours: 24,
            categories: vec![
                CategorySource {
                    name: "products".into(),
                    url: "https://example.com/products".into(),
                },
                CategorySource {
                    name: "faqs".into(),
                    url: "https://example.com/faq".into(),
                },
            ],
        }
    }

    fn cleanup(dir: &str) {
        std::fs::remove_dir_all(std::env::temp_dir().join(dir)).ok();
    }

    #[tokio::test]
    async fn test_refresh_populates_and_persists() {
        let dir = "helpclaw-test-cache-refresh";
        cleanup(dir);
        let cfg = config(dir);
        let extractor = Arc::new(StubExtractor::new());
        let cache = ContentCache::new(&cfg, extractor, Arc::new(NoEmbedder));

        let report = cache.refresh(true).await.unwrap();
        assert_eq!(report.status, RefreshStatus::Completed);
        assert_eq!(report.per_category["products"], 1);
        assert_eq!(report.per_category["faqs"], 1);
        assert_eq!(cache.entry_count(), 2);

        // A fresh instance picks the snapshot back up from disk
        let reloaded = ContentCache::new(&cfg, Arc::new(StubExtractor::new()), Arc::new(NoEmbedder));
        assert_eq!(reloaded.entry_count(), 2);
        assert!(reloaded.last_refreshed_at().is_some());
        cleanup(dir);
    }

    #[tokio::test]
    async fn test_partial_failure_retains_previous_entries() {
        let dir = "helpclaw-test-cache-partial";
        cleanup(dir);
        let extractor = Arc::new(StubExtractor::new());
        let cache = ContentCache::new(&config(dir), extractor.clone(), Arc::new(NoEmbedder));

        cache.refresh(true).await.unwrap();
        let first = cache.current();
        let old_faq_time = first.newest_for("faqs").unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        extractor.fail_category("faqs");
        let report = cache.refresh(true).await.unwrap();

        // Failed category keeps its entry and its prior timestamp
        assert_eq!(report.per_category["faqs"], 1);
        let snap = cache.current();
        assert_eq!(snap.newest_for("faqs").unwrap(), old_faq_time);
        // Successful category got a newer timestamp
        assert!(snap.newest_for("products").unwrap() > old_faq_time);
        cleanup(dir);
    }

    #[tokio::test]
    async fn test_unforced_refresh_skips_when_fresh() {
        let dir = "helpclaw-test-cache-skip";
        cleanup(dir);
        let extractor = Arc::new(StubExtractor::new());
        let cache = ContentCache::new(&config(dir), extractor.clone(), Arc::new(NoEmbedder));

        cache.refresh(true).await.unwrap();
        let fetches_after_first = extractor.fetches.load(Ordering::SeqCst);

        let report = cache.refresh(false).await.unwrap();
        assert_eq!(report.status, RefreshStatus::Skipped);
        assert_eq!(extractor.fetches.load(Ordering::SeqCst), fetches_after_first);
        cleanup(dir);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_rejected() {
        let dir = "helpclaw-test-cache-mutex";
        cleanup(dir);
        let extractor = Arc::new(StubExtractor {
            fetches: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            delay_ms: 100,
        });
        let cache = Arc::new(ContentCache::new(
            &config(dir),
            extractor.clone(),
            Arc::new(NoEmbedder),
        ));

        let (a, b) = tokio::join!(cache.refresh(true), cache.refresh(true));
        let results = [a, b];
        let completed = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(HelpClawError::RefreshInProgress)))
            .count();
        assert_eq!(completed, 1);
        assert_eq!(rejected, 1);
        // Exactly one fetch cycle ran: one fetch per category
        assert_eq!(extractor.fetches.load(Ordering::SeqCst), 2);
        cleanup(dir);
    }

    #[tokio::test]
    async fn test_search_and_staleness() {
        let dir = "helpclaw-test-cache-search";
        cleanup(dir);
        let cache = ContentCache::new(&config(dir), Arc::new(StubExtractor::new()), Arc::new(NoEmbedder));
        assert!(cache.search("products", 3).await.is_empty());
        assert!(!cache.is_fresh("products"));

        cache.refresh(true).await.unwrap();
        let hits = cache.search("products page", 3).await;
        assert_eq!(hits[0].entry.category, "products");
        assert!(hits[0].score > 0.5);
        assert!(cache.is_fresh("products"));

        // No lexical overlap and the embedder is down → empty, not error
        assert!(cache.search("zzz qqq", 3).await.is_empty());
        cleanup(dir);
    }

    #[tokio::test]
    async fn test_clear_removes_snapshot_and_file() {
        let dir = "helpclaw-test-cache-clear";
        cleanup(dir);
        let cfg = config(dir);
        let cache = ContentCache::new(&cfg, Arc::new(StubExtractor::new()), Arc::new(NoEmbedder));
        cache.refresh(true).await.unwrap();
        assert!(cache.entry_count() > 0);

        cache.clear();
        assert_eq!(cache.entry_count(), 0);
        assert!(cache.last_refreshed_at().is_none());

        let reloaded = ContentCache::new(&cfg, Arc::new(StubExtractor::new()), Arc::new(NoEmbedder));
        assert_eq!(reloaded.entry_count(), 0);
        cleanup(dir);
    }
}

//! The knowledge index: ranked nearest-match search over curated items.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use helpclaw_core::scoring;
use helpclaw_core::traits::EmbeddingProvider;
use helpclaw_core::types::KnowledgeItem;

/// One ranked match from the index.
#[derive(Debug, Clone)]
pub struct KnowledgeHit {
    pub item: KnowledgeItem,
    pub score: f32,
}

/// Immutable search index over the curated dataset.
///
/// Ingest happens once in [`KnowledgeIndex::build`]; after that the index
/// is read-only and safe to share across arbitrary concurrent callers.
pub struct KnowledgeIndex {
    items: Vec<KnowledgeItem>,
    /// Lexical body per item: question + answer + tags.
    bodies: Vec<String>,
    /// One embedding per item, batch-computed at build time. `None` when
    /// the provider failed or the dataset is empty.
    embeddings: Option<Vec<Vec<f32>>>,
    embedder: Arc<dyn EmbeddingProvider>,
    /// Set when the embedding provider has failed; the semantic pass is
    /// skipped for the rest of the process lifetime.
    lexical_only: AtomicBool,
}

impl KnowledgeIndex {
    /// Build the index from a fixed item collection.
    ///
    /// Embeddings are computed in a single batch call. If the provider
    /// fails, the index degrades permanently to lexical-only mode — this
    /// never aborts startup. An empty dataset likewise degrades to an
    /// index that returns no matches.
    pub async fn build(items: Vec<KnowledgeItem>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let bodies: Vec<String> = items
            .iter()
            .map(|i| {
                let mut body = String::new();
                if let Some(q) = &i.question {
                    body.push_str(q);
                    body.push(' ');
                }
                body.push_str(&i.answer);
                for tag in &i.tags {
                    body.push(' ');
                    body.push_str(tag);
                }
                body
            })
            .collect();

        if items.is_empty() {
            return Self {
                items,
                bodies,
                embeddings: None,
                embedder,
                lexical_only: AtomicBool::new(true),
            };
        }

        let texts: Vec<String> = items.iter().map(|i| i.to_embedding_text()).collect();
        let (embeddings, lexical_only) = match embedder.embed(&texts).await {
            Ok(vectors) if Self::validate_batch(&vectors, items.len()) => {
                tracing::info!(
                    "🧠 Embedded {} knowledge items (dim {})",
                    vectors.len(),
                    vectors.first().map(|v| v.len()).unwrap_or(0)
                );
                (Some(vectors), false)
            }
            Ok(_) => {
                tracing::warn!("⚠️ Embedding provider returned a malformed batch — lexical-only mode");
                (None, true)
            }
            Err(e) => {
                tracing::warn!("⚠️ Embedding provider failed at ingest: {e} — lexical-only mode");
                (None, true)
            }
        };

        Self {
            items,
            bodies,
            embeddings,
            embedder,
            lexical_only: AtomicBool::new(lexical_only),
        }
    }

    /// One vector per item, all the same dimension, none empty.
    fn validate_batch(vectors: &[Vec<f32>], expected: usize) -> bool {
        if vectors.len() != expected {
            return false;
        }
        let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
        dim > 0 && vectors.iter().all(|v| v.len() == dim)
    }

    /// Ranked search: lexical first, embedding cosine similarity only when
    /// no document shares a word with the query.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<KnowledgeHit> {
        if self.items.is_empty() || top_k == 0 {
            return vec![];
        }

        let query_words = scoring::tokenize(query);
        let lexical: Vec<f32> = self
            .items
            .iter()
            .zip(&self.bodies)
            .map(|(item, body)| scoring::lexical_score(&query_words, &item.title, body))
            .collect();

        let ranked = scoring::rank_top_k(&lexical, top_k);
        if !ranked.is_empty() {
            return ranked
                .into_iter()
                .map(|(i, score)| KnowledgeHit {
                    item: self.items[i].clone(),
                    score,
                })
                .collect();
        }

        self.semantic_search(query, top_k).await
    }

    async fn semantic_search(&self, query: &str, top_k: usize) -> Vec<KnowledgeHit> {
        if self.lexical_only.load(Ordering::Relaxed) {
            return vec![];
        }
        let Some(embeddings) = &self.embeddings else {
            return vec![];
        };

        let query_vec = match self.embedder.embed(&[query.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) | Err(_) => {
                tracing::warn!("⚠️ Query embedding failed — staying lexical-only");
                self.lexical_only.store(true, Ordering::Relaxed);
                return vec![];
            }
        };

        let scores: Vec<f32> = embeddings
            .iter()
            .map(|v| scoring::cosine_similarity(v, &query_vec).clamp(0.0, 1.0))
            .collect();

        scoring::rank_top_k(&scores, top_k)
            .into_iter()
            .map(|(i, score)| KnowledgeHit {
                item: self.items[i].clone(),
                score,
            })
            .collect()
    }

    /// Render the top matches as context blocks for the generative
    /// fallback tier. Empty string when nothing matches.
    pub async fn build_context(&self, query: &str, top_k: usize) -> String {
        let hits = self.search(query, top_k).await;
        if hits.is_empty() {
            return String::new();
        }

        let blocks: Vec<String> = hits
            .iter()
            .map(|hit| {
                let mut block = format!(
                    "[{}] {}\n",
                    hit.item.category.as_str().to_uppercase(),
                    hit.item.title
                );
                if let Some(q) = &hit.item.question {
                    block.push_str(&format!("Q: {q}\n"));
                }
                block.push_str(&format!("A: {}\n", hit.item.answer));
                block
            })
            .collect();

        blocks.join("\n---\n\n")
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the semantic pass is still available.
    pub fn has_embeddings(&self) -> bool {
        self.embeddings.is_some() && !self.lexical_only.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use helpclaw_core::error::{HelpClawError, Result};
    use helpclaw_core::types::Category;
    use std::sync::atomic::AtomicUsize;

    /// Deterministic embedder: refund-ish texts map to one axis,
    /// everything else to the other. Counts calls.
    struct StubEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubEmbedder {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        fn name(&self) -> &str {
            "stub"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HelpClawError::Provider("stub down".into()));
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    if t.contains("refund") || t.contains("money") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    fn items() -> Vec<KnowledgeItem> {
        vec![
            KnowledgeItem {
                id: "p1".into(),
                category: Category::Policy,
                title: "Refund Policy".into(),
                question: None,
                answer: "60 day guarantee".into(),
                tags: vec!["refund".into()],
            },
            KnowledgeItem {
                id: "f1".into(),
                category: Category::Faq,
                title: "Shipping Times".into(),
                question: Some("How long does shipping take?".into()),
                answer: "Orders ship in 3-5 business days".into(),
                tags: vec![],
            },
        ]
    }

    #[tokio::test]
    async fn test_exact_title_match_is_confident() {
        let embedder = Arc::new(StubEmbedder::new(false));
        let index = KnowledgeIndex::build(items(), embedder).await;
        let hits = index.search("refund policy", 3).await;
        assert_eq!(hits[0].item.id, "p1");
        assert!(hits[0].score >= 0.5);
    }

    #[tokio::test]
    async fn test_lexical_path_makes_no_embed_call() {
        let embedder = Arc::new(StubEmbedder::new(false));
        let index = KnowledgeIndex::build(items(), embedder.clone()).await;
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1); // ingest batch only

        let hits = index.search("shipping", 3).await;
        assert_eq!(hits[0].item.id, "f1");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1); // still just ingest
    }

    #[tokio::test]
    async fn test_semantic_fallback_on_zero_lexical_match() {
        let embedder = Arc::new(StubEmbedder::new(false));
        let index = KnowledgeIndex::build(items(), embedder.clone()).await;

        // No word overlap with either item → semantic pass
        let hits = index.search("money back", 3).await;
        assert_eq!(hits[0].item.id, "p1");
        assert!(hits[0].score > 0.9);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2); // ingest + query
    }

    #[tokio::test]
    async fn test_failed_ingest_degrades_to_lexical_only() {
        let embedder = Arc::new(StubEmbedder::new(true));
        let index = KnowledgeIndex::build(items(), embedder.clone()).await;
        assert!(!index.has_embeddings());

        // Lexical still works
        let hits = index.search("refund", 3).await;
        assert_eq!(hits[0].item.id, "p1");

        // Semantic path is skipped entirely, no further provider calls
        let hits = index.search("money back", 3).await;
        assert!(hits.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_dataset_returns_empty() {
        let embedder = Arc::new(StubEmbedder::new(false));
        let index = KnowledgeIndex::build(vec![], embedder.clone()).await;
        assert!(index.is_empty());
        assert!(index.search("anything", 3).await.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_build_context_blocks() {
        let embedder = Arc::new(StubEmbedder::new(false));
        let index = KnowledgeIndex::build(items(), embedder).await;
        let ctx = index.build_context("refund policy", 3).await;
        assert!(ctx.contains("[POLICY] Refund Policy"));
        assert!(ctx.contains("A: 60 day guarantee"));
    }

    #[tokio::test]
    async fn test_build_context_empty_when_no_match() {
        let embedder = Arc::new(StubEmbedder::new(true));
        let index = KnowledgeIndex::build(items(), embedder).await;
        // Lexical miss + embeddings unavailable → no context at all
        assert!(index.build_context("zzz qqq", 3).await.is_empty());
    }
}

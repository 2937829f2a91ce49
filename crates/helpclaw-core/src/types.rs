//! Domain types shared across the retrieval engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a curated knowledge item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Faq,
    Product,
    Policy,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Faq => "faq",
            Category::Product => "product",
            Category::Policy => "policy",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A curated knowledge item. Owned by the knowledge index and immutable
/// after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub title: String,
    #[serde(default)]
    pub question: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl KnowledgeItem {
    /// Render the item as the text block that gets embedded, matching the
    /// layout the index was trained to retrieve against.
    pub fn to_embedding_text(&self) -> String {
        let mut parts = vec![
            format!("Title: {}", self.title),
            format!("Type: {}", self.category),
        ];
        if let Some(q) = &self.question {
            parts.push(format!("Q: {q}"));
        }
        parts.push(format!("A: {}", self.answer));
        parts.join("\n")
    }
}

/// A single cached entry of externally sourced content. The whole entry is
/// replaced (never merged) when its category refreshes successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub category: String,
    pub title: String,
    pub content: String,
    pub scraped_at: DateTime<Utc>,
}

/// Immutable point-in-time view of the content cache. The cache holds a
/// single current-snapshot `Arc` that is atomically replaced on refresh,
/// so readers never observe a partially updated snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<CacheEntry>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

impl CacheSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries belonging to one category.
    pub fn entries_for<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a CacheEntry> + 'a {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Most recent scrape timestamp within a category, if any.
    pub fn newest_for(&self, category: &str) -> Option<DateTime<Utc>> {
        self.entries_for(category).map(|e| e.scraped_at).max()
    }
}

/// Which tier produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Dataset,
    Cache,
    Fallback,
    FallbackError,
}

/// The result of one query through the cascade. Produced fresh per query,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub tier: Tier,
    /// Match quality estimate, always in [0, 1].
    pub confidence: f32,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    /// A full fetch cycle ran.
    Completed,
    /// The snapshot was still fresh and `forced` was not set.
    Skipped,
}

/// Report returned by `ContentCache::refresh`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub status: RefreshStatus,
    /// Entry count per configured category after the refresh.
    pub per_category: BTreeMap<String, usize>,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of the background scheduler's state.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_secs: u64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// Seconds until the next scheduled refresh is due (0 = due now).
    pub next_due_in_secs: u64,
}

/// Data availability per tier, for operational introspection.
#[derive(Debug, Clone, Serialize)]
pub struct TierStats {
    pub dataset_items: usize,
    pub cache_entries: usize,
    pub fallback_available: bool,
}

/// Structured text extracted from one external page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDoc {
    pub title: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_embedding_text() {
        let item = KnowledgeItem {
            id: "faq-1".into(),
            category: Category::Faq,
            title: "Refund Policy".into(),
            question: Some("How do refunds work?".into()),
            answer: "60 day guarantee".into(),
            tags: vec!["refund".into()],
        };
        let text = item.to_embedding_text();
        assert!(text.starts_with("Title: Refund Policy"));
        assert!(text.contains("Type: faq"));
        assert!(text.contains("Q: How do refunds work?"));
        assert!(text.ends_with("A: 60 day guarantee"));
    }

    #[test]
    fn test_item_deserialize_lowercase_type() {
        let json = r#"{"id":"p1","type":"product","title":"Chews","answer":"Tasty"}"#;
        let item: KnowledgeItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.category, Category::Product);
        assert!(item.question.is_none());
        assert!(item.tags.is_empty());
    }

    #[test]
    fn test_snapshot_newest_for() {
        let old = Utc::now() - chrono::Duration::hours(5);
        let new = Utc::now();
        let snap = CacheSnapshot {
            entries: vec![
                CacheEntry {
                    category: "faqs".into(),
                    title: "a".into(),
                    content: "x".into(),
                    scraped_at: old,
                },
                CacheEntry {
                    category: "faqs".into(),
                    title: "b".into(),
                    content: "y".into(),
                    scraped_at: new,
                },
            ],
            last_refreshed_at: Some(new),
        };
        assert_eq!(snap.newest_for("faqs"), Some(new));
        assert_eq!(snap.newest_for("products"), None);
    }
}

//! Curated dataset loading.
//!
//! Dataset files are plain JSON arrays of knowledge items, human-editable
//! and git-friendly. A missing file is skipped; a malformed file is
//! logged and skipped rather than aborting startup.

use std::path::Path;

use helpclaw_core::types::KnowledgeItem;

/// Load curated items from `dir`, reading `files` in order. Insertion
/// order is preserved — it is the tie-break order for ranked search.
pub fn load_items(dir: &Path, files: &[String]) -> Vec<KnowledgeItem> {
    let mut items = Vec::new();

    for name in files {
        let path = dir.join(name);
        if !path.exists() {
            tracing::debug!("Dataset file not found, skipping: {}", path.display());
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<Vec<KnowledgeItem>>(&json) {
                Ok(mut parsed) => {
                    tracing::info!("📚 Loaded {} items from {}", parsed.len(), name);
                    items.append(&mut parsed);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to parse {}: {e}", name);
                }
            },
            Err(e) => {
                tracing::warn!("⚠️ Failed to read {}: {e}", name);
            }
        }
    }

    if items.is_empty() {
        tracing::warn!("⚠️ Curated dataset is empty — knowledge tier will return no matches");
    }
    items
}

//! # HelpClaw Knowledge Index
//!
//! Immutable index over the curated support dataset (FAQs, products,
//! policies). Built once at process start, read-only for the process
//! lifetime — no hot reload.
//!
//! ## Search strategy
//! ```text
//! query
//!   ↓ lexical word-overlap scoring (free — no external calls)
//! any match? → ranked results
//!   ↓ zero lexical matches
//! embedding cosine similarity (semantic safety net for paraphrases)
//!   ↓ embeddings unavailable
//! empty result → cascade falls through to the next tier
//! ```

pub mod index;
pub mod loader;

pub use index::{KnowledgeHit, KnowledgeIndex};
pub use loader::load_items;

//! # HelpClaw Retrieval
//!
//! The per-query priority cascade across the three response tiers, and
//! the process-wide engine context that owns the tiers.
//!
//! ```text
//! query
//!   ↓ Tier 1: KnowledgeIndex (cheapest, most authoritative)
//! confidence ≥ 0.5? → answer
//!   ↓ Tier 2: ContentCache (refreshed in the background)
//! confidence ≥ 0.5? → answer
//!   ↓ quick mode && confidence > 0.3? → cache answer (skip slow tier)
//!   ↓ Tier 3: generative fallback (most expensive)
//! success → answer · failure/timeout → fixed handoff message
//! ```

pub mod cascade;
pub mod context;

pub use cascade::{RetrievalCascade, FALLBACK_CONFIDENCE, MIN_CONFIDENCE, QUICK_CONFIDENCE};
pub use context::EngineContext;

//! # HelpClaw Content Cache
//!
//! Refreshable, TTL-aware cache of externally sourced content (product
//! pages, FAQ pages, policy pages). Tolerant of partial fetch failure:
//! a category whose fetch fails keeps its previous entries.
//!
//! ## Concurrency model
//! Readers clone an `Arc<CacheSnapshot>` out of the cache; the snapshot is
//! immutable once built and replaced in one atomic reference swap, so a
//! reader always sees either the old or the new snapshot in full. The
//! refresh path is serialized by a compare-and-swap in-progress flag —
//! at most one fetch cycle runs at a time, whether scheduled or manual.

pub mod cache;
pub mod snapshot;

pub use cache::{CacheHit, ContentCache};
pub use snapshot::{SnapshotStore, SNAPSHOT_VERSION};

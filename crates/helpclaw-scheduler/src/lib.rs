//! # HelpClaw Refresh Scheduler
//!
//! One background tokio task that keeps the content cache refreshed on an
//! interval. The loop sleeps in bounded increments so `stop()` takes
//! effect within about a second, and it never interrupts a fetch that is
//! already underway.
//!
//! Overlap prevention lives in the cache itself (a compare-and-swap
//! in-progress flag), so a manual refresh from a request path and the
//! scheduled refresh can never run two fetch cycles concurrently — the
//! loser is rejected and the loop simply backs off and retries later.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use helpclaw_cache::ContentCache;
use helpclaw_core::config::SchedulerConfig;
use helpclaw_core::error::HelpClawError;
use helpclaw_core::types::SchedulerStatus;

/// Maximum single sleep inside the loop; the stop flag is re-checked at
/// this cadence.
const TICK: Duration = Duration::from_secs(1);

/// Drives periodic content cache refresh without overlap.
pub struct RefreshScheduler {
    cache: Arc<ContentCache>,
    interval_secs: u64,
    backoff_secs: u64,
    running: Arc<AtomicBool>,
    /// Bumped on every `start()`. A loop whose start generation no longer
    /// matches exits, so a stop/start cycle while a refresh is in flight
    /// cannot leave the old loop alive alongside the new one.
    generation: Arc<AtomicU64>,
}

impl RefreshScheduler {
    /// Create a scheduler from configuration.
    pub fn new(cache: Arc<ContentCache>, config: &SchedulerConfig) -> Self {
        Self::from_secs(cache, config.interval_hours * 3600, config.backoff_secs)
    }

    /// Create with an explicit interval, mostly for tests.
    pub fn from_secs(cache: Arc<ContentCache>, interval_secs: u64, backoff_secs: u64) -> Self {
        Self {
            cache,
            interval_secs,
            backoff_secs,
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Launch the background loop. Idempotent: a second call while the
    /// loop is alive is a no-op.
    pub fn start(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Scheduler is already running");
            return;
        }

        let started_gen = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(
            "⏰ Refresh scheduler started (interval: {}h)",
            self.interval_secs / 3600
        );
        tokio::spawn(run_loop(
            self.cache.clone(),
            self.running.clone(),
            self.generation.clone(),
            started_gen,
            self.interval_secs,
            self.backoff_secs,
        ));
    }

    /// Signal the loop to exit after its current wait or fetch. Idempotent.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            tracing::info!("Refresh scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current scheduler state for the operational surface.
    pub fn status(&self) -> SchedulerStatus {
        let last = self.cache.last_refreshed_at();
        SchedulerStatus {
            running: self.is_running(),
            interval_secs: self.interval_secs,
            last_refreshed_at: last,
            next_due_in_secs: secs_until_due(last, self.interval_secs),
        }
    }
}

/// `max(0, interval − elapsed since last refresh)`; due immediately if the
/// cache has never been refreshed.
fn secs_until_due(last: Option<chrono::DateTime<Utc>>, interval_secs: u64) -> u64 {
    match last {
        Some(at) => {
            let elapsed = (Utc::now() - at).num_seconds().max(0) as u64;
            interval_secs.saturating_sub(elapsed)
        }
        None => 0,
    }
}

/// Whether the loop started at `started_gen` should keep going. False as
/// soon as the scheduler stops or a newer loop has been started.
fn loop_active(running: &AtomicBool, generation: &AtomicU64, started_gen: u64) -> bool {
    running.load(Ordering::Acquire) && generation.load(Ordering::Acquire) == started_gen
}

async fn run_loop(
    cache: Arc<ContentCache>,
    running: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    started_gen: u64,
    interval_secs: u64,
    backoff_secs: u64,
) {
    while loop_active(&running, &generation, started_gen) {
        let remaining = secs_until_due(cache.last_refreshed_at(), interval_secs);
        if remaining > 0 {
            tokio::time::sleep(TICK.min(Duration::from_secs(remaining))).await;
            continue;
        }

        tracing::info!("🔄 Scheduled content refresh starting...");
        match cache.refresh(true).await {
            Ok(report) => {
                let summary: Vec<String> = report
                    .per_category
                    .iter()
                    .map(|(name, count)| format!("{count} {name}"))
                    .collect();
                tracing::info!("✅ Scheduled refresh completed: {}", summary.join(", "));
            }
            Err(HelpClawError::RefreshInProgress) => {
                // A manual refresh beat us to it; it will update the
                // snapshot timestamp, so just back off.
                tracing::debug!("Scheduled refresh skipped — manual refresh in flight");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }
            Err(e) => {
                // Failures never terminate the loop.
                tracing::warn!("⚠️ Scheduled refresh failed: {e}");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }
        }
    }
    tracing::debug!("Scheduler loop exited");
}

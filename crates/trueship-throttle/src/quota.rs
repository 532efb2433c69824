//! Leaky-bucket quota accounting
//!
//! [`QuotaState`] tracks how many request units remain in the bucket and when
//! the replenishment clock was last (re)started. It has no locking of its own;
//! the [`ExecutionGate`](crate::gate::ExecutionGate) owns it behind a mutex and
//! is the only caller of the mutating methods.
//!
//! The replenishment clock is an explicit `Option<Instant>`: `None` means the
//! clock is idle (bucket untouched or fully restored), `Some(t)` means quota is
//! below capacity and units are credited relative to `t`.

use tokio::time::Instant;
use tracing::debug;

use crate::policy::ReplenishFn;

/// Mutable quota state for a single throttler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    /// Bucket capacity
    max_quota: u32,
    /// Units currently available, always within `0..=max_quota`
    remaining: u32,
    /// Baseline of the replenishment clock; `None` while idle
    started_at: Option<Instant>,
}

impl QuotaState {
    /// Creates a full bucket with an idle clock.
    pub fn new(max_quota: u32) -> Self {
        Self {
            max_quota,
            remaining: max_quota,
            started_at: None,
        }
    }

    /// Bucket capacity.
    pub fn max_quota(&self) -> u32 {
        self.max_quota
    }

    /// Units currently available.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Whether the replenishment clock is running.
    pub fn clock_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Instant the replenishment clock was last started or reset.
    pub fn clock_started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    // ========================================================================
    // Replenishment
    // ========================================================================

    /// Credits quota released since the clock baseline.
    ///
    /// Elapsed time is truncated to whole seconds and passed to `release`.
    /// A zero release leaves the baseline untouched so later calls see a larger
    /// elapsed value. A nonzero release is added (clamped at capacity) and the
    /// baseline restarts at `now`, so the same seconds are never credited
    /// twice. Once the bucket is full again the clock goes idle.
    ///
    /// Returns the number of units actually added.
    pub fn replenish(&mut self, now: Instant, release: &ReplenishFn) -> u32 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        if self.remaining == self.max_quota {
            return 0;
        }

        let elapsed = now.saturating_duration_since(started_at).as_secs();
        let released = release(elapsed);

        debug!(elapsed, released, "Throttler: seconds elapsed, quota released");

        if released == 0 {
            return 0;
        }

        let before = self.remaining;
        self.remaining = self
            .remaining
            .saturating_add(released)
            .min(self.max_quota);
        self.started_at = if self.remaining == self.max_quota {
            None
        } else {
            Some(now)
        };

        debug!(remaining = self.remaining, "Throttler: added quota");
        self.remaining - before
    }

    // ========================================================================
    // Consumption
    // ========================================================================

    /// Takes one unit after a successful call and starts the clock if idle.
    ///
    /// Consuming from an empty bucket leaves it at zero; the deficit is not
    /// tracked. Starting an already running clock keeps its baseline.
    pub fn consume(&mut self, now: Instant) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        debug!(remaining = self.remaining, "Throttler: subtracted quota");
    }

    /// Empties the bucket after the remote side signalled throttling.
    ///
    /// Unlike [`consume`](Self::consume) this always restarts the clock from
    /// `now`, even when it was already running.
    pub fn drain(&mut self, now: Instant) {
        self.remaining = 0;
        self.started_at = Some(now);
        debug!("Throttler: quota drained after throttling signal");
    }
}

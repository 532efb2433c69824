//! Mutual-exclusion gate around the quota state
//!
//! Every read and write of [`QuotaState`] happens inside [`ExecutionGate`]'s
//! lock. The lock only covers the inspect/mutate step and is released before
//! any delay is awaited, so a sleeping caller never blocks other callers from
//! checking replenishment.

use serde::Serialize;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use crate::{policy::ThrottlePolicy, quota::QuotaState};

/// What [`ExecutionGate::wait_if_needed`] did before letting the caller through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Quota was available, no delay
    Proceed,
    /// Quota was exhausted; the delay strategy ran once
    Waited,
}

/// Point-in-time view of the quota, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub remaining: u32,
    pub max_quota: u32,
    pub clock_running: bool,
}

/// Lock-guarded owner of the quota state.
#[derive(Debug)]
pub struct ExecutionGate {
    policy: ThrottlePolicy,
    state: Mutex<QuotaState>,
}

impl ExecutionGate {
    /// Creates a gate with a full bucket.
    pub fn new(policy: ThrottlePolicy) -> Self {
        let state = QuotaState::new(policy.max_quota());
        Self {
            policy,
            state: Mutex::new(state),
        }
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Replenishes and, if the bucket is still empty, awaits one delay.
    ///
    /// Quota is not rechecked after the delay. One delay cycle is trusted to be
    /// enough; if it was not, the caller proceeds anyway and the next
    /// consumption saturates at zero.
    pub async fn wait_if_needed(&self) -> GateOutcome {
        {
            let mut state = self.state.lock().await;
            state.replenish(Instant::now(), self.policy.replenish_fn());
            if !state.is_exhausted() {
                return GateOutcome::Proceed;
            }
        }

        debug!("Throttler: quota exceeded. Waiting...");
        self.policy.delay().await;
        GateOutcome::Waited
    }

    /// Records one successful call.
    pub async fn consume(&self) {
        self.state.lock().await.consume(Instant::now());
    }

    /// Empties the bucket and restarts the replenishment clock.
    pub async fn drain(&self) {
        self.state.lock().await.drain(Instant::now());
    }

    pub async fn snapshot(&self) -> QuotaSnapshot {
        let state = self.state.lock().await;
        QuotaSnapshot {
            remaining: state.remaining(),
            max_quota: state.max_quota(),
            clock_running: state.clock_running(),
        }
    }
}

//! Retry orchestration around a throttled operation
//!
//! [`Throttler`] runs an operation through the [`ExecutionGate`] and retries
//! it when the remote side answers with a throttling signal:
//!
//! ```text
//! ATTEMPTING --ok--------------------------> SUCCEEDED
//! ATTEMPTING --throttled, budget left-----> RETRY_WAIT --> ATTEMPTING
//! ATTEMPTING --fatal | budget exhausted---> FAILED
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trueship_throttle::Throttler;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let throttler = Throttler::default();
//! let client = reqwest::Client::new();
//! let body = throttler
//!     .execute(|| async {
//!         client
//!             .get("https://api.example.com/orders")
//!             .send()
//!             .await?
//!             .error_for_status()?
//!             .text()
//!             .await
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use tracing::{debug, info, warn};

use crate::{
    classify::{ClassifyFailure, FailureClass},
    error::{ConfigError, ThrottleError},
    gate::{ExecutionGate, GateOutcome, QuotaSnapshot},
    policy::ThrottlePolicy,
};

/// Leaky-bucket throttler with bounded retry on throttling signals.
///
/// Thread-safe; share it between tasks via `Arc<Throttler>` or a reference.
/// All callers draw from the same bucket.
#[derive(Debug)]
pub struct Throttler {
    gate: ExecutionGate,
}

impl Throttler {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            gate: ExecutionGate::new(policy),
        }
    }

    /// See [`ThrottlePolicy::from_delay_seconds`].
    pub fn from_delay_seconds(max_quota: u32, delay_seconds: u64) -> Result<Self, ConfigError> {
        ThrottlePolicy::from_delay_seconds(max_quota, delay_seconds).map(Self::new)
    }

    pub fn policy(&self) -> &ThrottlePolicy {
        self.gate.policy()
    }

    /// Current quota, for diagnostics.
    pub async fn snapshot(&self) -> QuotaSnapshot {
        self.gate.snapshot().await
    }

    /// Runs `operation` under the throttle, classifying failures with
    /// [`ClassifyFailure`].
    ///
    /// # Errors
    /// * [`ThrottleError::Operation`] - the operation failed with a non-throttling error
    /// * [`ThrottleError::RetriesExhausted`] - throttled more times than the retry ceiling allows
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, ThrottleError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifyFailure,
    {
        self.execute_with(operation, E::classify).await
    }

    /// Runs `operation` under the throttle with an explicit classifier.
    pub async fn execute_with<T, E, F, Fut, C>(
        &self,
        mut operation: F,
        classify: C,
    ) -> Result<T, ThrottleError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> FailureClass,
    {
        let max_retries = self.policy().max_retry_count();
        let mut retry_count = 0u32;

        loop {
            debug!(attempt = retry_count, "Throttler: trying execute request");

            if self.gate.wait_if_needed().await == GateOutcome::Waited {
                debug!(attempt = retry_count, "Throttler: proceeding after quota wait");
            }

            let err = match operation().await {
                Ok(value) => {
                    self.gate.consume().await;
                    if retry_count > 0 {
                        info!(retries = retry_count, "Request succeeded after retry");
                    } else {
                        debug!("Throttler: request executed successfully");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !classify(&err).is_throttled() {
                return Err(ThrottleError::Operation(err));
            }

            if retry_count >= max_retries {
                warn!(retries = retry_count, "Throttle retry limit exhausted");
                return Err(ThrottleError::RetriesExhausted {
                    retries: retry_count,
                    source: err,
                });
            }

            warn!(attempt = retry_count, "Throttler: got throttling signal, retrying");
            self.gate.drain().await;
            retry_count += 1;

            debug!("Throttler: waiting before next retry");
            self.policy().delay().await;
        }
    }
}

impl Default for Throttler {
    /// Throttler with the TrueShip default profile.
    fn default() -> Self {
        Self::new(ThrottlePolicy::default())
    }
}

//! Throttle policy: capacity, replenishment, delay and retry ceiling
//!
//! A [`ThrottlePolicy`] is fixed when the throttler is built. Three ways to
//! construct one are provided:
//!
//! - [`ThrottlePolicy::new`] - fully explicit
//! - [`ThrottlePolicy::default`] - the TrueShip leaky bucket (one request per
//!   second, 20 retries)
//! - [`ThrottlePolicy::from_delay_seconds`] - linear replenishment derived from
//!   a single delay value, 10 retries

use std::{fmt, future::Future, sync::Arc, time::Duration};

use futures_util::future::{BoxFuture, FutureExt};

use crate::error::ConfigError;

/// Maps whole seconds elapsed since the last credit to quota units released.
pub type ReplenishFn = Arc<dyn Fn(u64) -> u32 + Send + Sync>;

/// Asynchronous suspension awaited whenever a caller has to back off.
pub type DelayFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// TrueShip bucket size
pub const DEFAULT_MAX_QUOTA: u32 = 1;

/// TrueShip drip rate (units per elapsed second)
pub const DEFAULT_DRIP_RATE: u32 = 1;

/// Delay of the default profile
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Retry ceiling of the default profile
pub const DEFAULT_MAX_RETRY_COUNT: u32 = 20;

/// Retry ceiling used by [`ThrottlePolicy::from_delay_seconds`]
pub const DELAY_SECONDS_MAX_RETRY_COUNT: u32 = 10;

/// Immutable throttle configuration.
#[derive(Clone)]
pub struct ThrottlePolicy {
    max_quota: u32,
    replenish: ReplenishFn,
    delay: DelayFn,
    max_retry_count: u32,
}

impl fmt::Debug for ThrottlePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottlePolicy")
            .field("max_quota", &self.max_quota)
            .field("max_retry_count", &self.max_retry_count)
            .finish_non_exhaustive()
    }
}

impl ThrottlePolicy {
    /// Creates a policy from explicit parts.
    ///
    /// # Arguments
    /// * `max_quota` - Bucket capacity, must be greater than 0
    /// * `replenish` - Units released for a number of whole elapsed seconds
    /// * `delay` - Suspension awaited when the bucket is empty and between retries
    /// * `max_retry_count` - Retries allowed after throttling signals
    pub fn new<R, D, Fut>(
        max_quota: u32,
        replenish: R,
        delay: D,
        max_retry_count: u32,
    ) -> Result<Self, ConfigError>
    where
        R: Fn(u64) -> u32 + Send + Sync + 'static,
        D: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if max_quota == 0 {
            return Err(ConfigError::ZeroQuota);
        }
        Ok(Self {
            max_quota,
            replenish: Arc::new(replenish),
            delay: Arc::new(move || delay().boxed()),
            max_retry_count,
        })
    }

    /// Linear bucket where one unit is released every `delay_seconds`.
    ///
    /// The delay strategy sleeps for `delay_seconds` and the retry ceiling is
    /// fixed at [`DELAY_SECONDS_MAX_RETRY_COUNT`].
    pub fn from_delay_seconds(max_quota: u32, delay_seconds: u64) -> Result<Self, ConfigError> {
        if delay_seconds == 0 {
            return Err(ConfigError::ZeroDelay);
        }
        Self::new(
            max_quota,
            move |elapsed| u32::try_from(elapsed / delay_seconds).unwrap_or(u32::MAX),
            sleep_for(Duration::from_secs(delay_seconds)),
            DELAY_SECONDS_MAX_RETRY_COUNT,
        )
    }

    /// Returns a copy with a different retry ceiling.
    pub fn with_max_retry_count(mut self, max_retry_count: u32) -> Self {
        self.max_retry_count = max_retry_count;
        self
    }

    pub fn max_quota(&self) -> u32 {
        self.max_quota
    }

    pub fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    pub fn replenish_fn(&self) -> &ReplenishFn {
        &self.replenish
    }

    /// Awaits the configured delay strategy once.
    pub async fn delay(&self) {
        (self.delay)().await
    }
}

impl Default for ThrottlePolicy {
    /// TrueShip leaky bucket: size 1, one unit per second, 1 s delay, 20 retries.
    fn default() -> Self {
        Self {
            max_quota: DEFAULT_MAX_QUOTA,
            replenish: Arc::new(|elapsed| {
                u32::try_from(elapsed)
                    .unwrap_or(u32::MAX)
                    .saturating_mul(DEFAULT_DRIP_RATE)
            }),
            delay: Arc::new(|| tokio::time::sleep(DEFAULT_DELAY).boxed()),
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
        }
    }
}

/// Delay strategy that sleeps on the tokio timer for `duration`.
pub fn sleep_for(duration: Duration) -> impl Fn() -> tokio::time::Sleep + Send + Sync + 'static {
    move || tokio::time::sleep(duration)
}

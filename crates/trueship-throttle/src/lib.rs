//! TrueShip Throttle - leaky-bucket request throttling with 429-aware retry
//!
//! Wraps outbound API calls so callers stay within a provider's rate limit and
//! ride out "Too Many Requests" responses:
//!
//! - **Quota accounting** - [`QuotaState`] drains one unit per successful call
//!   and is replenished from whole seconds elapsed
//! - **Gate** - [`ExecutionGate`] serializes all quota access behind one async
//!   mutex and makes callers wait when the bucket is empty
//! - **Classification** - [`ClassifyFailure`] separates remote throttling
//!   (HTTP 429) from every other failure
//! - **Retry** - [`Throttler`] retries throttled calls with the configured
//!   delay, up to a retry ceiling
//!
//! ## Modules
//!
//! - [`quota`] - quota state and replenishment
//! - [`gate`] - lock-guarded wait-if-needed gate
//! - [`classify`] - failure classification
//! - [`policy`] - throttle policy and its constructors
//! - [`settings`] - YAML settings file
//! - [`throttler`] - retry orchestration

pub mod classify;
pub mod error;
pub mod gate;
pub mod policy;
pub mod quota;
pub mod settings;
pub mod throttler;

pub use classify::{classify_status, ClassifyFailure, FailureClass, HttpStatusError};
pub use error::{ConfigError, ThrottleError};
pub use gate::{ExecutionGate, GateOutcome, QuotaSnapshot};
pub use policy::{DelayFn, ReplenishFn, ThrottlePolicy};
pub use quota::QuotaState;
pub use settings::{Profile, Settings};
pub use throttler::Throttler;

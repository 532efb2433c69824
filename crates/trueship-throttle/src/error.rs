//! Error types for the throttler

use thiserror::Error;

use crate::settings::ValidationError;

/// Failure returned by [`Throttler::execute`](crate::Throttler::execute).
///
/// The two variants keep "the operation failed" apart from "throttling could
/// not be resolved within the retry budget".
#[derive(Debug, Error)]
pub enum ThrottleError<E> {
    /// The operation failed with an error that is not a throttling signal.
    /// The error is passed through untouched.
    #[error(transparent)]
    Operation(E),

    /// The remote service kept throttling after every allowed retry
    #[error("throttle max retry count reached after {retries} retries")]
    RetriesExhausted {
        /// Number of retries performed before giving up
        retries: u32,
        /// The last throttling failure received
        #[source]
        source: E,
    },
}

impl<E> ThrottleError<E> {
    /// Returns `true` when the retry budget ran out.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, ThrottleError::RetriesExhausted { .. })
    }

    /// The non-retryable operation error, if that is what this is.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            ThrottleError::Operation(err) => Some(err),
            ThrottleError::RetriesExhausted { .. } => None,
        }
    }

    /// Consumes the error and returns the underlying operation failure.
    ///
    /// For [`ThrottleError::RetriesExhausted`] this is the last throttling
    /// failure.
    pub fn into_inner(self) -> E {
        match self {
            ThrottleError::Operation(err) => err,
            ThrottleError::RetriesExhausted { source, .. } => source,
        }
    }
}

/// Errors raised while building a throttle policy
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Bucket capacity must be at least one unit
    #[error("max quota must be greater than 0")]
    ZeroQuota,

    /// The per-unit delay is used as a divisor and must be positive
    #[error("delay seconds must be greater than 0")]
    ZeroDelay,

    /// Settings failed validation
    #[error("invalid throttle settings: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

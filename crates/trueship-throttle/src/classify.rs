//! Failure classification
//!
//! The throttler only needs to know one thing about a failed operation: is the
//! remote service throttling us (HTTP 429) or not. [`ClassifyFailure`] answers
//! that for an error type; [`Throttler::execute_with`](crate::Throttler::execute_with)
//! accepts a plain function instead for error types that cannot implement it.

use thiserror::Error;

/// HTTP 429 Too Many Requests
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Outcome of classifying an operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// The remote side signalled rate limiting; worth retrying after a delay
    Throttled,
    /// Any other failure; returned to the caller unchanged
    Fatal,
}

impl FailureClass {
    pub fn is_throttled(self) -> bool {
        self == FailureClass::Throttled
    }
}

/// Errors that can tell whether they are a remote throttling signal.
pub trait ClassifyFailure {
    fn classify(&self) -> FailureClass;
}

/// Classifies a protocol-level response status.
pub fn classify_status(status: u16) -> FailureClass {
    if status == TOO_MANY_REQUESTS {
        FailureClass::Throttled
    } else {
        FailureClass::Fatal
    }
}

/// Transport-neutral protocol error carrying a response status.
///
/// Callers whose HTTP stack has no [`ClassifyFailure`] impl can map error
/// responses into this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("HTTP {status}: {message}")]
pub struct HttpStatusError {
    pub status: u16,
    pub message: String,
}

impl HttpStatusError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl ClassifyFailure for HttpStatusError {
    fn classify(&self) -> FailureClass {
        classify_status(self.status)
    }
}

#[cfg(feature = "reqwest")]
impl ClassifyFailure for reqwest::Error {
    /// Only errors produced from a received response (e.g. via
    /// `Response::error_for_status`) carry a status; connection, timeout and
    /// decode failures have none and are fatal.
    fn classify(&self) -> FailureClass {
        match self.status() {
            Some(status) => classify_status(status.as_u16()),
            None => FailureClass::Fatal,
        }
    }
}

impl ClassifyFailure for anyhow::Error {
    /// Looks through the error chain for a known protocol error.
    fn classify(&self) -> FailureClass {
        self.chain()
            .find_map(classify_cause)
            .unwrap_or(FailureClass::Fatal)
    }
}

fn classify_cause(cause: &(dyn std::error::Error + 'static)) -> Option<FailureClass> {
    #[cfg(feature = "reqwest")]
    {
        if let Some(err) = cause.downcast_ref::<reqwest::Error>() {
            return Some(err.classify());
        }
    }
    cause
        .downcast_ref::<HttpStatusError>()
        .map(ClassifyFailure::classify)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_429_is_throttled() {
        assert_eq!(classify_status(429), FailureClass::Throttled);
        assert!(classify_status(429).is_throttled());
    }

    #[test]
    fn test_other_statuses_are_fatal() {
        for status in [200, 400, 401, 404, 500, 502, 503, 504] {
            assert_eq!(classify_status(status), FailureClass::Fatal, "{status}");
        }
    }

    #[test]
    fn test_http_status_error_classification() {
        assert_eq!(
            HttpStatusError::new(429, "slow down").classify(),
            FailureClass::Throttled
        );
        assert_eq!(
            HttpStatusError::new(503, "unavailable").classify(),
            FailureClass::Fatal
        );
        assert_eq!(
            HttpStatusError::new(429, "slow down").to_string(),
            "HTTP 429: slow down"
        );
    }

    #[test]
    fn test_anyhow_finds_status_error_in_chain() {
        let err = anyhow::Error::new(HttpStatusError::new(429, "too many"))
            .context("fetching orders");
        assert_eq!(err.classify(), FailureClass::Throttled);
    }

    #[test]
    fn test_anyhow_without_transport_error_is_fatal() {
        let err = anyhow::anyhow!("index out of range");
        assert_eq!(err.classify(), FailureClass::Fatal);

        let err = anyhow::Error::new(HttpStatusError::new(503, "down"));
        assert_eq!(err.classify(), FailureClass::Fatal);
    }
}

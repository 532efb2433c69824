//! Integration tests for trueship-throttle
//!
//! Uses wiremock to simulate a rate-limited HTTP API and reqwest as the real
//! transport, verifying classification and retry behavior end to end.

mod common;

mod test_classification;
mod test_retry;

//! Classification of real reqwest failures
//!
//! A 429 surfaced through `error_for_status` is a throttling signal; other
//! statuses and transport failures are fatal and reach the caller unchanged.

use trueship_throttle::{ClassifyFailure, FailureClass, Throttler};
use wiremock::MockServer;

use crate::common;

#[tokio::test]
async fn test_reqwest_429_is_throttled() {
    let server = MockServer::start().await;
    common::mount_status(&server, 429).await;

    let err = common::fetch(&reqwest::Client::new(), &common::orders_url(&server))
        .await
        .unwrap_err();

    assert_eq!(err.classify(), FailureClass::Throttled);
}

#[tokio::test]
async fn test_reqwest_503_is_fatal() {
    let server = MockServer::start().await;
    common::mount_status(&server, 503).await;

    let err = common::fetch(&reqwest::Client::new(), &common::orders_url(&server))
        .await
        .unwrap_err();

    assert_eq!(err.classify(), FailureClass::Fatal);
}

#[tokio::test]
async fn test_connection_error_is_fatal() {
    // Nothing listens on port 1
    let err = common::fetch(&reqwest::Client::new(), "http://127.0.0.1:1/orders")
        .await
        .unwrap_err();

    assert!(err.status().is_none());
    assert_eq!(err.classify(), FailureClass::Fatal);
}

#[tokio::test]
async fn test_anyhow_context_keeps_classification() {
    let server = MockServer::start().await;
    common::mount_status(&server, 429).await;

    let err = anyhow::Error::new(
        common::fetch(&reqwest::Client::new(), &common::orders_url(&server))
            .await
            .unwrap_err(),
    )
    .context("listing orders");

    assert_eq!(err.classify(), FailureClass::Throttled);
}

#[tokio::test]
async fn test_service_unavailable_propagates_without_quota_change() {
    let server = MockServer::start().await;
    common::mount_status(&server, 503).await;
    let throttler = Throttler::new(common::fast_policy(3, 5));
    let client = reqwest::Client::new();
    let url = common::orders_url(&server);

    let err = throttler
        .execute(|| common::fetch(&client, &url))
        .await
        .unwrap_err();

    assert!(!err.is_retries_exhausted());
    let source = err.into_inner();
    assert_eq!(source.status().map(|s| s.as_u16()), Some(503));
    assert_eq!(common::request_count(&server).await, 1);

    let snapshot = throttler.snapshot().await;
    assert_eq!(snapshot.remaining, 3);
    assert!(!snapshot.clock_running);
}

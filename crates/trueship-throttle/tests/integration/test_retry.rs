//! Retry behavior against a rate-limited endpoint

use std::sync::Arc;

use trueship_throttle::{ThrottleError, Throttler};
use wiremock::MockServer;

use crate::common;

#[tokio::test]
async fn test_recovers_after_single_429() {
    let server = MockServer::start().await;
    common::mount_throttled_then_ok(&server, 1, "order-1001").await;
    let throttler = Throttler::new(common::fast_policy(1, 3));
    let client = reqwest::Client::new();
    let url = common::orders_url(&server);

    let body = throttler
        .execute(|| common::fetch(&client, &url))
        .await
        .expect("request should succeed after retry");

    assert_eq!(body, "order-1001");
    assert_eq!(common::request_count(&server).await, 2);
    assert_eq!(throttler.snapshot().await.remaining, 0);
}

#[tokio::test]
async fn test_gives_up_after_retry_ceiling() {
    let server = MockServer::start().await;
    common::mount_status(&server, 429).await;
    let throttler = Throttler::new(common::fast_policy(2, 2));
    let client = reqwest::Client::new();
    let url = common::orders_url(&server);

    let err = throttler
        .execute(|| common::fetch(&client, &url))
        .await
        .unwrap_err();

    match err {
        ThrottleError::RetriesExhausted { retries, source } => {
            assert_eq!(retries, 2);
            assert_eq!(source.status().map(|s| s.as_u16()), Some(429));
        }
        ThrottleError::Operation(err) => panic!("expected exhausted retries, got {err}"),
    }
    assert_eq!(common::request_count(&server).await, 3);
}

#[tokio::test]
async fn test_zero_retry_ceiling_fails_on_first_429() {
    let server = MockServer::start().await;
    common::mount_status(&server, 429).await;
    let throttler = Throttler::new(common::fast_policy(1, 0));
    let client = reqwest::Client::new();
    let url = common::orders_url(&server);

    let err = throttler
        .execute(|| common::fetch(&client, &url))
        .await
        .unwrap_err();

    assert!(err.is_retries_exhausted());
    assert_eq!(common::request_count(&server).await, 1);
}

#[tokio::test]
async fn test_concurrent_callers_all_complete() {
    let server = MockServer::start().await;
    common::mount_throttled_then_ok(&server, 2, "ok").await;
    let throttler = Arc::new(Throttler::new(common::fast_policy(2, 5)));
    let client = reqwest::Client::new();
    let url = common::orders_url(&server);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let throttler = Arc::clone(&throttler);
        let client = client.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            throttler.execute(|| common::fetch(&client, &url)).await
        }));
    }

    for handle in handles {
        let body = handle.await.unwrap().expect("every caller should succeed");
        assert_eq!(body, "ok");
    }

    // Five successes plus the two throttled attempts
    assert_eq!(common::request_count(&server).await, 7);
    let snapshot = throttler.snapshot().await;
    assert!(snapshot.remaining <= snapshot.max_quota);
}

//! Shared test helpers for throttler integration tests
//!
//! Provides wiremock endpoints that answer with fixed statuses and a fast
//! policy so retries complete in milliseconds.

use std::time::Duration;

use trueship_throttle::ThrottlePolicy;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path served by the mock orders endpoint
pub const ORDERS_PATH: &str = "/orders";

/// Policy with linear replenishment and a 10ms delay.
pub fn fast_policy(max_quota: u32, max_retry_count: u32) -> ThrottlePolicy {
    ThrottlePolicy::new(
        max_quota,
        |elapsed| u32::try_from(elapsed).unwrap_or(u32::MAX),
        || tokio::time::sleep(Duration::from_millis(10)),
        max_retry_count,
    )
    .expect("valid policy")
}

/// GET `url` and turn non-success statuses into errors.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.text().await
}

pub fn orders_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), ORDERS_PATH)
}

/// Mounts an orders endpoint that always answers with `status`.
pub async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Mounts an orders endpoint that answers 429 `times` times, then 200 with `body`.
pub async fn mount_throttled_then_ok(server: &MockServer, times: u64, body: &str) {
    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "1"))
        .up_to_n_times(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Number of requests the mock server has seen.
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

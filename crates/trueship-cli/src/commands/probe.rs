//! Probe command - drive GET requests through the throttler
//!
//! Issues a batch of requests against one URL through a single shared
//! [`Throttler`], then reports how each request ended and where the quota
//! stands afterwards. Useful for checking settings against a live endpoint.

use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use futures_util::{stream, StreamExt};
use serde::Serialize;
use tracing::info;
use trueship_throttle::{QuotaSnapshot, Settings, ThrottleError, Throttler};

use crate::output::Output;

#[derive(Debug, Args)]
pub struct ProbeCommand {
    /// URL to request
    pub url: String,

    /// Number of requests to send
    #[arg(short = 'n', long, default_value_t = 5)]
    pub requests: usize,

    /// Requests allowed in flight at once
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,
}

/// How a single probe request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Ok { status: u16 },
    Failed { error: String },
    RetriesExhausted { retries: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub index: usize,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub requests: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub results: Vec<ProbeResult>,
    pub quota: QuotaSnapshot,
}

impl ProbeCommand {
    pub async fn execute(&self, settings: &Settings, output: Output) -> Result<()> {
        if self.requests == 0 {
            bail!("--requests must be at least 1");
        }
        if self.concurrency == 0 {
            bail!("--concurrency must be at least 1");
        }

        let policy = settings
            .to_policy()
            .context("Invalid throttle settings")?;
        let throttler = Throttler::new(policy);
        let client = reqwest::Client::new();

        info!(
            url = %self.url,
            requests = self.requests,
            concurrency = self.concurrency,
            "Starting probe"
        );

        let report = self.run(&throttler, &client).await;
        print_report(&report, output)?;

        if report.succeeded == 0 {
            bail!("All {} requests failed", report.requests);
        }
        Ok(())
    }

    /// Sends every request and collects the results in request order.
    pub async fn run(&self, throttler: &Throttler, client: &reqwest::Client) -> ProbeReport {
        let started = Instant::now();
        let url = self.url.as_str();

        let mut results: Vec<ProbeResult> = stream::iter(1..=self.requests)
            .map(move |index| async move {
                let request_started = Instant::now();
                let outcome = match throttler.execute(|| fetch(client, url)).await {
                    Ok(status) => ProbeOutcome::Ok { status },
                    Err(ThrottleError::RetriesExhausted { retries, .. }) => {
                        ProbeOutcome::RetriesExhausted { retries }
                    }
                    Err(ThrottleError::Operation(e)) => ProbeOutcome::Failed {
                        error: e.to_string(),
                    },
                };
                ProbeResult {
                    index,
                    outcome,
                    elapsed_ms: millis(request_started),
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by_key(|r| r.index);

        let succeeded = results
            .iter()
            .filter(|r| matches!(r.outcome, ProbeOutcome::Ok { .. }))
            .count();

        ProbeReport {
            url: self.url.clone(),
            requests: self.requests,
            succeeded,
            failed: self.requests - succeeded,
            elapsed_ms: millis(started),
            results,
            quota: throttler.snapshot().await,
        }
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<u16, reqwest::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.status().as_u16())
}

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn print_report(report: &ProbeReport, output: Output) -> Result<()> {
    if output.is_json() {
        let json = serde_json::to_value(report).context("Failed to serialize probe report")?;
        output.json(&json);
        return Ok(());
    }

    let summary = format!(
        "{} of {} requests succeeded in {} ms",
        report.succeeded, report.requests, report.elapsed_ms
    );
    if report.failed == 0 {
        output.success(&summary);
    } else {
        output.warn(&summary);
    }

    for result in &report.results {
        let line = match &result.outcome {
            ProbeOutcome::Ok { status } => format!("HTTP {}", status),
            ProbeOutcome::Failed { error } => format!("failed: {}", error),
            ProbeOutcome::RetriesExhausted { retries } => {
                format!("still throttled after {} retries", retries)
            }
        };
        output.info(&format!(
            "#{:<4} {} ({} ms)",
            result.index, line, result.elapsed_ms
        ));
    }

    output.info("");
    output.info(&format!(
        "Quota: {}/{} remaining, replenishment clock {}",
        report.quota.remaining,
        report.quota.max_quota,
        if report.quota.clock_running {
            "running"
        } else {
            "idle"
        }
    ));

    Ok(())
}

//! Readiness probing for the analysis sidecar.
//!
//! The sidecar starts alongside the worker and may take a while to load its
//! models. Before each job the worker polls a health URL until it answers
//! `200 OK` or the retry budget runs out. Connection errors only mean "not
//! ready yet"; they are never surfaced to the caller.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

/// Default health URL of the analysis sidecar.
pub const DEFAULT_READINESS_URL: &str = "http://localhost:8000/docs";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;
pub const DEFAULT_INTERVAL_MS: u64 = 500;

/// Wall-clock spacing of "still waiting" log lines.
const PROGRESS_EVERY_MS: u64 = 5_000;
/// Upper bound for a single probe request.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ReadinessProber {
    http_client: Client,
    url: String,
    max_attempts: u32,
    interval_ms: u64,
}

impl ReadinessProber {
    pub fn new(
        url: impl Into<String>,
        max_attempts: u32,
        interval_ms: u64,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(PROBE_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            url: url.into(),
            max_attempts,
            interval_ms,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Poll until the endpoint answers 200, returning false once the budget is spent.
    pub async fn wait_until_ready(&self) -> bool {
        let progress_every = (PROGRESS_EVERY_MS / self.interval_ms.max(1)).max(1);

        for attempt in 1..=self.max_attempts {
            match self.http_client.get(&self.url).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    info!(
                        "API is reachable after {} ms.",
                        u64::from(attempt) * self.interval_ms
                    );
                    return true;
                }
                Ok(response) => {
                    debug!(attempt, status = %response.status(), "Server not ready yet");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Server not reachable yet");
                }
            }

            if u64::from(attempt) % progress_every == 0 {
                info!("Still waiting on the server to come up...");
            }

            tokio::time::sleep(self.interval()).await;
        }

        warn!(
            "Failed to connect to server at {} after {} attempts.",
            self.url, self.max_attempts
        );
        false
    }
}

/// One-shot form of [`ReadinessProber::wait_until_ready`].
///
/// A prober that cannot be built counts as not ready.
pub async fn wait_until_ready(url: &str, max_attempts: u32, interval_ms: u64) -> bool {
    match ReadinessProber::new(url, max_attempts, interval_ms) {
        Ok(prober) => prober.wait_until_ready().await,
        Err(e) => {
            warn!(url = %url, error = %e, "Failed to create readiness client");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prober_accessors() {
        let prober = ReadinessProber::new(DEFAULT_READINESS_URL, 3, 250).unwrap();
        assert_eq!(prober.url(), "http://localhost:8000/docs");
        assert_eq!(prober.max_attempts(), 3);
        assert_eq!(prober.interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_zero_attempts_returns_false_immediately() {
        let started = std::time::Instant::now();
        assert!(!wait_until_ready("http://127.0.0.1:9/docs", 0, 1_000).await);
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}

//! Relays a job's published result to a caller-supplied callback URL.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::utils::url_validation::{CallbackTarget, UrlValidationError, resolve_callback_target};

/// Maximum number of response body characters logged for a callback.
const MAX_LOGGED_BODY: usize = 1024;

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Callback URL rejected: {0}")]
    Rejected(#[from] UrlValidationError),

    #[error("Callback delivery to {url} failed: {error}")]
    Delivery { url: String, error: String },

    #[error("Failed to create callback client: {0}")]
    Client(String),
}

/// Posts JSON payloads to callback URLs and waits for the answer.
pub struct CallbackRelay {
    timeout: Duration,
    allow_private: bool,
}

impl CallbackRelay {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            allow_private: false,
        }
    }

    /// Permit callbacks to loopback and private-network hosts
    pub fn allow_private(mut self, allow: bool) -> Self {
        self.allow_private = allow;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `payload` to `url`, returning the response status.
    ///
    /// A non-success status is logged but still returned as `Ok`; only URL
    /// rejection and transport failures are errors.
    pub async fn relay(&self, url: &str, payload: &Value) -> Result<u16, CallbackError> {
        let target = resolve_callback_target(url, self.allow_private).await?;
        self.deliver(&target, payload).await
    }

    /// POST to a validated target, connecting only to the addresses it was
    /// validated against.
    pub(crate) async fn deliver(
        &self,
        target: &CallbackTarget,
        payload: &Value,
    ) -> Result<u16, CallbackError> {
        let url = &target.url;
        debug!(url = %url, pinned = target.resolved.len(), "Relaying result to callback");

        let mut builder = Client::builder().timeout(self.timeout);
        if let (Some(host), false) = (url.host_str(), target.resolved.is_empty()) {
            builder = builder.resolve_to_addrs(host, &target.resolved);
        }
        let client = builder
            .build()
            .map_err(|e| CallbackError::Client(e.to_string()))?;

        let response = client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| CallbackError::Delivery {
                url: url.to_string(),
                error: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(MAX_LOGGED_BODY).collect();

        if status.is_success() {
            info!(url = %url, status = %status, body = %body, "Response from submit endpoint");
        } else {
            warn!(url = %url, status = %status, body = %body, "Submit endpoint returned non-success status");
        }

        Ok(status.as_u16())
    }
}

//! Outbound HTTP client for peer requests (spec §4.3 "Federation client
//! contract"): one client, 3-second default timeout, bounded exponential
//! backoff for idempotent GETs, settable User-Agent, TLS on by default.

use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FederationError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
/// ~10 minutes of exponential backoff across 23 attempts (spec §4.3).
const MAX_RETRY_ATTEMPTS: u32 = 23;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub struct FederationClient {
    http: reqwest::Client,
}

impl FederationClient {
    pub fn new() -> Self {
        Self::with_user_agent("concrnt-node")
    }

    pub fn with_user_agent(user_agent: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("failed to build federation HTTP client");
        FederationClient { http }
    }

    /// Idempotent GET with bounded exponential backoff on server errors
    /// and transport failures. Non-5xx responses are not retried.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FederationError> {
        let mut attempt = 0;
        loop {
            match self.http.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json::<T>().await.map_err(FederationError::from);
                }
                Ok(resp) if resp.status().is_server_error() && attempt < MAX_RETRY_ATTEMPTS => {
                    warn!(url, status = %resp.status(), attempt, "retrying after server error");
                }
                Ok(resp) => {
                    return Err(FederationError::Upstream(format!(
                        "{} returned {}",
                        url,
                        resp.status()
                    )));
                }
                Err(e) if attempt < MAX_RETRY_ATTEMPTS && !e.is_timeout() => {
                    debug!(url, attempt, error = %e, "retrying after transport error");
                }
                Err(e) => return Err(FederationError::from(e)),
            }
            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
        }
    }

    pub async fn get_text(&self, url: &str) -> Result<String, FederationError> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(FederationError::Upstream(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }
        Ok(resp.text().await?)
    }
}

impl Default for FederationClient {
    fn default() -> Self {
        Self::new()
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(8);
    Duration::from_millis(250 * 2u64.pow(exponent)).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_then_caps() {
        let first = backoff_delay(0);
        let later = backoff_delay(5);
        let capped = backoff_delay(22);
        assert!(later > first);
        assert!(capped <= MAX_BACKOFF);
    }
}

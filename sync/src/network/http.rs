//! Connectivity readings from HTTP probes against the remote API.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};

use super::{ConnectivitySource, ProbeError};
use crate::config::SyncConfig;

/// Polls `GET {api_url}{probe_path}`. Any HTTP response counts as connected;
/// a transport failure counts as disconnected.
#[derive(Debug, Clone)]
pub struct HttpConnectivity {
    client: reqwest::Client,
    url: String,
    interval: Duration,
}

impl HttpConnectivity {
    /// Create a probe for the given endpoint.
    pub fn new(
        api_url: &str,
        probe_path: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        if interval.is_zero() {
            return Err(ProbeError::Config("probe interval must be positive".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self {
            client,
            url: probe_url(api_url, probe_path),
            interval,
        })
    }

    /// Create a probe from runtime configuration.
    pub fn from_config(config: &SyncConfig) -> Result<Self, ProbeError> {
        Self::new(
            &config.api_url,
            &config.probe_path,
            config.probe_interval,
            config.request_timeout,
        )
    }

    /// URL being probed.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn probe_url(api_url: &str, probe_path: &str) -> String {
    format!(
        "{}/{}",
        api_url.trim_end_matches('/'),
        probe_path.trim_start_matches('/')
    )
}

async fn probe(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) => {
            tracing::trace!(url = %url, status = %response.status(), "probe answered");
            true
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "probe failed");
            false
        }
    }
}

impl ConnectivitySource for HttpConnectivity {
    fn is_connected(&self) -> BoxFuture<'static, Result<bool, ProbeError>> {
        let client = self.client.clone();
        let url = self.url.clone();
        Box::pin(async move { Ok(probe(&client, &url).await) })
    }

    fn changes(&self) -> BoxStream<'static, bool> {
        let state = (self.client.clone(), self.url.clone(), self.interval);
        stream::unfold(state, |(client, url, interval)| async move {
            tokio::time::sleep(interval).await;
            let online = probe(&client, &url).await;
            Some((online, (client, url, interval)))
        })
        .boxed()
    }
}

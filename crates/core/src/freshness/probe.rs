use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::fetcher::{build_client, FetchError};

/// Lightweight remote lookup of the current catalog's freshness token.
#[async_trait]
pub trait FreshnessProbe: Send + Sync {
    /// Fetch the remote token.
    ///
    /// Returns `Ok(None)` when the endpoint answered without a token and
    /// `FetchError::NotFound` when it has no list at all.
    async fn remote_id(&self) -> Result<Option<String>, FetchError>;
}

/// Default bound for a whole probe request.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Probe reading `<router_base>/filmliste.id`.
pub struct HttpFreshnessProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpFreshnessProbe {
    pub fn new(remote: &RemoteConfig) -> Result<Self, FetchError> {
        let probe = Self::with_client(build_client(remote)?, remote.id_url());
        Ok(probe.with_timeout(remote.timeout()))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Bound the whole request, body included. The token is tiny, so a slow
    /// answer means the endpoint is unusable.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FreshnessProbe for HttpFreshnessProbe {
    async fn remote_id(&self) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), &self.url));
        }

        let body = response.text().await.map_err(FetchError::from_reqwest)?;
        let id = body.trim();
        debug!("Remote catalog id from {}: {:?}", self.url, id);

        Ok((!id.is_empty()).then(|| id.to_string()))
    }
}

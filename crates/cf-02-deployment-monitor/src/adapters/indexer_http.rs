//! HTTP indexer poller.

use crate::config::IndexerConfig;
use crate::error::{IndexerError, IndexerResult};
use crate::ports::IndexerPoller;
use async_trait::async_trait;
use shared_types::{Address, NetworkId};
use std::time::Duration;
use tracing::debug;

/// Polls `GET {base}/v1/chains/{network}/safes/{address}` until it answers 2xx.
pub struct HttpIndexerPoller {
    http: reqwest::Client,
    base_url: String,
    config: IndexerConfig,
}

impl HttpIndexerPoller {
    pub fn new(base_url: impl Into<String>, config: IndexerConfig) -> IndexerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IndexerError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
        })
    }

    fn account_url(&self, network_id: &NetworkId, address: &Address) -> String {
        format!(
            "{}/v1/chains/{}/safes/{}",
            self.base_url, network_id, address
        )
    }
}

#[async_trait]
impl IndexerPoller for HttpIndexerPoller {
    async fn poll_until_indexed(
        &self,
        network_id: &NetworkId,
        address: &Address,
    ) -> IndexerResult<()> {
        let url = self.account_url(network_id, address);

        for attempt in 1..=self.config.max_attempts {
            match self.http.get(&url).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    debug!(%url, attempt, status = %response.status(), "[cf-02] Not indexed yet")
                }
                Err(err) => debug!(%url, attempt, error = %err, "[cf-02] Indexer request failed"),
            }
            if attempt < self.config.max_attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        Err(IndexerError::NotIndexed {
            attempts: self.config.max_attempts,
        })
    }
}

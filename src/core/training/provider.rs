use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::ProviderUpdate;
use crate::core::config::ProviderConfig;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Seam between the reconcilers and the ML provider's job-status endpoint,
/// so tests can substitute a fake.
#[async_trait]
pub trait TrainingProvider: Send + Sync {
    async fn fetch_training(&self, job_id: &str) -> Result<ProviderUpdate, ProviderError>;
}

/// HTTP client for the provider's trainings API. Training jobs legitimately
/// run for tens of minutes, so the status fetch carries its own timeout.
pub struct HttpProvider {
    client: Client,
    base_url: String,
    api_token: String,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }
}

#[async_trait]
impl TrainingProvider for HttpProvider {
    async fn fetch_training(&self, job_id: &str) -> Result<ProviderUpdate, ProviderError> {
        let url = format!("{}/trainings/{}", self.base_url, job_id);
        let res = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(ProviderError::Api {
                status: res.status().as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }
        Ok(res.json::<ProviderUpdate>().await?)
    }
}

/// Fixed-response fake for tests.
#[cfg(test)]
pub struct StaticProvider {
    pub update: Option<ProviderUpdate>,
}

#[cfg(test)]
#[async_trait]
impl TrainingProvider for StaticProvider {
    async fn fetch_training(&self, job_id: &str) -> Result<ProviderUpdate, ProviderError> {
        match &self.update {
            Some(update) => {
                let mut update = update.clone();
                if update.id.is_empty() {
                    update.id = job_id.to_string();
                }
                Ok(update)
            }
            None => Err(ProviderError::Api {
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }
}

use crate::config::PageSpeedConfig;
use crate::error::NetworkError;
use crate::models::{ScoreReport, TargetUrl};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;

#[async_trait]
pub trait ScoreSource: Send + Sync {
    async fn fetch_score(&self, url: &TargetUrl) -> Result<ScoreReport, NetworkError>;
}

/// PageSpeed Insights client. One GET per call, no retry.
pub struct PageSpeedClient {
    client: Client,
    config: PageSpeedConfig,
}

impl PageSpeedClient {
    pub fn new(config: PageSpeedConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: PageSpeedConfig) -> Self {
        PageSpeedClient { client, config }
    }

    fn query<'a>(&'a self, url: &'a TargetUrl) -> Vec<(&'static str, &'a str)> {
        let mut query = vec![("url", url.as_str()), ("strategy", self.config.strategy.as_str())];
        if let Some(key) = self.config.api_key.as_deref() {
            query.push(("key", key));
        }
        query
    }
}

#[async_trait]
impl ScoreSource for PageSpeedClient {
    async fn fetch_score(&self, url: &TargetUrl) -> Result<ScoreReport, NetworkError> {
        info!("Requesting pagespeed score for {}", url);
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&self.query(url))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("pagespeed responded {} with {} bytes", status, body.len());

        if !status.is_success() {
            return Err(NetworkError::Status { status, body });
        }

        parse_score_report(body)
    }
}

pub fn parse_score_report(body: String) -> Result<ScoreReport, NetworkError> {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => Ok(ScoreReport(map)),
        Ok(_) => Err(NetworkError::Decode {
            reason: "top-level value is not an object".to_string(),
            body,
        }),
        Err(e) => Err(NetworkError::Decode {
            reason: e.to_string(),
            body,
        }),
    }
}

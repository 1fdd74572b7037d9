// Gateway HTTP client - tag registry plus live and historical data feeds
use crate::application::data_feed::{
    HistoricalDataFeed, HistoricalReading, HistoryResponse, LiveDataFeed, LiveReading, TagRegistry,
};
use crate::domain::tag::{Plc, Tag, TagId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct GatewayClient {
    host: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct HistoricalDataResponse {
    #[serde(default)]
    data: Vec<HistoricalReading>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    command_id: Option<String>,
}

impl GatewayClient {
    pub fn new(host: String) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gateway request {url} failed with status {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse gateway response from {url}"))
    }
}

#[async_trait]
impl TagRegistry for GatewayClient {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.get_json("/tags").await
    }

    async fn list_plcs(&self) -> Result<Vec<Plc>> {
        self.get_json("/plcs").await
    }
}

#[async_trait]
impl LiveDataFeed for GatewayClient {
    async fn read_current(&self, tag_ids: &[TagId]) -> Result<Vec<LiveReading>> {
        let joined = tag_ids
            .iter()
            .map(TagId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/gateway/data?tagIds={}", urlencoding::encode(&joined));
        self.get_json(&path).await
    }
}

#[async_trait]
impl HistoricalDataFeed for GatewayClient {
    async fn fetch_range(
        &self,
        tag_ids: &[TagId],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HistoryResponse> {
        let url = self.url("/gateway/historical-data");
        let body = json!({
            "tagIds": tag_ids,
            "start_date": start.to_rfc3339(),
            "end_date": end.to_rfc3339(),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send historical-data request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Historical-data request failed with status {status}: {text}");
        }

        let parsed = response
            .json::<HistoricalDataResponse>()
            .await
            .context("Failed to parse historical-data response")?;

        // An explicit pending status means the gateway is still collecting;
        // it is not an empty result.
        if parsed.status.as_deref() == Some("pending") {
            return Ok(HistoryResponse::Pending {
                command_id: parsed.command_id,
            });
        }
        Ok(HistoryResponse::Ready(parsed.data))
    }
}

// Dashboard persistence HTTP client
use crate::application::data_feed::DashboardStore;
use crate::domain::layout::DashboardState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct DashboardClient {
    host: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SavedDashboard {
    id: String,
}

impl DashboardClient {
    pub fn new(host: String) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }
}

#[async_trait]
impl DashboardStore for DashboardClient {
    /// POST creates on first save; once the backend has assigned an id,
    /// later saves PUT to the same resource.
    async fn save(&self, state: &DashboardState) -> Result<String> {
        match &state.id {
            Some(id) => {
                let url = self.url(&format!("/dashboards/{id}"));
                let response = self
                    .client
                    .put(&url)
                    .json(state)
                    .send()
                    .await
                    .context("Failed to send dashboard update")?;
                if !response.status().is_success() {
                    anyhow::bail!("Dashboard update failed with status {}", response.status());
                }
                Ok(id.clone())
            }
            None => {
                let url = self.url("/dashboards");
                let response = self
                    .client
                    .post(&url)
                    .json(state)
                    .send()
                    .await
                    .context("Failed to send dashboard create")?;
                if !response.status().is_success() {
                    anyhow::bail!("Dashboard create failed with status {}", response.status());
                }
                let saved = response
                    .json::<SavedDashboard>()
                    .await
                    .context("Failed to parse dashboard create response")?;
                Ok(saved.id)
            }
        }
    }

    async fn load(&self, id: &str) -> Result<Option<DashboardState>> {
        let url = self.url(&format!("/dashboards/{id}"));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send dashboard fetch")?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            anyhow::bail!("Dashboard fetch failed with status {}", response.status());
        }
        Ok(Some(
            response
                .json::<DashboardState>()
                .await
                .context("Failed to parse dashboard")?,
        ))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/dashboards/{id}"));
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .context("Failed to send dashboard delete")?;
        if !response.status().is_success() {
            anyhow::bail!("Dashboard delete failed with status {}", response.status());
        }
        Ok(())
    }
}

// Repository traits for the external collaborators: tag registry, live and
// historical data feeds, and dashboard persistence.
use crate::domain::layout::DashboardState;
use crate::domain::sample::{Quality, Sample, SampleValue};
use crate::domain::tag::{Plc, Tag, TagId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One reading as emitted by the gateway or the simulator. Fields are
/// optional on the wire; `into_sample` substitutes safe defaults so a
/// malformed reading never reaches the UI as an error.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveReading {
    #[serde(rename = "tagId", alias = "tag_id")]
    pub tag_id: TagId,
    #[serde(default)]
    pub value: Option<SampleValue>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LiveReading {
    pub fn into_sample(self, fallback_now: DateTime<Utc>) -> (TagId, Sample) {
        let value = self.value.unwrap_or(SampleValue::Number(0.0));
        let quality = self
            .quality
            .as_deref()
            .map(Quality::parse_lenient)
            .unwrap_or(Quality::Uncertain);
        let timestamp = self.timestamp.unwrap_or(fallback_now);
        (self.tag_id, Sample::new(value, quality, timestamp))
    }
}

/// One historical reading. Some backends report the ingest time as
/// `received_at` instead of `timestamp`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalReading {
    #[serde(rename = "tag_id", alias = "tagId")]
    pub tag_id: TagId,
    #[serde(default)]
    pub value: Option<SampleValue>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default, alias = "received_at")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HistoricalReading {
    pub fn into_sample(self, fallback_now: DateTime<Utc>) -> (TagId, Sample) {
        let value = self.value.unwrap_or(SampleValue::Number(0.0));
        let quality = self
            .quality
            .as_deref()
            .map(Quality::parse_lenient)
            .unwrap_or(Quality::Uncertain);
        let timestamp = self.timestamp.unwrap_or(fallback_now);
        (self.tag_id, Sample::new(value, quality, timestamp))
    }
}

/// A historical fetch either carries data or is still being assembled by
/// the gateway. `Pending` must not be read as an empty series.
#[derive(Debug, Clone)]
pub enum HistoryResponse {
    Ready(Vec<HistoricalReading>),
    Pending { command_id: Option<String> },
}

#[async_trait]
pub trait TagRegistry: Send + Sync {
    /// All configured tags, for the selection UI.
    async fn list_tags(&self) -> anyhow::Result<Vec<Tag>>;

    /// All configured PLCs.
    async fn list_plcs(&self) -> anyhow::Result<Vec<Plc>>;
}

#[async_trait]
pub trait LiveDataFeed: Send + Sync {
    /// Current reading for each requested tag.
    async fn read_current(&self, tag_ids: &[TagId]) -> anyhow::Result<Vec<LiveReading>>;
}

#[async_trait]
pub trait HistoricalDataFeed: Send + Sync {
    /// Readings for the requested tags over [start, end].
    async fn fetch_range(
        &self,
        tag_ids: &[TagId],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<HistoryResponse>;
}

#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// Persist the dashboard; returns the backend-assigned id.
    async fn save(&self, state: &DashboardState) -> anyhow::Result<String>;

    /// Load a dashboard by id, `None` when the backend has no such id.
    async fn load(&self, id: &str) -> anyhow::Result<Option<DashboardState>>;

    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

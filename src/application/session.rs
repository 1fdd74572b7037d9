// Dashboard session - live polling and historical refresh over the store
use crate::application::dashboard_service::DashboardService;
use crate::application::data_feed::{HistoricalDataFeed, HistoryResponse, LiveDataFeed};
use crate::application::sample_store::SampleStore;
use crate::domain::sample::TagSeries;
use crate::domain::tag::TagId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// How many times a `pending` historical response is re-polled before the
/// attempt is abandoned (store left untouched).
const PENDING_RETRY_ATTEMPTS: usize = 5;
const PENDING_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Drives one active dashboard view: a periodic live tick feeding the
/// sample store, and on-demand historical refreshes. Teardown cancels the
/// tick so nothing mutates the store after the view unmounts.
pub struct DashboardSession {
    samples: Arc<SampleStore>,
    dashboards: Arc<DashboardService>,
    live: Arc<dyn LiveDataFeed>,
    historical: Arc<dyn HistoricalDataFeed>,
    poll_interval: Duration,
    history_window: chrono::Duration,
    /// Issue sequence for historical fetches; responses apply strictly in
    /// issuance order, so a stale response never overwrites a newer one.
    issued: AtomicU64,
    applied: Mutex<u64>,
    shutdown: watch::Sender<bool>,
    tick_task: StdMutex<Option<JoinHandle<()>>>,
}

impl DashboardSession {
    pub fn new(
        samples: Arc<SampleStore>,
        dashboards: Arc<DashboardService>,
        live: Arc<dyn LiveDataFeed>,
        historical: Arc<dyn HistoricalDataFeed>,
        poll_interval: Duration,
        history_window: chrono::Duration,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            samples,
            dashboards,
            live,
            historical,
            poll_interval,
            history_window,
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
            shutdown,
            tick_task: StdMutex::new(None),
        })
    }

    /// Start the periodic live tick.
    pub fn start(self: &Arc<Self>) {
        let session = self.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(session.poll_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => session.poll_once().await,
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
        if let Ok(mut guard) = self.tick_task.lock() {
            if let Some(previous) = guard.replace(task) {
                previous.abort();
            }
        }
    }

    /// One live poll over the union of all bound tags.
    async fn poll_once(&self) {
        let tag_ids = self.dashboards.bound_tag_ids().await;
        if tag_ids.is_empty() {
            return;
        }
        match self.live.read_current(&tag_ids).await {
            Ok(readings) => {
                let now = Utc::now();
                for reading in readings {
                    let (tag_id, sample) = reading.into_sample(now);
                    self.samples.upsert_live(tag_id, sample).await;
                }
            }
            Err(e) => tracing::warn!("live poll failed: {e:#}"),
        }
    }

    /// Refresh history over the session's configured window ending now.
    pub async fn refresh_recent(&self) -> anyhow::Result<()> {
        let end = Utc::now();
        self.refresh_history(end - self.history_window, end).await
    }

    /// Fetch and apply historical series for every bound tag. A response
    /// is discarded when a fetch issued later has already applied
    /// (last-write-wins by issuance order, not response arrival).
    pub async fn refresh_history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let tag_ids = self.dashboards.bound_tag_ids().await;
        if tag_ids.is_empty() {
            return Ok(());
        }

        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(readings) = self.fetch_ready(&tag_ids, start, end).await? else {
            tracing::info!("historical fetch {seq} still pending, store untouched");
            return Ok(());
        };

        // Held across the apply so a competing response cannot interleave
        // mid-update.
        let mut applied = self.applied.lock().await;
        if seq <= *applied {
            tracing::debug!("discarding stale historical response {seq} (applied {})", *applied);
            return Ok(());
        }
        *applied = seq;

        let now = Utc::now();
        let mut by_tag: HashMap<TagId, TagSeries> = HashMap::new();
        for reading in readings {
            let (tag_id, sample) = reading.into_sample(now);
            by_tag.entry(tag_id).or_default().push(sample);
        }
        // Tags that returned no readings get an explicit empty series so
        // the view falls back to the live window instead of stale data.
        for tag_id in &tag_ids {
            by_tag.entry(tag_id.clone()).or_default();
        }
        for (tag_id, series) in by_tag {
            self.samples.replace_history(tag_id, series).await;
        }
        tracing::debug!("applied historical response {seq}");
        Ok(())
    }

    async fn fetch_ready(
        &self,
        tag_ids: &[TagId],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Option<Vec<crate::application::data_feed::HistoricalReading>>> {
        for attempt in 0..PENDING_RETRY_ATTEMPTS {
            match self.historical.fetch_range(tag_ids, start, end).await? {
                HistoryResponse::Ready(readings) => return Ok(Some(readings)),
                HistoryResponse::Pending { command_id } => {
                    tracing::debug!(
                        "historical data pending (attempt {}, command {:?})",
                        attempt + 1,
                        command_id
                    );
                    tokio::time::sleep(PENDING_RETRY_DELAY).await;
                }
            }
        }
        Ok(None)
    }

    /// Cancel the live tick and the dashboard service's pending debounce.
    pub fn teardown(&self) {
        let _ = self.shutdown.send(true);
        if let Ok(mut guard) = self.tick_task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
        self.dashboards.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::data_feed::{
        DashboardStore, HistoricalReading, LiveReading,
    };
    use crate::domain::layout::DashboardState;
    use crate::domain::sample::SampleValue;
    use crate::domain::widget::{WidgetDraft, WidgetType};
    use async_trait::async_trait;

    struct NullStore;

    #[async_trait]
    impl DashboardStore for NullStore {
        async fn save(&self, _state: &DashboardState) -> anyhow::Result<String> {
            Ok("dash-1".to_string())
        }

        async fn load(&self, _id: &str) -> anyhow::Result<Option<DashboardState>> {
            Ok(None)
        }

        async fn delete(&self, _id: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct ConstantLive {
        value: f64,
    }

    #[async_trait]
    impl LiveDataFeed for ConstantLive {
        async fn read_current(&self, tag_ids: &[TagId]) -> anyhow::Result<Vec<LiveReading>> {
            Ok(tag_ids
                .iter()
                .map(|tag_id| LiveReading {
                    tag_id: tag_id.clone(),
                    value: Some(SampleValue::Number(self.value)),
                    quality: Some("good".to_string()),
                    timestamp: Some(Utc::now()),
                })
                .collect())
        }
    }

    /// Historical feed whose successive calls take decreasing wall time:
    /// the first call resolves last.
    struct SlowThenFast {
        calls: AtomicU64,
    }

    impl SlowThenFast {
        fn reading(tag_id: &TagId, value: f64) -> HistoricalReading {
            HistoricalReading {
                tag_id: tag_id.clone(),
                value: Some(SampleValue::Number(value)),
                quality: Some("good".to_string()),
                timestamp: Some(Utc::now()),
            }
        }
    }

    #[async_trait]
    impl HistoricalDataFeed for SlowThenFast {
        async fn fetch_range(
            &self,
            tag_ids: &[TagId],
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> anyhow::Result<HistoryResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(HistoryResponse::Ready(
                    tag_ids.iter().map(|t| Self::reading(t, 111.0)).collect(),
                ))
            } else {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(HistoryResponse::Ready(
                    tag_ids.iter().map(|t| Self::reading(t, 222.0)).collect(),
                ))
            }
        }
    }

    /// Pending for `pending_calls` responses, then ready.
    struct EventuallyReady {
        pending_calls: u64,
        calls: AtomicU64,
    }

    #[async_trait]
    impl HistoricalDataFeed for EventuallyReady {
        async fn fetch_range(
            &self,
            tag_ids: &[TagId],
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> anyhow::Result<HistoryResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.pending_calls {
                Ok(HistoryResponse::Pending {
                    command_id: Some(format!("cmd-{call}")),
                })
            } else {
                Ok(HistoryResponse::Ready(
                    tag_ids
                        .iter()
                        .map(|t| SlowThenFast::reading(t, 7.0))
                        .collect(),
                ))
            }
        }
    }

    async fn session_with(
        historical: Arc<dyn HistoricalDataFeed>,
        live_value: f64,
    ) -> (Arc<DashboardSession>, Arc<SampleStore>) {
        let samples = Arc::new(SampleStore::new());
        let dashboards = DashboardService::new(Arc::new(NullStore), DashboardState::default());
        dashboards
            .create_widget(WidgetDraft {
                widget_type: WidgetType::Trend,
                title: "t".to_string(),
                tag_ids: vec![TagId::new("7")],
                colors: Vec::new(),
                formula: None,
                unit: None,
                x_axis_type: None,
                x_axis_tag_id: None,
                y_axis_tag_ids: None,
                time_aggregation: None,
                show_time_range: None,
            })
            .await
            .unwrap();
        let session = DashboardSession::new(
            samples.clone(),
            dashboards,
            Arc::new(ConstantLive { value: live_value }),
            historical,
            Duration::from_secs(1),
            chrono::Duration::hours(24),
        );
        (session, samples)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_historical_response_is_discarded() {
        let (session, samples) =
            session_with(Arc::new(SlowThenFast { calls: AtomicU64::new(0) }), 0.0).await;

        // A is issued first but resolves after B; B's data must win.
        let a = session.refresh_recent();
        let b = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.refresh_recent().await
        };
        let (ra, rb) = tokio::join!(a, b);
        ra.unwrap();
        rb.unwrap();

        let series = samples.series(&TagId::new("7")).await;
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].number(), Some(222.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_response_retries_until_ready() {
        let (session, samples) = session_with(
            Arc::new(EventuallyReady {
                pending_calls: 2,
                calls: AtomicU64::new(0),
            }),
            0.0,
        )
        .await;

        session.refresh_recent().await.unwrap();
        let series = samples.series(&TagId::new("7")).await;
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].number(), Some(7.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_pending_leaves_store_untouched() {
        let (session, samples) = session_with(
            Arc::new(EventuallyReady {
                pending_calls: u64::MAX,
                calls: AtomicU64::new(0),
            }),
            0.0,
        )
        .await;

        session.refresh_recent().await.unwrap();
        assert!(samples.series(&TagId::new("7")).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_tick_feeds_store_and_teardown_stops_it() {
        let (session, samples) = session_with(
            Arc::new(EventuallyReady {
                pending_calls: u64::MAX,
                calls: AtomicU64::new(0),
            }),
            55.0,
        )
        .await;

        session.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let current = samples.current(&TagId::new("7")).await.unwrap();
        assert_eq!(current.number(), Some(55.0));

        session.teardown();
        let before = samples.series(&TagId::new("7")).await.len();
        tokio::time::sleep(Duration::from_secs(5)).await;
        let after = samples.series(&TagId::new("7")).await.len();
        assert_eq!(before, after);
    }
}

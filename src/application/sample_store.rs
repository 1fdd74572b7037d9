// In-memory sample store - latest value plus per-tag history
use crate::domain::sample::{Sample, TagSeries};
use crate::domain::tag::TagId;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// Live readings kept per tag when no true historical series exists.
const LIVE_WINDOW_CAPACITY: usize = 60;

#[derive(Default)]
struct StoreState {
    current: HashMap<TagId, Sample>,
    history: HashMap<TagId, TagSeries>,
    live_window: HashMap<TagId, VecDeque<Sample>>,
}

/// Keyed store fusing live and historical readings. All keys are canonical
/// `TagId`s, so numeric- and string-origin ids hit the same entries. State
/// sits behind one lock so multi-field updates are atomic to readers.
#[derive(Default)]
pub struct SampleStore {
    inner: RwLock<StoreState>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a tag's current sample and append it to the bounded live
    /// window (oldest reading evicted at capacity).
    pub async fn upsert_live(&self, tag_id: TagId, sample: Sample) {
        let mut state = self.inner.write().await;
        let window = state
            .live_window
            .entry(tag_id.clone())
            .or_insert_with(|| VecDeque::with_capacity(LIVE_WINDOW_CAPACITY));
        if window.len() >= LIVE_WINDOW_CAPACITY {
            window.pop_front();
        }
        window.push_back(sample.clone());
        state.current.insert(tag_id, sample);
    }

    /// Wholesale-replace a tag's historical series. Ascending timestamp
    /// order is a post-condition regardless of input order.
    pub async fn replace_history(&self, tag_id: TagId, mut series: TagSeries) {
        series.sort_by_key(|sample| sample.timestamp);
        self.inner.write().await.history.insert(tag_id, series);
    }

    pub async fn current(&self, tag_id: &TagId) -> Option<Sample> {
        self.inner.read().await.current.get(tag_id).cloned()
    }

    pub async fn current_number(&self, tag_id: &TagId) -> Option<f64> {
        self.inner
            .read()
            .await
            .current
            .get(tag_id)
            .and_then(Sample::number)
    }

    /// A tag's series: the historical series when one exists, otherwise a
    /// snapshot of the live window, otherwise empty.
    pub async fn series(&self, tag_id: &TagId) -> TagSeries {
        let state = self.inner.read().await;
        if let Some(history) = state.history.get(tag_id) {
            if !history.is_empty() {
                return history.clone();
            }
        }
        state
            .live_window
            .get(tag_id)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_numeric_and_string_ids_hit_the_same_entry() {
        let store = SampleStore::new();
        let now = Utc::now();
        store
            .upsert_live(TagId::from(42_i64), Sample::numeric(7.5, now))
            .await;

        let read_back = store.current(&TagId::new("42")).await;
        assert_eq!(read_back.and_then(|s| s.number()), Some(7.5));

        store
            .upsert_live(TagId::new("42"), Sample::numeric(8.0, now))
            .await;
        assert_eq!(store.current_number(&TagId::from(42_i64)).await, Some(8.0));
    }

    #[tokio::test]
    async fn test_live_window_is_bounded() {
        let store = SampleStore::new();
        let tag = TagId::new("1");
        let start = Utc::now();
        for i in 0..(LIVE_WINDOW_CAPACITY + 10) {
            let ts = start + Duration::seconds(i as i64);
            store
                .upsert_live(tag.clone(), Sample::numeric(i as f64, ts))
                .await;
        }

        let series = store.series(&tag).await;
        assert_eq!(series.len(), LIVE_WINDOW_CAPACITY);
        // Oldest entries evicted first.
        assert_eq!(series[0].number(), Some(10.0));
        assert_eq!(store.current_number(&tag).await, Some(69.0));
    }

    #[tokio::test]
    async fn test_history_takes_precedence_over_live_window() {
        let store = SampleStore::new();
        let tag = TagId::new("1");
        let now = Utc::now();
        store
            .upsert_live(tag.clone(), Sample::numeric(1.0, now))
            .await;
        store
            .replace_history(
                tag.clone(),
                vec![
                    Sample::numeric(5.0, now - Duration::hours(2)),
                    Sample::numeric(6.0, now - Duration::hours(1)),
                ],
            )
            .await;

        let series = store.series(&tag).await;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].number(), Some(5.0));
        // The current sample is still the live one.
        assert_eq!(store.current_number(&tag).await, Some(1.0));
    }

    #[tokio::test]
    async fn test_replace_history_sorts_ascending() {
        let store = SampleStore::new();
        let tag = TagId::new("1");
        let now = Utc::now();
        store
            .replace_history(
                tag.clone(),
                vec![
                    Sample::numeric(3.0, now),
                    Sample::numeric(1.0, now - Duration::hours(2)),
                    Sample::numeric(2.0, now - Duration::hours(1)),
                ],
            )
            .await;

        let series = store.series(&tag).await;
        let values: Vec<_> = series.iter().filter_map(Sample::number).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn test_missing_tag_reads_empty() {
        let store = SampleStore::new();
        assert!(store.current(&TagId::new("nope")).await.is_none());
        assert!(store.series(&TagId::new("nope")).await.is_empty());
    }
}

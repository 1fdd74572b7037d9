// Demo-mode simulator - waveform readings with measurement noise
use crate::application::data_feed::{
    HistoricalDataFeed, HistoricalReading, HistoryResponse, LiveDataFeed, LiveReading, TagRegistry,
};
use crate::domain::tag::{Plc, Tag, TagId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;

/// Spacing of synthesized historical points.
const HISTORY_STEP_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy)]
struct Waveform {
    base: f64,
    amplitude: f64,
    period_secs: f64,
    noise: f64,
}

impl Waveform {
    fn value_at(&self, timestamp: DateTime<Utc>) -> f64 {
        let t = timestamp.timestamp() as f64;
        self.base + self.amplitude * (t * std::f64::consts::TAU / self.period_secs).sin()
    }

    fn noisy_value_at(&self, timestamp: DateTime<Utc>) -> f64 {
        self.value_at(timestamp) + rand::thread_rng().gen_range(-self.noise..=self.noise)
    }
}

/// Serves a fixed plant catalog and synthesized readings so the dashboard
/// runs without a gateway.
pub struct SimulatorFeed {
    tags: Vec<Tag>,
    plcs: Vec<Plc>,
    waveforms: HashMap<TagId, Waveform>,
}

impl SimulatorFeed {
    pub fn new() -> Self {
        let plcs = vec![
            Plc {
                id: TagId::new("1"),
                name: "Press Line A".to_string(),
                brand: "Siemens".to_string(),
            },
            Plc {
                id: TagId::new("2"),
                name: "Packaging Line".to_string(),
                brand: "Allen-Bradley".to_string(),
            },
        ];

        let catalog: [(&str, &str, &str, &str, Waveform); 6] = [
            ("1", "Tank Level", "1", "%", Waveform { base: 62.0, amplitude: 18.0, period_secs: 3600.0, noise: 1.5 }),
            ("2", "Coolant Flow", "1", "L/min", Waveform { base: 140.0, amplitude: 35.0, period_secs: 1800.0, noise: 4.0 }),
            ("3", "Line Pressure", "1", "bar", Waveform { base: 96.0, amplitude: 22.0, period_secs: 900.0, noise: 2.0 }),
            ("4", "Oven Temperature", "2", "°C", Waveform { base: 78.0, amplitude: 9.0, period_secs: 7200.0, noise: 0.8 }),
            ("5", "Motor Speed", "2", "rpm", Waveform { base: 1450.0, amplitude: 320.0, period_secs: 2700.0, noise: 25.0 }),
            ("6", "Conveyor Speed", "2", "rpm", Waveform { base: 820.0, amplitude: 110.0, period_secs: 2100.0, noise: 12.0 }),
        ];

        let mut tags = Vec::with_capacity(catalog.len());
        let mut waveforms = HashMap::with_capacity(catalog.len());
        for (id, name, plc_id, unit, waveform) in catalog {
            tags.push(Tag {
                id: TagId::new(id),
                name: name.to_string(),
                plc_id: TagId::new(plc_id),
                unit: Some(unit.to_string()),
                data_type: Some("analog".to_string()),
            });
            waveforms.insert(TagId::new(id), waveform);
        }

        Self {
            tags,
            plcs,
            waveforms,
        }
    }

    fn reading_at(&self, tag_id: &TagId, timestamp: DateTime<Utc>) -> Option<f64> {
        self.waveforms
            .get(tag_id)
            .map(|waveform| waveform.noisy_value_at(timestamp))
    }
}

impl Default for SimulatorFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagRegistry for SimulatorFeed {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.clone())
    }

    async fn list_plcs(&self) -> Result<Vec<Plc>> {
        Ok(self.plcs.clone())
    }
}

#[async_trait]
impl LiveDataFeed for SimulatorFeed {
    async fn read_current(&self, tag_ids: &[TagId]) -> Result<Vec<LiveReading>> {
        let now = Utc::now();
        Ok(tag_ids
            .iter()
            .filter_map(|tag_id| {
                self.reading_at(tag_id, now).map(|value| LiveReading {
                    tag_id: tag_id.clone(),
                    value: Some(value.into()),
                    // A sliver of uncertain readings keeps quality handling
                    // exercised in demo mode.
                    quality: Some(
                        if rand::thread_rng().gen_bool(0.02) {
                            "uncertain"
                        } else {
                            "good"
                        }
                        .to_string(),
                    ),
                    timestamp: Some(now),
                })
            })
            .collect())
    }
}

#[async_trait]
impl HistoricalDataFeed for SimulatorFeed {
    async fn fetch_range(
        &self,
        tag_ids: &[TagId],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HistoryResponse> {
        let mut readings = Vec::new();
        for tag_id in tag_ids {
            let Some(waveform) = self.waveforms.get(tag_id) else {
                continue;
            };
            let mut cursor = start;
            while cursor <= end {
                readings.push(HistoricalReading {
                    tag_id: tag_id.clone(),
                    value: Some(waveform.noisy_value_at(cursor).into()),
                    quality: Some("good".to_string()),
                    timestamp: Some(cursor),
                });
                cursor += Duration::minutes(HISTORY_STEP_MINUTES);
            }
        }
        Ok(HistoryResponse::Ready(readings))
    }
}

// Chart data builder - shapes store contents into what each widget renders
use crate::application::sample_store::SampleStore;
use crate::domain::aggregation::{aggregate, bucket_label, AggregationBucket};
use crate::domain::formula;
use crate::domain::tag::TagId;
use crate::domain::widget::{Widget, WidgetType, XAxisType};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Recent-bucket windows per time-axis widget type.
pub const TREND_WINDOW: usize = 30;
pub const BAR_WINDOW: usize = 20;
pub const HORIZONTAL_BAR_WINDOW: usize = 15;

/// Gauge full-scale lookup by display-name fragment. First match wins;
/// unmatched names read on a 0-100 scale.
const GAUGE_RANGES: [(&str, f64); 5] = [
    ("level", 100.0),
    ("flow", 200.0),
    ("pressure", 150.0),
    ("temperature", 100.0),
    ("speed", 3000.0),
];

pub fn gauge_max(display_name: &str) -> f64 {
    let lowered = display_name.to_lowercase();
    GAUGE_RANGES
        .iter()
        .find(|(fragment, _)| lowered.contains(fragment))
        .map(|(_, max)| *max)
        .unwrap_or(100.0)
}

/// Chart-ready payload per widget, a closed union keyed on the wire by
/// `kind` for the rendering layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum WidgetData {
    Kpi(KpiData),
    Gauge(GaugeData),
    Series(SeriesChartData),
    Category(CategoryChartData),
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiData {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GaugeEntry {
    pub label: String,
    pub value: f64,
    pub max: f64,
    pub percent: f64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GaugeData {
    pub entries: Vec<GaugeEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesData {
    pub name: String,
    pub color: String,
    pub values: Vec<f64>,
}

/// Label axis plus one dataset per Y-tag (trend/bar/horizontal bar).
#[derive(Debug, Clone, Serialize)]
pub struct SeriesChartData {
    pub labels: Vec<String>,
    pub series: Vec<SeriesData>,
}

/// One point per tag from current values (donut/radar, and tag/index axes).
#[derive(Debug, Clone, Serialize)]
pub struct CategoryChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
}

/// Builds the render payload for one widget from the sample store and the
/// time aggregator. Formula and data-shape failures degrade to zeros here
/// and never cross this boundary as errors.
#[derive(Clone)]
pub struct ChartDataBuilder {
    samples: Arc<SampleStore>,
}

impl ChartDataBuilder {
    pub fn new(samples: Arc<SampleStore>) -> Self {
        Self { samples }
    }

    pub async fn build(
        &self,
        widget: &Widget,
        display_names: &HashMap<TagId, String>,
    ) -> WidgetData {
        match widget.widget_type {
            WidgetType::Kpi => WidgetData::Kpi(self.build_kpi(widget, display_names).await),
            WidgetType::Gauge => WidgetData::Gauge(self.build_gauge(widget, display_names).await),
            WidgetType::Trend => self.build_axis_chart(widget, display_names, TREND_WINDOW).await,
            WidgetType::Bar => self.build_axis_chart(widget, display_names, BAR_WINDOW).await,
            WidgetType::HorizontalBar => {
                self.build_axis_chart(widget, display_names, HORIZONTAL_BAR_WINDOW)
                    .await
            }
            WidgetType::Donut => {
                WidgetData::Category(self.build_category(widget, display_names, true).await)
            }
            WidgetType::Radar => {
                WidgetData::Category(self.build_category(widget, display_names, false).await)
            }
        }
    }

    async fn current_values(&self, tag_ids: &[TagId]) -> HashMap<TagId, f64> {
        let mut values = HashMap::new();
        for tag_id in tag_ids {
            if let Some(value) = self.samples.current_number(tag_id).await {
                values.insert(tag_id.clone(), value);
            }
        }
        values
    }

    fn label_for<'a>(tag_id: &'a TagId, display_names: &'a HashMap<TagId, String>) -> &'a str {
        display_names
            .get(tag_id)
            .map(String::as_str)
            .unwrap_or(tag_id.as_str())
    }

    async fn build_kpi(&self, widget: &Widget, display_names: &HashMap<TagId, String>) -> KpiData {
        let value = match widget.formula.as_deref().filter(|f| !f.trim().is_empty()) {
            Some(expr) => {
                let values = self.current_values(&widget.tag_ids).await;
                formula::evaluate(expr, &widget.tag_ids, &values, display_names)
            }
            None => match widget.tag_ids.first() {
                Some(tag_id) => self.samples.current_number(tag_id).await.unwrap_or(0.0),
                None => 0.0,
            },
        };
        KpiData {
            value,
            unit: widget.unit.clone(),
        }
    }

    async fn build_gauge(
        &self,
        widget: &Widget,
        display_names: &HashMap<TagId, String>,
    ) -> GaugeData {
        let mut entries = Vec::with_capacity(widget.tag_ids.len());
        for (index, tag_id) in widget.tag_ids.iter().enumerate() {
            let label = Self::label_for(tag_id, display_names).to_string();
            let value = self.samples.current_number(tag_id).await.unwrap_or(0.0);
            let max = gauge_max(&label);
            entries.push(GaugeEntry {
                percent: (value / max * 100.0).clamp(0.0, 100.0),
                color: widget.color_at(index),
                label,
                value,
                max,
            });
        }
        GaugeData { entries }
    }

    async fn build_axis_chart(
        &self,
        widget: &Widget,
        display_names: &HashMap<TagId, String>,
        window: usize,
    ) -> WidgetData {
        match widget.x_axis_type.unwrap_or(XAxisType::Time) {
            XAxisType::Time => {
                WidgetData::Series(self.build_time_series(widget, display_names, window).await)
            }
            XAxisType::Tag => {
                WidgetData::Category(self.build_category(widget, display_names, false).await)
            }
            XAxisType::Index => {
                let mut data = self.build_category(widget, display_names, false).await;
                data.labels = (1..=data.values.len()).map(|i| i.to_string()).collect();
                WidgetData::Category(data)
            }
        }
    }

    /// Labels come from the first Y-tag's buckets; every Y-tag becomes one
    /// dataset from its own aggregation, both cut to the most recent
    /// `window` buckets.
    async fn build_time_series(
        &self,
        widget: &Widget,
        display_names: &HashMap<TagId, String>,
        window: usize,
    ) -> SeriesChartData {
        let granularity = widget.time_aggregation();
        let mut labels = Vec::new();
        let mut series = Vec::new();
        for (index, tag_id) in widget.y_axis_tags().iter().enumerate() {
            let samples = self.samples.series(tag_id).await;
            let buckets = aggregate(&samples, granularity);
            let recent = recent_window(&buckets, window);
            if index == 0 {
                labels = recent
                    .iter()
                    .map(|bucket| bucket_label(bucket.timestamp, granularity))
                    .collect();
            }
            series.push(SeriesData {
                name: Self::label_for(tag_id, display_names).to_string(),
                color: widget.color_at(index),
                values: recent
                    .iter()
                    .map(|bucket| bucket.average.unwrap_or(0.0))
                    .collect(),
            });
        }
        SeriesChartData { labels, series }
    }

    async fn build_category(
        &self,
        widget: &Widget,
        display_names: &HashMap<TagId, String>,
        absolute: bool,
    ) -> CategoryChartData {
        let tag_ids = widget.y_axis_tags();
        let mut labels = Vec::with_capacity(tag_ids.len());
        let mut values = Vec::with_capacity(tag_ids.len());
        let mut colors = Vec::with_capacity(tag_ids.len());
        for (index, tag_id) in tag_ids.iter().enumerate() {
            let value = self.samples.current_number(tag_id).await.unwrap_or(0.0);
            labels.push(Self::label_for(tag_id, display_names).to_string());
            values.push(if absolute { value.abs() } else { value });
            colors.push(widget.color_at(index));
        }
        CategoryChartData {
            labels,
            values,
            colors,
        }
    }
}

fn recent_window(buckets: &[AggregationBucket], window: usize) -> &[AggregationBucket] {
    let start = buckets.len().saturating_sub(window);
    &buckets[start..]
}

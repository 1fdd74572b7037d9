// Widget domain model - declarative description of one dashboard tile
use crate::domain::aggregation::Granularity;
use crate::domain::tag::TagId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of widget kinds. Per-kind behavior (default sizing, chart
/// shaping) dispatches through lookup tables rather than branching spread
/// across call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetType {
    Kpi,
    Gauge,
    Trend,
    Bar,
    HorizontalBar,
    Donut,
    Radar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XAxisType {
    Time,
    Tag,
    Index,
}

/// Fixed ordered palette for default series colors. Assignment cycles by
/// tag index modulo the palette length, so identical tag orders always
/// receive identical colors.
pub const PALETTE: [&str; 20] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
    "#7f7f7f", "#bcbd22", "#17becf", "#aec7e8", "#ffbb78", "#98df8a", "#ff9896",
    "#c5b0d5", "#c49c94", "#f7b6d2", "#dbdb8d", "#9edae5", "#393b79",
];

pub fn default_colors(count: usize) -> Vec<String> {
    (0..count)
        .map(|index| PALETTE[index % PALETTE.len()].to_string())
        .collect()
}

/// Default grid footprint per widget type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSize {
    pub w: u32,
    pub h: u32,
    pub min_w: u32,
    pub min_h: u32,
}

const fn size(w: u32, h: u32, min_w: u32, min_h: u32) -> DefaultSize {
    DefaultSize { w, h, min_w, min_h }
}

/// Per-type default-size table. Gauges widen when they carry several tags.
pub fn default_size(widget_type: WidgetType, tag_count: usize) -> DefaultSize {
    match widget_type {
        WidgetType::Kpi => size(3, 2, 2, 2),
        WidgetType::Gauge if tag_count > 1 => size(4, 3, 3, 2),
        WidgetType::Gauge => size(2, 2, 2, 2),
        WidgetType::Trend => size(4, 2, 3, 2),
        WidgetType::Bar => size(4, 2, 3, 2),
        WidgetType::HorizontalBar => size(4, 2, 3, 2),
        WidgetType::Donut => size(3, 3, 2, 2),
        WidgetType::Radar => size(3, 3, 3, 3),
    }
}

/// One dashboard tile: type, bound tags, axis/aggregation options, formula,
/// colors, unit. Created by the builder dialog, mutated only by that dialog
/// or by deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: String,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    pub title: String,
    pub tag_ids: Vec<TagId>,
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_type: Option<XAxisType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis_tag_id: Option<TagId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis_tag_ids: Option<Vec<TagId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_aggregation: Option<Granularity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_time_range: Option<bool>,
}

impl Widget {
    /// Y-axis tags default to the widget's bound tags when not set.
    pub fn y_axis_tags(&self) -> &[TagId] {
        self.y_axis_tag_ids.as_deref().unwrap_or(&self.tag_ids)
    }

    /// Series/point color by index, cycling the stored list.
    pub fn color_at(&self, index: usize) -> String {
        if self.colors.is_empty() {
            PALETTE[index % PALETTE.len()].to_string()
        } else {
            self.colors[index % self.colors.len()].clone()
        }
    }

    pub fn time_aggregation(&self) -> Granularity {
        self.time_aggregation.unwrap_or_default()
    }
}

/// Builder-dialog input for a new widget; validated before a `Widget` and
/// its layout item are created.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDraft {
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub x_axis_type: Option<XAxisType>,
    #[serde(default)]
    pub x_axis_tag_id: Option<TagId>,
    #[serde(default)]
    pub y_axis_tag_ids: Option<Vec<TagId>>,
    #[serde(default)]
    pub time_aggregation: Option<Granularity>,
    #[serde(default)]
    pub show_time_range: Option<bool>,
}

impl WidgetDraft {
    pub fn into_widget(self) -> Widget {
        let colors = if self.colors.is_empty() {
            default_colors(self.tag_ids.len())
        } else {
            self.colors
        };
        Widget {
            id: Uuid::new_v4().to_string(),
            widget_type: self.widget_type,
            title: self.title,
            tag_ids: self.tag_ids,
            colors,
            formula: self.formula,
            unit: self.unit,
            x_axis_type: self.x_axis_type,
            x_axis_tag_id: self.x_axis_tag_id,
            y_axis_tag_ids: self.y_axis_tag_ids,
            time_aggregation: self.time_aggregation,
            show_time_range: self.show_time_range,
        }
    }
}

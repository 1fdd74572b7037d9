// Grid layout domain model
use crate::domain::widget::Widget;
use serde::{Deserialize, Serialize};

/// Grid position and size of one widget, one-to-one by widget id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub widget_id: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
}

impl LayoutItem {
    pub fn overlaps(&self, other: &LayoutItem) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// New widgets stack below everything already on the grid.
pub fn next_free_y(items: &[LayoutItem]) -> u32 {
    items.iter().map(|item| item.y + item.h).max().unwrap_or(0)
}

/// Breakpoint-keyed layout sets as the persistence backend stores them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layouts {
    #[serde(default)]
    pub lg: Vec<LayoutItem>,
}

/// The unit of persistence: the widget list plus its layout, identified by
/// an opaque id the backend assigns on first save.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(default)]
    pub layouts: Layouts,
}

impl DashboardState {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// Widget domain model
use super::layout::GridLayout;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client-generated widget identity, stable for the life of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier, e.g. `w-3f2a...`.
    pub fn generate() -> Self {
        Self(format!("w-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WidgetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    Table,
    BarChart,
    LineChart,
    PieChart,
    StatCard,
}

impl WidgetType {
    /// Size given to a freshly added widget, as (w, h).
    pub fn default_size(&self) -> (u32, u32) {
        match self {
            WidgetType::Table => (6, 4),
            WidgetType::BarChart | WidgetType::LineChart => (6, 4),
            WidgetType::PieChart => (4, 4),
            WidgetType::StatCard => (3, 2),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WidgetType::Table => "Table",
            WidgetType::BarChart => "Bar Chart",
            WidgetType::LineChart => "Line Chart",
            WidgetType::PieChart => "Pie Chart",
            WidgetType::StatCard => "Stat Card",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    #[serde(rename = "type")]
    pub kind: WidgetType,
    pub title: String,
    pub layout: GridLayout,
    #[serde(default)]
    pub data_source: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl Widget {
    pub fn new(id: WidgetId, kind: WidgetType, layout: GridLayout) -> Self {
        Self {
            id,
            kind,
            title: kind.label().to_string(),
            layout,
            data_source: String::new(),
            config: serde_json::Map::new(),
        }
    }

    pub fn has_data_source(&self) -> bool {
        !self.data_source.is_empty()
    }
}

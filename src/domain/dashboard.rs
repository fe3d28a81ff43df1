// Dashboard definition domain model
use super::layout::DEFAULT_GRID_COLS;
use super::widget::{Widget, WidgetId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub workflow_name: String,
    pub node_id: String,
    pub alias: String,
}

impl DataSource {
    pub fn new(
        workflow_name: impl Into<String>,
        node_id: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            node_id: node_id.into(),
            alias: alias.into(),
        }
    }
}

fn default_grid_cols() -> u32 {
    DEFAULT_GRID_COLS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardDefinition {
    pub name: String,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(default = "default_grid_cols")]
    pub grid_cols: u32,
}

impl DashboardDefinition {
    /// Empty definition used when the server has nothing stored yet.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_sources: Vec::new(),
            widgets: Vec::new(),
            grid_cols: DEFAULT_GRID_COLS,
        }
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| &w.id == id)
    }

    pub fn widget_mut(&mut self, id: &WidgetId) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| &w.id == id)
    }

    pub fn data_source(&self, alias: &str) -> Option<&DataSource> {
        self.data_sources.iter().find(|s| s.alias == alias)
    }

    /// First row below every widget; new widgets are stacked there.
    pub fn next_free_row(&self) -> u32 {
        self.widgets.iter().map(|w| w.layout.bottom()).max().unwrap_or(0)
    }
}

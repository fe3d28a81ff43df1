// Errors raised by dashboard mutations
use super::layout::GridLayout;
use super::widget::WidgetId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("unknown widget: {0}")]
    UnknownWidget(WidgetId),

    #[error("data source alias already in use: {0}")]
    DuplicateAlias(String),

    #[error("unknown data source: {0}")]
    UnknownDataSource(String),

    #[error("layout {layout:?} does not fit a {grid_cols}-column grid")]
    InvalidLayout { layout: GridLayout, grid_cols: u32 },

    #[error("a drag gesture on {0} is already active")]
    GestureActive(WidgetId),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

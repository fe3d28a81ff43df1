// Dashboard state store - Definition, per-widget data cache and selection
use crate::application::geometry::normalize;
use crate::domain::dashboard::{DashboardDefinition, DataSource};
use crate::domain::error::{DashboardError, DashboardResult};
use crate::domain::event::Dataset;
use crate::domain::layout::GridLayout;
use crate::domain::widget::{Widget, WidgetId, WidgetType};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Disconnected,
    Closed,
}

/// Cached data for one widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetData {
    pub dataset: Option<Dataset>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// What a widget renderer should show.
#[derive(Debug, Clone, PartialEq)]
pub enum DataStatus {
    NoData,
    Ready(Dataset),
    Stale { dataset: Dataset, error: String },
    Failed(String),
}

/// Single source of truth for the editor session. Reads return owned values;
/// every change goes through one of the named mutations below.
#[derive(Debug)]
pub struct DashboardStore {
    definition: DashboardDefinition,
    cache: HashMap<WidgetId, WidgetData>,
    selection: Option<WidgetId>,
    connection: ConnectionState,
    channel_error: Option<String>,
    available_tables: Vec<String>,
    dirty: bool,
}

impl DashboardStore {
    pub fn new(definition: DashboardDefinition) -> Self {
        let mut store = Self {
            definition: DashboardDefinition::empty(""),
            cache: HashMap::new(),
            selection: None,
            connection: ConnectionState::default(),
            channel_error: None,
            available_tables: Vec::new(),
            dirty: false,
        };
        store.load(definition);
        store
    }

    /// Replace the definition wholesale. Cached data and selection belong to
    /// the old definition and are dropped.
    pub fn load(&mut self, mut definition: DashboardDefinition) {
        definition.grid_cols = definition.grid_cols.max(1);
        let cols = definition.grid_cols;
        for widget in &mut definition.widgets {
            let fixed = normalize(widget.layout, cols);
            if fixed != widget.layout {
                tracing::warn!(
                    "Widget {} layout {:?} outside {}-column grid, normalized to {:?}",
                    widget.id,
                    widget.layout,
                    cols,
                    fixed
                );
                widget.layout = fixed;
            }
        }
        self.definition = definition;
        self.cache.clear();
        self.selection = None;
        self.dirty = false;
    }

    // ---- reads ----

    pub fn definition(&self) -> DashboardDefinition {
        self.definition.clone()
    }

    pub fn name(&self) -> String {
        self.definition.name.clone()
    }

    pub fn grid_cols(&self) -> u32 {
        self.definition.grid_cols
    }

    pub fn widgets(&self) -> Vec<Widget> {
        self.definition.widgets.clone()
    }

    pub fn widget(&self, id: &WidgetId) -> Option<Widget> {
        self.definition.widget(id).cloned()
    }

    pub fn contains_widget(&self, id: &WidgetId) -> bool {
        self.definition.widget(id).is_some()
    }

    pub fn data_sources(&self) -> Vec<DataSource> {
        self.definition.data_sources.clone()
    }

    /// Data source a widget points at, `None` when unset or dangling.
    pub fn widget_source(&self, id: &WidgetId) -> Option<DataSource> {
        let widget = self.definition.widget(id)?;
        self.definition.data_source(&widget.data_source).cloned()
    }

    pub fn widget_data(&self, id: &WidgetId) -> Option<WidgetData> {
        self.cache.get(id).cloned()
    }

    pub fn data_status(&self, id: &WidgetId) -> DataStatus {
        let Some(widget) = self.definition.widget(id) else {
            return DataStatus::NoData;
        };
        if widget.has_data_source() && self.definition.data_source(&widget.data_source).is_none() {
            return DataStatus::NoData;
        }

        match self.cache.get(id) {
            Some(WidgetData {
                dataset: Some(dataset),
                error: Some(error),
                ..
            }) => DataStatus::Stale {
                dataset: dataset.clone(),
                error: error.clone(),
            },
            Some(WidgetData {
                dataset: Some(dataset),
                ..
            }) => DataStatus::Ready(dataset.clone()),
            Some(WidgetData {
                error: Some(error), ..
            }) => DataStatus::Failed(error.clone()),
            _ => DataStatus::NoData,
        }
    }

    pub fn selected_widget(&self) -> Option<WidgetId> {
        self.selection.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn channel_error(&self) -> Option<String> {
        self.channel_error.clone()
    }

    pub fn available_tables(&self) -> Vec<String> {
        self.available_tables.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ---- definition mutations ----

    /// Add a widget of `kind` below the existing ones and return its new id.
    pub fn add_widget(&mut self, kind: WidgetType) -> WidgetId {
        let mut id = WidgetId::generate();
        while self.contains_widget(&id) {
            id = WidgetId::generate();
        }

        let cols = self.definition.grid_cols;
        let (w, h) = kind.default_size();
        let layout = normalize(GridLayout::new(0, self.definition.next_free_row(), w, h), cols);
        self.definition
            .widgets
            .push(Widget::new(id.clone(), kind, layout));
        self.dirty = true;
        tracing::debug!("Added {:?} widget {} at {:?}", kind, id, layout);
        id
    }

    /// Remove a widget together with its cached data and selection.
    pub fn remove_widget(&mut self, id: &WidgetId) -> DashboardResult<Widget> {
        let idx = self
            .definition
            .widgets
            .iter()
            .position(|w| &w.id == id)
            .ok_or_else(|| DashboardError::UnknownWidget(id.clone()))?;
        let widget = self.definition.widgets.remove(idx);
        self.cache.remove(id);
        if self.selection.as_ref() == Some(id) {
            self.selection = None;
        }
        self.dirty = true;
        Ok(widget)
    }

    /// Store a committed layout. Previews never come through here.
    pub fn update_widget_layout(&mut self, id: &WidgetId, layout: GridLayout) -> DashboardResult<()> {
        let grid_cols = self.definition.grid_cols;
        if !layout.fits(grid_cols) {
            return Err(DashboardError::InvalidLayout { layout, grid_cols });
        }
        let widget = self.widget_entry(id)?;
        if widget.layout != layout {
            widget.layout = layout;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn update_widget_config(&mut self, id: &WidgetId, config: Map<String, Value>) -> DashboardResult<()> {
        self.widget_entry(id)?.config = config;
        self.dirty = true;
        Ok(())
    }

    pub fn set_widget_title(&mut self, id: &WidgetId, title: impl Into<String>) -> DashboardResult<()> {
        self.widget_entry(id)?.title = title.into();
        self.dirty = true;
        Ok(())
    }

    /// Point a widget at a data source alias; an empty alias detaches it.
    pub fn set_widget_data_source(&mut self, id: &WidgetId, alias: &str) -> DashboardResult<()> {
        if !alias.is_empty() && self.definition.data_source(alias).is_none() {
            return Err(DashboardError::UnknownDataSource(alias.to_string()));
        }
        let widget = self.widget_entry(id)?;
        if widget.data_source != alias {
            widget.data_source = alias.to_string();
            self.cache.remove(id);
        }
        self.dirty = true;
        Ok(())
    }

    pub fn add_data_source(&mut self, source: DataSource) -> DashboardResult<()> {
        if self.definition.data_source(&source.alias).is_some() {
            return Err(DashboardError::DuplicateAlias(source.alias));
        }
        self.definition.data_sources.push(source);
        self.dirty = true;
        Ok(())
    }

    /// Remove a data source. Widgets still naming it keep the dangling alias
    /// and report `DataStatus::NoData`.
    pub fn remove_data_source(&mut self, alias: &str) -> DashboardResult<DataSource> {
        let idx = self
            .definition
            .data_sources
            .iter()
            .position(|s| s.alias == alias)
            .ok_or_else(|| DashboardError::UnknownDataSource(alias.to_string()))?;
        let source = self.definition.data_sources.remove(idx);
        let dangling = self
            .definition
            .widgets
            .iter()
            .filter(|w| w.data_source == alias)
            .count();
        if dangling > 0 {
            tracing::info!("Data source '{}' removed, {} widget(s) left without data", alias, dangling);
        }
        self.dirty = true;
        Ok(source)
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    // ---- selection ----

    pub fn select_widget(&mut self, id: &WidgetId) -> DashboardResult<()> {
        if !self.contains_widget(id) {
            return Err(DashboardError::UnknownWidget(id.clone()));
        }
        self.selection = Some(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // ---- data cache ----

    /// Replace the cached rows for a widget and clear its error. Returns
    /// false when the widget no longer exists.
    pub fn set_dashboard_data(&mut self, id: &WidgetId, dataset: Dataset) -> bool {
        if !self.contains_widget(id) {
            return false;
        }
        let entry = self.cache.entry(id.clone()).or_default();
        entry.dataset = Some(dataset);
        entry.error = None;
        entry.updated_at = Some(Utc::now());
        true
    }

    /// Record a server error for one widget, keeping any cached rows.
    pub fn set_widget_error(&mut self, id: &WidgetId, error: impl Into<String>) -> bool {
        if !self.contains_widget(id) {
            return false;
        }
        self.cache.entry(id.clone()).or_default().error = Some(error.into());
        true
    }

    /// Distribute a refresh result (alias -> dataset) to the widgets reading
    /// each alias. Returns how many widgets were updated.
    pub fn apply_refresh(&mut self, results: &HashMap<String, Dataset>) -> usize {
        let targets: Vec<(WidgetId, Dataset)> = self
            .definition
            .widgets
            .iter()
            .filter_map(|w| results.get(&w.data_source).map(|d| (w.id.clone(), d.clone())))
            .collect();
        let count = targets.len();
        for (id, dataset) in targets {
            self.set_dashboard_data(&id, dataset);
        }
        count
    }

    pub fn set_connection_state(&mut self, state: ConnectionState) {
        if state == ConnectionState::Open {
            self.channel_error = None;
        }
        self.connection = state;
    }

    pub fn set_channel_error(&mut self, error: impl Into<String>) {
        self.channel_error = Some(error.into());
    }

    pub fn set_available_tables(&mut self, tables: Vec<String>) {
        self.available_tables = tables;
    }

    fn widget_entry(&mut self, id: &WidgetId) -> DashboardResult<&mut Widget> {
        self.definition
            .widget_mut(id)
            .ok_or_else(|| DashboardError::UnknownWidget(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(n: u64) -> Dataset {
        Dataset::new(vec![json!({"x": n})], vec!["x".into()], n)
    }

    fn store_with_source() -> DashboardStore {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        store
            .add_data_source(DataSource::new("sales_pipeline", "agg_1", "sales"))
            .unwrap();
        store
    }

    #[test]
    fn test_add_widget_stacks_below() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let first = store.add_widget(WidgetType::Table);
        let second = store.add_widget(WidgetType::StatCard);
        assert_ne!(first, second);
        assert_eq!(store.widget(&first).unwrap().layout, GridLayout::new(0, 0, 6, 4));
        assert_eq!(store.widget(&second).unwrap().layout, GridLayout::new(0, 4, 3, 2));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_load_normalizes_layouts_and_resets() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::Table);
        store.set_dashboard_data(&id, dataset(1));

        let mut def = DashboardDefinition::empty("loaded");
        let mut widget = Widget::new("w1".into(), WidgetType::Table, GridLayout::new(10, 0, 4, 0));
        widget.data_source = "sales".into();
        def.widgets.push(widget);
        store.load(def);

        assert_eq!(store.widget(&"w1".into()).unwrap().layout, GridLayout::new(8, 0, 4, 1));
        assert!(store.widget_data(&id).is_none());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_remove_widget_purges_cache_and_selection() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::Table);
        store.set_dashboard_data(&id, dataset(3));
        store.select_widget(&id).unwrap();

        store.remove_widget(&id).unwrap();
        assert!(store.widget_data(&id).is_none());
        assert!(store.selected_widget().is_none());
        assert!(!store.set_dashboard_data(&id, dataset(4)));
        assert_eq!(store.remove_widget(&id), Err(DashboardError::UnknownWidget(id)));
    }

    #[test]
    fn test_update_layout_rejects_out_of_grid() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::Table);
        let bad = GridLayout::new(9, 0, 4, 3);
        assert_eq!(
            store.update_widget_layout(&id, bad),
            Err(DashboardError::InvalidLayout {
                layout: bad,
                grid_cols: 12
            })
        );
        store.update_widget_layout(&id, GridLayout::new(8, 1, 4, 3)).unwrap();
        assert_eq!(store.widget(&id).unwrap().layout, GridLayout::new(8, 1, 4, 3));
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut store = store_with_source();
        let err = store
            .add_data_source(DataSource::new("other", "n2", "sales"))
            .unwrap_err();
        assert_eq!(err, DashboardError::DuplicateAlias("sales".into()));
    }

    #[test]
    fn test_dangling_source_reports_no_data() {
        let mut store = store_with_source();
        let id = store.add_widget(WidgetType::BarChart);
        store.set_widget_data_source(&id, "sales").unwrap();
        store.set_dashboard_data(&id, dataset(2));
        assert!(matches!(store.data_status(&id), DataStatus::Ready(_)));

        store.remove_data_source("sales").unwrap();
        assert_eq!(store.widget(&id).unwrap().data_source, "sales");
        assert_eq!(store.data_status(&id), DataStatus::NoData);
    }

    #[test]
    fn test_error_keeps_cached_rows() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::Table);
        assert!(store.set_widget_error(&id, "boom"));
        assert_eq!(store.data_status(&id), DataStatus::Failed("boom".into()));

        store.set_dashboard_data(&id, dataset(5));
        store.set_widget_error(&id, "table dropped");
        assert_eq!(
            store.data_status(&id),
            DataStatus::Stale {
                dataset: dataset(5),
                error: "table dropped".into()
            }
        );

        store.set_dashboard_data(&id, dataset(6));
        assert_eq!(store.data_status(&id), DataStatus::Ready(dataset(6)));
    }

    #[test]
    fn test_apply_refresh_by_alias() {
        let mut store = store_with_source();
        let a = store.add_widget(WidgetType::Table);
        let b = store.add_widget(WidgetType::PieChart);
        store.set_widget_data_source(&a, "sales").unwrap();

        let mut results = HashMap::new();
        results.insert("sales".to_string(), dataset(9));
        assert_eq!(store.apply_refresh(&results), 1);
        assert_eq!(store.data_status(&a), DataStatus::Ready(dataset(9)));
        assert_eq!(store.data_status(&b), DataStatus::NoData);
    }

    #[test]
    fn test_unknown_data_source_rejected() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::Table);
        assert_eq!(
            store.set_widget_data_source(&id, "missing"),
            Err(DashboardError::UnknownDataSource("missing".into()))
        );
        store.set_widget_data_source(&id, "").unwrap();
    }

    #[test]
    fn test_config_and_title_setters() {
        let mut store = DashboardStore::new(DashboardDefinition::empty("ops"));
        let id = store.add_widget(WidgetType::LineChart);
        store.mark_saved();

        let mut config = Map::new();
        config.insert("x_column".into(), json!("day"));
        store.update_widget_config(&id, config.clone()).unwrap();
        store.set_widget_title(&id, "Daily volume").unwrap();

        let widget = store.widget(&id).unwrap();
        assert_eq!(widget.config, config);
        assert_eq!(widget.title, "Daily volume");
        assert!(store.is_dirty());
    }
}

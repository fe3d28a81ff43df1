// Dashboard session - Use cases tying the store, live client and repository together
use crate::application::dashboard_channel::{ChannelEvent, DashboardChannel};
use crate::application::dashboard_repository::DashboardRepository;
use crate::application::dashboard_store::DashboardStore;
use crate::application::live_data_client::{Dispatch, LiveDataClient};
use crate::domain::dashboard::DashboardDefinition;
use crate::domain::error::{DashboardError, DashboardResult};
use crate::domain::view::{ViewParams, DEFAULT_PAGE_SIZE};
use crate::domain::widget::{Widget, WidgetId, WidgetType};
use anyhow::Context;
use std::sync::Arc;

pub struct DashboardSession {
    project: String,
    repository: Arc<dyn DashboardRepository>,
    store: DashboardStore,
    client: LiveDataClient,
}

impl DashboardSession {
    /// Load `name` from the repository (or start empty when it does not exist
    /// yet) and attach the live client to `channel`.
    pub async fn open(
        project: &str,
        name: &str,
        repository: Arc<dyn DashboardRepository>,
        pipeline_key: &str,
        channel: Arc<dyn DashboardChannel>,
    ) -> anyhow::Result<Self> {
        let definition = repository
            .load(project, name)
            .await
            .with_context(|| format!("Failed to load dashboard {}/{}", project, name))?;

        let definition = match definition {
            Some(definition) => definition,
            None => {
                tracing::info!("Dashboard {}/{} not found, starting empty", project, name);
                DashboardDefinition::empty(name)
            }
        };

        Ok(Self {
            project: project.to_string(),
            repository,
            store: DashboardStore::new(definition),
            client: LiveDataClient::new(pipeline_key, channel),
        })
    }

    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DashboardStore {
        &mut self.store
    }

    pub fn client(&self) -> &LiveDataClient {
        &self.client
    }

    /// Persist the current definition. On failure the in-memory state is left
    /// untouched (and still dirty) so the user can retry.
    pub async fn save(&mut self) -> anyhow::Result<()> {
        let definition = self.store.definition();
        self.repository
            .save(&self.project, &definition)
            .await
            .with_context(|| format!("Failed to save dashboard {}", definition.name))?;
        self.store.mark_saved();
        tracing::info!("Saved dashboard {}/{}", self.project, definition.name);
        Ok(())
    }

    /// Ask the server to recompute all data sources and spread the results
    /// over the widgets reading them.
    pub async fn refresh(&mut self) -> anyhow::Result<usize> {
        let name = self.store.name();
        let results = self
            .repository
            .refresh(&self.project, &name)
            .await
            .with_context(|| format!("Failed to refresh dashboard {}", name))?;
        Ok(self.store.apply_refresh(&results))
    }

    pub fn add_widget(&mut self, kind: WidgetType) -> WidgetId {
        self.store.add_widget(kind)
    }

    /// Delete a widget, its cached data and its live subscription.
    pub fn remove_widget(&mut self, id: &WidgetId) -> DashboardResult<Widget> {
        let widget = self.store.remove_widget(id)?;
        self.client.unsubscribe(id);
        Ok(widget)
    }

    /// Default view for a widget: its configured table (falling back to the
    /// data source alias), first page, configured page size.
    pub fn default_view(&self, id: &WidgetId) -> Option<ViewParams> {
        let widget = self.store.widget(id)?;
        let source = self.store.widget_source(id)?;
        let table = widget
            .config
            .get("table")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or(source.alias);
        let page_size = widget
            .config
            .get("page_size")
            .and_then(|v| v.as_u64())
            .map_or(DEFAULT_PAGE_SIZE, |n| n as u32);
        Some(ViewParams::new(table).with_page_size(page_size))
    }

    /// Subscribe a widget to its default view. Returns false when the widget
    /// has no usable data source.
    pub fn subscribe_widget(&mut self, id: &WidgetId) -> anyhow::Result<bool> {
        let Some(view) = self.default_view(id) else {
            tracing::debug!("Widget {} has no data source, not subscribing", id);
            return Ok(false);
        };
        self.client.subscribe(id, view)?;
        Ok(true)
    }

    pub fn subscribe_all(&mut self) -> anyhow::Result<usize> {
        let mut count = 0;
        for widget in self.store.widgets() {
            if self.subscribe_widget(&widget.id)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Pagination, sort or filter change for a mounted widget.
    pub fn change_view(&mut self, id: &WidgetId, view: ViewParams) -> anyhow::Result<()> {
        if !self.store.contains_widget(id) {
            return Err(DashboardError::UnknownWidget(id.clone()).into());
        }
        self.client.subscribe(id, view)?;
        Ok(())
    }

    /// Manual refresh of one widget's current view.
    pub fn refetch_widget(&mut self, id: &WidgetId) -> anyhow::Result<()> {
        self.client.fetch(id)?;
        Ok(())
    }

    /// Single dispatch step for everything the transport reports.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) -> Option<Dispatch> {
        match event {
            ChannelEvent::Connected => {
                if let Err(e) = self.client.on_connected(&mut self.store) {
                    tracing::warn!("Failed to re-subscribe widgets: {}", e);
                }
                None
            }
            ChannelEvent::Frame(text) => Some(self.client.handle_frame(&text, &mut self.store)),
            ChannelEvent::Disconnected { reason } => {
                self.client.on_disconnected(&mut self.store, &reason);
                None
            }
            ChannelEvent::Closed => {
                self.client.close(&mut self.store);
                None
            }
        }
    }

    pub fn close(&mut self) {
        self.client.close(&mut self.store);
    }
}

// Repository trait for dashboard definitions
use crate::domain::dashboard::DashboardDefinition;
use crate::domain::event::Dataset;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Load a stored definition, `None` when the server has none yet
    async fn load(&self, project: &str, name: &str) -> anyhow::Result<Option<DashboardDefinition>>;

    /// Persist the full definition (idempotent)
    async fn save(&self, project: &str, definition: &DashboardDefinition) -> anyhow::Result<()>;

    /// Recompute every data source server-side, keyed by alias
    async fn refresh(&self, project: &str, name: &str) -> anyhow::Result<HashMap<String, Dataset>>;
}

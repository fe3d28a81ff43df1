// HTTP repository implementation for dashboard definitions
use crate::application::dashboard_repository::DashboardRepository;
use crate::domain::dashboard::DashboardDefinition;
use crate::domain::event::Dataset;
use crate::infrastructure::config::{encode_segments, prepare_path};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct HttpDashboardRepository {
    base_url: String,
    path_template: String,
    client: reqwest::Client,
}

impl HttpDashboardRepository {
    pub fn new(base_url: String, path_template: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            path_template,
            client: reqwest::Client::new(),
        }
    }

    fn dashboard_url(&self, project: &str, name: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("project".to_string(), encode_segments(project));
        vars.insert("name".to_string(), encode_segments(name));
        format!("{}{}", self.base_url, prepare_path(&self.path_template, &vars))
    }

    async fn ensure_success(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Dashboard {} failed with status {}: {}", action, status, body);
    }
}

#[async_trait]
impl DashboardRepository for HttpDashboardRepository {
    async fn load(&self, project: &str, name: &str) -> Result<Option<DashboardDefinition>> {
        let url = self.dashboard_url(project, name);
        tracing::debug!("Loading dashboard from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send dashboard load request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let definition = Self::ensure_success(response, "load")
            .await?
            .json::<DashboardDefinition>()
            .await
            .context("Failed to parse dashboard definition")?;
        Ok(Some(definition))
    }

    async fn save(&self, project: &str, definition: &DashboardDefinition) -> Result<()> {
        let url = self.dashboard_url(project, &definition.name);
        let response = self
            .client
            .put(&url)
            .json(definition)
            .send()
            .await
            .context("Failed to send dashboard save request")?;

        Self::ensure_success(response, "save").await?;
        Ok(())
    }

    async fn refresh(&self, project: &str, name: &str) -> Result<HashMap<String, Dataset>> {
        let url = format!("{}/refresh", self.dashboard_url(project, name));
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send dashboard refresh request")?;

        let results = Self::ensure_success(response, "refresh")
            .await?
            .json::<HashMap<String, Dataset>>()
            .await
            .context("Failed to parse refresh results")?;
        Ok(results)
    }
}

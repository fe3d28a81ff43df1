use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub base_url: String,
    pub ws_url: String,
    pub ws_path: String,
    pub dashboard_path: String,
    pub dependencies_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000".to_string(),
            ws_path: "/ws/dashboard/${pipeline_key}".to_string(),
            dashboard_path: "/api/dashboards/${project}/${name}".to_string(),
            dependencies_path: "/api/dependencies".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardSettings {
    pub project: String,
    pub name: String,
    pub pipeline_key: Option<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            project: "default".to_string(),
            name: "main".to_string(),
            pipeline_key: None,
        }
    }
}

impl DashboardSettings {
    /// Explicit key, or `<project>/<name>` when none is configured.
    pub fn pipeline_key(&self) -> String {
        self.pipeline_key
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.project, self.name))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GridSettings {
    pub gap_px: f64,
    pub row_height_px: f64,
    pub container_width_px: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            gap_px: 12.0,
            row_height_px: 60.0,
            container_width_px: 1200.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingSettings {
    pub debug: bool,
}

/// Load `config/dashboard.*` (optional) with `DASHBOARD__SECTION__KEY`
/// environment overrides on top.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${var}` placeholders in a path template
pub fn prepare_path(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

/// Percent-encode each `/`-separated segment, keeping the separators.
pub fn encode_segments(value: &str) -> String {
    value
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_path() {
        let mut vars = HashMap::new();
        vars.insert("project".to_string(), "acme".to_string());
        vars.insert("name".to_string(), "ops".to_string());

        let result = prepare_path("/api/dashboards/${project}/${name}", &vars);

        assert_eq!(result, "/api/dashboards/acme/ops");
    }

    #[test]
    fn test_encode_segments_keeps_slashes() {
        assert_eq!(encode_segments("my proj/pipe#1"), "my%20proj/pipe%231");
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.ws_path, "/ws/dashboard/${pipeline_key}");
        assert_eq!(config.dashboard.pipeline_key(), "default/main");
        assert_eq!(config.reconnect.max_delay_ms, 30_000);
        assert!(!config.logging.debug);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"dashboard": {"project": "acme", "pipeline_key": "acme/live"}}"#)
                .unwrap();
        assert_eq!(config.dashboard.name, "main");
        assert_eq!(config.dashboard.pipeline_key(), "acme/live");
    }
}

// Dependency installer client - Streams pip output line by line
use crate::infrastructure::log_stream::{LogLine, LogStreamDecoder};
use anyhow::{Context, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct PackageRequest<'a> {
    packages: &'a [String],
}

#[derive(Debug, Deserialize)]
struct PackageList {
    #[serde(default)]
    packages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DependenciesApi {
    endpoint: String,
    client: reqwest::Client,
}

impl DependenciesApi {
    pub fn new(base_url: &str, path: &str) -> Self {
        Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), path),
            client: reqwest::Client::new(),
        }
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("Failed to list installed packages")?
            .error_for_status()?;
        let list = response
            .json::<PackageList>()
            .await
            .context("Failed to parse package list")?;
        Ok(list.packages)
    }

    pub async fn install(&self, packages: &[String]) -> Result<BoxStream<'static, Result<LogLine>>> {
        self.stream_action("install", packages).await
    }

    pub async fn uninstall(&self, packages: &[String]) -> Result<BoxStream<'static, Result<LogLine>>> {
        self.stream_action("uninstall", packages).await
    }

    async fn stream_action(
        &self,
        action: &str,
        packages: &[String],
    ) -> Result<BoxStream<'static, Result<LogLine>>> {
        let url = format!("{}/{}", self.endpoint, action);
        let response = self
            .client
            .post(&url)
            .json(&PackageRequest { packages })
            .send()
            .await
            .with_context(|| format!("Failed to start package {}", action))?
            .error_for_status()?;

        let stream = async_stream::try_stream! {
            let mut body = response.bytes_stream();
            let mut decoder = LogStreamDecoder::new();
            while let Some(chunk) = body.next().await {
                let chunk = chunk.context("Log stream interrupted")?;
                for line in decoder.push(&chunk) {
                    yield line;
                }
            }
            for line in decoder.finish() {
                yield line;
            }
        };
        Ok(stream.boxed())
    }
}

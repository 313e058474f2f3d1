use crate::app::RunRecord;
use crate::azure::{ApiFlavor, AzureConfig, FetchError};
use crate::traits::RunService;
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Url;
use std::sync::Arc;

/// HTTP client for one Azure DevOps organization/project.
///
/// Every call is a single attempt bounded by the configured timeout. Failures
/// are logged and returned unchanged.
#[derive(Debug, Clone)]
pub struct AzureClient {
    http: reqwest::Client,
    config: Arc<AzureConfig>,
}

impl AzureClient {
    pub fn new(config: AzureConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let token = base64::engine::general_purpose::STANDARD.encode(format!(":{}", config.pat));
        let mut auth = HeaderValue::from_str(&format!("Basic {token}"))
            .map_err(|_| FetchError::Config("personal access token is not header-safe".into()))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("azw/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    /// `<base>/<org>/<project>/<segments...>?api-version=<v>`, with org and
    /// project percent-encoded as path segments.
    fn api_url(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.config.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| FetchError::Config("base URL cannot carry a path".into()))?;
            path.pop_if_empty();
            path.push(&self.config.organization);
            path.push(&self.config.project);
            path.extend(segments);
        }
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    pub fn runs_url(&self, definition_id: Option<u32>) -> Result<Url, FetchError> {
        if definition_id == Some(0) {
            return Err(FetchError::InvalidDefinition(0));
        }
        match (self.config.flavor, definition_id) {
            (ApiFlavor::Pipelines, Some(id)) => {
                self.api_url(&["_apis", "pipelines", &id.to_string(), "runs"])
            }
            (ApiFlavor::Pipelines, None) => Err(FetchError::Config(
                "the pipelines API needs a definition id; use --flavor builds to list all".into(),
            )),
            (ApiFlavor::Builds, scope) => {
                let mut url = self.api_url(&["_apis", "build", "builds"])?;
                if let Some(id) = scope {
                    url.query_pairs_mut()
                        .append_pair("definitions", &id.to_string());
                }
                Ok(url)
            }
        }
    }

    pub fn cancel_url(&self, run_id: u64) -> Result<Url, FetchError> {
        self.api_url(&["_apis", "build", "builds", &run_id.to_string()])
    }

    async fn fetch_runs_once(
        &self,
        definition_id: Option<u32>,
    ) -> Result<Vec<RunRecord>, FetchError> {
        let url = self.runs_url(definition_id)?;
        tracing::debug!(?definition_id, %url, "fetching runs");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), &body));
        }
        tracing::trace!(body = %body, "runs response");

        let mut runs = self.config.flavor.parse_runs(&body)?;
        if let Some(id) = definition_id {
            retain_definition(&mut runs, id);
        }
        tracing::debug!(?definition_id, count = runs.len(), "runs fetched");
        Ok(runs)
    }
}

/// Drop records that declare a different definition. Records without
/// definition metadata are kept: the request URL already scoped them.
pub fn retain_definition(runs: &mut Vec<RunRecord>, definition_id: u32) {
    let wanted = u64::from(definition_id);
    runs.retain(|r| r.definition.as_ref().map_or(true, |d| d.id == wanted));
}

#[async_trait]
impl RunService for AzureClient {
    async fn fetch_runs(&self, definition_id: Option<u32>) -> Result<Vec<RunRecord>, FetchError> {
        let result = self.fetch_runs_once(definition_id).await;
        if let Err(e) = &result {
            tracing::error!(?definition_id, error = %e, "fetching runs failed");
        }
        result
    }

    async fn cancel_run(&self, run_id: u64) -> Result<(), FetchError> {
        let url = self.cancel_url(run_id)?;
        tracing::debug!(run_id, %url, "requesting cancellation");

        let resp = self
            .http
            .patch(url)
            .json(&serde_json::json!({ "status": "cancelling" }))
            .send()
            .await
            .inspect_err(|e| tracing::error!(run_id, error = %e, "cancel request failed"))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        let err = FetchError::from_status(status.as_u16(), &body);
        tracing::error!(run_id, error = %err, "cancel rejected");
        Err(err)
    }
}

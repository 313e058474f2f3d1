//! Upstream response shapes and their mapping into [`RunRecord`].
//!
//! The Pipelines and Builds endpoints describe the same thing with different
//! field names. Each has its own raw shape here; [`ApiFlavor::parse_runs`] is
//! the only place that knows about either, and everything past it sees one
//! normalized record.

use crate::app::{DefinitionRef, RunRecord, SortKey, UNKNOWN_STATUS};
use crate::azure::FetchError;
use serde::Deserialize;

/// Which upstream endpoint the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ApiFlavor {
    /// `_apis/pipelines/{id}/runs`; runs are labelled by name.
    Pipelines,
    /// `_apis/build/builds`; runs are labelled by build number.
    Builds,
}

impl ApiFlavor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pipelines => "pipelines",
            Self::Builds => "builds",
        }
    }

    pub fn default_sort_key(self) -> SortKey {
        match self {
            Self::Pipelines => SortKey::Label,
            Self::Builds => SortKey::Id,
        }
    }

    pub fn label_heading(self) -> &'static str {
        match self {
            Self::Pipelines => "Pipeline Name",
            Self::Builds => "Build Number",
        }
    }

    /// Status literals counted in the summary strip.
    pub fn summary_statuses(self) -> [&'static str; 2] {
        match self {
            Self::Pipelines => ["running", "queued"],
            Self::Builds => ["inProgress", "completed"],
        }
    }

    /// Values offered by the status filter, in cycle order.
    pub fn status_options(self) -> &'static [&'static str] {
        match self {
            Self::Pipelines => &["running", "queued", "inProgress", "completed"],
            Self::Builds => &["inProgress", "completed", "notStarted", "cancelling"],
        }
    }

    pub fn parse_runs(self, body: &str) -> Result<Vec<RunRecord>, FetchError> {
        match self {
            Self::Pipelines => {
                let runs: Vec<PipelineRun> = unwrap_envelope(body)?;
                Ok(runs.into_iter().map(RunRecord::from).collect())
            }
            Self::Builds => {
                let builds: Vec<Build> = unwrap_envelope(body)?;
                Ok(builds.into_iter().map(RunRecord::from).collect())
            }
        }
    }
}

impl std::fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    value: Option<Vec<T>>,
}

fn unwrap_envelope<T: serde::de::DeserializeOwned>(body: &str) -> Result<Vec<T>, FetchError> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| FetchError::ResponseShape(e.to_string()))?;
    envelope
        .value
        .ok_or_else(|| FetchError::ResponseShape("missing `value` array".to_string()))
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    web: Option<Href>,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

#[derive(Debug, Deserialize)]
struct RawDefinition {
    id: u64,
    #[serde(default)]
    name: String,
}

impl From<RawDefinition> for DefinitionRef {
    fn from(d: RawDefinition) -> Self {
        DefinitionRef {
            id: d.id,
            name: d.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipelineRun {
    id: u64,
    name: String,
    /// The runs endpoint calls this `state`; older payloads use `status`.
    #[serde(default, alias = "state")]
    status: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default, alias = "createdDate")]
    queue_time: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default, rename = "_links")]
    links: Links,
    #[serde(default)]
    pipeline: Option<RawDefinition>,
}

impl From<PipelineRun> for RunRecord {
    fn from(run: PipelineRun) -> Self {
        RunRecord {
            id: run.id,
            label: run.name,
            status: run.status.unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
            result: run.result,
            queue_time: run.queue_time,
            start_time: run.start_time,
            detail_url: run.links.web.map(|w| w.href),
            definition: run.pipeline.map(DefinitionRef::from),
            repository: None,
            requested_for: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Build {
    id: u64,
    build_number: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    queue_time: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default, rename = "_links")]
    links: Links,
    #[serde(default)]
    definition: Option<RawDefinition>,
    #[serde(default)]
    repository: Option<RawRepository>,
    #[serde(default)]
    requested_for: Option<Identity>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Identity {
    display_name: String,
}

impl From<Build> for RunRecord {
    fn from(build: Build) -> Self {
        RunRecord {
            id: build.id,
            label: build.build_number,
            status: build.status.unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
            result: build.result,
            queue_time: build.queue_time,
            start_time: build.start_time,
            detail_url: build.links.web.map(|w| w.href),
            definition: build.definition.map(DefinitionRef::from),
            repository: build.repository.map(|r| r.name),
            requested_for: build.requested_for.map(|i| i.display_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PIPELINE_RUNS_JSON: &str = r#"{
        "count": 2,
        "value": [
            {
                "id": 812,
                "name": "20240115.3",
                "state": "inProgress",
                "createdDate": "2024-01-15T10:00:00.000Z",
                "url": "https://dev.azure.com/acme/web/_apis/pipelines/12/runs/812",
                "_links": {
                    "self": { "href": "https://dev.azure.com/acme/web/_apis/pipelines/12/runs/812" },
                    "web": { "href": "https://dev.azure.com/acme/web/_build/results?buildId=812" }
                },
                "pipeline": { "id": 12, "name": "web-ci", "folder": "\\" }
            },
            {
                "id": 811,
                "name": "20240115.2",
                "state": "completed",
                "result": "succeeded",
                "createdDate": "2024-01-15T09:00:00.000Z",
                "_links": {
                    "web": { "href": "https://dev.azure.com/acme/web/_build/results?buildId=811" }
                },
                "pipeline": { "id": 12, "name": "web-ci" }
            }
        ]
    }"#;

    const BUILDS_JSON: &str = r#"{
        "count": 1,
        "value": [
            {
                "id": 4021,
                "buildNumber": "2024.01.15-rc1",
                "status": "inProgress",
                "queueTime": "2024-01-15T10:00:00Z",
                "startTime": "2024-01-15T10:00:05Z",
                "_links": { "web": { "href": "https://dev.azure.com/acme/web/_build/results?buildId=4021" } },
                "definition": { "id": 7, "name": "release" },
                "repository": { "id": "r1", "name": "web", "type": "TfsGit" },
                "requestedFor": { "displayName": "Dana Smith", "uniqueName": "dana@acme.test" }
            }
        ]
    }"#;

    #[test]
    fn parse_pipeline_runs_in_order() {
        let runs = ApiFlavor::Pipelines.parse_runs(PIPELINE_RUNS_JSON).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, 812);
        assert_eq!(runs[0].label, "20240115.3");
        assert_eq!(runs[0].status, "inProgress");
        assert_eq!(
            runs[0].queue_time.as_deref(),
            Some("2024-01-15T10:00:00.000Z")
        );
        assert_eq!(
            runs[0].detail_url.as_deref(),
            Some("https://dev.azure.com/acme/web/_build/results?buildId=812")
        );
        assert_eq!(
            runs[0].definition,
            Some(DefinitionRef {
                id: 12,
                name: "web-ci".to_string()
            })
        );
        assert_eq!(runs[1].id, 811);
        assert_eq!(runs[1].result.as_deref(), Some("succeeded"));
    }

    #[test]
    fn parse_pipeline_run_with_status_field() {
        let json = r#"{"value":[{"id":1,"name":"alpha","status":"running","_links":{"web":{"href":"https://x.test/1"}}}]}"#;
        let runs = ApiFlavor::Pipelines.parse_runs(json).unwrap();
        assert_eq!(runs[0].status, "running");
        assert!(runs[0].definition.is_none());
    }

    #[test]
    fn missing_status_backfilled_as_unknown() {
        let json = r#"{"value":[{"id":1,"name":"alpha"}]}"#;
        let runs = ApiFlavor::Pipelines.parse_runs(json).unwrap();
        assert_eq!(runs[0].status, UNKNOWN_STATUS);
        assert!(runs[0].detail_url.is_none());

        let json = r#"{"value":[{"id":1,"buildNumber":"1.0"}]}"#;
        let runs = ApiFlavor::Builds.parse_runs(json).unwrap();
        assert_eq!(runs[0].status, UNKNOWN_STATUS);
    }

    #[test]
    fn parse_builds_with_enrichment() {
        let runs = ApiFlavor::Builds.parse_runs(BUILDS_JSON).unwrap();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.id, 4021);
        assert_eq!(run.label, "2024.01.15-rc1");
        assert_eq!(run.start_time.as_deref(), Some("2024-01-15T10:00:05Z"));
        assert_eq!(run.definition.as_ref().map(|d| d.id), Some(7));
        assert_eq!(run.repository.as_deref(), Some("web"));
        assert_eq!(run.requested_for.as_deref(), Some("Dana Smith"));
    }

    #[test]
    fn missing_value_is_shape_error() {
        let err = ApiFlavor::Builds
            .parse_runs(r#"{"count":0}"#)
            .unwrap_err();
        assert!(matches!(err, FetchError::ResponseShape(_)));
    }

    #[test]
    fn invalid_json_is_shape_error() {
        let err = ApiFlavor::Pipelines.parse_runs("<html>").unwrap_err();
        assert!(matches!(err, FetchError::ResponseShape(_)));
    }

    #[test]
    fn record_missing_id_is_shape_error() {
        let err = ApiFlavor::Pipelines
            .parse_runs(r#"{"value":[{"name":"no id"}]}"#)
            .unwrap_err();
        assert!(matches!(err, FetchError::ResponseShape(_)));
    }

    #[test]
    fn empty_value_is_ok() {
        let runs = ApiFlavor::Builds.parse_runs(r#"{"count":0,"value":[]}"#).unwrap();
        assert!(runs.is_empty());
    }

    #[test]
    fn flavor_defaults() {
        assert_eq!(ApiFlavor::Pipelines.default_sort_key(), SortKey::Label);
        assert_eq!(ApiFlavor::Builds.default_sort_key(), SortKey::Id);
        assert_eq!(ApiFlavor::Pipelines.summary_statuses(), ["running", "queued"]);
        assert_eq!(
            ApiFlavor::Builds.summary_statuses(),
            ["inProgress", "completed"]
        );
    }
}

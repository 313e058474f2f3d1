#![allow(dead_code)]

use azw::app::{AppConfig, AppState, DefinitionRef, RunRecord, SortKey};
use azw::azure::ApiFlavor;

pub fn run(id: u64, label: &str, status: &str) -> RunRecord {
    RunRecord {
        id,
        label: label.to_string(),
        status: status.to_string(),
        result: None,
        queue_time: Some("2024-06-01T10:00:00Z".to_string()),
        start_time: None,
        detail_url: Some(format!(
            "https://dev.azure.com/acme/web/_build/results?buildId={id}"
        )),
        definition: Some(DefinitionRef {
            id: 12,
            name: "web-ci".to_string(),
        }),
        repository: None,
        requested_for: None,
    }
}

/// The three-run set used by most scenarios.
pub fn scenario_runs() -> Vec<RunRecord> {
    vec![
        run(1, "alpha", "running"),
        run(2, "beta", "queued"),
        run(3, "Alphb", "running"),
    ]
}

pub fn new_state(flavor: ApiFlavor, sort_key: SortKey) -> AppState {
    AppState::new(
        AppConfig {
            target: "acme/web".to_string(),
            flavor,
            version_string: "azw v0.0.0".to_string(),
        },
        Some(12),
        sort_key,
    )
}

/// State after one successful fetch of `runs`.
pub fn loaded_state(runs: Vec<RunRecord>) -> AppState {
    let mut state = new_state(ApiFlavor::Pipelines, SortKey::Id);
    let ticket = state.refresh();
    state.apply_fetch_result(ticket, Ok(runs));
    state
}

pub fn pipeline_runs_json() -> &'static str {
    r#"{
        "count": 3,
        "value": [
            {
                "id": 3,
                "name": "Alphb",
                "state": "inProgress",
                "createdDate": "2024-06-01T10:02:00.1234567Z",
                "_links": { "web": { "href": "https://dev.azure.com/acme/web/_build/results?buildId=3" } },
                "pipeline": { "id": 12, "name": "web-ci" }
            },
            {
                "id": 1,
                "name": "alpha",
                "state": "completed",
                "result": "succeeded",
                "createdDate": "2024-06-01T10:00:00Z",
                "_links": { "web": { "href": "https://dev.azure.com/acme/web/_build/results?buildId=1" } },
                "pipeline": { "id": 12, "name": "web-ci" }
            },
            {
                "id": 2,
                "name": "beta",
                "createdDate": "2024-06-01T10:01:00Z",
                "pipeline": { "id": 12, "name": "web-ci" }
            }
        ]
    }"#
}

pub fn build_runs_json() -> &'static str {
    r#"{
        "count": 2,
        "value": [
            {
                "id": 42,
                "buildNumber": "20240601.2",
                "status": "inProgress",
                "queueTime": "2024-06-01T10:00:00Z",
                "startTime": "2024-06-01T10:00:05Z",
                "_links": { "web": { "href": "https://dev.azure.com/acme/web/_build/results?buildId=42" } },
                "definition": { "id": 12, "name": "web-ci" },
                "repository": { "name": "web" },
                "requestedFor": { "displayName": "Dana Reyes" }
            },
            {
                "id": 41,
                "buildNumber": "20240601.1",
                "status": "completed",
                "result": "failed",
                "queueTime": "2024-06-01T09:00:00Z",
                "definition": { "id": 12, "name": "web-ci" }
            }
        ]
    }"#
}

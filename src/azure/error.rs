/// Every way a call against the Azure DevOps API can fail.
///
/// The client never recovers from any of these: it logs and hands the error to
/// the caller, which decides how to render it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network, DNS, TLS or timeout failure before a response arrived.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 401/403: the personal access token was rejected.
    #[error("authentication rejected (HTTP {status}); check AZURE_DEVOPS_PAT")]
    Auth { status: u16 },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid definition id {0}: must be a positive integer")]
    InvalidDefinition(u32),

    /// 2xx response whose body is not the expected `{ "value": [...] }` envelope.
    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// Classify a non-success status into `Auth` or `Status`.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Auth { status },
            _ => Self::Status {
                status,
                body: summarize_body(body),
            },
        }
    }
}

/// Azure error bodies are JSON with a `message` field; fall back to the first
/// line of whatever came back.
fn summarize_body(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let first = body.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        "(empty body)".to_string()
    } else {
        crate::app::truncate(first, 200)
    }
}

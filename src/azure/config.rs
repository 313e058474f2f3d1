use crate::azure::{ApiFlavor, FetchError};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
pub const DEFAULT_API_VERSION: &str = "7.1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for one organization/project. Validated once at
/// startup so a missing value can never end up inside a URL or header.
#[derive(Clone)]
pub struct AzureConfig {
    pub base_url: Url,
    pub organization: String,
    pub project: String,
    pub pat: String,
    pub api_version: String,
    pub flavor: ApiFlavor,
    pub timeout: Duration,
}

impl std::fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConfig")
            .field("base_url", &self.base_url.as_str())
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("pat", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("flavor", &self.flavor)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AzureConfig {
    pub fn new(
        base_url: &str,
        organization: &str,
        project: &str,
        pat: &str,
        flavor: ApiFlavor,
    ) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::Config(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::Config(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }
        let config = Self {
            base_url,
            organization: require("organization (AZURE_DEVOPS_ORG)", organization)?,
            project: require("project (AZURE_DEVOPS_PROJECT)", project)?,
            pat: require("personal access token (AZURE_DEVOPS_PAT)", pat)?,
            api_version: DEFAULT_API_VERSION.to_string(),
            flavor,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        Ok(config)
    }

    pub fn with_api_version(mut self, version: &str) -> Result<Self, FetchError> {
        self.api_version = require("api version", version)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `<org>/<project>` as shown in the header.
    pub fn display_target(&self) -> String {
        format!("{}/{}", self.organization, self.project)
    }
}

fn require(what: &str, value: &str) -> Result<String, FetchError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "undefined" {
        return Err(FetchError::Config(format!("missing {what}")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AzureConfig {
        AzureConfig::new(DEFAULT_BASE_URL, "acme", "web", "secret", ApiFlavor::Pipelines).unwrap()
    }

    #[test]
    fn new_trims_values() {
        let cfg =
            AzureConfig::new(DEFAULT_BASE_URL, " acme ", "web\n", "s", ApiFlavor::Builds).unwrap();
        assert_eq!(cfg.organization, "acme");
        assert_eq!(cfg.project, "web");
        assert_eq!(cfg.display_target(), "acme/web");
    }

    #[test]
    fn blank_organization_rejected() {
        let err = AzureConfig::new(DEFAULT_BASE_URL, "  ", "web", "s", ApiFlavor::Builds)
            .unwrap_err();
        assert!(err.to_string().contains("AZURE_DEVOPS_ORG"));
    }

    #[test]
    fn literal_undefined_rejected() {
        let err = AzureConfig::new(DEFAULT_BASE_URL, "acme", "web", "undefined", ApiFlavor::Builds)
            .unwrap_err();
        assert!(err.to_string().contains("AZURE_DEVOPS_PAT"));
    }

    #[test]
    fn bad_base_url_rejected() {
        assert!(AzureConfig::new("not a url", "a", "b", "c", ApiFlavor::Builds).is_err());
        assert!(AzureConfig::new("mailto:x@y.z", "a", "b", "c", ApiFlavor::Builds).is_err());
    }

    #[test]
    fn api_version_must_be_set() {
        assert!(valid().with_api_version(" ").is_err());
        assert_eq!(valid().with_api_version("7.0").unwrap().api_version, "7.0");
    }

    #[test]
    fn debug_redacts_pat() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}

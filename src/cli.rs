use crate::app::SortKey;
use crate::azure::config::{DEFAULT_API_VERSION, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::azure::{ApiFlavor, AzureConfig, FetchError};
use clap::Parser;
use std::time::Duration;

/// Read from the environment only, never from the command line.
pub const PAT_ENV: &str = "AZURE_DEVOPS_PAT";

#[derive(Parser, Debug)]
#[command(name = "azw", version, about = "Azure Pipelines run watcher TUI")]
pub struct Cli {
    /// Azure DevOps organization
    #[arg(short, long, env = "AZURE_DEVOPS_ORG")]
    pub organization: Option<String>,

    /// Project inside the organization
    #[arg(short, long, env = "AZURE_DEVOPS_PROJECT")]
    pub project: Option<String>,

    /// Pipeline (or build) definition id to watch
    #[arg(short, long, env = "AZURE_DEVOPS_DEFINITION", value_parser = clap::value_parser!(u32).range(1..))]
    pub definition: Option<u32>,

    /// Which REST API to read runs from
    #[arg(short, long, value_enum, default_value_t = ApiFlavor::Pipelines)]
    pub flavor: ApiFlavor,

    /// Service root, e.g. https://tfs.example.com/tfs for on-prem collections
    #[arg(long, env = "AZURE_DEVOPS_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// REST api-version query parameter
    #[arg(long, default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Initial sort column (defaults to label for pipelines, id for builds)
    #[arg(short, long, value_enum)]
    pub sort: Option<SortKey>,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Enable verbose logging to $XDG_STATE_HOME/azw/debug.log
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    /// Validate everything the client needs. `pat` comes from `PAT_ENV`.
    pub fn azure_config(&self, pat: &str) -> Result<AzureConfig, FetchError> {
        if self.flavor == ApiFlavor::Pipelines && self.definition.is_none() {
            return Err(FetchError::Config(
                "missing definition id (--definition or AZURE_DEVOPS_DEFINITION); \
                 the pipelines API lists runs per definition"
                    .into(),
            ));
        }
        let config = AzureConfig::new(
            &self.base_url,
            self.organization.as_deref().unwrap_or_default(),
            self.project.as_deref().unwrap_or_default(),
            pat,
            self.flavor,
        )?
        .with_api_version(&self.api_version)?
        .with_timeout(Duration::from_secs(self.timeout));
        Ok(config)
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort.unwrap_or_else(|| self.flavor.default_sort_key())
    }
}

pub fn pat_from_env() -> String {
    std::env::var(PAT_ENV).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["azw", "--organization", "acme", "--project", "web"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn pipelines_config_with_definition() {
        let cli = parse(&["--definition", "12"]);
        let cfg = cli.azure_config("secret").unwrap();
        assert_eq!(cfg.display_target(), "acme/web");
        assert_eq!(cfg.flavor, ApiFlavor::Pipelines);
        assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cli.sort_key(), SortKey::Label);
    }

    #[test]
    fn pipelines_without_definition_rejected() {
        let cli = Cli {
            definition: None,
            ..parse(&["--definition", "3"])
        };
        let err = cli.azure_config("secret").unwrap_err();
        assert!(err.to_string().contains("--definition"));
    }

    #[test]
    fn builds_flavor_defaults_to_id_sort() {
        let cli = parse(&["--flavor", "builds"]);
        assert!(cli.azure_config("secret").is_ok());
        assert_eq!(cli.sort_key(), SortKey::Id);
    }

    #[test]
    fn explicit_sort_wins() {
        let cli = parse(&["--flavor", "builds", "--sort", "label"]);
        assert_eq!(cli.sort_key(), SortKey::Label);
    }

    #[test]
    fn zero_definition_rejected_by_parser() {
        let result = Cli::try_parse_from(["azw", "-o", "a", "-p", "b", "--definition", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_timeout_rejected_by_parser() {
        let result = Cli::try_parse_from(["azw", "-o", "a", "-p", "b", "--timeout", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_pat_rejected() {
        let cli = parse(&["--flavor", "builds"]);
        let err = cli.azure_config("").unwrap_err();
        assert!(err.to_string().contains(PAT_ENV));
    }

    #[test]
    fn custom_timeout_and_api_version() {
        let cli = parse(&["-f", "builds", "-t", "5", "--api-version", "6.0"]);
        let cfg = cli.azure_config("secret").unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.api_version, "6.0");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::auth::Token;

const CONFIG_CANDIDATES: [&str; 4] = [
    "cycletime.toml",
    "cycletime.json",
    "cycletime.yaml",
    "cycletime.yml",
];

/// Configuration file structure for cycletime.
///
/// Every key is optional; values given on the command line or through the
/// environment take precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    /// Project board column names used to classify timeline events
    #[serde(default)]
    pub columns: ColumnNames,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// Repository owner (user or organization)
    pub owner: Option<String>,

    /// Repository name
    pub project_name: Option<String>,

    /// GraphQL endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Personal access token
    pub token: Option<String>,

    /// Request timeout for the GraphQL call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ColumnNames {
    /// Column that marks work as started
    #[serde(default = "default_doing_column")]
    pub doing: String,

    /// Column that marks work as finished
    #[serde(default = "default_done_column")]
    pub done: String,

    /// Column that marks code as ready for review
    #[serde(default = "default_committed_column")]
    pub committed: String,

    /// Column that marks work as deployed and verified
    #[serde(default = "default_deployed_column")]
    pub deployed: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    /// Destination CSV path
    pub output: Option<PathBuf>,

    /// Include committed/deployed dates, lead time and points
    #[serde(default)]
    pub lead_time: bool,

    /// What to do with issues that never reached the done column
    #[serde(default)]
    pub missing_done: MissingDonePolicy,
}

/// Handling of closed issues without any event in the done column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingDonePolicy {
    /// Drop the issue from the report and log a warning
    #[default]
    Skip,
    /// Keep the issue with an empty done date and unknown durations
    Keep,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: None,
            project_name: None,
            endpoint: default_endpoint(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            doing: default_doing_column(),
            done: default_done_column(),
            committed: default_committed_column(),
            deployed: default_deployed_column(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.github.com/graphql".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_doing_column() -> String {
    "Doing".to_string()
}

fn default_done_column() -> String {
    "Done".to_string()
}

fn default_committed_column() -> String {
    "PR ready".to_string()
}

fn default_deployed_column() -> String {
    "Analytics QA".to_string()
}

pub const DEFAULT_OUTPUT: &str = "output.csv";

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cycletime.toml, ./cycletime.json, ./cycletime.yaml, ./cycletime.yml
    /// 3. `<config dir>/cycletime/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        if let Some(config) = Self::discover(Path::new("."))? {
            return Ok(config);
        }

        if let Some(dir) = dirs::config_dir() {
            let path = dir.join("cycletime").join("config.toml");
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    fn discover(dir: &Path) -> Result<Option<Self>> {
        for candidate in &CONFIG_CANDIDATES {
            let path = dir.join(candidate);
            if path.exists() {
                return Self::load_from_path(&path).map(Some);
            }
        }
        Ok(None)
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub owner: Option<String>,
    pub project_name: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub output: Option<PathBuf>,
    pub lead_time: Option<bool>,
    pub missing_done: Option<MissingDonePolicy>,
    pub doing_column: Option<String>,
    pub done_column: Option<String>,
    pub committed_column: Option<String>,
    pub deployed_column: Option<String>,
    pub dump_json: bool,
    pub quiet: bool,
}

/// Fully resolved settings handed to the report pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    pub owner: String,
    pub project_name: String,
    pub endpoint: Url,
    pub token: Token,
    pub timeout: Duration,
    pub output_path: PathBuf,
    pub columns: ColumnNames,
    pub include_lead_time: bool,
    pub missing_done: MissingDonePolicy,
    pub dump_json: bool,
    pub quiet: bool,
}

impl Settings {
    /// Merge file configuration with command line overrides.
    ///
    /// # Errors
    ///
    /// Fails when owner, repository name or token is missing or blank, or when
    /// the endpoint is not a valid URL.
    pub fn resolve(config: Config, overrides: Overrides) -> Result<Self> {
        let Config {
            github,
            columns,
            report,
        } = config;

        let owner = required(overrides.owner.or(github.owner), "owner", "GITHUB_OWNER")?;
        let project_name = required(
            overrides.project_name.or(github.project_name),
            "project name",
            "GITHUB_PROJECT_NAME",
        )?;
        let token = Token::from(required(
            overrides.token.or(github.token),
            "token",
            "GITHUB_TOKEN",
        )?);

        let endpoint = overrides.endpoint.unwrap_or(github.endpoint);
        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("Invalid GraphQL endpoint: {endpoint}"))?;

        let columns = ColumnNames {
            doing: overrides.doing_column.unwrap_or(columns.doing),
            done: overrides.done_column.unwrap_or(columns.done),
            committed: overrides.committed_column.unwrap_or(columns.committed),
            deployed: overrides.deployed_column.unwrap_or(columns.deployed),
        };

        Ok(Self {
            owner,
            project_name,
            endpoint,
            token,
            timeout: Duration::from_secs(overrides.timeout_secs.unwrap_or(github.timeout_secs)),
            output_path: overrides
                .output
                .or(report.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            columns,
            include_lead_time: overrides.lead_time.unwrap_or(report.lead_time),
            missing_done: overrides.missing_done.unwrap_or(report.missing_done),
            dump_json: overrides.dump_json,
            quiet: overrides.quiet,
        })
    }

    /// `owner/name` form of the repository.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.project_name)
    }
}

fn required(value: Option<String>, what: &str, env: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("Missing GitHub {what}: set {env} or configure it in cycletime.toml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn overrides() -> Overrides {
        Overrides {
            owner: Some("acme".to_string()),
            project_name: Some("widgets".to_string()),
            token: Some("ghp_test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.endpoint, "https://api.github.com/graphql");
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.columns.doing, "Doing");
        assert_eq!(config.columns.done, "Done");
        assert_eq!(config.columns.committed, "PR ready");
        assert_eq!(config.columns.deployed, "Analytics QA");
        assert!(!config.report.lead_time);
        assert_eq!(config.report.missing_done, MissingDonePolicy::Skip);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[github]
owner = "acme"
project-name = "widgets"
endpoint = "https://github.example.com/api/graphql"

[columns]
doing = "In Progress"

[report]
lead-time = true
missing-done = "keep"
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.github.owner.as_deref(), Some("acme"));
        assert_eq!(config.github.project_name.as_deref(), Some("widgets"));
        assert_eq!(config.github.endpoint, "https://github.example.com/api/graphql");
        assert_eq!(config.columns.doing, "In Progress");
        assert_eq!(config.columns.done, "Done");
        assert!(config.report.lead_time);
        assert_eq!(config.report.missing_done, MissingDonePolicy::Keep);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = "github:\n  owner: acme\ncolumns:\n  deployed: Released\n";
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.github.owner.as_deref(), Some("acme"));
        assert_eq!(config.columns.deployed, "Released");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("definitely-missing-cycletime.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_discover_candidate_in_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("cycletime.json"),
            r#"{ "github": { "owner": "from-json" } }"#,
        )
        .unwrap();

        let config = Config::discover(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.github.owner.as_deref(), Some("from-json"));
    }

    #[test]
    fn test_discover_without_candidates() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(Config::discover(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(Config::default(), overrides()).unwrap();
        assert_eq!(settings.repository(), "acme/widgets");
        assert_eq!(settings.endpoint.as_str(), "https://api.github.com/graphql");
        assert_eq!(settings.output_path, PathBuf::from("output.csv"));
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(!settings.include_lead_time);
        assert_eq!(settings.columns, ColumnNames::default());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::default();
        config.github.owner = Some("file-owner".to_string());
        config.columns.done = "Closed".to_string();
        config.report.output = Some(PathBuf::from("file.csv"));

        let overrides = Overrides {
            output: Some(PathBuf::from("cli.csv")),
            done_column: Some("Shipped".to_string()),
            lead_time: Some(true),
            ..overrides()
        };

        let settings = Settings::resolve(config, overrides).unwrap();
        assert_eq!(settings.owner, "acme");
        assert_eq!(settings.columns.done, "Shipped");
        assert_eq!(settings.output_path, PathBuf::from("cli.csv"));
        assert!(settings.include_lead_time);
    }

    #[test]
    fn test_file_values_fill_gaps() {
        let mut config = Config::default();
        config.github.token = Some("file-token".to_string());
        config.report.lead_time = true;

        let overrides = Overrides {
            token: None,
            ..overrides()
        };

        let settings = Settings::resolve(config, overrides).unwrap();
        assert_eq!(settings.token.as_str(), "file-token");
        assert!(settings.include_lead_time);
    }

    #[test]
    fn test_cli_can_disable_lead_time_from_file() {
        let mut config = Config::default();
        config.report.lead_time = true;

        let overrides = Overrides {
            lead_time: Some(false),
            ..overrides()
        };

        let settings = Settings::resolve(config, overrides).unwrap();
        assert!(!settings.include_lead_time);
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let overrides = Overrides {
            token: Some("   ".to_string()),
            ..overrides()
        };

        let err = Settings::resolve(Config::default(), overrides).unwrap_err();
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let overrides = Overrides {
            endpoint: Some("not a url".to_string()),
            ..overrides()
        };

        assert!(Settings::resolve(Config::default(), overrides).is_err());
    }
}

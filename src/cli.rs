use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

use crate::config::{Config, MissingDonePolicy, Overrides, Settings};
use crate::output::{self, PhaseProgress};
use crate::providers::{GitHubProvider, MetricOptions};

#[derive(Parser)]
#[command(name = "cycletime")]
#[command(author, version, about = "Cycle time and lead time report for closed GitHub issues", long_about = None)]
pub struct Cli {
    /// Destination CSV file [default: output.csv]
    output: Option<PathBuf>,

    #[arg(long, env = "GITHUB_OWNER")]
    owner: Option<String>,

    #[arg(short = 'P', long, env = "GITHUB_PROJECT_NAME")]
    project: Option<String>,

    #[arg(long, env = "GRAPHQL_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Configuration file (toml, json or yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Add committed/deployed dates, lead time and points columns
    #[arg(short, long, default_value_t = false, overrides_with = "no_lead_time")]
    lead_time: bool,

    /// Cycle time columns only, even if the config file enables lead time
    #[arg(long, default_value_t = false, overrides_with = "lead_time")]
    no_lead_time: bool,

    /// What to do with closed issues that never reached the done column
    #[arg(long, value_enum)]
    missing_done: Option<MissingDonePolicy>,

    #[arg(long)]
    doing_column: Option<String>,

    #[arg(long)]
    done_column: Option<String>,

    #[arg(long)]
    committed_column: Option<String>,

    #[arg(long)]
    deployed_column: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the computed records as JSON to stdout before writing the CSV
    #[arg(long, default_value_t = false)]
    dump_json: bool,

    /// Suppress the banner, progress and summary
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            owner: self.owner.clone(),
            project_name: self.project.clone(),
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            timeout_secs: self.timeout,
            output: self.output.clone(),
            lead_time: match (self.lead_time, self.no_lead_time) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            missing_done: self.missing_done,
            doing_column: self.doing_column.clone(),
            done_column: self.done_column.clone(),
            committed_column: self.committed_column.clone(),
            deployed_column: self.deployed_column.clone(),
            dump_json: self.dump_json,
            quiet: self.quiet,
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        let config = Config::load(self.config.as_deref())?;
        Settings::resolve(config, self.overrides())
    }

    pub async fn execute(&self) -> Result<()> {
        let settings = self.settings()?;
        debug!("Resolved settings: {settings:?}");

        if !settings.quiet {
            output::print_banner();
        }

        info!(
            "Collecting cycle times for repository: {}",
            settings.repository()
        );

        let provider = GitHubProvider::new(&settings)?;
        let options = MetricOptions {
            columns: &settings.columns,
            include_lead_time: settings.include_lead_time,
            missing_done: settings.missing_done,
        };

        let progress = PhaseProgress::start(settings.quiet);
        let (insights, progress) = provider
            .collect_insights(&options, progress)
            .await
            .with_context(|| format!("Failed to collect issues for {}", settings.repository()))?;

        if settings.dump_json {
            output::export_json(&insights, true, std::io::stdout().lock())?;
        }

        if let Err(e) = output::write_csv_report(&insights, &settings.output_path) {
            progress.abandon();
            return Err(e).with_context(|| {
                format!("Failed to write report to {}", settings.output_path.display())
            });
        }
        progress.finish_write(&settings.output_path);

        if !settings.quiet {
            output::print_summary(&insights);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_output_and_flags() {
        let cli = Cli::try_parse_from([
            "cycletime",
            "report.csv",
            "--owner",
            "acme",
            "-P",
            "widgets",
            "--token",
            "ghp_test",
            "--lead-time",
            "--missing-done",
            "keep",
            "--doing-column",
            "In Progress",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.output, Some(PathBuf::from("report.csv")));
        assert_eq!(overrides.owner.as_deref(), Some("acme"));
        assert_eq!(overrides.project_name.as_deref(), Some("widgets"));
        assert_eq!(overrides.lead_time, Some(true));
        assert_eq!(overrides.missing_done, Some(MissingDonePolicy::Keep));
        assert_eq!(overrides.doing_column.as_deref(), Some("In Progress"));
    }

    #[test]
    fn test_output_defaults_when_omitted() {
        let cli = Cli::try_parse_from([
            "cycletime",
            "--owner",
            "acme",
            "-P",
            "widgets",
            "--token",
            "ghp_test",
        ])
        .unwrap();

        let settings = Settings::resolve(Config::default(), cli.overrides()).unwrap();
        assert_eq!(settings.output_path, PathBuf::from("output.csv"));
        assert!(!settings.include_lead_time);
        assert_eq!(settings.missing_done, MissingDonePolicy::Skip);
    }

    #[test]
    fn test_no_lead_time_overrides_config_file() {
        let cli = Cli::try_parse_from(["cycletime", "--no-lead-time", "--token", "ghp_test"]).unwrap();
        assert_eq!(cli.overrides().lead_time, Some(false));

        let cli = Cli::try_parse_from(["cycletime", "--token", "ghp_test"]).unwrap();
        assert_eq!(cli.overrides().lead_time, None);
    }

    #[test]
    fn test_rejects_unknown_missing_done_policy() {
        let result = Cli::try_parse_from(["cycletime", "--missing-done", "explode"]);
        assert!(result.is_err());
    }
}

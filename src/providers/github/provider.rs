use chrono::Utc;
use log::{info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::insights::CycleInsights;
use crate::output::PhaseProgress;

use super::client::GitHubClient;
use super::issue_metrics::{calculate_milestone_metrics, MetricOptions};
use super::types::GitHubMilestone;

/// Cycle time insights provider for a GitHub repository.
///
/// Fetches closed issues per milestone in a single GraphQL request and turns
/// their project board history into per-issue metric records.
pub struct GitHubProvider {
    pub client: GitHubClient,
    pub owner: String,
    pub repo: String,
}

impl GitHubProvider {
    /// Creates a provider for `owner/repo` talking to the endpoint in `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = GitHubClient::new(
            settings.endpoint.clone(),
            settings.token.clone(),
            settings.timeout,
        )?;

        Ok(Self {
            client,
            owner: settings.owner.clone(),
            repo: settings.project_name.clone(),
        })
    }

    /// Collects cycle time insights for the configured repository.
    ///
    /// Progress is displayed in two of the three report phases:
    /// 1. Fetching milestones and their closed issues
    /// 2. Computing per-issue metrics
    ///
    /// The returned progress handle is left in phase 3 for the caller to
    /// finish once the report is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API reports errors, the
    /// repository does not exist or the response cannot be decoded.
    pub async fn collect_insights(
        &self,
        options: &MetricOptions<'_>,
        progress: PhaseProgress,
    ) -> Result<(CycleInsights, PhaseProgress)> {
        info!(
            "Starting insights collection for repository: {}/{}",
            self.owner, self.repo
        );

        let milestones = match self
            .client
            .fetch_milestones(&self.owner, &self.repo, options.include_lead_time)
            .await
        {
            Ok(milestones) => milestones,
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };

        if milestones.is_empty() {
            warn!("No milestones found for repository: {}/{}", self.owner, self.repo);
        }

        let progress = progress.finish_fetch_start_compute(milestones.len());

        let insights = self.build_insights(&milestones, options);

        let progress = progress.finish_compute_start_write(insights.total_issues);

        Ok((insights, progress))
    }

    fn build_insights(&self, milestones: &[GitHubMilestone], options: &MetricOptions<'_>) -> CycleInsights {
        let mut skipped_issues = 0;
        let milestones: Vec<_> = milestones
            .iter()
            .map(|milestone| {
                let (metrics, skipped) = calculate_milestone_metrics(milestone, options);
                skipped_issues += skipped;
                metrics
            })
            .collect();

        let total_issues = milestones.iter().map(|m| m.records.len()).sum();

        if skipped_issues > 0 {
            warn!(
                "{skipped_issues} closed issues never reached '{}' and were left out of the report",
                options.columns.done
            );
        }

        CycleInsights {
            repository: format!("{}/{}", self.owner, self.repo),
            collected_at: Utc::now(),
            include_lead_time: options.include_lead_time,
            total_issues,
            skipped_issues,
            milestones,
        }
    }
}

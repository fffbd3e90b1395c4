use log::{debug, warn};

use super::points::total_points;
use super::timeline::{days_between, first_in_column, last_in_column, ColumnEntry};
use super::types::{GitHubIssue, GitHubMilestone, TimelineEventKind};
use crate::config::{ColumnNames, MissingDonePolicy};
use crate::insights::{DeliveryMetrics, MetricRecord, MilestoneMetrics};

/// How issue timelines are turned into metric records.
#[derive(Debug, Clone)]
pub struct MetricOptions<'a> {
    pub columns: &'a ColumnNames,
    pub include_lead_time: bool,
    pub missing_done: MissingDonePolicy,
}

/// Calculates the metric record for one closed issue.
///
/// Returns `None` when the issue never reached the done column and the
/// missing-done policy is [`MissingDonePolicy::Skip`].
pub fn calculate_issue_metrics(
    issue: &GitHubIssue,
    options: &MetricOptions<'_>,
) -> Option<MetricRecord> {
    let columns = options.columns;
    debug!(
        "'{}': {} board events, {} added to project",
        issue.title,
        issue.timeline.len(),
        issue
            .timeline
            .iter()
            .filter(|event| event.kind == TimelineEventKind::AddedToProject)
            .count()
    );

    let doing_at = first_in_column(&issue.timeline, &columns.doing).timestamp();
    let done_at = match last_in_column(&issue.timeline, &columns.done) {
        ColumnEntry::Found(at) => Some(at),
        ColumnEntry::Missing => match options.missing_done {
            MissingDonePolicy::Skip => {
                warn!(
                    "Skipping '{}' ({}): no '{}' event in its timeline",
                    issue.title, issue.url, columns.done
                );
                return None;
            }
            MissingDonePolicy::Keep => {
                debug!("Keeping '{}' without a done date", issue.title);
                None
            }
        },
    };

    let delivery = options.include_lead_time.then(|| {
        let committed_at = first_in_column(&issue.timeline, &columns.committed).or(doing_at);
        let deployed_at = last_in_column(&issue.timeline, &columns.deployed).or(done_at);

        DeliveryMetrics {
            committed_at,
            deployed_at,
            lead_time_days: days_between(deployed_at, committed_at),
            points: total_points(issue.labels.as_deref()),
        }
    });

    Some(MetricRecord {
        title: issue.title.clone(),
        url: issue.url.clone(),
        doing_at,
        done_at,
        cycle_time_days: days_between(done_at, doing_at),
        delivery,
    })
}

/// Calculates records for every issue of a milestone, ordered by done date.
///
/// Returns the milestone metrics and the number of skipped issues. Records
/// without a done date sort last.
pub fn calculate_milestone_metrics(
    milestone: &GitHubMilestone,
    options: &MetricOptions<'_>,
) -> (MilestoneMetrics, usize) {
    let mut records: Vec<MetricRecord> = milestone
        .issues
        .iter()
        .filter_map(|issue| calculate_issue_metrics(issue, options))
        .collect();

    let skipped = milestone.issues.len() - records.len();

    records.sort_by_key(|record| (record.done_at.is_none(), record.done_at));

    (
        MilestoneMetrics {
            title: milestone.title.clone(),
            records,
        },
        skipped,
    )
}

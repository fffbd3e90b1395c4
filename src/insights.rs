use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct CycleInsights {
    pub repository: String,
    pub collected_at: DateTime<Utc>,
    pub include_lead_time: bool,
    pub total_issues: usize,
    pub skipped_issues: usize,
    pub milestones: Vec<MilestoneMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneMetrics {
    pub title: String,
    pub records: Vec<MetricRecord>,
}

/// Per-issue timing derived from the project board timeline.
///
/// Durations are `None` when one of their endpoints is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub title: String,
    pub url: String,
    pub doing_at: Option<DateTime<Utc>>,
    pub done_at: Option<DateTime<Utc>>,
    pub cycle_time_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delivery: Option<DeliveryMetrics>,
}

/// Lead time and size, only computed when the report includes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    pub committed_at: Option<DateTime<Utc>>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub lead_time_days: Option<i64>,
    pub points: u32,
}

use chrono::{DateTime, Utc};

/// A GitHub milestone with its closed issues, in API order.
#[derive(Debug, Clone)]
pub struct GitHubMilestone {
    pub title: String,
    pub issues: Vec<GitHubIssue>,
}

/// A closed issue and its project board history.
#[derive(Debug, Clone)]
pub struct GitHubIssue {
    pub title: String,
    pub url: String,
    /// Board events in chronological order as returned by the API
    pub timeline: Vec<TimelineEvent>,
    /// `None` when labels were not requested
    pub labels: Option<Vec<String>>,
}

/// Project board transitions the timeline query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEventKind {
    MovedColumnsInProject,
    AddedToProject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEvent {
    pub kind: TimelineEventKind,
    pub created_at: DateTime<Utc>,
    pub column: String,
}

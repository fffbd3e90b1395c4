use chrono::{DateTime, Utc};
use graphql_client::QueryBody;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::core::GitHubClient;
use crate::error::{CycleTimeError, Result};
use crate::providers::github::types::{
    GitHubIssue, GitHubMilestone, TimelineEvent, TimelineEventKind,
};

pub const OPERATION_NAME: &str = "MilestoneIssues";

macro_rules! milestone_query {
    ($milestones:literal, $labels:literal) => {
        concat!(
            "query MilestoneIssues($owner: String!, $name: String!) {\n",
            "  repository(owner: $owner, name: $name) {\n",
            "    milestones(",
            $milestones,
            ") {\n",
            "      nodes {\n",
            "        title\n",
            "        issues(last: 100, states: CLOSED) {\n",
            "          nodes {\n",
            "            title\n",
            "            url\n",
            $labels,
            "            timelineItems(itemTypes: [MOVED_COLUMNS_IN_PROJECT_EVENT, ADDED_TO_PROJECT_EVENT], first: 100) {\n",
            "              nodes {\n",
            "                __typename\n",
            "                ... on MovedColumnsInProjectEvent {\n",
            "                  createdAt\n",
            "                  projectColumnName\n",
            "                }\n",
            "                ... on AddedToProjectEvent {\n",
            "                  createdAt\n",
            "                  projectColumnName\n",
            "                }\n",
            "              }\n",
            "            }\n",
            "          }\n",
            "        }\n",
            "      }\n",
            "    }\n",
            "  }\n",
            "}\n",
        )
    };
}

const CYCLE_TIME_QUERY: &str = milestone_query!("first: 20", "");

const LEAD_TIME_QUERY: &str = milestone_query!(
    "last: 13",
    "            labels(first: 10) {\n              nodes {\n                name\n              }\n            }\n"
);

/// Page sizes baked into the milestone query.
///
/// Nothing beyond these windows is fetched; a connection that comes back
/// full may have been truncated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub milestones: usize,
    pub issues: usize,
    pub timeline_items: usize,
    pub labels: Option<usize>,
}

impl PageLimits {
    pub const CYCLE_TIME: Self = Self {
        milestones: 20,
        issues: 100,
        timeline_items: 100,
        labels: None,
    };

    pub const LEAD_TIME: Self = Self {
        milestones: 13,
        issues: 100,
        timeline_items: 100,
        labels: Some(10),
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variables {
    pub owner: String,
    pub name: String,
}

pub struct MilestoneQuery {
    pub body: QueryBody<Variables>,
    pub limits: PageLimits,
}

/// Builds the milestone query for a repository.
///
/// The lead time variant looks at the last 13 milestones and also requests
/// issue labels; the cycle time variant looks at the first 20.
pub fn build_milestone_query(owner: &str, name: &str, include_lead_time: bool) -> MilestoneQuery {
    let (query, limits) = if include_lead_time {
        (LEAD_TIME_QUERY, PageLimits::LEAD_TIME)
    } else {
        (CYCLE_TIME_QUERY, PageLimits::CYCLE_TIME)
    };

    MilestoneQuery {
        body: QueryBody {
            variables: Variables {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            query,
            operation_name: OPERATION_NAME,
        },
        limits,
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseData {
    pub repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryNode {
    pub milestones: Connection<MilestoneNode>,
}

/// A GraphQL connection; both the list and its items are nullable.
#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    pub nodes: Option<Vec<Option<T>>>,
}

impl<T> Connection<T> {
    /// Page slots used, null items included.
    fn len(&self) -> usize {
        self.nodes.as_ref().map_or(0, Vec::len)
    }

    fn into_nodes(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten().flatten()
    }
}

#[derive(Debug, Deserialize)]
pub struct MilestoneNode {
    pub title: String,
    pub issues: Connection<IssueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueNode {
    pub title: String,
    pub url: String,
    pub timeline_items: Connection<TimelineItemNode>,
    pub labels: Option<Connection<LabelNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItemNode {
    #[serde(rename = "__typename")]
    pub typename: TimelineTypename,
    pub created_at: Option<DateTime<Utc>>,
    pub project_column_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TimelineTypename {
    MovedColumnsInProjectEvent,
    AddedToProjectEvent,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct LabelNode {
    pub name: String,
}

impl TimelineItemNode {
    fn into_event(self) -> Option<TimelineEvent> {
        let kind = match self.typename {
            TimelineTypename::MovedColumnsInProjectEvent => TimelineEventKind::MovedColumnsInProject,
            TimelineTypename::AddedToProjectEvent => TimelineEventKind::AddedToProject,
            TimelineTypename::Other => return None,
        };

        Some(TimelineEvent {
            kind,
            created_at: self.created_at?,
            column: self.project_column_name?,
        })
    }
}

impl From<IssueNode> for GitHubIssue {
    fn from(node: IssueNode) -> Self {
        Self {
            title: node.title,
            url: node.url,
            timeline: node
                .timeline_items
                .into_nodes()
                .filter_map(TimelineItemNode::into_event)
                .collect(),
            labels: node
                .labels
                .map(|labels| labels.into_nodes().map(|label| label.name).collect()),
        }
    }
}

impl From<MilestoneNode> for GitHubMilestone {
    fn from(node: MilestoneNode) -> Self {
        Self {
            title: node.title,
            issues: node.issues.into_nodes().map(GitHubIssue::from).collect(),
        }
    }
}

/// Describes every connection that came back exactly as large as its page.
pub fn truncation_warnings(milestones: &Connection<MilestoneNode>, limits: PageLimits) -> Vec<String> {
    let mut warnings = Vec::new();

    if milestones.len() >= limits.milestones {
        warnings.push(format!(
            "Fetched {} milestones, the maximum per query; older or newer milestones may be missing",
            limits.milestones
        ));
    }

    for milestone in milestones.nodes.iter().flatten().flatten() {
        if milestone.issues.len() >= limits.issues {
            warnings.push(format!(
                "Milestone '{}' returned {} closed issues, the maximum per query; some issues may be missing",
                milestone.title, limits.issues
            ));
        }

        for issue in milestone.issues.nodes.iter().flatten().flatten() {
            if issue.timeline_items.len() >= limits.timeline_items {
                warnings.push(format!(
                    "Issue '{}' returned {} timeline events, the maximum per query; later events may be missing",
                    issue.title, limits.timeline_items
                ));
            }

            if let (Some(labels), Some(limit)) = (&issue.labels, limits.labels) {
                if labels.len() >= limit {
                    warnings.push(format!(
                        "Issue '{}' returned {limit} labels, the maximum per query; points may be undercounted",
                        issue.title
                    ));
                }
            }
        }
    }

    warnings
}

impl GitHubClient {
    /// Fetch closed issues with their project board history, grouped by milestone.
    ///
    /// # Arguments
    /// * `owner` - Repository owner
    /// * `name` - Repository name
    /// * `include_lead_time` - Use the lead time variant of the query (labels included)
    ///
    /// # Errors
    /// Returns an error if:
    /// * The GraphQL request fails
    /// * The repository is not found
    /// * The response cannot be deserialized
    pub async fn fetch_milestones(
        &self,
        owner: &str,
        name: &str,
        include_lead_time: bool,
    ) -> Result<Vec<GitHubMilestone>> {
        let query = build_milestone_query(owner, name, include_lead_time);

        let data: ResponseData = self.execute_graphql_request(&query.body).await?;

        let repository = data
            .repository
            .ok_or_else(|| CycleTimeError::RepositoryNotFound(format!("{owner}/{name}")))?;

        for warning in truncation_warnings(&repository.milestones, query.limits) {
            warn!("{warning}");
        }

        let milestones: Vec<GitHubMilestone> = repository
            .milestones
            .into_nodes()
            .map(GitHubMilestone::from)
            .collect();

        info!("Fetched {} milestones for {owner}/{name}", milestones.len());

        Ok(milestones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ResponseData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_cycle_time_query_shape() {
        let query = build_milestone_query("acme", "widgets", false);

        assert_eq!(query.limits, PageLimits::CYCLE_TIME);
        assert_eq!(query.body.operation_name, "MilestoneIssues");
        assert!(query.body.query.contains("milestones(first: 20)"));
        assert!(query.body.query.contains("issues(last: 100, states: CLOSED)"));
        assert!(query.body.query.contains("first: 100) {"));
        assert!(!query.body.query.contains("labels"));
        assert_eq!(
            query.body.variables,
            Variables {
                owner: "acme".to_string(),
                name: "widgets".to_string(),
            }
        );
    }

    #[test]
    fn test_lead_time_query_shape() {
        let query = build_milestone_query("acme", "widgets", true);

        assert_eq!(query.limits, PageLimits::LEAD_TIME);
        assert!(query.body.query.contains("milestones(last: 13)"));
        assert!(query.body.query.contains("labels(first: 10)"));
        assert!(query.body.query.contains("MOVED_COLUMNS_IN_PROJECT_EVENT, ADDED_TO_PROJECT_EVENT"));
    }

    #[test]
    fn test_owner_is_sent_as_variable() {
        let query = build_milestone_query("ac\"me", "widgets", false);
        let body = serde_json::to_value(&query.body).unwrap();

        assert_eq!(body["variables"]["owner"], "ac\"me");
        assert_eq!(body["operationName"], "MilestoneIssues");
        assert!(!query.body.query.contains("ac\"me"));
    }

    #[test]
    fn test_converts_nodes_and_drops_unknown_events() {
        let data = parse(json!({
            "repository": { "milestones": { "nodes": [{
                "title": "Sprint 1",
                "issues": { "nodes": [{
                    "title": "Build the thing",
                    "url": "https://github.com/acme/widgets/issues/1",
                    "labels": { "nodes": [{ "name": "3 Points" }] },
                    "timelineItems": { "nodes": [
                        { "__typename": "AddedToProjectEvent", "createdAt": "2024-01-01T00:00:00Z", "projectColumnName": "Doing" },
                        { "__typename": "LabeledEvent" },
                        null,
                        { "__typename": "MovedColumnsInProjectEvent", "createdAt": "2024-01-05T00:00:00Z", "projectColumnName": "Done" }
                    ] }
                }] }
            }] } }
        }));

        let milestones: Vec<GitHubMilestone> = data
            .repository
            .unwrap()
            .milestones
            .into_nodes()
            .map(GitHubMilestone::from)
            .collect();

        assert_eq!(milestones.len(), 1);
        let issue = &milestones[0].issues[0];
        assert_eq!(issue.timeline.len(), 2);
        assert_eq!(issue.timeline[0].kind, TimelineEventKind::AddedToProject);
        assert_eq!(issue.timeline[1].column, "Done");
        assert_eq!(issue.labels, Some(vec!["3 Points".to_string()]));
    }

    #[test]
    fn test_labels_absent_in_cycle_time_variant() {
        let data = parse(json!({
            "repository": { "milestones": { "nodes": [{
                "title": "Sprint 1",
                "issues": { "nodes": [{
                    "title": "t", "url": "u", "timelineItems": { "nodes": [] }
                }] }
            }] } }
        }));

        let milestone = GitHubMilestone::from(
            data.repository.unwrap().milestones.into_nodes().next().unwrap(),
        );
        assert_eq!(milestone.issues[0].labels, None);
    }

    #[test]
    fn test_truncation_warnings_for_full_pages() {
        let events: Vec<_> = (0..100)
            .map(|_| json!({ "__typename": "MovedColumnsInProjectEvent", "createdAt": "2024-01-01T00:00:00Z", "projectColumnName": "Doing" }))
            .collect();
        let labels: Vec<_> = (0..10).map(|i| json!({ "name": format!("label-{i}") })).collect();
        let data = parse(json!({
            "repository": { "milestones": { "nodes": [{
                "title": "Sprint 1",
                "issues": { "nodes": [{
                    "title": "Busy issue", "url": "u",
                    "labels": { "nodes": labels },
                    "timelineItems": { "nodes": events }
                }] }
            }] } }
        }));

        let warnings = truncation_warnings(&data.repository.unwrap().milestones, PageLimits::LEAD_TIME);

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("100 timeline events"));
        assert!(warnings[1].contains("10 labels"));
    }

    #[test]
    fn test_null_nodes_count_towards_full_page() {
        let mut events: Vec<_> = (0..99)
            .map(|_| json!({ "__typename": "MovedColumnsInProjectEvent", "createdAt": "2024-01-01T00:00:00Z", "projectColumnName": "Doing" }))
            .collect();
        events.push(serde_json::Value::Null);
        let data = parse(json!({
            "repository": { "milestones": { "nodes": [{
                "title": "Sprint 1",
                "issues": { "nodes": [{
                    "title": "Hidden events", "url": "u",
                    "timelineItems": { "nodes": events }
                }] }
            }] } }
        }));

        let warnings = truncation_warnings(&data.repository.unwrap().milestones, PageLimits::CYCLE_TIME);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Hidden events"));
    }

    fn empty_milestones(count: usize) -> ResponseData {
        let milestones: Vec<_> = (0..count)
            .map(|i| json!({ "title": format!("Sprint {i}"), "issues": { "nodes": [] } }))
            .collect();
        parse(json!({ "repository": { "milestones": { "nodes": milestones } } }))
    }

    #[test]
    fn test_full_milestone_page_cycle_time() {
        let warnings = truncation_warnings(
            &empty_milestones(20).repository.unwrap().milestones,
            PageLimits::CYCLE_TIME,
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("20 milestones"));

        let warnings = truncation_warnings(
            &empty_milestones(19).repository.unwrap().milestones,
            PageLimits::CYCLE_TIME,
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_full_milestone_page_lead_time() {
        let warnings = truncation_warnings(
            &empty_milestones(13).repository.unwrap().milestones,
            PageLimits::LEAD_TIME,
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("13 milestones"));

        let warnings = truncation_warnings(
            &empty_milestones(12).repository.unwrap().milestones,
            PageLimits::LEAD_TIME,
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_full_issue_page() {
        let mut issues: Vec<_> = (0..99)
            .map(|i| json!({ "title": format!("Issue {i}"), "url": "u", "timelineItems": { "nodes": [] } }))
            .collect();
        issues.push(serde_json::Value::Null);
        let data = parse(json!({
            "repository": { "milestones": { "nodes": [{
                "title": "Crowded sprint",
                "issues": { "nodes": issues }
            }] } }
        }));

        let warnings = truncation_warnings(&data.repository.unwrap().milestones, PageLimits::CYCLE_TIME);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Milestone 'Crowded sprint'"));
        assert!(warnings[0].contains("100 closed issues"));
    }

    #[test]
    fn test_no_truncation_warnings_for_partial_pages() {
        let data = parse(json!({
            "repository": { "milestones": { "nodes": [{
                "title": "Sprint 1",
                "issues": { "nodes": [] }
            }] } }
        }));

        let warnings = truncation_warnings(&data.repository.unwrap().milestones, PageLimits::CYCLE_TIME);
        assert!(warnings.is_empty());
    }
}

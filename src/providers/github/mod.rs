mod client;
mod issue_metrics;
mod points;
mod provider;
mod timeline;
mod types;

pub use issue_metrics::MetricOptions;
pub use provider::GitHubProvider;

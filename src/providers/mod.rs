mod github;

pub use github::{GitHubProvider, MetricOptions};

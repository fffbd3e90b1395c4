mod core;
pub mod milestones;

pub use self::core::GitHubClient;

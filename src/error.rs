use thiserror::Error;

#[derive(Error, Debug)]
pub enum CycleTimeError {
    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL errors: {errors}")]
    GraphQL { errors: String },

    #[error("GraphQL response contained no data")]
    NoResponseData,

    #[error("Repository '{0}' not found")]
    RepositoryNotFound(String),

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CycleTimeError>;

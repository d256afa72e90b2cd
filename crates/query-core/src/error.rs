use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Bad per-item input. Never retried and never recovered in place.
    #[error("{0}")]
    Validation(String),

    #[error("batch file has no items")]
    EmptyBatch,

    #[error("batch item {index} is not a mapping")]
    InvalidItem { index: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueryError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, missing feeds, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A cloud referenced by name is not one of aws / azure / gcp.
    #[error("unknown cloud: {0}")]
    UnknownCloud(String),
    /// Persisted document could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from loading or validating manager configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

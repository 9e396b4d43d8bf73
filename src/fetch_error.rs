#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Normals report not found (404): {0}")]
    NotFound(String),
    #[error("Server error (5xx): {0}")]
    ServerError(String),
    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(String),
}

use thiserror::Error;

/// Errors raised by the external collaborators of the quantitative pipeline
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Invalid response from {origin}: {message}")]
    Decode { origin: String, message: String },

    #[error("No baseline source succeeded for analysis {analysis_id}: {}", .attempts.join("; "))]
    AllSourcesFailed { analysis_id: String, attempts: Vec<String> },

    #[error("No stored record for analysis {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session event channel closed")]
    Closed,
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Whether retrying against another source could help.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Http(_) | ServiceError::NotFound(_) => true,
            ServiceError::Status { status, .. } => *status >= 500 || *status == 404,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_sources_failed_lists_attempts() {
        let err = ServiceError::AllSourcesFailed {
            analysis_id: "a1".into(),
            attempts: vec!["local: refused".into(), "history: missing".into()],
        };
        let text = err.to_string();
        assert!(text.contains("a1"));
        assert!(text.contains("local: refused; history: missing"));
    }

    #[test]
    fn test_transient_classification() {
        let server = ServiceError::Status { url: "u".into(), status: 503, body: String::new() };
        let client = ServiceError::Status { url: "u".into(), status: 400, body: String::new() };
        assert!(server.is_transient());
        assert!(!client.is_transient());
        assert!(ServiceError::NotFound("a".into()).is_transient());
    }
}

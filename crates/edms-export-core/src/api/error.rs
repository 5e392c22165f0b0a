use std::path::PathBuf;

use thiserror::Error;

use crate::export::QuerySpec;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Query failed for model {model_id} / query {query_id} (status {status}): {body}")]
    QueryFailure {
        model_id: String,
        query_id: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Malformed CSV payload: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Map a non-success export response to an error kind.
    /// 403 means the session cookie was rejected; everything else is a query problem.
    pub fn from_status(status: reqwest::StatusCode, body: &str, query: &QuerySpec) -> Self {
        match status.as_u16() {
            403 => ApiError::AuthenticationFailure(format!(
                "session cookie rejected (status {})",
                status
            )),
            _ => ApiError::QueryFailure {
                model_id: query.model_id().to_string(),
                query_id: query.query_id().to_string(),
                status,
                body: Self::truncate_body(body),
            },
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ApiError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, ApiError::AuthenticationFailure(_))
    }

    pub fn is_query_failure(&self) -> bool {
        matches!(self, ApiError::QueryFailure { .. })
    }
}

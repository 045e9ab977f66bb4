use crate::location::LocationId;
use thiserror::Error;

/// Why a location list could not be loaded
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connectivity problem, timeout or other transport failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("server returned {status}: {message}")]
    Response {
        status: reqwest::StatusCode,
        message: String,
    },

    /// The body was not a `{"locations": [...]}` document
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// HTTP status for `Response` errors
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            FetchError::Response { status, .. } => Some(*status),
            FetchError::Network(e) => e.status(),
            FetchError::Parse(_) => None,
        }
    }
}

/// A single location record that was skipped during a load
#[derive(Debug, Clone, PartialEq, Error)]
#[error("location #{index}{}: {reason}", .id.map(|id| format!(" (id {})", id)).unwrap_or_default())]
pub struct ValidationError {
    /// Position of the record in the `locations` array
    pub index: usize,
    /// Record id, when it could be read
    pub id: Option<LocationId>,
    pub reason: String,
}

impl ValidationError {
    pub fn new(index: usize, id: Option<LocationId>, reason: impl Into<String>) -> Self {
        Self {
            index,
            id,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let with_id = ValidationError::new(2, Some(7), "missing coordinates");
        assert_eq!(with_id.to_string(), "location #2 (id 7): missing coordinates");

        let without_id = ValidationError::new(0, None, "not an object");
        assert_eq!(without_id.to_string(), "location #0: not an object");
    }

    #[test]
    fn test_response_error_display() {
        let err = FetchError::Response {
            status: reqwest::StatusCode::FORBIDDEN,
            message: "Insufficient permissions".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "server returned 403 Forbidden: Insufficient permissions"
        );
        assert_eq!(err.status(), Some(reqwest::StatusCode::FORBIDDEN));
    }
}

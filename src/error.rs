//! Error types with HTTP status code mapping.
//!
//! [`TimeMachineError`] is the central error type. Synchronous operations
//! return it directly; failures inside background jobs are written to the
//! job record instead and never surface here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// Uses the same envelope as successful responses:
/// ```json
/// {
///   "success": false,
///   "message": "snapshot not found: abcd1234",
///   "error": { "code": 2001, "kind": "not_found" }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable error message.
    pub message: String,
    /// Classification of the failure.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and classification.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Machine-readable error kind.
    pub kind: &'static str,
}

/// Service error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status               |
/// |-----------|-----------------------|---------------------------|
/// | 1000–1999 | Validation / format   | 400 Bad Request           |
/// | 2000–2999 | Not found             | 404 Not Found             |
/// | 3000–3999 | Server / filesystem   | 500 Internal Server Error |
/// | 4000–4999 | Database / tools      | 502 Bad Gateway           |
#[derive(Debug, thiserror::Error)]
pub enum TimeMachineError {
    /// Opening or pinging a database failed.
    #[error("connection error: {0}")]
    Connect(#[source] sqlx::Error),

    /// The dump or restore tool could not be started or exited non-zero.
    #[error("{tool} failed: {status}\nOutput: {output}")]
    ToolInvocation {
        /// Tool name (`pg_dump`, `psql`).
        tool: String,
        /// Exit status or spawn error.
        status: String,
        /// Combined stdout and stderr.
        output: String,
    },

    /// No snapshot file or cached connection matches the given id.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up.
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// A filename does not follow the snapshot encoding.
    #[error("invalid snapshot filename format: {0}")]
    Format(String),

    /// Creating the restore target database failed.
    #[error("failed to create database {database}: {source}")]
    Provisioning {
        /// Target database name.
        database: String,
        /// Underlying cause.
        #[source]
        source: Box<TimeMachineError>,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Filesystem failure in the backup directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any database statement failing after a successful connect.
    #[error("query error: {0}")]
    Query(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TimeMachineError {
    /// Shorthand for a missing snapshot.
    #[must_use]
    pub fn snapshot_not_found(id: &str) -> Self {
        Self::NotFound {
            kind: "snapshot",
            id: id.to_string(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Format(_) => 1002,
            Self::NotFound { .. } => 2001,
            Self::Internal(_) => 3000,
            Self::Io(_) => 3001,
            Self::Connect(_) => 4001,
            Self::Query(_) => 4002,
            Self::Provisioning { .. } => 4003,
            Self::ToolInvocation { .. } => 4004,
        }
    }

    /// Returns the machine-readable kind for this variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Format(_) => "format",
            Self::NotFound { .. } => "not_found",
            Self::Internal(_) => "internal",
            Self::Io(_) => "io",
            Self::Connect(_) => "connect",
            Self::Query(_) => "query",
            Self::Provisioning { .. } => "provisioning",
            Self::ToolInvocation { .. } => "tool_invocation",
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Format(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Connect(_)
            | Self::Query(_)
            | Self::Provisioning { .. }
            | Self::ToolInvocation { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for TimeMachineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            message: self.to_string(),
            error: ErrorBody {
                code: self.error_code(),
                kind: self.kind(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = TimeMachineError::snapshot_not_found("abcd1234");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), 2001);
        assert_eq!(err.to_string(), "snapshot not found: abcd1234");
    }

    #[test]
    fn tool_failure_embeds_output() {
        let err = TimeMachineError::ToolInvocation {
            tool: "pg_dump".to_string(),
            status: "exit status: 1".to_string(),
            output: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "pg_dump failed: exit status: 1\nOutput: permission denied"
        );
        assert_eq!(err.kind(), "tool_invocation");
    }

    #[test]
    fn provisioning_wraps_cause() {
        let err = TimeMachineError::Provisioning {
            database: "orders_copy".to_string(),
            source: Box::new(TimeMachineError::Query("already exists".to_string())),
        };
        assert!(err.to_string().contains("orders_copy"));
        assert!(err.to_string().contains("already exists"));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn into_response_sets_status() {
        let response = TimeMachineError::InvalidRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

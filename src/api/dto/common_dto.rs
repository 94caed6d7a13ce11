//! Response envelope shared by every endpoint.

use serde::Serialize;
use utoipa::ToSchema;

/// Successful response carrying a payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// `true` unless the operation reported a degraded result.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Operation result.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wraps `data` in a successful envelope.
    #[must_use]
    pub fn ok(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data,
        }
    }
}

/// Successful response with no payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl MessageResponse {
    /// Creates a successful message-only envelope.
    #[must_use]
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

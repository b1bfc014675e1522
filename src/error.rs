//! Error types with HTTP status code mapping.
//!
//! [`FaucetError`] is the central error type of the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! [`WalletError`] describes failures of the external wallet/chain service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "faucet has no money, check back later",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure reported by, or while talking to, the wallet service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// The service could not be reached or answered with a server error.
    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request (e.g. a spend it cannot build).
    #[error("wallet rejected request: {0}")]
    Rejected(String),

    /// No block exists at the requested height.
    #[error("block {0} not found")]
    BlockNotFound(u32),

    /// The service answered with a body that could not be decoded.
    #[error("malformed wallet response: {0}")]
    Decode(String),
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request            |
/// | 2000–2999 | Not Found       | 404 Not Found              |
/// | 3000–3999 | Server/Upstream | 500 / 502                  |
/// | 4000–4999 | Faucet-Specific | 422 Unprocessable Entity   |
#[derive(Debug, thiserror::Error)]
pub enum FaucetError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unreserved, spendable funds cannot cover the payout.
    #[error("faucet has no money, check back later")]
    InsufficientFunds,

    /// The wallet refused or failed to submit a spend. Reserved funds are
    /// released before this is returned.
    #[error("submit failed: {0}")]
    SubmitFailed(#[source] WalletError),

    /// Any other wallet call failed.
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// No block exists at the requested height.
    #[error("block {0} not found")]
    BlockNotFound(u32),

    /// The broadcast hub task is no longer running.
    #[error("broadcast hub closed")]
    HubClosed,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FaucetError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::BlockNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Wallet(_) => 3001,
            Self::SubmitFailed(_) => 3002,
            Self::HubClosed => 3003,
            Self::InsufficientFunds => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::BlockNotFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Wallet(_) | Self::SubmitFailed(_) => StatusCode::BAD_GATEWAY,
            Self::HubClosed | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_is_unprocessable() {
        let err = FaucetError::InsufficientFunds;
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), 4001);
    }

    #[test]
    fn wallet_errors_map_to_bad_gateway() {
        let err = FaucetError::from(WalletError::Unavailable("down".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        let err = FaucetError::SubmitFailed(WalletError::Rejected("no".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("no"));
    }

    #[test]
    fn response_carries_status() {
        let response = FaucetError::InvalidRequest("empty address".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

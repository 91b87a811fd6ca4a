// crates/vmp-http/src/error.rs
// ============================================================================
// Module: HTTP Error Mapping
// Description: Maps `CoreError` onto HTTP status codes and a stable JSON
//              error body (spec.md §7).
// Dependencies: axum, vmp-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! Every handler in this crate returns `Result<_, ApiError>`. `CoreError`'s
//! seven kinds map onto six status codes (spec.md §7): validation -> 400,
//! authorization -> 403, not_found -> 404, conflict -> 409,
//! unavailable/integrity -> 503, internal -> 500. The response body never
//! carries more than `reason` and `message`; internal detail is logged, not
//! returned, so an internal error never leaks SQL or filesystem text to a
//! caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;
use vmp_core::CoreError;

/// Wraps a [`CoreError`] so it can be returned directly from an axum handler.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR || status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(reason = self.0.reason(), error = %self.0, "request failed");
        } else {
            tracing::warn!(reason = self.0.reason(), error = %self.0, "request rejected");
        }
        let body = json!({ "reason": self.0.reason(), "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

/// The status code a [`CoreError`] maps onto (spec.md §7).
#[must_use]
pub fn status_for(error: &CoreError) -> StatusCode {
    match error {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::Authorization(_) => StatusCode::FORBIDDEN,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::Integrity(_) | CoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_its_documented_status() {
        assert_eq!(status_for(&CoreError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&CoreError::authorization("x")), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&CoreError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&CoreError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(status_for(&CoreError::integrity("x")), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(&CoreError::Unavailable("x".to_string())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(&CoreError::Internal("x".to_string())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

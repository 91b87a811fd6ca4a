// crates/vmp-core/src/error.rs
// ============================================================================
// Module: VMP Core Error Taxonomy
// Description: The seven error kinds shared by every component.
// Purpose: Give the HTTP boundary a single, stable mapping from failure to
//          status code without leaking internal detail to callers.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`CoreError`] is the one error type every vmp-core operation returns.
//! Its variants are the kinds of spec.md §7 ("error kinds, not type
//! names"), each carrying enough structured detail for the HTTP boundary
//! to log a correlatable message without exposing it to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// The seven error kinds of spec.md §7.
///
/// # Invariants
/// - Variants are stable for programmatic handling at the HTTP boundary.
/// - No variant embeds a lower-layer error type directly; callers convert
///   backend errors (store, object-store, notify) into this enum explicitly
///   so vmp-core stays free of I/O dependencies.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input shape or constraint violation.
    #[error("validation: {0}")]
    Validation(String),

    /// Actor lacks permission for the requested target.
    #[error("authorization: {0}")]
    Authorization(String),

    /// Referenced entity is absent in the caller's scope.
    #[error("not found: {0}")]
    NotFound(String),

    /// Version race, duplicate unique key, or disallowed state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Checksum mismatch or storage/DB inconsistency.
    #[error("integrity: {0}")]
    Integrity(String),

    /// A store or object-store deadline was exceeded.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// An unexpected failure with no more specific kind.
    #[error("internal: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns the short machine-readable reason used in HTTP error bodies.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authorization(_) => "authorization",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Integrity(_) => "integrity",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Builds a validation error from a displayable detail.
    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    /// Builds an authorization error from a displayable detail.
    #[must_use]
    pub fn authorization(detail: impl Into<String>) -> Self {
        Self::Authorization(detail.into())
    }

    /// Builds a not-found error from a displayable detail.
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }

    /// Builds a conflict error from a displayable detail.
    #[must_use]
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict(detail.into())
    }

    /// Builds an integrity error from a displayable detail.
    #[must_use]
    pub fn integrity(detail: impl Into<String>) -> Self {
        Self::Integrity(detail.into())
    }
}

/// Convenience alias for vmp-core fallible operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::CoreError;

    #[test]
    fn reason_is_stable_per_kind() {
        assert_eq!(CoreError::validation("bad").reason(), "validation");
        assert_eq!(CoreError::not_found("missing").reason(), "not_found");
        assert_eq!(CoreError::conflict("race").reason(), "conflict");
    }
}

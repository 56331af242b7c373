//! Shared primitives for all Rust crates in Rolegate.

#![forbid(unsafe_code)]

/// Authenticated identity primitives shared across services.
pub mod auth;

use thiserror::Error;

pub use auth::AuthenticatedUser;

/// Result type used across Rolegate crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Backing store is unreachable; callers must fail closed rather than
    /// treat this as a deny decision.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn errors_render_their_category() {
        let error = AppError::Unavailable("store down".to_owned());
        assert_eq!(error.to_string(), "unavailable: store down");

        let error = AppError::Conflict("role 'editor' already exists".to_owned());
        assert_eq!(error.to_string(), "conflict: role 'editor' already exists");
    }
}

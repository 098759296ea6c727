//! Error types for pollhub.

use thiserror::Error;

use crate::validation::{ViolationKind, Violations};

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Validation error: {0}")]
    Validation(Violations),

    #[error("Reference error: {0}")]
    Reference(String),

    #[error("Uniqueness error: {0}")]
    Uniqueness(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a validation error carrying a single field-scoped violation.
    #[must_use]
    pub fn invalid(field: &str, kind: ViolationKind, message: impl Into<String>) -> Self {
        let mut violations = Violations::new();
        violations.push(field, kind, message);
        Self::Validation(violations)
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Reference(_) => "REFERENCE_ERROR",
            Self::Uniqueness(_) => "UNIQUENESS_ERROR",
            Self::State(_) => "STATE_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller caused this error (4xx-equivalent).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Config(_) | Self::Internal(_)
        )
    }

    /// Field-level violations, if this is a validation error.
    #[must_use]
    pub const fn violations(&self) -> Option<&Violations> {
        match self {
            Self::Validation(v) => Some(v),
            _ => None,
        }
    }
}

// === From implementations ===

impl From<Violations> for AppError {
    fn from(violations: Violations) -> Self {
        match violations.dominant_kind() {
            Some(ViolationKind::Authorization) => Self::Forbidden(violations.to_string()),
            Some(ViolationKind::Reference) => Self::Reference(violations.to_string()),
            Some(ViolationKind::State) => Self::State(violations.to_string()),
            Some(ViolationKind::Uniqueness) => Self::Uniqueness(violations.to_string()),
            _ => Self::Validation(violations),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.into())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

//! Error types for outfitsave.
//!
//! This module defines all error types that can occur throughout the outfitsave system.

/// The main error type for outfitsave operations.
#[derive(Debug, thiserror::Error)]
pub enum OutfitSaveError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// Configuration file not found
    #[error("Configuration file not found at path: {0}")]
    ConfigNotFound(String),

    /// Outfit id does not resolve to a stored record
    #[error("Outfit not found: {0}")]
    NotFound(String),

    /// No unique share slug could be found within the attempt bound
    #[error("Failed to allocate a unique share slug after {attempts} attempts")]
    SlugAllocationExhausted { attempts: u32 },

    /// The store rejected a slug write because another outfit holds it
    #[error("Share slug '{0}' is already taken")]
    SlugConflict(String),

    /// Caller is not allowed to act on the outfit
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request carried no usable identity
    #[error("Authentication required")]
    Unauthorized,

    /// Invalid caller-supplied input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record store failures (connection loss, timeouts, ...)
    #[error("Store error: {0}")]
    Store(String),

    /// JSON serialization errors (wraps serde_json errors)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OutfitSaveError {
    /// Create a config error with a message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid config error
    pub fn invalid_config<S: Into<String>>(field: S, message: S) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error for an outfit id
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store(message.into())
    }

    /// Whether the allocator should treat this error as a slug collision and
    /// draw a new candidate.
    pub fn is_retryable_collision(&self) -> bool {
        matches!(self, Self::SlugConflict(_))
    }

    /// Check if this error was caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Forbidden(_) | Self::Unauthorized | Self::InvalidInput(_)
        )
    }
}

/// Result type alias for outfitsave operations
pub type Result<T> = std::result::Result<T, OutfitSaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OutfitSaveError::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_invalid_config_error() {
        let err = OutfitSaveError::invalid_config("share.base_url", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'share.base_url': must not be empty"
        );
    }

    #[test]
    fn test_exhausted_display() {
        let err = OutfitSaveError::SlugAllocationExhausted { attempts: 10 };
        assert_eq!(
            err.to_string(),
            "Failed to allocate a unique share slug after 10 attempts"
        );
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(OutfitSaveError::SlugConflict("a-123456".into()).is_retryable_collision());
        assert!(!OutfitSaveError::store("connection reset").is_retryable_collision());
        assert!(!OutfitSaveError::not_found("x").is_retryable_collision());
    }

    #[test]
    fn test_client_errors() {
        assert!(OutfitSaveError::not_found("x").is_client_error());
        assert!(OutfitSaveError::Unauthorized.is_client_error());
        assert!(!OutfitSaveError::SlugAllocationExhausted { attempts: 10 }.is_client_error());
        assert!(!OutfitSaveError::store("down").is_client_error());
    }
}

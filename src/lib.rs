//! AcFun Uploader Library
//!
//! A Rust library for publishing videos on AcFun: fragmented upload with
//! retry, asset registration, cover upload and publication, plus cookie and
//! password login.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        // Test that our constants are accessible
        assert_eq!(MAX_ATTEMPTS, 3);
        assert_eq!(ENV_USERNAME, "ACFUN_USERNAME");
        assert!(USER_AGENT.contains("Mozilla"));
    }

    #[test]
    fn test_error_types() {
        // Test that our error types work correctly
        let auth_error = errors::AuthError::MissingCredentials;
        let app_error = AppError::Auth(auth_error);

        assert_eq!(app_error.category(), "authentication");
        assert!(!app_error.is_recoverable());
    }
}

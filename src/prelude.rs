//! Prelude module for the AcFun uploader library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use acfun_uploader::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use acfun_uploader::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let client = AcfunClient::with_endpoints(config.client_config(), config.endpoints()?)?;
//!     let transport = client.fragment_transport(false)?;
//!     let policy = config.retry_policy()?;
//!
//!     // Continue with UploadOrchestrator::new(&client, &transport, policy)...
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    AcfunClient, AttributionKind, ClientConfig, Endpoints, HttpFragmentTransport, MemberApi,
    PublicationMetadata, PublishReport, PublishRequest, RetryPolicy, StageOutcome,
    TransferObserver, UploadOrchestrator, UploadState,
};

// Authentication functions
pub use crate::auth::{establish_session, get_auth_status, AuthStatus, SessionOptions};

// Configuration
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{ENV_PASSWORD, ENV_USERNAME, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};

// Common external crate re-exports for convenience
pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        // Verify that all essential types are available through prelude
        let _client_config = ClientConfig::default();
        let _endpoints = Endpoints::default();
        let policy = RetryPolicy::default();
        assert!(!policy.allow_insecure_retry);

        // Test that constants are available
        assert_eq!(ENV_PASSWORD, "ACFUN_PASSWORD");
    }

    #[test]
    fn test_prelude_integration_pattern() {
        let config = AppConfig::default();
        let client =
            AcfunClient::with_endpoints(config.client_config(), config.endpoints().unwrap())
                .unwrap();
        assert!(client.fragment_transport(false).is_ok());
        assert_eq!(client.endpoints(), &Endpoints::default());
    }
}

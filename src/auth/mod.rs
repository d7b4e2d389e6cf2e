//! Authentication management for AcFun sessions
//!
//! This module loads and saves cookie files, resolves credentials and
//! establishes a logged-in session on an [`crate::app::AcfunClient`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use acfun_uploader::app::{AcfunClient, ClientConfig};
//! use acfun_uploader::auth::{establish_session, SessionOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AcfunClient::new(ClientConfig::default())?;
//! let options = SessionOptions {
//!     cookie_file: PathBuf::from("cookies/ac_cookies.txt"),
//!     username: None,
//!     password: None,
//!     save_cookies: true,
//!     interactive: false,
//! };
//! establish_session(&client, &options).await?;
//! # Ok(())
//! # }
//! ```

pub mod cookies;
pub mod credentials;

// Re-export main public API
pub use cookies::{
    install_cookies, load_cookie_file, parse_cookie_file, remove_cookie_file, save_cookie_file,
    StoredCookie,
};
pub use credentials::{
    check_credentials, establish_session, get_auth_status, prompt_credentials,
    resolve_credentials, AuthStatus, Credentials, SessionOptions, SessionSource,
};

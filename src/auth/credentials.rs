//! Credential resolution and session establishment
//!
//! A session is established from the cookie file when its cookies still
//! carry a login. Otherwise a password login is made with credentials taken
//! from the command line, the environment or an interactive prompt, and the
//! new cookies are saved for the next run.

use std::env;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::app::AcfunClient;
use crate::auth::cookies::{load_cookie_file, save_cookie_file};
use crate::constants::env as env_constants;
use crate::errors::{AuthError, AuthResult};

/// Username and password for a password login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Resolves credentials from arguments first, then the environment
///
/// Returns `None` unless both a username and a password are found.
pub fn resolve_credentials(
    username: Option<String>,
    password: Option<String>,
) -> Option<Credentials> {
    let username = username
        .or_else(|| env::var(env_constants::USERNAME).ok())
        .filter(|value| !value.trim().is_empty())?;
    let password = password
        .or_else(|| env::var(env_constants::PASSWORD).ok())
        .filter(|value| !value.is_empty())?;
    Some(Credentials {
        username: username.trim().to_string(),
        password,
    })
}

/// Whether both credential environment variables are set
pub fn check_credentials() -> bool {
    env::var(env_constants::USERNAME).is_ok() && env::var(env_constants::PASSWORD).is_ok()
}

/// Prompt user for credentials interactively
pub fn prompt_credentials() -> AuthResult<Credentials> {
    print!("AcFun username (phone or email): ");
    io::stdout().flush().map_err(AuthError::CredentialStorage)?;

    let mut username = String::new();
    io::stdin()
        .read_line(&mut username)
        .map_err(AuthError::CredentialStorage)?;
    let username = username.trim().to_string();
    validate_username(&username)?;

    let password = rpassword::prompt_password("AcFun password: ")
        .map_err(AuthError::CredentialStorage)?;
    if password.is_empty() {
        return Err(AuthError::InvalidUsername {
            reason: "Password cannot be empty".to_string(),
        });
    }

    Ok(Credentials { username, password })
}

fn validate_username(username: &str) -> AuthResult<()> {
    if username.is_empty() {
        return Err(AuthError::InvalidUsername {
            reason: "Username cannot be empty".to_string(),
        });
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidUsername {
            reason: "Username cannot contain whitespace".to_string(),
        });
    }
    Ok(())
}

/// How [`establish_session`] obtains a logged-in session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Cookie file to read, and to write after a password login
    pub cookie_file: PathBuf,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Write cookies after a password login
    pub save_cookies: bool,
    /// Prompt for credentials when none are configured
    pub interactive: bool,
}

/// Where the session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Saved cookies were still logged in
    Cookies { installed: usize },
    /// A password login was made
    Password,
}

/// Makes `client` logged in, from cookies or by password
///
/// # Errors
///
/// Returns `AuthError` if the saved cookies are not logged in and no
/// credentials are available, or the password login fails.
pub async fn establish_session(
    client: &AcfunClient,
    options: &SessionOptions,
) -> AuthResult<SessionSource> {
    if let Some(installed) = restore_cookies(client, &options.cookie_file).await? {
        return Ok(SessionSource::Cookies { installed });
    }

    let credentials = match resolve_credentials(options.username.clone(), options.password.clone())
    {
        Some(credentials) => credentials,
        None if options.interactive => prompt_credentials()?,
        None => return Err(AuthError::MissingCredentials),
    };

    let cookies = client
        .login(&credentials.username, &credentials.password)
        .await?;

    if options.save_cookies {
        if let Err(e) = save_cookie_file(&options.cookie_file, &cookies) {
            tracing::warn!(
                "Could not save cookies to {}: {}",
                options.cookie_file.display(),
                e
            );
        }
    }

    Ok(SessionSource::Password)
}

/// Loads cookies from `path` and checks they are still logged in
///
/// Returns the number of installed cookies when they are.
async fn restore_cookies(client: &AcfunClient, path: &Path) -> AuthResult<Option<usize>> {
    if !path.exists() {
        tracing::info!("Cookie file {} not found", path.display());
        return Ok(None);
    }

    let cookies = match load_cookie_file(path) {
        Ok(cookies) => cookies,
        Err(e) => {
            tracing::warn!("Ignoring unusable cookie file {}: {}", path.display(), e);
            return Ok(None);
        }
    };

    let installed = client.install_cookies(&cookies);
    if installed == 0 {
        return Ok(None);
    }

    if client.check_login().await? {
        tracing::info!("Logged in with cookies from {}", path.display());
        Ok(Some(installed))
    } else {
        tracing::warn!("Cookies in {} are no longer logged in", path.display());
        Ok(None)
    }
}

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Cookie file location
    pub cookie_file: PathBuf,
    /// Cookies found in the file, `None` when the file is missing or unusable
    pub cookie_count: Option<usize>,
    /// Whether both credential environment variables are set
    pub env_credentials: bool,
    /// Whether the cookies carry a login (None = not tested)
    pub logged_in: Option<bool>,
}

impl AuthStatus {
    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (self.cookie_count, self.logged_in, self.env_credentials) {
            (_, Some(true), _) => "Logged in with saved cookies".to_string(),
            (Some(_), Some(false), true) => {
                "Saved cookies expired; credentials will be used to log in again".to_string()
            }
            (Some(_), Some(false), false) => {
                "Saved cookies expired - run 'auth login' to sign in again".to_string()
            }
            (Some(_), None, _) => "Cookies saved but not verified".to_string(),
            (None, _, true) => "No saved cookies; credentials configured".to_string(),
            (None, _, false) => "Not logged in - run 'auth login' to sign in".to_string(),
        }
    }
}

/// Check current authentication status without network access
pub fn get_auth_status(cookie_file: &Path) -> AuthStatus {
    AuthStatus {
        cookie_file: cookie_file.to_path_buf(),
        cookie_count: load_cookie_file(cookie_file).ok().map(|c| c.len()),
        env_credentials: check_credentials(),
        logged_in: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_arguments() {
        let credentials =
            resolve_credentials(Some(" user@example.com ".to_string()), Some("pw".to_string()))
                .unwrap();
        assert_eq!(credentials.username, "user@example.com");
        assert_eq!(credentials.password, "pw");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("13800000000").is_ok());
        assert!(validate_username("user@example.com").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("two words").is_err());
    }

    #[test]
    fn test_auth_status_messages() {
        let mut status = AuthStatus {
            cookie_file: PathBuf::from("cookies.txt"),
            cookie_count: None,
            env_credentials: false,
            logged_in: None,
        };
        assert!(status.status_message().contains("Not logged in"));

        status.env_credentials = true;
        assert!(status.status_message().contains("credentials configured"));

        status.cookie_count = Some(4);
        assert!(status.status_message().contains("not verified"));

        status.logged_in = Some(false);
        assert!(status.status_message().contains("expired"));

        status.logged_in = Some(true);
        assert!(status.status_message().contains("Logged in"));
    }

    #[test]
    fn test_status_without_cookie_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let status = get_auth_status(&dir.path().join("missing.txt"));
        assert_eq!(status.cookie_count, None);
        assert_eq!(status.logged_in, None);
    }
}

//! AcFun account authentication
//!
//! Password sign-in against the account service and the login-state check
//! against the member API. Session cookies set by the sign-in response are
//! captured so they can be persisted.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::app::client::http::{decode_json, HttpHandler};
use crate::app::client::Endpoints;
use crate::auth::StoredCookie;
use crate::constants::{acfun, upload};
use crate::errors::{AuthError, AuthResult};

/// Sign-in response body
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    result: Option<i64>,
    #[serde(default)]
    error_msg: Option<String>,
}

/// Channel list response; only the result code matters
#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    result: Option<i64>,
}

/// Handles AcFun authentication operations
pub struct AuthHandler<'a> {
    http: &'a HttpHandler,
    endpoints: &'a Endpoints,
}

impl<'a> AuthHandler<'a> {
    pub fn new(http: &'a HttpHandler, endpoints: &'a Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Signs in with a username and password
    ///
    /// On success the session cookies are already in the client's cookie
    /// jar; they are also returned for persistence.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if:
    /// - The sign-in request fails
    /// - The response is not JSON
    /// - The service rejects the credentials
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<Vec<StoredCookie>> {
        let url = self.endpoints.id_url(acfun::LOGIN_PATH);
        tracing::info!("Signing in to AcFun as {}", username);

        let form = [
            ("username", username),
            ("password", password),
            ("key", ""),
            ("captcha", ""),
        ];
        let response = self
            .http
            .send_form(url.clone(), &form)
            .await
            .map_err(AuthError::Http)?;

        let fallback_domain = url.host_str().unwrap_or_default().to_string();
        let cookies: Vec<StoredCookie> = response
            .cookies()
            .map(|cookie| StoredCookie::from_response(&cookie, &fallback_domain))
            .collect();

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Http)?;
        tracing::debug!("Sign-in response status: {}", status);

        let login: LoginResponse = decode_json(&body)?;
        if login.result != Some(upload::MEMBER_OK) {
            let message = login
                .error_msg
                .unwrap_or_else(|| "wrong username or password".to_string());
            tracing::warn!("AcFun login failed for {}: {}", username, message);
            return Err(AuthError::LoginFailed { message });
        }

        tracing::info!("Login succeeded, {} cookies received", cookies.len());
        Ok(cookies)
    }

    /// Checks whether the current cookies carry a logged-in session
    ///
    /// # Errors
    ///
    /// Returns `AuthError` only if the member API cannot be reached
    pub async fn check_login(&self) -> AuthResult<bool> {
        let url = self.endpoints.member_url(acfun::MY_CHANNELS_PATH);
        let (status, body) = self.http.get_text(url).await?;
        let logged_in = interpret_login_check(status, &body);
        tracing::debug!("Login check: status {}, logged in: {}", status, logged_in);
        Ok(logged_in)
    }
}

/// Reads the channel-list response
///
/// JSON with `result == 0` means logged in. Anything else that is JSON, or
/// an HTML page mentioning login, means not logged in. Other HTML pages are
/// the creator centre itself.
fn interpret_login_check(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::OK {
        return false;
    }
    if let Ok(response) = serde_json::from_str::<ChannelsResponse>(body) {
        return response.result == Some(upload::MEMBER_OK);
    }
    let lower = body.to_lowercase();
    !(lower.contains("login") || body.contains("登录"))
}

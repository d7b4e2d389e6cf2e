//! HTTP client implementation for AcFun interaction
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration, building and endpoint URLs
//! - `auth`: password sign-in and login-state check
//! - `http`: rate-limited member API requests
//! - `upload`: fragment transfer to the upload host

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use url::Url;

use crate::app::api::{
    CoverTokenResponse, CoverUrlResponse, CreateDougaResponse, CreateVideoResponse, MemberApi,
    ResultResponse, TokenResponse,
};
use crate::app::models::PublicationRecord;
use crate::auth::{install_cookies, StoredCookie};
use crate::constants::{acfun, upload as protocol};
use crate::errors::{AuthResult, TransportError, TransportResult};

pub mod auth;
pub mod config;
pub mod http;
pub mod upload;

pub use config::{ClientConfig, Endpoints};
pub use upload::HttpFragmentTransport;

use auth::AuthHandler;
use http::HttpHandler;

/// Outcome of probing one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCheck {
    pub url: Url,
    /// HTTP status, when the host answered
    pub status: Option<u16>,
    /// Failure description, when the request failed
    pub error: Option<String>,
}

impl HostCheck {
    pub fn is_ok(&self) -> bool {
        self.status == Some(200)
    }
}

/// Result of [`AcfunClient::probe_connectivity`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub checks: Vec<HostCheck>,
}

impl ConnectivityReport {
    /// Whether every probed host answered 200
    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(HostCheck::is_ok)
    }

    /// Hosts that did not answer 200
    pub fn failures(&self) -> impl Iterator<Item = &HostCheck> {
        self.checks.iter().filter(|check| !check.is_ok())
    }
}

/// HTTP client for the AcFun member API
///
/// Holds the cookie jar carrying the login session, rate limits every
/// member API call and implements [`MemberApi`] for the publish pipeline.
#[derive(Debug)]
pub struct AcfunClient {
    http: HttpHandler,
    jar: Arc<Jar>,
    endpoints: Endpoints,
    config: ClientConfig,
}

impl AcfunClient {
    /// Creates a client against the production endpoints
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if HTTP client creation fails
    pub fn new(config: ClientConfig) -> AuthResult<Self> {
        Self::with_endpoints(config, Endpoints::default())
    }

    /// Creates a client against custom endpoints
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if HTTP client creation fails or the rate limit
    /// is zero
    pub fn with_endpoints(config: ClientConfig, endpoints: Endpoints) -> AuthResult<Self> {
        let jar = Arc::new(Jar::default());
        let client = config.build_member_client(Arc::clone(&jar), &endpoints)?;
        let http = HttpHandler::new(client, config.rate_limit_rps)?;

        tracing::debug!("Created AcFun client for {}", endpoints.member);

        Ok(Self {
            http,
            jar,
            endpoints,
            config,
        })
    }

    /// Endpoints this client talks to
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Adds persisted cookies to the session; returns how many were usable
    pub fn install_cookies(&self, cookies: &[StoredCookie]) -> usize {
        let installed = install_cookies(&self.jar, cookies, &self.endpoints.member);
        tracing::info!("Loaded {} of {} cookies", installed, cookies.len());
        installed
    }

    /// Signs in with a username and password
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the request fails or the credentials are
    /// rejected
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<Vec<StoredCookie>> {
        AuthHandler::new(&self.http, &self.endpoints)
            .login(username, password)
            .await
    }

    /// Checks whether the session is logged in
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the member API cannot be reached
    pub async fn check_login(&self) -> AuthResult<bool> {
        AuthHandler::new(&self.http, &self.endpoints)
            .check_login()
            .await
    }

    /// Probes the public site, the member API and the upload host
    ///
    /// Every host is probed; the report says which ones did not answer 200.
    pub async fn probe_connectivity(&self) -> ConnectivityReport {
        let client = match self.config.build_probe_client() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Could not build probe client: {}", e);
                return ConnectivityReport {
                    checks: vec![HostCheck {
                        url: self.endpoints.site.clone(),
                        status: None,
                        error: Some(e.to_string()),
                    }],
                };
            }
        };

        let targets = [
            self.endpoints.site.clone(),
            self.endpoints.member.clone(),
            self.endpoints.upload.clone(),
        ];

        let mut checks = Vec::with_capacity(targets.len());
        for url in targets {
            let check = match client.get(url.clone()).send().await {
                Ok(response) => HostCheck {
                    url,
                    status: Some(response.status().as_u16()),
                    error: None,
                },
                Err(e) => HostCheck {
                    url,
                    status: None,
                    error: Some(e.to_string()),
                },
            };

            if check.is_ok() {
                tracing::info!("Network check passed: {}", check.url);
            } else {
                tracing::warn!(
                    "Network check failed: {} ({})",
                    check.url,
                    check
                        .error
                        .clone()
                        .or_else(|| check.status.map(|s| format!("status {}", s)))
                        .unwrap_or_default()
                );
            }
            checks.push(check);
        }

        ConnectivityReport { checks }
    }

    /// Builds the fragment transport for the upload host
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if an HTTP client cannot be built
    pub fn fragment_transport(&self, allow_insecure_retry: bool) -> AuthResult<HttpFragmentTransport> {
        HttpFragmentTransport::new(&self.config, &self.endpoints, allow_insecure_retry)
    }

    fn upload_page(&self) -> String {
        self.endpoints
            .member_url(acfun::UPLOAD_PAGE_PATH)
            .to_string()
    }
}

#[async_trait]
impl MemberApi for AcfunClient {
    async fn request_upload_token(
        &self,
        file_name: &str,
        size: u64,
    ) -> TransportResult<TokenResponse> {
        let form = [
            ("fileName", file_name.to_string()),
            ("size", size.to_string()),
            ("template", protocol::SESSION_TEMPLATE.to_string()),
        ];
        self.http
            .post_form(self.endpoints.member_url(acfun::TOKEN_PATH), &form, None)
            .await
    }

    async fn create_video(
        &self,
        video_key: i64,
        file_name: &str,
    ) -> TransportResult<CreateVideoResponse> {
        let form = [
            ("videoKey", video_key.to_string()),
            ("fileName", file_name.to_string()),
            ("vodType", protocol::VOD_TYPE.to_string()),
        ];
        let referer = self.upload_page();
        self.http
            .post_form(
                self.endpoints.member_url(acfun::CREATE_VIDEO_PATH),
                &form,
                Some(&referer),
            )
            .await
    }

    async fn upload_finish(&self, task_id: i64) -> TransportResult<ResultResponse> {
        let form = [("taskId", task_id.to_string())];
        self.http
            .post_form(self.endpoints.member_url(acfun::FINISH_PATH), &form, None)
            .await
    }

    async fn request_cover_token(&self, file_name: &str) -> TransportResult<CoverTokenResponse> {
        let form = [("fileName", file_name.to_string())];
        self.http
            .post_form(self.endpoints.member_url(acfun::COVER_TOKEN_PATH), &form, None)
            .await
    }

    async fn resolve_cover_url(&self, token: &str) -> TransportResult<CoverUrlResponse> {
        let form = [
            ("bizFlag", protocol::COVER_BIZ_FLAG.to_string()),
            ("token", token.to_string()),
        ];
        self.http
            .post_form(self.endpoints.member_url(acfun::COVER_URL_PATH), &form, None)
            .await
    }

    async fn create_douga(
        &self,
        record: &PublicationRecord,
    ) -> TransportResult<CreateDougaResponse> {
        let form = record
            .form_fields()
            .map_err(|e| TransportError::Encode {
                reason: e.to_string(),
            })?;
        let referer = self.upload_page();
        self.http
            .post_form(
                self.endpoints.member_url(acfun::CREATE_DOUGA_PATH),
                &form,
                Some(&referer),
            )
            .await
    }
}

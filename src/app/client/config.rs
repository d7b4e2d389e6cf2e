//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP
//! clients used against the member API and the fragment upload host.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{acfun, http, limits};
use crate::errors::{AuthError, AuthResult};

/// Configuration for the HTTP clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Request timeout for member API calls
    pub request_timeout: Duration,
    /// Request timeout for a single fragment transfer
    pub fragment_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit for member API calls (requests per second)
    pub rate_limit_rps: u32,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            request_timeout: http::DEFAULT_TIMEOUT,
            fragment_timeout: http::FRAGMENT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Builds the cookie-carrying client used for member API calls
    pub fn build_member_client(&self, jar: Arc<Jar>, endpoints: &Endpoints) -> AuthResult<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(http::ACCEPT_LANGUAGE),
        );
        let origin = endpoints.member_origin();
        if let Ok(value) = HeaderValue::from_str(&origin) {
            headers.insert(ORIGIN, value);
            if let Ok(referer) = HeaderValue::from_str(&format!("{}/", origin)) {
                headers.insert(REFERER, referer);
            }
        }

        let builder = self
            .base_builder()
            .cookie_provider(jar)
            .default_headers(headers)
            .timeout(self.request_timeout);

        builder.build().map_err(AuthError::Http)
    }

    /// Builds a client for the upload host
    ///
    /// With `verify_tls == false` the client accepts any server certificate.
    pub fn build_upload_client(&self, verify_tls: bool) -> AuthResult<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        self.base_builder()
            .default_headers(headers)
            .timeout(self.fragment_timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(AuthError::Http)
    }

    /// Builds a short-timeout client for connectivity probes
    pub fn build_probe_client(&self) -> AuthResult<Client> {
        self.base_builder()
            .timeout(http::PROBE_TIMEOUT)
            .build()
            .map_err(AuthError::Http)
    }

    fn base_builder(&self) -> reqwest::ClientBuilder {
        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .tcp_nodelay(self.tcp_nodelay);

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder
    }
}

/// Base URLs of the remote services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Creator-centre API
    pub member: Url,
    /// Fragment upload host
    pub upload: Url,
    /// Account service
    pub id: Url,
    /// Public site, only probed for connectivity
    pub site: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            member: Url::parse(acfun::MEMBER_BASE_URL).expect("Member URL should be valid"),
            upload: Url::parse(acfun::UPLOAD_BASE_URL).expect("Upload URL should be valid"),
            id: Url::parse(acfun::ID_BASE_URL).expect("Account URL should be valid"),
            site: Url::parse(acfun::SITE_URL).expect("Site URL should be valid"),
        }
    }
}

impl Endpoints {
    /// Parses endpoint base URLs
    pub fn parse(member: &str, upload: &str, id: &str, site: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            member: Url::parse(member)?,
            upload: Url::parse(upload)?,
            id: Url::parse(id)?,
            site: Url::parse(site)?,
        })
    }

    /// Points every service at one base URL (local test servers)
    pub fn single_host(base: &str) -> Result<Self, url::ParseError> {
        Self::parse(base, base, base, base)
    }

    /// Member API URL for `path`
    pub fn member_url(&self, path: &str) -> Url {
        join(&self.member, path)
    }

    /// Upload host URL for `path`
    pub fn upload_url(&self, path: &str) -> Url {
        join(&self.upload, path)
    }

    /// Account service URL for `path`
    pub fn id_url(&self, path: &str) -> Url {
        join(&self.id, path)
    }

    /// `scheme://host[:port]` of the member API, used for Origin headers
    pub fn member_origin(&self) -> String {
        self.member.origin().ascii_serialization()
    }
}

fn join(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url
}

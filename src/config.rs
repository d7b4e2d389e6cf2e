//! Configuration management for the AcFun uploader
//!
//! Settings are read from a TOML file; every section and key is optional and
//! falls back to the built-in defaults. The file is searched for in:
//!
//! 1. the path given with `--config`
//! 2. `./acfun-uploader.toml`
//! 3. `<user config dir>/acfun-uploader/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, Endpoints, RetryPolicy};
use crate::constants::{acfun, auth, batch, files, http, limits};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Retry settings for fragment transfers
    pub retry: RetryConfigToml,
    /// Service base URLs
    pub endpoints: EndpointsConfigToml,
    /// Cookie session settings
    pub auth: AuthConfigToml,
    /// Batch upload settings
    pub batch: BatchConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Member API request timeout in seconds
    pub request_timeout_secs: u64,
    /// Timeout for one fragment transfer in seconds
    pub fragment_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Member API rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Override of the browser user agent
    pub user_agent: Option<String>,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            tcp_keepalive_secs: Some(30),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            fragment_timeout_secs: http::FRAGMENT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            user_agent: None,
        }
    }
}

/// TOML-friendly retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfigToml {
    /// Attempts per fragment, first try included
    pub max_attempts: u32,
    /// Backoff unit in milliseconds; attempt n waits `base * 2^(n-1)`
    pub base_delay_ms: u64,
    /// Skip certificate validation on fragment retries
    pub allow_insecure_retry: bool,
}

impl Default for RetryConfigToml {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_ATTEMPTS,
            base_delay_ms: limits::RETRY_BASE_DELAY_MS,
            allow_insecure_retry: false,
        }
    }
}

/// TOML-friendly endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfigToml {
    /// Creator-centre API
    pub member: String,
    /// Fragment upload host
    pub upload: String,
    /// Account (sign-in) service
    pub login: String,
    /// Public site, probed for connectivity
    pub site: String,
}

impl Default for EndpointsConfigToml {
    fn default() -> Self {
        Self {
            member: acfun::MEMBER_BASE_URL.to_string(),
            upload: acfun::UPLOAD_BASE_URL.to_string(),
            login: acfun::ID_BASE_URL.to_string(),
            site: acfun::SITE_URL.to_string(),
        }
    }
}

/// TOML-friendly cookie session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfigToml {
    /// Cookie file read before uploading and written after password login
    pub cookie_file: PathBuf,
    /// Persist cookies after a successful password login
    pub save_cookies: bool,
}

impl Default for AuthConfigToml {
    fn default() -> Self {
        Self {
            cookie_file: PathBuf::from(auth::DEFAULT_COOKIE_FILE),
            save_cookies: true,
        }
    }
}

/// TOML-friendly batch upload configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfigToml {
    /// Pause between uploads in seconds
    pub interval_secs: u64,
    /// Prefix prepended to every title derived from a file name
    pub title_prefix: String,
    /// Channel used when none is given on the command line
    pub channel_id: u32,
}

impl Default for BatchConfigToml {
    fn default() -> Self {
        Self {
            interval_secs: batch::UPLOAD_INTERVAL.as_secs(),
            title_prefix: String::new(),
            channel_id: batch::DEFAULT_CHANNEL_ID,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the first file found, or the defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicitly given file does not exist or
    /// the file found cannot be read or parsed.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Writes the commented default configuration to `path`
    ///
    /// Returns the path written. An existing file is only replaced when
    /// `force` is set.
    pub async fn write_default(path: Option<PathBuf>, force: bool) -> ConfigResult<PathBuf> {
        let config_path = match path {
            Some(path) => path,
            None => Self::default_config_path()?,
        };

        if config_path.exists() && !force {
            return Err(ConfigError::InvalidValue {
                field: "path".to_string(),
                value: config_path.display().to_string(),
                reason: "File already exists; pass --force to overwrite".to_string(),
            });
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&config_path, Self::generate_default_config_content()).await?;

        info!("Wrote default configuration to {}", config_path.display());
        Ok(config_path)
    }

    /// Renders the effective configuration as TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// HTTP client settings
    pub fn client_config(&self) -> ClientConfig {
        self.client.to_runtime_config()
    }

    /// Fragment retry policy
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `max_attempts` is zero
    pub fn retry_policy(&self) -> ConfigResult<RetryPolicy> {
        self.retry.to_runtime_config()
    }

    /// Service endpoints
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a URL does not parse
    pub fn endpoints(&self) -> ConfigResult<Endpoints> {
        self.endpoints.to_runtime_config()
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Ok(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir
            .join(files::CONFIG_DIR_NAME)
            .join(files::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# AcFun Uploader Configuration
# Every key is optional; removed keys fall back to these defaults.

[client]
# HTTP client settings
tcp_keepalive_secs = 30
tcp_nodelay = true
pool_idle_timeout_secs = {pool_idle}
request_timeout_secs = {request}
fragment_timeout_secs = {fragment}
connect_timeout_secs = {connect}
rate_limit_rps = {rps}
# user_agent = "Mozilla/5.0 ..."

[retry]
# Attempts per fragment, first try included
max_attempts = {attempts}
# Backoff unit; attempt n waits base * 2^(n-1) ms
base_delay_ms = {base_delay}
# Retry fragments without certificate validation after a failed first attempt.
# Weakens transport security; leave off unless the upload host's TLS is broken.
allow_insecure_retry = false

[endpoints]
member = "{member}"
upload = "{upload}"
login = "{login}"
site = "{site}"

[auth]
# Netscape or JSON cookie file
cookie_file = "{cookie_file}"
# Save cookies after a password login
save_cookies = true

[batch]
# Seconds to wait between uploads
interval_secs = {interval}
title_prefix = ""
channel_id = {channel}

[logging]
level = "info"  # error, warn, info, debug, trace
"#,
            pool_idle = http::POOL_IDLE_TIMEOUT.as_secs(),
            request = http::DEFAULT_TIMEOUT.as_secs(),
            fragment = http::FRAGMENT_TIMEOUT.as_secs(),
            connect = http::CONNECT_TIMEOUT.as_secs(),
            rps = limits::DEFAULT_RATE_LIMIT_RPS,
            attempts = limits::MAX_ATTEMPTS,
            base_delay = limits::RETRY_BASE_DELAY_MS,
            member = acfun::MEMBER_BASE_URL,
            upload = acfun::UPLOAD_BASE_URL,
            login = acfun::ID_BASE_URL,
            site = acfun::SITE_URL,
            cookie_file = auth::DEFAULT_COOKIE_FILE,
            interval = batch::UPLOAD_INTERVAL.as_secs(),
            channel = batch::DEFAULT_CHANNEL_ID,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            fragment_timeout: Duration::from_secs(self.fragment_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

impl RetryConfigToml {
    /// Convert to runtime RetryPolicy
    pub fn to_runtime_config(&self) -> ConfigResult<RetryPolicy> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                value: "0".to_string(),
                reason: "At least one attempt is required".to_string(),
            });
        }
        Ok(
            RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
                .with_insecure_retry(self.allow_insecure_retry),
        )
    }
}

impl EndpointsConfigToml {
    /// Convert to runtime Endpoints
    pub fn to_runtime_config(&self) -> ConfigResult<Endpoints> {
        Endpoints::parse(&self.member, &self.upload, &self.login, &self.site).map_err(|e| {
            ConfigError::InvalidValue {
                field: "endpoints".to_string(),
                value: format!(
                    "{}, {}, {}, {}",
                    self.member, self.upload, self.login, self.site
                ),
                reason: e.to_string(),
            }
        })
    }
}

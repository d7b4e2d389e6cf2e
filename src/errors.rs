//! Error types for the AcFun uploader
//!
//! Each pipeline stage has its own error enum so that the orchestrator can
//! report which stage failed. Transport-level failures are classified once,
//! in [`TransportError`], and that classification drives retry decisions.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants::limits;

/// Authentication and cookie session errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No credentials available from args, environment or prompt
    #[error(
        "Missing AcFun credentials. Set ACFUN_USERNAME and ACFUN_PASSWORD or pass --username/--password"
    )]
    MissingCredentials,

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// HTTP request failed during authentication
    #[error("HTTP request failed during authentication")]
    Http(#[from] reqwest::Error),

    /// Sign-in endpoint rejected the credentials
    #[error("AcFun login failed: {message}")]
    LoginFailed { message: String },

    /// Account or member API call failed
    #[error("AcFun request failed")]
    Request(#[from] TransportError),

    /// Cookies were loaded but the session is not logged in
    #[error("AcFun session is not logged in. Cookies may have expired")]
    NotLoggedIn,

    /// Cookie file missing or unreadable
    #[error("Cookie file not usable: {path}: {reason}")]
    CookieFile { path: PathBuf, reason: String },

    /// Cookie file JSON could not be parsed
    #[error("Cookie file is not valid JSON")]
    CookieParse(#[from] serde_json::Error),

    /// Client configured with a zero request rate
    #[error("Rate limit must be non-zero")]
    InvalidRateLimit,

    /// Invalid username format
    #[error("Invalid username: {reason}")]
    InvalidUsername { reason: String },

    /// File I/O error during cookie storage or prompting
    #[error("Failed to read or write credential data")]
    CredentialStorage(#[from] std::io::Error),
}

/// Kind of network-layer failure reported by the HTTP stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    /// Request or read timed out
    Timeout,
    /// Connection could not be established (refused, DNS, TLS handshake)
    Connect,
    /// Connection broke while sending or receiving
    Transport,
}

impl std::fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NetworkFailure::Timeout => "timeout",
            NetworkFailure::Connect => "connection error",
            NetworkFailure::Transport => "transport error",
        };
        f.write_str(label)
    }
}

/// Failure of a single remote call
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network-layer failure; always transient
    #[error("{kind}: {message}")]
    Network {
        kind: NetworkFailure,
        message: String,
    },

    /// Server answered with a non-success HTTP status
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// Server answered 200 but with a non-success result code
    #[error("server rejected request (result {result}): {body}")]
    Rejected { result: i64, body: String },

    /// Response body could not be decoded
    #[error("malformed response: {reason}")]
    Decode { reason: String },

    /// Request body could not be encoded
    #[error("cannot encode request: {reason}")]
    Encode { reason: String },
}

impl TransportError {
    /// Whether the failure is worth another attempt
    ///
    /// Network failures and the statuses in [`limits::RETRYABLE_STATUSES`]
    /// are transient; rejections and decode failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Network { .. } => true,
            TransportError::Status { status } => limits::RETRYABLE_STATUSES.contains(status),
            TransportError::Rejected { .. }
            | TransportError::Decode { .. }
            | TransportError::Encode { .. } => false,
        }
    }

    /// Short label used in per-attempt log lines
    pub fn class(&self) -> &'static str {
        match self {
            TransportError::Network { .. } => "network",
            TransportError::Status { .. } => "http-status",
            TransportError::Rejected { .. } => "rejected",
            TransportError::Decode { .. } => "decode",
            TransportError::Encode { .. } => "encode",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return TransportError::Status {
                status: status.as_u16(),
            };
        }
        if error.is_decode() {
            return TransportError::Decode {
                reason: error.to_string(),
            };
        }
        let kind = if error.is_timeout() {
            NetworkFailure::Timeout
        } else if error.is_connect() {
            NetworkFailure::Connect
        } else {
            NetworkFailure::Transport
        };
        TransportError::Network {
            kind,
            message: error.to_string(),
        }
    }
}

/// A retried operation that did not succeed
#[derive(Error, Debug)]
#[error("{operation} failed after {attempts} attempt(s): {source}")]
pub struct RetryError {
    /// Human-readable operation label
    pub operation: String,
    /// Number of attempts actually made
    pub attempts: u32,
    /// Failure of the last attempt
    pub source: TransportError,
}

/// Upload session negotiation errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Token endpoint could not be reached or answered badly
    #[error("session negotiation request failed")]
    Transport(#[from] TransportError),

    /// Required field missing from the token response
    #[error("session response is missing field `{field}`")]
    MissingField { field: &'static str },

    /// Server proposed an unusable fragment size
    #[error("session response has invalid fragment size {size}")]
    InvalidFragmentSize { size: i64 },
}

/// Fragment transfer errors
#[derive(Error, Debug)]
pub enum TransferError {
    /// A fragment could not be delivered
    #[error("fragment {index} was not acknowledged")]
    Fragment {
        index: u64,
        #[source]
        source: RetryError,
    },

    /// Reading the source file failed
    #[error("failed to read source file")]
    Io(#[from] std::io::Error),

    /// The source file ended before the expected fragment length
    #[error("source file shrank: fragment {index} expected {expected} bytes, read {actual}")]
    ShortRead {
        index: u64,
        expected: u64,
        actual: u64,
    },

    /// Nothing to upload
    #[error("source file is empty: {path}")]
    EmptyFile { path: PathBuf },
}

/// Asset registration errors
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Create-asset call failed at the transport level
    #[error("create-asset request failed")]
    Transport(#[from] TransportError),

    /// Create-asset returned a non-success result code
    #[error("create-asset rejected (result {result}): {message}")]
    Rejected { result: i64, message: String },

    /// Create-asset succeeded without returning an identifier
    #[error("create-asset response is missing `videoId`")]
    MissingVideoId,
}

/// Cover upload errors
#[derive(Error, Debug)]
pub enum CoverError {
    /// Cover image could not be read
    #[error("failed to read cover image")]
    Io(#[from] std::io::Error),

    /// Cover image has no content
    #[error("cover image is empty: {path}")]
    EmptyImage { path: PathBuf },

    /// Cover token request failed
    #[error("cover token request failed")]
    Token(#[source] TransportError),

    /// Cover token response had no token
    #[error("cover token response is missing `info.token`")]
    MissingToken,

    /// Cover bytes could not be delivered
    #[error("cover transfer failed")]
    Transfer(#[source] RetryError),

    /// Cover transfer could not be finalized
    #[error("cover finalize failed")]
    Finalize(#[source] RetryError),

    /// Resolve-URL request failed
    #[error("cover URL resolution failed")]
    ResolveUrl(#[source] TransportError),

    /// Resolve-URL response had no URL
    #[error("cover URL response is missing `url`")]
    MissingUrl,
}

/// Publication creation errors
#[derive(Error, Debug)]
pub enum PublicationError {
    /// Repost requires the original source URL
    #[error("reposted content requires an original source URL")]
    MissingSourceUrl,

    /// Title must not be blank
    #[error("publication title must not be empty")]
    EmptyTitle,

    /// Create-publication call failed at the transport level
    #[error("create-publication request failed")]
    Transport(#[from] TransportError),

    /// Create-publication returned a non-success result code
    #[error("create-publication rejected (result {result}): {message}")]
    Rejected { result: i64, message: String },

    /// Create-publication succeeded without an identifier
    #[error("create-publication response is missing `dougaId`")]
    MissingId,
}

/// Whole-pipeline errors, one variant per failing stage
#[derive(Error, Debug)]
pub enum UploadError {
    /// A local input is missing or unusable
    #[error("precondition failed: {reason}")]
    Precondition { reason: String },

    /// Publication metadata failed validation before any request was made
    #[error("invalid publication metadata")]
    Metadata(#[source] PublicationError),

    /// Session negotiation failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Fragment transfer failed
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Asset registration failed
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Cover upload failed
    #[error(transparent)]
    Cover(#[from] CoverError),

    /// Publication creation failed
    #[error(transparent)]
    Publication(#[from] PublicationError),
}

impl UploadError {
    /// Create a precondition error with a message
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition {
            reason: reason.into(),
        }
    }

    /// Pipeline stage that produced the error
    pub fn stage(&self) -> &'static str {
        match self {
            UploadError::Precondition { .. } | UploadError::Metadata(_) => "precondition",
            UploadError::Session(_) => "session",
            UploadError::Transfer(_) => "transfer",
            UploadError::Registration(_) => "registration",
            UploadError::Cover(_) => "cover",
            UploadError::Publication(_) => "publication",
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be rendered
    #[error("Failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// No user config directory on this platform
    #[error("Could not determine user config directory")]
    NoConfigDir,

    /// I/O error reading or writing configuration
    #[error("Configuration file I/O error")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Upload pipeline error
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if retrying the whole command later may help
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Auth(AuthError::Http(_)) => true,
            AppError::Upload(UploadError::Session(SessionError::Transport(e)))
            | AppError::Upload(UploadError::Registration(RegistrationError::Transport(e)))
            | AppError::Upload(UploadError::Publication(PublicationError::Transport(e))) => {
                e.is_transient()
            }
            AppError::Upload(UploadError::Transfer(TransferError::Fragment { source, .. })) => {
                source.source.is_transient()
            }
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Upload(_) => "upload",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Single remote call result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Upload pipeline result type alias
pub type UploadResult<T> = std::result::Result<T, UploadError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

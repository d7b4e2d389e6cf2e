//! Application constants for the AcFun uploader
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for authentication
pub mod env {
    /// Environment variable name for the AcFun username
    pub const USERNAME: &str = "ACFUN_USERNAME";

    /// Environment variable name for the AcFun password
    pub const PASSWORD: &str = "ACFUN_PASSWORD";
}

/// Authentication and cookie-related constants
pub mod auth {
    /// Default cookie file location, relative to the working directory
    pub const DEFAULT_COOKIE_FILE: &str = "cookies/ac_cookies.txt";

    /// File permissions for the cookie file (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const COOKIE_FILE_PERMISSIONS: u32 = 0o600;

    /// First line written by browsers exporting Netscape cookie files
    pub const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Browser user agent; the member API rejects unknown agents
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

    /// Accept-Language sent with member API calls
    pub const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9";

    /// Default HTTP request timeout for member API calls
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Read timeout for a single fragment transfer
    pub const FRAGMENT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Timeout for connectivity probes
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Retry and rate limiting configuration
pub mod limits {
    /// Default rate limit for member API requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

    /// Maximum attempts for a retried operation (first try included)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    /// HTTP statuses treated as transient
    pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
}

/// AcFun service URLs and endpoint paths
pub mod acfun {
    /// Member (creator centre) API base URL
    pub const MEMBER_BASE_URL: &str = "https://member.acfun.cn";

    /// Fragment upload host base URL
    pub const UPLOAD_BASE_URL: &str = "https://upload.kuaishouzt.com";

    /// Account service base URL
    pub const ID_BASE_URL: &str = "https://id.app.acfun.cn";

    /// Public site, used for connectivity checks
    pub const SITE_URL: &str = "https://www.acfun.cn";

    /// Sign-in endpoint path on the account service
    pub const LOGIN_PATH: &str = "/rest/web/login/signin";

    /// Upload session negotiation
    pub const TOKEN_PATH: &str = "/video/api/getKSCloudToken";

    /// Fragment transfer on the upload host
    pub const FRAGMENT_PATH: &str = "/api/upload/fragment";

    /// Transfer finalization on the upload host
    pub const COMPLETE_PATH: &str = "/api/upload/complete";

    /// Finish-processing call for an uploaded video
    pub const FINISH_PATH: &str = "/video/api/uploadFinish";

    /// Video asset registration
    pub const CREATE_VIDEO_PATH: &str = "/video/api/createVideo";

    /// Publication (douga) creation
    pub const CREATE_DOUGA_PATH: &str = "/video/api/createDouga";

    /// Cover image upload token
    pub const COVER_TOKEN_PATH: &str = "/common/api/getQiniuToken";

    /// Cover URL resolution after upload
    pub const COVER_URL_PATH: &str = "/common/api/getUrlAfterUpload";

    /// Channel list, used to check the login state
    pub const MY_CHANNELS_PATH: &str = "/video/api/getMyChannels";

    /// Upload page on the member site, sent as Referer by asset and
    /// publication calls
    pub const UPLOAD_PAGE_PATH: &str = "/upload-video";
}

/// Upload protocol constants
pub mod upload {
    /// Template identifier sent with session negotiation
    pub const SESSION_TEMPLATE: &str = "1";

    /// Result code acknowledging a fragment or finalize call
    pub const TRANSFER_OK: i64 = 1;

    /// Result code for success on member API calls
    pub const MEMBER_OK: i64 = 0;

    /// Storage type passed when registering a video
    pub const VOD_TYPE: &str = "ksCloud";

    /// Business flag for cover URL resolution
    pub const COVER_BIZ_FLAG: &str = "web-douga-cover";

    /// Length of the random cover file stem
    pub const COVER_NAME_LENGTH: usize = 16;

    /// Extension appended to cover file names
    pub const COVER_EXTENSION: &str = "jpeg";
}

/// Batch upload discovery constants
pub mod batch {
    use super::Duration;

    /// Video extensions picked up by directory scans
    pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "flv", "wmv"];

    /// Image extensions considered as covers, in preference order
    pub const COVER_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

    /// Stem of the shared fallback cover
    pub const DEFAULT_COVER_STEM: &str = "cover";

    /// Pause between consecutive uploads
    pub const UPLOAD_INTERVAL: Duration = Duration::from_secs(5);

    /// Default channel (games)
    pub const DEFAULT_CHANNEL_ID: u32 = 63;

    /// Tags used when a batch is given none ("batch upload", "automation")
    pub const DEFAULT_TAGS: [&str; 2] = ["批量上传", "自动化"];

    /// Description prefix followed by the video's file stem
    pub const DESCRIPTION_PREFIX: &str = "通过批量上传工具自动上传的视频: ";
}

/// Configuration file locations
pub mod files {
    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "acfun-uploader.toml";

    /// Directory under the user config dir
    pub const CONFIG_DIR_NAME: &str = "acfun-uploader";

    /// Configuration file name inside the config dir
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

// Re-export commonly used constants for convenience
pub use env::{PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{MAX_ATTEMPTS, RETRY_BASE_DELAY_MS};

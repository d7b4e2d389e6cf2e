//! Cookie session persistence
//!
//! Cookies are read from either a Netscape cookie file (as exported by
//! browsers and curl) or a JSON array, and written back as JSON with
//! owner-only permissions.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use reqwest::cookie::Jar;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::auth;
use crate::errors::{AuthError, AuthResult};

/// Prefix curl puts in front of the domain of HttpOnly cookies
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One persisted cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    /// Expiry as Unix seconds; `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl StoredCookie {
    /// Captures a cookie set by a response from `fallback_domain`
    pub fn from_response(cookie: &reqwest::cookie::Cookie<'_>, fallback_domain: &str) -> Self {
        let expires = cookie
            .expires()
            .and_then(|at| at.duration_since(UNIX_EPOCH).ok())
            .and_then(|since| i64::try_from(since.as_secs()).ok());

        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().unwrap_or(fallback_domain).to_string(),
            path: cookie.path().unwrap_or("/").to_string(),
            secure: cookie.secure(),
            expires,
        }
    }

    /// Whether the cookie expired before `now`
    pub fn is_expired(&self, now: SystemTime) -> bool {
        let Some(expires) = self.expires else {
            return false;
        };
        let now = now
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_secs())
            .unwrap_or(0);
        u64::try_from(expires).map_or(true, |expires| expires <= now)
    }

    /// `Set-Cookie` header value recreating this cookie
    pub fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}", self.name, self.value);
        let domain = self.domain.trim_start_matches('.');
        if !domain.is_empty() {
            header.push_str(&format!("; Domain={}", domain));
        }
        header.push_str(&format!("; Path={}", self.path));
        if self.secure {
            header.push_str("; Secure");
        }
        if let Some(expires) = self.expires.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        {
            header.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        header
    }

    /// URL the cookie is installed for; `fallback` when it has no domain
    fn origin_url(&self, fallback: &Url) -> Option<Url> {
        let domain = self.domain.trim_start_matches('.');
        if domain.is_empty() {
            return Some(fallback.clone());
        }
        Url::parse(&format!("https://{}/", domain)).ok()
    }
}

/// Adds `cookies` to `jar`, skipping expired ones; returns how many were added
pub fn install_cookies(jar: &Jar, cookies: &[StoredCookie], fallback: &Url) -> usize {
    let now = SystemTime::now();
    let mut installed = 0;

    for cookie in cookies {
        if cookie.is_expired(now) {
            tracing::debug!("Skipping expired cookie {}", cookie.name);
            continue;
        }
        match cookie.origin_url(fallback) {
            Some(url) => {
                jar.add_cookie_str(&cookie.to_set_cookie(), &url);
                installed += 1;
            }
            None => tracing::warn!(
                "Skipping cookie {} with unusable domain {:?}",
                cookie.name,
                cookie.domain
            ),
        }
    }

    installed
}

/// Parses a cookie file in Netscape or JSON format
pub fn parse_cookie_file(content: &str) -> AuthResult<Vec<StoredCookie>> {
    let content = content.trim();
    if content.starts_with(auth::NETSCAPE_HEADER) || content.contains('\t') {
        Ok(parse_netscape(content))
    } else if content.is_empty() {
        Ok(Vec::new())
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

/// Parses Netscape format: `domain flag path secure expiration name value`
fn parse_netscape(content: &str) -> Vec<StoredCookie> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let line = line.strip_prefix(HTTP_ONLY_PREFIX).unwrap_or(line);
            if line.is_empty() || line.starts_with('#') {
                return None;
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 7 {
                return None;
            }

            let expires = parts[4].parse::<i64>().ok().filter(|secs| *secs > 0);
            Some(StoredCookie {
                domain: parts[0].to_string(),
                path: parts[2].to_string(),
                secure: parts[3].eq_ignore_ascii_case("TRUE"),
                expires,
                name: parts[5].to_string(),
                value: parts[6].to_string(),
            })
        })
        .collect()
}

/// Reads and parses the cookie file at `path`
pub fn load_cookie_file(path: &Path) -> AuthResult<Vec<StoredCookie>> {
    let content = fs::read_to_string(path).map_err(|e| AuthError::CookieFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_cookie_file(&content)
}

/// Writes `cookies` as JSON to `path`, creating parent directories
pub fn save_cookie_file(path: &Path, cookies: &[StoredCookie]) -> AuthResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(cookies)?;
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(auth::COOKIE_FILE_PERMISSIONS);
    }
    let mut file = options.open(path)?;

    // An existing file keeps its old mode on open
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        if perms.mode() & 0o777 != auth::COOKIE_FILE_PERMISSIONS {
            perms.set_mode(auth::COOKIE_FILE_PERMISSIONS);
            file.set_permissions(perms)?;
        }
    }

    file.write_all(json.as_bytes())?;

    tracing::info!("Saved {} cookies to {}", cookies.len(), path.display());
    Ok(())
}

/// Deletes the cookie file; a missing file is not an error
pub fn remove_cookie_file(path: &Path) -> AuthResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AuthError::CredentialStorage(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;
    use tempfile::TempDir;

    const NETSCAPE: &str = "# Netscape HTTP Cookie File\n\
        # comment line\n\
        .acfun.cn\tTRUE\t/\tTRUE\t0\tacPasstoken\tpass-123\n\
        #HttpOnly_.acfun.cn\tTRUE\t/\tFALSE\t4102444800\tauth_key\t5566\n\
        broken line\n";

    #[test]
    fn test_parse_netscape() {
        let cookies = parse_cookie_file(NETSCAPE).unwrap();
        assert_eq!(cookies.len(), 2);

        assert_eq!(cookies[0].name, "acPasstoken");
        assert_eq!(cookies[0].value, "pass-123");
        assert_eq!(cookies[0].domain, ".acfun.cn");
        assert!(cookies[0].secure);
        assert_eq!(cookies[0].expires, None);

        assert_eq!(cookies[1].name, "auth_key");
        assert!(!cookies[1].secure);
        assert_eq!(cookies[1].expires, Some(4_102_444_800));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"[{"name":"acPasstoken","value":"abc","domain":".acfun.cn"}]"#;
        let cookies = parse_cookie_file(json).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].path, "/");
        assert!(!cookies[0].secure);

        assert!(matches!(
            parse_cookie_file("{not json"),
            Err(AuthError::CookieParse(_))
        ));
        assert!(parse_cookie_file("  ").unwrap().is_empty());
    }

    #[test]
    fn test_set_cookie_header() {
        let cookie = StoredCookie {
            name: "auth_key".to_string(),
            value: "5566".to_string(),
            domain: ".acfun.cn".to_string(),
            path: "/".to_string(),
            secure: true,
            expires: Some(4_102_444_800),
        };
        assert_eq!(
            cookie.to_set_cookie(),
            "auth_key=5566; Domain=acfun.cn; Path=/; Secure; Expires=Fri, 01 Jan 2100 00:00:00 GMT"
        );
    }

    #[test]
    fn test_expiry() {
        let mut cookie = parse_cookie_file(NETSCAPE).unwrap().remove(1);
        assert!(!cookie.is_expired(SystemTime::now()));
        cookie.expires = Some(1);
        assert!(cookie.is_expired(SystemTime::now()));
        cookie.expires = None;
        assert!(!cookie.is_expired(SystemTime::now()));
    }

    #[test]
    fn test_install_cookies_into_jar() {
        let jar = Jar::default();
        let fallback = Url::parse("https://member.acfun.cn/").unwrap();
        let mut cookies = parse_cookie_file(NETSCAPE).unwrap();
        cookies.push(StoredCookie {
            name: "old".to_string(),
            value: "x".to_string(),
            domain: String::new(),
            path: "/".to_string(),
            secure: false,
            expires: Some(1),
        });

        assert_eq!(install_cookies(&jar, &cookies, &fallback), 2);

        let header = jar.cookies(&fallback).unwrap();
        let header = header.to_str().unwrap();
        assert!(header.contains("acPasstoken=pass-123"));
        assert!(header.contains("auth_key=5566"));
        assert!(!header.contains("old=x"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies").join("ac_cookies.txt");
        let cookies = parse_cookie_file(NETSCAPE).unwrap();

        save_cookie_file(&path, &cookies).unwrap();
        assert_eq!(load_cookie_file(&path).unwrap(), cookies);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        assert!(remove_cookie_file(&path).unwrap());
        assert!(!remove_cookie_file(&path).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ac_cookies.txt");
        fs::write(&path, "stale").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let cookies = parse_cookie_file(NETSCAPE).unwrap();
        save_cookie_file(&path, &cookies).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(load_cookie_file(&path).unwrap(), cookies);
    }

    #[test]
    fn test_missing_file_reported() {
        let dir = TempDir::new().unwrap();
        let err = load_cookie_file(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, AuthError::CookieFile { .. }));
    }
}

//! Rate-limited member API requests
//!
//! Every creator-centre call goes through [`HttpHandler`]: it waits for the
//! rate limiter, posts a form, checks the status and decodes the JSON body.
//! It deliberately performs a single attempt; retried calls are wrapped in a
//! [`crate::app::RetryPolicy`] by the caller.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::header::REFERER;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::errors::{AuthError, AuthResult, TransportError, TransportResult};

/// Longest body excerpt quoted in decode errors
const BODY_EXCERPT_CHARS: usize = 200;

/// HTTP operations handler with rate limiting
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> AuthResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> AuthResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(
            NonZeroU32::new(rate_limit_rps).ok_or(AuthError::InvalidRateLimit)?,
        );
        Ok(RateLimiter::direct(quota))
    }

    async fn throttle(&self) {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;
    }

    /// Posts a form and decodes the JSON response
    ///
    /// # Errors
    ///
    /// Returns `TransportError` for network failures, non-2xx statuses and
    /// bodies that are not the expected JSON.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &[(&str, String)],
        referer: Option<&str>,
    ) -> TransportResult<T> {
        self.throttle().await;

        let mut request = self.client.post(url.clone()).form(form);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("POST {} returned {}", url.path(), status);
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        tracing::debug!("POST {} -> {} bytes", url.path(), body.len());
        decode_json(&body)
    }

    /// Fetches a page as text, returning its status
    pub async fn get_text(&self, url: Url) -> TransportResult<(StatusCode, String)> {
        self.throttle().await;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Posts a form and hands back the raw response
    ///
    /// For callers that need more than the decoded body, such as the
    /// cookies set by sign-in. No status check is made.
    pub async fn send_form<F: Serialize + ?Sized>(
        &self,
        url: Url,
        form: &F,
    ) -> reqwest::Result<Response> {
        self.throttle().await;
        self.client.post(url).form(form).send().await
    }
}

/// Decodes a JSON body, quoting the start of the body on failure
pub(crate) fn decode_json<T: DeserializeOwned>(body: &str) -> TransportResult<T> {
    serde_json::from_str(body).map_err(|e| TransportError::Decode {
        reason: format!("{} in {:?}", e, excerpt(body)),
    })
}

/// First characters of a response body, for log lines and errors
pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::api::ResultResponse;

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        assert!(HttpHandler::build_rate_limiter(0).is_err());
    }

    #[tokio::test]
    async fn test_send_form_is_throttled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/login")
            .match_body(mockito::Matcher::UrlEncoded("user".into(), "alice".into()))
            .with_body(r#"{"result":0}"#)
            .expect(2)
            .create_async()
            .await;

        let handler = HttpHandler::new(Client::new(), 1).unwrap();
        let url = Url::parse(&format!("{}/login", server.url())).unwrap();
        let form = [("user", "alice")];

        let started = std::time::Instant::now();
        for _ in 0..2 {
            let response = handler.send_form(url.clone(), &form).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(started.elapsed() >= Duration::from_millis(900));
        mock.assert_async().await;
    }

    #[test]
    fn test_decode_json_success() {
        let response: ResultResponse = decode_json(r#"{"result":0}"#).unwrap();
        assert_eq!(response.result, Some(0));
    }

    #[test]
    fn test_decode_json_html_body() {
        let err = decode_json::<ResultResponse>("<html><body>login</body></html>").unwrap_err();
        match err {
            TransportError::Decode { reason } => assert!(reason.contains("<html>")),
            other => panic!("Expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_CHARS);
        assert_eq!(excerpt("short"), "short");
    }
}

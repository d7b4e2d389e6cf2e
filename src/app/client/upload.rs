//! Fragment transfer over HTTP
//!
//! Fragments go to the upload host as raw `application/octet-stream` bodies
//! with the fragment index and transfer token in the query string. The
//! upload host acknowledges with `{"result": 1}`.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use async_trait::async_trait;

use crate::app::client::config::{ClientConfig, Endpoints};
use crate::app::client::http::{decode_json, excerpt};
use crate::app::models::Fragment;
use crate::app::retry::Attempt;
use crate::app::transport::FragmentTransport;
use crate::constants::{acfun, upload};
use crate::errors::{AuthResult, TransportError, TransportResult};

/// Acknowledgement body of the upload host
#[derive(Debug, Deserialize)]
struct TransferAck {
    #[serde(default)]
    result: Option<i64>,
}

/// [`FragmentTransport`] backed by reqwest
#[derive(Debug)]
pub struct HttpFragmentTransport {
    secure: Client,
    insecure: Option<Client>,
    fragment_url: Url,
    complete_url: Url,
}

impl HttpFragmentTransport {
    /// Creates the transport
    ///
    /// When `allow_insecure` is set a second client that skips certificate
    /// validation is built for attempts that request it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if an HTTP client cannot be built
    pub fn new(
        config: &ClientConfig,
        endpoints: &Endpoints,
        allow_insecure: bool,
    ) -> AuthResult<Self> {
        let secure = config.build_upload_client(true)?;
        let insecure = if allow_insecure {
            tracing::warn!("Fragment retries may skip certificate validation");
            Some(config.build_upload_client(false)?)
        } else {
            None
        };

        Ok(Self {
            secure,
            insecure,
            fragment_url: endpoints.upload_url(acfun::FRAGMENT_PATH),
            complete_url: endpoints.upload_url(acfun::COMPLETE_PATH),
        })
    }

    fn client_for(&self, attempt: Attempt) -> &Client {
        match (&self.insecure, attempt.verify_tls) {
            (Some(insecure), false) => insecure,
            _ => &self.secure,
        }
    }

    async fn acknowledge(response: reqwest::Response) -> TransportResult<()> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let ack: TransferAck = decode_json(&body)?;
        match ack.result {
            Some(upload::TRANSFER_OK) => Ok(()),
            other => Err(TransportError::Rejected {
                result: other.unwrap_or(-1),
                body: excerpt(&body),
            }),
        }
    }
}

#[async_trait]
impl FragmentTransport for HttpFragmentTransport {
    async fn send_fragment(
        &self,
        token: &str,
        fragment: &Fragment,
        attempt: Attempt,
    ) -> TransportResult<()> {
        tracing::debug!(
            "Sending fragment {} ({} bytes at offset {}), attempt {}",
            fragment.index,
            fragment.length,
            fragment.offset,
            attempt.number
        );

        let response = self
            .client_for(attempt)
            .post(self.fragment_url.clone())
            .query(&[
                ("fragment_id", fragment.index.to_string()),
                ("upload_token", token.to_string()),
            ])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(fragment.payload.clone())
            .send()
            .await?;

        Self::acknowledge(response).await
    }

    async fn complete(
        &self,
        token: &str,
        fragment_count: u64,
        attempt: Attempt,
    ) -> TransportResult<()> {
        let response = self
            .client_for(attempt)
            .post(self.complete_url.clone())
            .query(&[
                ("fragment_count", fragment_count.to_string()),
                ("upload_token", token.to_string()),
            ])
            .header(CONTENT_LENGTH, "0")
            .send()
            .await?;

        Self::acknowledge(response).await
    }
}

//! Cover image upload
//!
//! The cover goes through the same transfer path as video fragments: a
//! token is requested under a random file name, the whole image is sent as
//! fragment 0, the transfer is finalized with a count of 1 and the public
//! URL is resolved from the token. Every step is required.

use std::path::Path;

use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

use crate::app::api::MemberApi;
use crate::app::models::{CoverAsset, Fragment};
use crate::app::retry::RetryPolicy;
use crate::app::transport::{self, FragmentTransport};
use crate::constants::upload;
use crate::errors::CoverError;

/// Random `<16 alphanumerics>.jpeg` name used when requesting the token
pub fn random_cover_name() -> String {
    let stem: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(upload::COVER_NAME_LENGTH)
        .map(char::from)
        .collect();
    format!("{}.{}", stem, upload::COVER_EXTENSION)
}

/// Uploads cover images
pub struct CoverUploader<'a> {
    api: &'a dyn MemberApi,
    transport: &'a dyn FragmentTransport,
    policy: &'a RetryPolicy,
    finalize_policy: &'a RetryPolicy,
}

impl<'a> CoverUploader<'a> {
    pub fn new(
        api: &'a dyn MemberApi,
        transport: &'a dyn FragmentTransport,
        policy: &'a RetryPolicy,
        finalize_policy: &'a RetryPolicy,
    ) -> Self {
        Self {
            api,
            transport,
            policy,
            finalize_policy,
        }
    }

    /// Reads and uploads the image at `path`
    ///
    /// # Errors
    ///
    /// Returns `CoverError` if the file cannot be read, is empty or any
    /// upload step fails.
    pub async fn upload(&self, path: &Path) -> Result<CoverAsset, CoverError> {
        let image = tokio::fs::read(path).await?;
        if image.is_empty() {
            return Err(CoverError::EmptyImage {
                path: path.to_path_buf(),
            });
        }
        info!("Uploading cover {} ({} bytes)", path.display(), image.len());
        self.upload_bytes(Bytes::from(image)).await
    }

    /// Uploads an in-memory image
    ///
    /// # Errors
    ///
    /// Returns `CoverError` if any upload step fails
    pub async fn upload_bytes(&self, image: Bytes) -> Result<CoverAsset, CoverError> {
        let file_name = random_cover_name();

        let token = self
            .api
            .request_cover_token(&file_name)
            .await
            .map_err(CoverError::Token)?
            .info
            .and_then(|info| info.token)
            .filter(|token| !token.is_empty())
            .ok_or(CoverError::MissingToken)?;

        let fragment = Fragment {
            index: 0,
            offset: 0,
            length: image.len() as u64,
            payload: image,
        };
        transport::send_fragment(self.transport, self.policy, &token, &fragment)
            .await
            .map_err(CoverError::Transfer)?;
        transport::finalize(self.transport, self.finalize_policy, &token, 1)
            .await
            .map_err(CoverError::Finalize)?;

        let resolved_url = self
            .api
            .resolve_cover_url(&token)
            .await
            .map_err(CoverError::ResolveUrl)?
            .url
            .filter(|url| !url.is_empty())
            .ok_or(CoverError::MissingUrl)?;

        info!("Cover available at {}", resolved_url);
        Ok(CoverAsset { resolved_url })
    }
}

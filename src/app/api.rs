//! Member API seam and its wire types
//!
//! The pipeline stages talk to the creator-centre endpoints through the
//! [`MemberApi`] trait. [`crate::app::AcfunClient`] implements it over HTTP;
//! tests substitute in-memory implementations.

use async_trait::async_trait;
use serde::Deserialize;

use crate::app::models::PublicationRecord;
use crate::errors::TransportResult;

/// Creator-centre endpoints used by the publish pipeline
#[async_trait]
pub trait MemberApi: Send + Sync {
    /// Negotiate an upload session for a file
    async fn request_upload_token(&self, file_name: &str, size: u64)
        -> TransportResult<TokenResponse>;

    /// Register an uploaded video
    async fn create_video(
        &self,
        video_key: i64,
        file_name: &str,
    ) -> TransportResult<CreateVideoResponse>;

    /// Tell the server the video upload task is done
    async fn upload_finish(&self, task_id: i64) -> TransportResult<ResultResponse>;

    /// Request a transfer token for a cover image
    async fn request_cover_token(&self, file_name: &str) -> TransportResult<CoverTokenResponse>;

    /// Resolve the public URL of an uploaded cover
    async fn resolve_cover_url(&self, token: &str) -> TransportResult<CoverUrlResponse>;

    /// Submit the publication record
    async fn create_douga(&self, record: &PublicationRecord)
        -> TransportResult<CreateDougaResponse>;
}

/// Response of the session negotiation endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub result: Option<i64>,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub upload_config: Option<UploadConfig>,
}

/// Sizing parameters of an upload session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    #[serde(default)]
    pub part_size: Option<i64>,
}

/// Bare result-code response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultResponse {
    #[serde(default)]
    pub result: Option<i64>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

/// Response of create-video
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoResponse {
    #[serde(default)]
    pub result: Option<i64>,
    #[serde(default)]
    pub video_id: Option<i64>,
    #[serde(default, rename = "error_msg")]
    pub error_msg: Option<String>,
}

/// Response of the cover token endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverTokenResponse {
    #[serde(default)]
    pub result: Option<i64>,
    #[serde(default)]
    pub info: Option<CoverTokenInfo>,
}

/// Nested token of [`CoverTokenResponse`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverTokenInfo {
    #[serde(default)]
    pub token: Option<String>,
}

/// Response of the cover URL endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverUrlResponse {
    #[serde(default)]
    pub result: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Response of create-douga
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDougaResponse {
    #[serde(default)]
    pub result: Option<i64>,
    #[serde(default)]
    pub douga_id: Option<i64>,
    #[serde(default, rename = "error_msg")]
    pub error_msg: Option<String>,
}

//! Data types flowing through the publish pipeline
//!
//! Each value is produced by one stage and handed forward to the next. None
//! of them is persisted: a session that dies with the process is simply
//! abandoned on the server.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::PublicationError;

/// Upload session negotiated for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Server task identifier, reused as the asset key
    pub task_id: i64,
    /// Opaque transfer token authorizing fragment uploads
    pub token: String,
    /// Fragment size in bytes, always > 0
    pub fragment_size: u64,
}

/// `ceil(file_size / fragment_size)`
pub fn fragment_count(file_size: u64, fragment_size: u64) -> u64 {
    if fragment_size == 0 {
        return 0;
    }
    file_size / fragment_size + u64::from(file_size % fragment_size != 0)
}

/// One contiguous byte range of the source file
#[derive(Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 0-based fragment index
    pub index: u64,
    /// Byte offset in the source file
    pub offset: u64,
    /// Payload length in bytes
    pub length: u64,
    /// Fragment bytes; cheap to clone across retries
    pub payload: Bytes,
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("index", &self.index)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}

/// Registered video asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Key the asset was created with (the session task id)
    pub asset_key: i64,
    /// Identifier assigned by create-asset
    pub asset_id: i64,
    /// Source file name
    pub file_name: String,
}

/// Uploaded cover image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverAsset {
    /// Publicly servable cover URL
    pub resolved_url: String,
}

/// Whether the content is the uploader's own work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributionKind {
    /// Original work
    #[default]
    Original,
    /// Reposted from another source
    Repost,
}

impl AttributionKind {
    /// Wire value of the `creationType` field
    pub fn creation_type(&self) -> u8 {
        match self {
            AttributionKind::Repost => 1,
            AttributionKind::Original => 3,
        }
    }

    /// Parse a `creationType` wire value
    pub fn from_creation_type(value: u8) -> Option<Self> {
        match value {
            1 => Some(AttributionKind::Repost),
            3 => Some(AttributionKind::Original),
            _ => None,
        }
    }
}

impl fmt::Display for AttributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributionKind::Original => write!(f, "original"),
            AttributionKind::Repost => write!(f, "repost"),
        }
    }
}

/// Entry of the `videoInfos` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(rename = "videoId")]
    pub video_id: i64,
    pub title: String,
}

/// Caller-supplied metadata of a publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub channel_id: u32,
    pub attribution: AttributionKind,
    pub original_source_url: Option<String>,
}

impl PublicationMetadata {
    /// Checks the metadata before any network call is made
    pub fn validate(&self) -> Result<(), PublicationError> {
        if self.title.trim().is_empty() {
            return Err(PublicationError::EmptyTitle);
        }
        if self.attribution == AttributionKind::Repost && self.source_url().is_none() {
            return Err(PublicationError::MissingSourceUrl);
        }
        Ok(())
    }

    /// Non-blank original source URL, if any
    pub fn source_url(&self) -> Option<&str> {
        self.original_source_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Publication as submitted to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationRecord {
    pub title: String,
    pub description: String,
    pub tag_names: Vec<String>,
    pub attribution: AttributionKind,
    pub channel_id: u32,
    pub cover_url: String,
    pub video_infos: Vec<VideoInfo>,
    /// Present iff `attribution` is `Repost`
    pub original_source_url: Option<String>,
}

/// Result of a stage whose failure leaves the server state unknown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    /// The request failed; the server may or may not have applied it
    Uncertain { stage: &'static str, reason: String },
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success)
    }

    /// Human-readable warning for uncertain outcomes
    pub fn warning(&self) -> Option<String> {
        match self {
            StageOutcome::Success => None,
            StageOutcome::Uncertain { stage, reason } => {
                Some(format!("{} outcome uncertain: {}", stage, reason))
            }
        }
    }
}

/// Everything needed to publish one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub file_path: PathBuf,
    pub cover_path: PathBuf,
    pub metadata: PublicationMetadata,
}

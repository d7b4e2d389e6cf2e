//! Publication (douga) creation
//!
//! Combines caller metadata with the registered asset and the cover into a
//! [`PublicationRecord`] and submits it once.

use tracing::{info, warn};

use crate::app::api::MemberApi;
use crate::app::models::{
    AttributionKind, CoverAsset, MediaAsset, PublicationMetadata, PublicationRecord, VideoInfo,
};
use crate::constants::upload;
use crate::errors::PublicationError;

impl PublicationRecord {
    /// Form fields of the create-publication request
    ///
    /// `tagNames` and `videoInfos` are JSON-encoded arrays. Reposts carry
    /// the source link and `originalDeclare=0`, original work
    /// `originalDeclare=1`.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if an array cannot be encoded
    pub fn form_fields(&self) -> serde_json::Result<Vec<(&'static str, String)>> {
        let tags = serde_json::to_string(&self.tag_names)?;
        let video_infos = serde_json::to_string(&self.video_infos)?;

        let mut fields = vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("tagNames", tags),
            ("creationType", self.attribution.creation_type().to_string()),
            ("channelId", self.channel_id.to_string()),
            ("coverUrl", self.cover_url.clone()),
            ("videoInfos", video_infos),
            ("isJoinUpCollege", "0".to_string()),
        ];

        match self.attribution {
            AttributionKind::Repost => {
                fields.push((
                    "originalLinkUrl",
                    self.original_source_url.clone().unwrap_or_default(),
                ));
                fields.push(("originalDeclare", "0".to_string()));
            }
            AttributionKind::Original => fields.push(("originalDeclare", "1".to_string())),
        }

        Ok(fields)
    }
}

/// Builds and submits publication records
pub struct PublicationCreator<'a> {
    api: &'a dyn MemberApi,
}

impl<'a> PublicationCreator<'a> {
    pub fn new(api: &'a dyn MemberApi) -> Self {
        Self { api }
    }

    /// Assembles the record for `asset` with `cover`
    ///
    /// # Errors
    ///
    /// Returns `PublicationError` if the metadata is invalid
    pub fn build_record(
        metadata: &PublicationMetadata,
        asset: &MediaAsset,
        cover: &CoverAsset,
    ) -> Result<PublicationRecord, PublicationError> {
        metadata.validate()?;

        let original_source_url = match metadata.attribution {
            AttributionKind::Repost => metadata.source_url().map(str::to_string),
            AttributionKind::Original => None,
        };

        Ok(PublicationRecord {
            title: metadata.title.clone(),
            description: metadata.description.clone(),
            tag_names: metadata.tags.clone(),
            attribution: metadata.attribution,
            channel_id: metadata.channel_id,
            cover_url: cover.resolved_url.clone(),
            video_infos: vec![VideoInfo {
                video_id: asset.asset_id,
                title: metadata.title.clone(),
            }],
            original_source_url,
        })
    }

    /// Submits `record`; returns the assigned publication id
    ///
    /// # Errors
    ///
    /// Returns `PublicationError` if the request fails, the result code is
    /// non-zero or the response has no `dougaId`.
    pub async fn submit(&self, record: &PublicationRecord) -> Result<i64, PublicationError> {
        let response = self.api.create_douga(record).await?;

        let result = response.result.unwrap_or(-1);
        if result != upload::MEMBER_OK {
            let message = response.error_msg.unwrap_or_default();
            warn!("create-publication rejected (result {}): {}", result, message);
            return Err(PublicationError::Rejected { result, message });
        }

        let id = response.douga_id.ok_or(PublicationError::MissingId)?;
        info!("Published \"{}\" as ac{}", record.title, id);
        Ok(id)
    }
}

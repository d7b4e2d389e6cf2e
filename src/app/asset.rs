//! Video asset registration
//!
//! Registration is two calls: create-video, which assigns the asset id, and
//! upload-finish, which kicks off server-side processing. Only the first is
//! required to succeed.

use tracing::{info, warn};

use crate::app::api::MemberApi;
use crate::app::models::{MediaAsset, StageOutcome};
use crate::constants::upload;
use crate::errors::RegistrationError;

/// Registered asset plus the outcome of the finish-processing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRegistration {
    pub asset: MediaAsset,
    pub finish: StageOutcome,
}

/// Registers a transferred file as a video asset
pub struct AssetRegistrar<'a> {
    api: &'a dyn MemberApi,
}

impl<'a> AssetRegistrar<'a> {
    pub fn new(api: &'a dyn MemberApi) -> Self {
        Self { api }
    }

    /// Creates the asset keyed by `task_id`, then requests processing
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError` if create-video fails, is rejected or
    /// returns no `videoId`. A failing finish-processing call is reported in
    /// [`AssetRegistration::finish`] instead.
    pub async fn register(
        &self,
        task_id: i64,
        file_name: &str,
    ) -> Result<AssetRegistration, RegistrationError> {
        let response = self.api.create_video(task_id, file_name).await?;

        let result = response.result.unwrap_or(-1);
        if result != upload::MEMBER_OK {
            let message = response.error_msg.unwrap_or_default();
            warn!("create-video rejected (result {}): {}", result, message);
            return Err(RegistrationError::Rejected { result, message });
        }
        let asset_id = response.video_id.ok_or(RegistrationError::MissingVideoId)?;
        info!("Registered video asset {} for task {}", asset_id, task_id);

        let finish = self.finish_processing(task_id).await;

        Ok(AssetRegistration {
            asset: MediaAsset {
                asset_key: task_id,
                asset_id,
                file_name: file_name.to_string(),
            },
            finish,
        })
    }

    async fn finish_processing(&self, task_id: i64) -> StageOutcome {
        let reason = match self.api.upload_finish(task_id).await {
            Ok(response) if response.result == Some(upload::MEMBER_OK) => {
                info!("Processing requested for task {}", task_id);
                return StageOutcome::Success;
            }
            Ok(response) => format!(
                "result {}: {}",
                response.result.unwrap_or(-1),
                response.error_msg.unwrap_or_default()
            ),
            Err(e) => e.to_string(),
        };

        warn!("upload-finish for task {} did not confirm: {}", task_id, reason);
        StageOutcome::Uncertain {
            stage: "finish processing",
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::api::{CreateVideoResponse, ResultResponse};
    use crate::app::testing::MockMemberApi;

    #[tokio::test]
    async fn test_register_success() {
        let api = MockMemberApi::default();
        let registration = AssetRegistrar::new(&api)
            .register(11, "clip.mp4")
            .await
            .unwrap();

        assert_eq!(
            registration.asset,
            MediaAsset {
                asset_key: 11,
                asset_id: 42,
                file_name: "clip.mp4".to_string(),
            }
        );
        assert!(registration.finish.is_success());
        assert_eq!(api.calls(), vec!["create_video 11 clip.mp4", "upload_finish 11"]);
    }

    #[tokio::test]
    async fn test_rejected_create_skips_finish() {
        let api = MockMemberApi::default().with_create_video_response(CreateVideoResponse {
            result: Some(-3),
            video_id: None,
            error_msg: Some("quota exceeded".to_string()),
        });
        let err = AssetRegistrar::new(&api)
            .register(11, "clip.mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, RegistrationError::Rejected { result: -3, .. }));
        assert_eq!(api.calls(), vec!["create_video 11 clip.mp4"]);
    }

    #[tokio::test]
    async fn test_missing_video_id() {
        let api = MockMemberApi::default().with_create_video_response(CreateVideoResponse {
            result: Some(0),
            video_id: None,
            error_msg: None,
        });
        let err = AssetRegistrar::new(&api)
            .register(11, "clip.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::MissingVideoId));
    }

    #[tokio::test]
    async fn test_finish_failure_is_uncertain() {
        let api = MockMemberApi::default().with_finish_response(ResultResponse {
            result: Some(1),
            error_msg: Some("busy".to_string()),
        });
        let registration = AssetRegistrar::new(&api)
            .register(11, "clip.mp4")
            .await
            .unwrap();
        assert_eq!(registration.asset.asset_id, 42);
        assert_eq!(
            registration.finish,
            StageOutcome::Uncertain {
                stage: "finish processing",
                reason: "result 1: busy".to_string(),
            }
        );

        let api = MockMemberApi::default().failing("upload_finish");
        let registration = AssetRegistrar::new(&api)
            .register(11, "clip.mp4")
            .await
            .unwrap();
        assert!(!registration.finish.is_success());
    }
}

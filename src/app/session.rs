//! Upload session negotiation
//!
//! One call to the token endpoint per file. Failures are not retried here:
//! negotiation is cheap and idempotent, so a failed upload is simply started
//! again.

use tracing::info;

use crate::app::api::MemberApi;
use crate::app::models::UploadSession;
use crate::errors::SessionError;

/// Obtains an [`UploadSession`] for a file
pub struct SessionNegotiator<'a> {
    api: &'a dyn MemberApi,
}

impl<'a> SessionNegotiator<'a> {
    pub fn new(api: &'a dyn MemberApi) -> Self {
        Self { api }
    }

    /// Negotiates a session for `file_name` of `file_size` bytes
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the request fails or the response lacks
    /// `taskId`, `token` or a positive `uploadConfig.partSize`.
    pub async fn negotiate(
        &self,
        file_name: &str,
        file_size: u64,
    ) -> Result<UploadSession, SessionError> {
        let response = self.api.request_upload_token(file_name, file_size).await?;

        let task_id = response
            .task_id
            .ok_or(SessionError::MissingField { field: "taskId" })?;
        let token = response
            .token
            .filter(|token| !token.is_empty())
            .ok_or(SessionError::MissingField { field: "token" })?;
        let part_size = response
            .upload_config
            .and_then(|config| config.part_size)
            .ok_or(SessionError::MissingField {
                field: "uploadConfig.partSize",
            })?;

        let fragment_size = u64::try_from(part_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or(SessionError::InvalidFragmentSize { size: part_size })?;

        info!(
            "Negotiated upload session for {}: task {}, fragment size {} bytes",
            file_name, task_id, fragment_size
        );

        Ok(UploadSession {
            task_id,
            token,
            fragment_size,
        })
    }
}

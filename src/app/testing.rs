//! In-memory doubles of the network seams for pipeline tests

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::app::api::{
    CoverTokenInfo, CoverTokenResponse, CoverUrlResponse, CreateDougaResponse,
    CreateVideoResponse, MemberApi, ResultResponse, TokenResponse, UploadConfig,
};
use crate::app::models::{Fragment, PublicationRecord};
use crate::app::retry::Attempt;
use crate::app::transport::FragmentTransport;
use crate::errors::{TransportError, TransportResult};

pub const COVER_URL: &str = "https://imgs.aixifan.com/cover/abc.jpeg";

/// Ordered call log shared between doubles
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries whose first word is `call`
    pub fn count(&self, call: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.split(' ').next() == Some(call))
            .count()
    }
}

fn unavailable() -> TransportError {
    TransportError::Status { status: 503 }
}

/// Scripted [`MemberApi`]
pub struct MockMemberApi {
    log: CallLog,
    token: TokenResponse,
    create_video: CreateVideoResponse,
    finish: ResultResponse,
    cover_token: CoverTokenResponse,
    cover_url: CoverUrlResponse,
    douga: CreateDougaResponse,
    failing: HashSet<&'static str>,
    records: Mutex<Vec<PublicationRecord>>,
}

impl Default for MockMemberApi {
    fn default() -> Self {
        Self {
            log: CallLog::default(),
            token: TokenResponse {
                result: Some(0),
                task_id: Some(11),
                token: Some("video-token".to_string()),
                upload_config: Some(UploadConfig {
                    part_size: Some(4_000_000),
                }),
            },
            create_video: CreateVideoResponse {
                result: Some(0),
                video_id: Some(42),
                error_msg: None,
            },
            finish: ResultResponse {
                result: Some(0),
                error_msg: None,
            },
            cover_token: CoverTokenResponse {
                result: Some(0),
                info: Some(CoverTokenInfo {
                    token: Some("cover-token".to_string()),
                }),
            },
            cover_url: CoverUrlResponse {
                result: Some(0),
                url: Some(COVER_URL.to_string()),
            },
            douga: CreateDougaResponse {
                result: Some(0),
                douga_id: Some(98765),
                error_msg: None,
            },
            failing: HashSet::new(),
            records: Mutex::new(Vec::new()),
        }
    }
}

impl MockMemberApi {
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_token_response(mut self, response: TokenResponse) -> Self {
        self.token = response;
        self
    }

    pub fn with_create_video_response(mut self, response: CreateVideoResponse) -> Self {
        self.create_video = response;
        self
    }

    pub fn with_finish_response(mut self, response: ResultResponse) -> Self {
        self.finish = response;
        self
    }

    pub fn with_cover_token_response(mut self, response: CoverTokenResponse) -> Self {
        self.cover_token = response;
        self
    }

    pub fn with_cover_url_response(mut self, response: CoverUrlResponse) -> Self {
        self.cover_url = response;
        self
    }

    pub fn with_douga_response(mut self, response: CreateDougaResponse) -> Self {
        self.douga = response;
        self
    }

    /// Makes `endpoint` fail with HTTP 503
    pub fn failing(mut self, endpoint: &'static str) -> Self {
        self.failing.insert(endpoint);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.entries()
    }

    pub fn records(&self) -> Vec<PublicationRecord> {
        self.records.lock().unwrap().clone()
    }

    fn answer<T: Clone>(&self, endpoint: &'static str, entry: String, value: &T) -> TransportResult<T> {
        self.log.push(entry);
        if self.failing.contains(endpoint) {
            Err(unavailable())
        } else {
            Ok(value.clone())
        }
    }
}

#[async_trait]
impl MemberApi for MockMemberApi {
    async fn request_upload_token(
        &self,
        file_name: &str,
        size: u64,
    ) -> TransportResult<TokenResponse> {
        self.answer("token", format!("token {} {}", file_name, size), &self.token)
    }

    async fn create_video(
        &self,
        video_key: i64,
        file_name: &str,
    ) -> TransportResult<CreateVideoResponse> {
        self.answer(
            "create_video",
            format!("create_video {} {}", video_key, file_name),
            &self.create_video,
        )
    }

    async fn upload_finish(&self, task_id: i64) -> TransportResult<ResultResponse> {
        self.answer("upload_finish", format!("upload_finish {}", task_id), &self.finish)
    }

    async fn request_cover_token(&self, _file_name: &str) -> TransportResult<CoverTokenResponse> {
        self.answer("cover_token", "cover_token".to_string(), &self.cover_token)
    }

    async fn resolve_cover_url(&self, token: &str) -> TransportResult<CoverUrlResponse> {
        self.answer("cover_url", format!("cover_url {}", token), &self.cover_url)
    }

    async fn create_douga(
        &self,
        record: &PublicationRecord,
    ) -> TransportResult<CreateDougaResponse> {
        self.records.lock().unwrap().push(record.clone());
        self.answer(
            "create_douga",
            format!("create_douga {}", record.title),
            &self.douga,
        )
    }
}

/// [`FragmentTransport`] logging every call
pub struct RecordingTransport {
    log: CallLog,
    failing_fragment: Option<u64>,
    failing_complete: bool,
    attempts: Mutex<Vec<Attempt>>,
}

impl RecordingTransport {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing_fragment: None,
            failing_complete: false,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Every attempt at fragment `index` fails with HTTP 503
    pub fn failing_fragment(mut self, index: u64) -> Self {
        self.failing_fragment = Some(index);
        self
    }

    /// Every finalize attempt fails with HTTP 503
    pub fn failing_complete(mut self) -> Self {
        self.failing_complete = true;
        self
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl FragmentTransport for RecordingTransport {
    async fn send_fragment(
        &self,
        token: &str,
        fragment: &Fragment,
        attempt: Attempt,
    ) -> TransportResult<()> {
        self.attempts.lock().unwrap().push(attempt);
        self.log.push(format!(
            "fragment {} {} {}",
            token, fragment.index, fragment.length
        ));
        if self.failing_fragment == Some(fragment.index) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    async fn complete(
        &self,
        token: &str,
        fragment_count: u64,
        attempt: Attempt,
    ) -> TransportResult<()> {
        self.attempts.lock().unwrap().push(attempt);
        self.log
            .push(format!("complete {} {}", token, fragment_count));
        if self.failing_complete {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

//! End-to-end publish pipeline
//!
//! [`UploadOrchestrator::publish`] runs the stages in a fixed order:
//!
//! 1. local preconditions (metadata, source file, cover)
//! 2. session negotiation
//! 3. ordered fragment transfer
//! 4. transfer finalization
//! 5. asset registration
//! 6. cover upload
//! 7. publication
//!
//! Any failing stage ends the run in [`UploadState::Failed`]. Finalization
//! and finish-processing failures are recorded as warnings instead, because
//! the server may have completed them anyway.

use std::fmt;
use std::path::Path;

use tokio::fs::File;
use tracing::{error, info, warn};

use crate::app::api::MemberApi;
use crate::app::asset::AssetRegistrar;
use crate::app::cover::CoverUploader;
use crate::app::fragment::Fragmenter;
use crate::app::models::{PublishRequest, StageOutcome};
use crate::app::publication::PublicationCreator;
use crate::app::retry::RetryPolicy;
use crate::app::session::SessionNegotiator;
use crate::app::transfer::{NoopObserver, TransferCoordinator, TransferObserver};
use crate::app::transport::FragmentTransport;
use crate::errors::{TransferError, UploadError, UploadResult};

/// Progress of one publish run
///
/// States only move forward; `Failed` is terminal and reachable from any
/// other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UploadState {
    Idle,
    SessionNegotiated,
    Transferred,
    Finalized,
    AssetRegistered,
    CoverReady,
    Published,
    Failed,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UploadState::Idle => "idle",
            UploadState::SessionNegotiated => "session negotiated",
            UploadState::Transferred => "transferred",
            UploadState::Finalized => "finalized",
            UploadState::AssetRegistered => "asset registered",
            UploadState::CoverReady => "cover ready",
            UploadState::Published => "published",
            UploadState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Outcome of [`UploadOrchestrator::publish`]
#[derive(Debug)]
pub struct PublishReport {
    /// Final state
    pub state: UploadState,
    /// Publication id (`dougaId`) when published
    pub publication_id: Option<i64>,
    /// Error that ended a failed run
    pub error: Option<UploadError>,
    /// Uncertain outcomes of non-fatal stages
    pub warnings: Vec<String>,
    /// Every state the run passed through, `Idle` first
    pub history: Vec<UploadState>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.state == UploadState::Published
    }

    /// Stage that failed, if any
    pub fn failed_stage(&self) -> Option<&'static str> {
        self.error.as_ref().map(UploadError::stage)
    }

    /// Last state reached before failing
    pub fn last_completed(&self) -> UploadState {
        self.history
            .iter()
            .rev()
            .copied()
            .find(|state| *state != UploadState::Failed)
            .unwrap_or(UploadState::Idle)
    }
}

/// Mutable bookkeeping of a single run
struct Run {
    history: Vec<UploadState>,
    warnings: Vec<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            history: vec![UploadState::Idle],
            warnings: Vec::new(),
        }
    }

    fn advance(&mut self, state: UploadState) {
        info!("Upload state: {}", state);
        self.history.push(state);
    }

    fn note(&mut self, outcome: StageOutcome) {
        if let Some(warning) = outcome.warning() {
            warn!("{}", warning);
            self.warnings.push(warning);
        }
    }
}

/// Local inputs checked before any network call
struct Prepared {
    file: File,
    file_size: u64,
    file_name: String,
}

/// Sequences the publish stages for one file at a time
pub struct UploadOrchestrator<'a> {
    api: &'a dyn MemberApi,
    transport: &'a dyn FragmentTransport,
    policy: RetryPolicy,
    finalize_policy: RetryPolicy,
    observer: &'a dyn TransferObserver,
}

impl<'a> UploadOrchestrator<'a> {
    /// Creates an orchestrator retrying transfers under `policy`
    ///
    /// Finalize calls use the same attempts and backoff but always validate
    /// certificates.
    pub fn new(
        api: &'a dyn MemberApi,
        transport: &'a dyn FragmentTransport,
        policy: RetryPolicy,
    ) -> Self {
        let finalize_policy = policy.clone().with_insecure_retry(false);
        Self {
            api,
            transport,
            policy,
            finalize_policy,
            observer: &NoopObserver,
        }
    }

    /// Reports transfer progress to `observer`
    pub fn with_observer(mut self, observer: &'a dyn TransferObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Publishes `request`
    ///
    /// Never panics and never returns early: every outcome, including
    /// precondition failures, is described by the returned report.
    pub async fn publish(&self, request: &PublishRequest) -> PublishReport {
        let mut run = Run::new();
        let result = self.run_stages(request, &mut run).await;

        match result {
            Ok(id) => PublishReport {
                state: UploadState::Published,
                publication_id: Some(id),
                error: None,
                warnings: run.warnings,
                history: run.history,
            },
            Err(e) => {
                error!("Upload failed at {} stage: {}", e.stage(), e);
                run.advance(UploadState::Failed);
                PublishReport {
                    state: UploadState::Failed,
                    publication_id: None,
                    error: Some(e),
                    warnings: run.warnings,
                    history: run.history,
                }
            }
        }
    }

    async fn run_stages(&self, request: &PublishRequest, run: &mut Run) -> UploadResult<i64> {
        let prepared = prepare(request).await?;
        info!(
            "Publishing {} ({} bytes) as \"{}\"",
            prepared.file_name, prepared.file_size, request.metadata.title
        );

        let session = SessionNegotiator::new(self.api)
            .negotiate(&prepared.file_name, prepared.file_size)
            .await?;
        run.advance(UploadState::SessionNegotiated);

        let coordinator = TransferCoordinator::new(
            self.transport,
            &self.policy,
            &self.finalize_policy,
            self.observer,
        );
        let fragmenter = Fragmenter::new(prepared.file, prepared.file_size, session.fragment_size);
        let fragment_count = coordinator
            .send_fragments(&session, fragmenter)
            .await
            .map_err(|e| match e {
                TransferError::ShortRead { .. } => UploadError::precondition(e.to_string()),
                other => UploadError::Transfer(other),
            })?;
        run.advance(UploadState::Transferred);

        let finalized = coordinator.finalize(&session.token, fragment_count).await;
        run.note(finalized);
        run.advance(UploadState::Finalized);

        let registration = AssetRegistrar::new(self.api)
            .register(session.task_id, &prepared.file_name)
            .await?;
        run.note(registration.finish);
        run.advance(UploadState::AssetRegistered);

        let cover = CoverUploader::new(
            self.api,
            self.transport,
            &self.policy,
            &self.finalize_policy,
        )
        .upload(&request.cover_path)
        .await?;
        run.advance(UploadState::CoverReady);

        let record =
            PublicationCreator::build_record(&request.metadata, &registration.asset, &cover)?;
        let id = PublicationCreator::new(self.api).submit(&record).await?;
        run.advance(UploadState::Published);

        Ok(id)
    }
}

/// Checks every local input and opens the source file
async fn prepare(request: &PublishRequest) -> UploadResult<Prepared> {
    request
        .metadata
        .validate()
        .map_err(UploadError::Metadata)?;

    let file_size = non_empty_file(&request.file_path, "source file").await?;
    let file_name = request
        .file_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            UploadError::precondition(format!(
                "source file name is not valid UTF-8: {}",
                request.file_path.display()
            ))
        })?;
    non_empty_file(&request.cover_path, "cover image").await?;

    let file = File::open(&request.file_path).await.map_err(|e| {
        UploadError::precondition(format!(
            "cannot open source file {}: {}",
            request.file_path.display(),
            e
        ))
    })?;

    Ok(Prepared {
        file,
        file_size,
        file_name,
    })
}

/// Size of the regular, non-empty file at `path`
async fn non_empty_file(path: &Path, what: &str) -> UploadResult<u64> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        UploadError::precondition(format!("{} {} is not readable: {}", what, path.display(), e))
    })?;
    if !metadata.is_file() {
        return Err(UploadError::precondition(format!(
            "{} {} is not a regular file",
            what,
            path.display()
        )));
    }
    if metadata.len() == 0 {
        return Err(UploadError::precondition(format!(
            "{} {} is empty",
            what,
            path.display()
        )));
    }
    Ok(metadata.len())
}

//! Ordered fragment transfer and finalization
//!
//! Fragments are sent strictly one after another: fragment `i` is only read
//! and attempted after fragment `i - 1` was acknowledged. The first fragment
//! that exhausts its retries aborts the whole transfer.

use futures::{pin_mut, TryStreamExt};
use tracing::{info, warn};

use crate::app::fragment::Fragmenter;
use crate::app::models::{StageOutcome, UploadSession};
use crate::app::retry::RetryPolicy;
use crate::app::transport::{self, FragmentTransport};
use crate::errors::TransferError;

/// Receives transfer progress
///
/// All methods default to no-ops so observers implement only what they use.
pub trait TransferObserver: Send + Sync {
    /// Transfer of `fragment_count` fragments totalling `total_bytes` starts
    fn on_start(&self, _fragment_count: u64, _total_bytes: u64) {}

    /// Fragment `index` (0-based) of `length` bytes was acknowledged
    fn on_fragment(&self, _index: u64, _length: u64) {}

    /// Every fragment was acknowledged
    fn on_finish(&self) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TransferObserver for NoopObserver {}

/// Drives fragments through a [`FragmentTransport`]
pub struct TransferCoordinator<'a> {
    transport: &'a dyn FragmentTransport,
    policy: &'a RetryPolicy,
    finalize_policy: &'a RetryPolicy,
    observer: &'a dyn TransferObserver,
}

impl<'a> TransferCoordinator<'a> {
    pub fn new(
        transport: &'a dyn FragmentTransport,
        policy: &'a RetryPolicy,
        finalize_policy: &'a RetryPolicy,
        observer: &'a dyn TransferObserver,
    ) -> Self {
        Self {
            transport,
            policy,
            finalize_policy,
            observer,
        }
    }

    /// Sends every fragment of `fragmenter` in index order
    ///
    /// Returns the number of fragments sent.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::Fragment` for the first fragment that could
    /// not be delivered; no later fragment is read or sent. Read failures
    /// are returned as they occur.
    pub async fn send_fragments(
        &self,
        session: &UploadSession,
        fragmenter: Fragmenter,
    ) -> Result<u64, TransferError> {
        let total = fragmenter.fragment_count();
        info!(
            "Transferring {} bytes in {} fragment(s) of {} bytes",
            fragmenter.file_size(),
            total,
            session.fragment_size
        );
        self.observer.on_start(total, fragmenter.file_size());

        let fragments = fragmenter.into_stream();
        pin_mut!(fragments);

        let mut sent = 0;
        while let Some(fragment) = fragments.try_next().await? {
            transport::send_fragment(self.transport, self.policy, &session.token, &fragment)
                .await
                .map_err(|source| {
                    warn!(
                        "Fragment {}/{} failed, aborting transfer",
                        fragment.index + 1,
                        total
                    );
                    TransferError::Fragment {
                        index: fragment.index,
                        source,
                    }
                })?;

            sent += 1;
            self.observer.on_fragment(fragment.index, fragment.length);
        }

        self.observer.on_finish();
        info!("All {} fragment(s) acknowledged", sent);
        Ok(sent)
    }

    /// Finalizes the transfer of `fragment_count` fragments
    ///
    /// A failed finalize does not abort the upload: the server may have
    /// completed the transfer anyway, so the result is reported as
    /// [`StageOutcome::Uncertain`].
    pub async fn finalize(&self, token: &str, fragment_count: u64) -> StageOutcome {
        match transport::finalize(self.transport, self.finalize_policy, token, fragment_count).await
        {
            Ok(()) => {
                info!("Transfer finalized ({} fragments)", fragment_count);
                StageOutcome::Success
            }
            Err(e) => {
                warn!("Transfer finalize did not confirm: {}", e);
                StageOutcome::Uncertain {
                    stage: "finalize transfer",
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tempfile::NamedTempFile;

    use crate::app::testing::{CallLog, RecordingTransport};

    #[derive(Default)]
    struct CountingObserver {
        events: Mutex<Vec<String>>,
    }

    impl TransferObserver for CountingObserver {
        fn on_start(&self, fragment_count: u64, total_bytes: u64) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {} {}", fragment_count, total_bytes));
        }

        fn on_fragment(&self, index: u64, length: u64) {
            self.events
                .lock()
                .unwrap()
                .push(format!("fragment {} {}", index, length));
        }
    }

    fn session() -> UploadSession {
        UploadSession {
            task_id: 1,
            token: "tok".to_string(),
            fragment_size: 400,
        }
    }

    async fn fragmenter(size: usize) -> (NamedTempFile, Fragmenter) {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![7u8; size]).unwrap();
        let fragmenter = Fragmenter::open(file.path(), 400).await.unwrap();
        (file, fragmenter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fragments_sent_in_order() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(log.clone());
        let policy = RetryPolicy::default();
        let observer = CountingObserver::default();
        let coordinator = TransferCoordinator::new(&transport, &policy, &policy, &observer);

        let (_file, fragmenter) = fragmenter(1_000).await;
        let sent = coordinator
            .send_fragments(&session(), fragmenter)
            .await
            .unwrap();

        assert_eq!(sent, 3);
        assert_eq!(
            log.entries(),
            vec!["fragment tok 0 400", "fragment tok 1 400", "fragment tok 2 200"]
        );
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec!["start 3 1000", "fragment 0 400", "fragment 1 400", "fragment 2 200"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fragment_aborts_transfer() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(log.clone()).failing_fragment(1);
        let policy = RetryPolicy::default();
        let coordinator = TransferCoordinator::new(&transport, &policy, &policy, &NoopObserver);

        let (_file, fragmenter) = fragmenter(1_200).await;
        let err = coordinator
            .send_fragments(&session(), fragmenter)
            .await
            .unwrap_err();

        match err {
            TransferError::Fragment { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(source.attempts, 3);
            }
            other => panic!("Expected fragment failure, got {:?}", other),
        }
        assert_eq!(
            log.entries(),
            vec![
                "fragment tok 0 400",
                "fragment tok 1 400",
                "fragment tok 1 400",
                "fragment tok 1 400",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_read_stops_transfer() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(log.clone());
        let policy = RetryPolicy::default();
        let coordinator = TransferCoordinator::new(&transport, &policy, &policy, &NoopObserver);

        let (file, fragmenter) = fragmenter(1_000).await;
        std::fs::write(file.path(), vec![7u8; 600]).unwrap();

        let err = coordinator
            .send_fragments(&session(), fragmenter)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::ShortRead {
                index: 1,
                expected: 400,
                actual: 200
            }
        ));
        assert_eq!(log.entries(), vec!["fragment tok 0 400"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_failure_is_uncertain() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(log.clone()).failing_complete();
        let policy = RetryPolicy::default();
        let coordinator = TransferCoordinator::new(&transport, &policy, &policy, &NoopObserver);

        let outcome = coordinator.finalize("tok", 3).await;
        assert!(!outcome.is_success());
        assert!(outcome.warning().unwrap().contains("finalize transfer"));
        assert_eq!(log.entries().len(), 3);

        let transport = RecordingTransport::new(CallLog::default());
        let coordinator = TransferCoordinator::new(&transport, &policy, &policy, &NoopObserver);
        assert_eq!(coordinator.finalize("tok", 3).await, StageOutcome::Success);
    }
}

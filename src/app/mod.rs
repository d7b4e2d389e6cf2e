//! Core publish pipeline for the AcFun uploader
//!
//! This module contains the upload stages, the seams they talk to the
//! network through, and the HTTP client implementing those seams.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use acfun_uploader::app::{
//!     AcfunClient, AttributionKind, ClientConfig, PublicationMetadata, PublishRequest,
//!     RetryPolicy, UploadOrchestrator,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AcfunClient::new(ClientConfig::default())?;
//! let transport = client.fragment_transport(false)?;
//!
//! let request = PublishRequest {
//!     file_path: PathBuf::from("clip.mp4"),
//!     cover_path: PathBuf::from("cover.jpg"),
//!     metadata: PublicationMetadata {
//!         title: "Speedrun".to_string(),
//!         description: String::new(),
//!         tags: vec!["game".to_string()],
//!         channel_id: 63,
//!         attribution: AttributionKind::Original,
//!         original_source_url: None,
//!     },
//! };
//!
//! let report = UploadOrchestrator::new(&client, &transport, RetryPolicy::default())
//!     .publish(&request)
//!     .await;
//! println!("published: {:?}", report.publication_id);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod asset;
pub mod client;
pub mod cover;
pub mod fragment;
pub mod models;
pub mod orchestrator;
pub mod publication;
pub mod retry;
pub mod session;
pub mod transfer;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main public API
pub use api::MemberApi;
pub use asset::{AssetRegistrar, AssetRegistration};
pub use client::{
    AcfunClient, ClientConfig, ConnectivityReport, Endpoints, HostCheck, HttpFragmentTransport,
};
pub use cover::{random_cover_name, CoverUploader};
pub use fragment::Fragmenter;
pub use models::{
    fragment_count, AttributionKind, CoverAsset, Fragment, MediaAsset, PublicationMetadata,
    PublicationRecord, PublishRequest, StageOutcome, UploadSession, VideoInfo,
};
pub use orchestrator::{PublishReport, UploadOrchestrator, UploadState};
pub use publication::PublicationCreator;
pub use retry::{Attempt, RetryPolicy};
pub use session::SessionNegotiator;
pub use transfer::{NoopObserver, TransferCoordinator, TransferObserver};
pub use transport::FragmentTransport;

//! Command-line interface components
//!
//! This module contains CLI-specific code for the AcFun uploader,
//! including argument parsing, progress display, and user interaction.

pub mod args;
pub mod batch;
pub mod commands;
pub mod progress;
pub mod prompt;
pub mod signals;

pub use args::{
    AuthAction, AuthArgs, BatchArgs, Cli, Commands, ConfigAction, ConfigArgs, GlobalArgs,
    SessionArgs, UploadArgs,
};
pub use batch::{batch_tags, run_batch, scan_directory, BatchItem, BatchPlan, BatchSummary};
pub use commands::{handle_auth, handle_batch, handle_config, handle_upload};
pub use progress::{ProgressConfig, TransferProgress};
pub use prompt::{confirm, AskUser, AssumeYes, ConnectivityDecision};
pub use signals::Interrupt;

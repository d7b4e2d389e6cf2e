//! Fragment transfer progress display
//!
//! Renders [`TransferObserver`] callbacks as an `indicatif` bar on a
//! terminal, and as plain lines on stderr otherwise.

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::TransferObserver;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {bytes_per_sec} {msg}";

/// Progress display configuration
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Draw a progress bar when stderr is a terminal
    pub enable_progress_bars: bool,
    /// Print nothing at all
    pub quiet: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            quiet: false,
        }
    }
}

/// Shows the progress of one video transfer
pub struct TransferProgress {
    bar: ProgressBar,
    text_mode: bool,
    quiet: bool,
    fragment_count: AtomicU64,
}

impl TransferProgress {
    /// Create a display; bars are only drawn on a terminal
    pub fn new(config: ProgressConfig) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);
        let use_bar = config.enable_progress_bars && is_terminal && !config.quiet;

        let bar = if use_bar {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-");
            bar.set_style(style);
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            bar,
            text_mode: !use_bar,
            quiet: config.quiet,
            fragment_count: AtomicU64::new(0),
        }
    }

    /// Bytes reported so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl TransferObserver for TransferProgress {
    fn on_start(&self, fragment_count: u64, total_bytes: u64) {
        self.fragment_count.store(fragment_count, Ordering::Relaxed);
        self.bar.set_length(total_bytes);
        self.bar.set_position(0);
        self.bar.set_message(format!("0/{} fragments", fragment_count));

        if self.text_mode && !self.quiet {
            eprintln!(
                "Uploading {} bytes in {} fragment(s)",
                total_bytes, fragment_count
            );
        }
    }

    fn on_fragment(&self, index: u64, length: u64) {
        let count = self.fragment_count.load(Ordering::Relaxed);
        self.bar.inc(length);
        self.bar
            .set_message(format!("{}/{} fragments", index + 1, count));

        if self.text_mode && !self.quiet {
            eprintln!("Progress: fragment {}/{} sent", index + 1, count);
        }
    }

    fn on_finish(&self) {
        self.bar.finish_with_message("transfer complete");
    }
}

//! Command-line argument parsing for the AcFun uploader
//!
//! This module defines the CLI structure using clap derive macros, covering
//! single and batch uploads, login management and configuration files.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::{AttributionKind, PublicationMetadata, PublishRequest};

/// AcFun Uploader - publish videos to AcFun
#[derive(Parser, Debug)]
#[command(
    name = "acfun_uploader",
    version,
    about = "Upload and publish videos on AcFun",
    long_about = "Uploads a video to AcFun in fragments, registers it, uploads a cover image and publishes it.
Supports cookie or password login, automatic retry of failed fragments, and batch uploads of a directory."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload and publish a single video
    Upload(UploadArgs),

    /// Upload every video in a directory
    Batch(BatchArgs),

    /// Manage the saved login
    Auth(AuthArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Login and network options shared by upload commands
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// AcFun username (phone or email)
    #[arg(short, long)]
    pub username: Option<String>,

    /// AcFun password
    #[arg(short, long)]
    pub password: Option<String>,

    /// Cookie file to log in with
    #[arg(long, value_name = "FILE")]
    pub cookie_file: Option<PathBuf>,

    /// Retry failed fragments without certificate verification
    #[arg(long)]
    pub insecure_retry: bool,

    /// Skip the network check before uploading
    #[arg(long)]
    pub skip_network_check: bool,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the upload command
#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Video file to upload
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Cover image
    #[arg(short, long, value_name = "IMAGE")]
    pub cover: PathBuf,

    /// Publication title
    #[arg(short, long)]
    pub title: String,

    /// Channel (partition) id
    #[arg(long = "cid", value_name = "ID")]
    pub channel_id: u32,

    /// Publication description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Tags, separated by commas or given repeatedly
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub tags: Vec<String>,

    /// Creation type: 3 for original work, 1 for repost
    #[arg(long = "type", default_value = "3", value_name = "1|3")]
    pub creation_type: u8,

    /// Source URL, required for reposts
    #[arg(long = "original-url", value_name = "URL")]
    pub original_url: Option<String>,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for the batch command
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Directory to scan for videos
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Channel (partition) id; defaults to the configured one
    #[arg(long = "cid", value_name = "ID")]
    pub channel_id: Option<u32>,

    /// Prefix prepended to every title
    #[arg(long)]
    pub title_prefix: Option<String>,

    /// Description used for every video; defaults to one naming each file
    #[arg(short, long)]
    pub description: Option<String>,

    /// Tags, separated by commas or given repeatedly; defaults to the batch tags
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub tags: Vec<String>,

    /// Seconds to wait between uploads
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for login management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Login actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Log in with a password and save the cookies
    Login {
        /// AcFun username (phone or email)
        #[arg(short, long)]
        username: Option<String>,

        /// AcFun password
        #[arg(short, long)]
        password: Option<String>,

        /// Where to save the cookies
        #[arg(long, value_name = "FILE")]
        cookie_file: Option<PathBuf>,
    },

    /// Show login status
    Status {
        /// Ask AcFun whether the saved cookies are still logged in
        #[arg(long)]
        check: bool,

        /// Cookie file to inspect
        #[arg(long, value_name = "FILE")]
        cookie_file: Option<PathBuf>,
    },

    /// Delete the saved cookies
    Clear {
        /// Cookie file to delete
        #[arg(long, value_name = "FILE")]
        cookie_file: Option<PathBuf>,
    },
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        /// Where to write; defaults to the user config directory
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level requested by global arguments, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl UploadArgs {
    /// Check the arguments before anything is sent
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }

        let attribution = self.attribution()?;
        if attribution == AttributionKind::Repost
            && self
                .original_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err("Reposts (--type 1) require --original-url".to_string());
        }

        Ok(())
    }

    /// Attribution selected by `--type`
    pub fn attribution(&self) -> Result<AttributionKind, String> {
        AttributionKind::from_creation_type(self.creation_type).ok_or_else(|| {
            format!(
                "Invalid creation type {}: use 3 for original work or 1 for repost",
                self.creation_type
            )
        })
    }

    /// Build the publish request described by the arguments
    pub fn to_request(&self) -> Result<PublishRequest, String> {
        Ok(PublishRequest {
            file_path: self.file.clone(),
            cover_path: self.cover.clone(),
            metadata: PublicationMetadata {
                title: self.title.trim().to_string(),
                description: self.description.clone(),
                tags: clean_tags(&self.tags),
                channel_id: self.channel_id,
                attribution: self.attribution()?,
                original_source_url: self.original_url.clone(),
            },
        })
    }
}

/// Trims tags and drops empty ones
pub fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

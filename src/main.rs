//! AcFun Uploader CLI application
//!
//! Command-line interface for uploading and publishing videos on AcFun.

use std::process;

use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Import CLI modules through the library (module is public but not re-exported)
use acfun_uploader::cli::{
    handle_auth, handle_batch, handle_config, handle_upload, Cli, Commands,
};
use acfun_uploader::config::AppConfig;
use acfun_uploader::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok(); // Ignore errors if file doesn't exist

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Configuration is loaded first so its log level applies without flags
    let config = AppConfig::load(cli.global.config.clone()).await;
    let configured_level = config
        .as_ref()
        .ok()
        .and_then(|config| config.logging.level.parse::<Level>().ok());

    init_logging(&cli, configured_level);

    info!("AcFun Uploader v{} starting", env!("CARGO_PKG_VERSION"));

    let quiet = cli.global.quiet;

    // Execute the appropriate command
    match cli.command {
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args, cli.global.config).await
        }
        Commands::Upload(args) => {
            info!("Executing upload command");
            handle_upload(args, config?, quiet).await
        }
        Commands::Batch(args) => {
            info!("Executing batch command");
            handle_batch(args, config?, quiet).await
        }
        Commands::Auth(args) => {
            info!("Executing auth command");
            handle_auth(args, config?).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli, configured_level: Option<Level>) {
    let log_level = cli
        .log_level()
        .or(configured_level)
        .unwrap_or(Level::WARN);

    // Create environment filter
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("acfun_uploader={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    // Initialize subscriber
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}

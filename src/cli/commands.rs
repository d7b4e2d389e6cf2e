//! Command handlers for the CLI
//!
//! This module implements the logic for each CLI command, connecting the
//! argument parsing to the upload pipeline and the session helpers.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::{
    AcfunClient, AttributionKind, HttpFragmentTransport, PublicationMetadata, PublishReport,
    PublishRequest, RetryPolicy, UploadOrchestrator,
};
use crate::auth::{
    establish_session, get_auth_status, load_cookie_file, prompt_credentials,
    remove_cookie_file, resolve_credentials, save_cookie_file, SessionOptions, SessionSource,
};
use crate::cli::args::{
    AuthAction, AuthArgs, BatchArgs, ConfigAction, ConfigArgs, SessionArgs, UploadArgs,
};
use crate::cli::batch::{batch_tags, run_batch, scan_directory, BatchSummary};
use crate::cli::progress::{ProgressConfig, TransferProgress};
use crate::cli::prompt::{confirm, AskUser, AssumeYes, ConnectivityDecision};
use crate::cli::signals::Interrupt;
use crate::config::AppConfig;
use crate::errors::{AppError, AuthError, Result};

/// A logged-in client with its transport and retry policy
struct Pipeline {
    client: AcfunClient,
    transport: HttpFragmentTransport,
    policy: RetryPolicy,
}

impl Pipeline {
    /// Logs in, checks the network and builds the fragment transport
    async fn connect(config: &AppConfig, args: &SessionArgs) -> Result<Self> {
        let client = build_client(config)?;

        match establish_session(&client, &session_options(config, args)).await? {
            SessionSource::Cookies { installed } => {
                info!("Using saved login ({} cookies)", installed)
            }
            SessionSource::Password => info!("Logged in with password"),
        }

        if args.skip_network_check {
            info!("Skipping network check");
        } else if args.yes {
            check_network(&client, &AssumeYes).await?;
        } else {
            check_network(&client, &AskUser).await?;
        }

        let allow_insecure = config.retry.allow_insecure_retry || args.insecure_retry;
        if allow_insecure {
            warn!("Insecure retry enabled: fragment retries will not verify TLS certificates");
        }

        let policy = config.retry_policy()?.with_insecure_retry(allow_insecure);
        let transport = client.fragment_transport(allow_insecure)?;

        Ok(Self {
            client,
            transport,
            policy,
        })
    }

    /// Publishes `request` with a progress display
    async fn publish(&self, request: &PublishRequest, quiet: bool) -> PublishReport {
        let progress = TransferProgress::new(ProgressConfig {
            quiet,
            ..ProgressConfig::default()
        });
        UploadOrchestrator::new(&self.client, &self.transport, self.policy.clone())
            .with_observer(&progress)
            .publish(request)
            .await
    }
}

/// Handle the upload command
pub async fn handle_upload(args: UploadArgs, config: AppConfig, quiet: bool) -> Result<()> {
    args.validate().map_err(AppError::generic)?;
    let request = args.to_request().map_err(AppError::generic)?;

    info!(
        "Uploading {} as \"{}\" (channel {}, {})",
        request.file_path.display(),
        request.metadata.title,
        request.metadata.channel_id,
        request.metadata.attribution
    );

    let pipeline = Pipeline::connect(&config, &args.session).await?;
    let interrupt = Interrupt::listen();
    let report = match interrupt.guard(pipeline.publish(&request, quiet)).await {
        Some(report) => report,
        None => {
            warn!("Interrupted, abandoning upload of {}", request.file_path.display());
            return Err(AppError::generic("Upload interrupted"));
        }
    };
    print_report(&report, &request.metadata.title);

    into_result(report)
}

/// Handle the batch command
pub async fn handle_batch(args: BatchArgs, config: AppConfig, quiet: bool) -> Result<()> {
    let title_prefix = args
        .title_prefix
        .clone()
        .unwrap_or_else(|| config.batch.title_prefix.clone());
    let channel_id = args.channel_id.unwrap_or(config.batch.channel_id);
    let interval = Duration::from_secs(args.interval.unwrap_or(config.batch.interval_secs));

    let plan = scan_directory(&args.dir, &title_prefix)?;
    for skipped in &plan.missing_cover {
        println!("⚠️  Skipping {}: no cover image found", skipped.display());
    }
    if plan.items.is_empty() {
        println!("No videos with a cover found in {}", args.dir.display());
        return Ok(());
    }

    println!("📋 {} video(s) to upload to channel {}:", plan.items.len(), channel_id);
    for item in &plan.items {
        println!(
            "  • {} (cover: {})",
            item.title,
            item.cover
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
    }

    if !args.session.yes && !confirm("Start uploading?", true)? {
        println!("Cancelled");
        return Ok(());
    }

    let pipeline = Pipeline::connect(&config, &args.session).await?;
    let interrupt = Interrupt::listen();
    let tags = batch_tags(&args.tags);
    let total = plan.items.len();

    let summary = run_batch(&plan.items, interval, &interrupt, |position, item| {
        println!("\n[{}/{}] {}", position + 1, total, item.title);
        let request = PublishRequest {
            file_path: item.video.clone(),
            cover_path: item.cover.clone(),
            metadata: PublicationMetadata {
                title: item.title.clone(),
                description: item.description(args.description.as_deref()),
                tags: tags.clone(),
                channel_id,
                attribution: AttributionKind::Original,
                original_source_url: None,
            },
        };
        let pipeline = &pipeline;

        async move {
            let report = pipeline.publish(&request, quiet).await;
            print_report(&report, &request.metadata.title);
            match (report.publication_id, report.error) {
                (Some(id), _) => Ok(id),
                (None, error) => Err(error.map(|e| e.to_string()).unwrap_or_default()),
            }
        }
    })
    .await;

    print_summary(&summary);

    if summary.interrupted {
        Err(AppError::generic(format!(
            "Batch interrupted; {} upload(s) not attempted",
            summary.skipped.len()
        )))
    } else if summary.failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::generic(format!(
            "{} of {} uploads failed",
            summary.failed.len(),
            summary.total()
        )))
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("\n📊 Batch Summary:");
    println!("  Total: {}", summary.total());
    println!("  Published: {}", summary.succeeded.len());
    println!("  Failed: {}", summary.failed.len());
    if summary.interrupted {
        println!("  Not attempted (interrupted): {}", summary.skipped.len());
    }
    for (title, reason) in &summary.failed {
        println!("  ❌ {}: {}", title, reason);
    }
}

/// Handle login management commands
pub async fn handle_auth(args: AuthArgs, config: AppConfig) -> Result<()> {
    match args.action {
        AuthAction::Login {
            username,
            password,
            cookie_file,
        } => {
            let path = cookie_path(&config, cookie_file);
            let credentials = match resolve_credentials(username, password) {
                Some(credentials) => credentials,
                None if atty::is(atty::Stream::Stdin) => prompt_credentials()?,
                None => return Err(AuthError::MissingCredentials.into()),
            };

            let client = build_client(&config)?;
            let cookies = client
                .login(&credentials.username, &credentials.password)
                .await?;
            save_cookie_file(&path, &cookies)?;

            println!(
                "✅ Logged in as {}; saved {} cookies to {}",
                credentials.username,
                cookies.len(),
                path.display()
            );
        }
        AuthAction::Status { check, cookie_file } => {
            let path = cookie_path(&config, cookie_file);
            let mut status = get_auth_status(&path);

            if check && status.cookie_count.is_some() {
                let client = build_client(&config)?;
                client.install_cookies(&load_cookie_file(&path)?);
                status.logged_in = Some(client.check_login().await?);
            }

            println!("🔐 Login Status");
            println!("==============");
            println!("Cookie file: {}", status.cookie_file.display());
            match status.cookie_count {
                Some(count) => println!("Cookies: {}", count),
                None => println!("Cookies: none"),
            }
            println!(
                "Credentials in environment: {}",
                if status.env_credentials { "yes" } else { "no" }
            );
            println!("Status: {}", status.status_message());
        }
        AuthAction::Clear { cookie_file } => {
            let path = cookie_path(&config, cookie_file);
            if remove_cookie_file(&path)? {
                println!("🗑️  Removed {}", path.display());
            } else {
                println!("No saved cookies at {}", path.display());
            }
        }
    }

    Ok(())
}

/// Handle configuration commands
///
/// Takes the config path rather than a loaded config so that `config init`
/// works when the existing file does not parse.
pub async fn handle_config(args: ConfigArgs, config_file: Option<PathBuf>) -> Result<()> {
    match args.action {
        ConfigAction::Init { force, path } => {
            let written = AppConfig::write_default(path, force).await?;
            println!("✅ Wrote default configuration to {}", written.display());
        }
        ConfigAction::Show => {
            let config = AppConfig::load(config_file).await?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn build_client(config: &AppConfig) -> Result<AcfunClient> {
    Ok(AcfunClient::with_endpoints(
        config.client_config(),
        config.endpoints()?,
    )?)
}

fn cookie_path(config: &AppConfig, cookie_file: Option<PathBuf>) -> PathBuf {
    cookie_file.unwrap_or_else(|| config.auth.cookie_file.clone())
}

fn session_options(config: &AppConfig, args: &SessionArgs) -> SessionOptions {
    SessionOptions {
        cookie_file: cookie_path(config, args.cookie_file.clone()),
        username: args.username.clone(),
        password: args.password.clone(),
        save_cookies: config.auth.save_cookies,
        interactive: !args.yes && atty::is(atty::Stream::Stdin),
    }
}

/// Probes the AcFun hosts and asks `decision` what to do on failure
async fn check_network(client: &AcfunClient, decision: &dyn ConnectivityDecision) -> Result<()> {
    let report = client.probe_connectivity().await;
    if report.is_ok() || decision.proceed(&report) {
        Ok(())
    } else {
        Err(AppError::generic("Upload cancelled after failed network check"))
    }
}

fn print_report(report: &PublishReport, title: &str) {
    for warning in &report.warnings {
        println!("⚠️  {}", warning);
    }

    match (report.publication_id, &report.error) {
        (Some(id), _) => println!("✅ Published \"{}\" as ac{}", title, id),
        (None, Some(error)) => println!(
            "❌ \"{}\" failed during {} (last completed: {}): {}",
            title,
            error.stage(),
            report.last_completed(),
            error
        ),
        (None, None) => println!("❌ \"{}\" did not complete", title),
    }
}

fn into_result(report: PublishReport) -> Result<()> {
    if report.is_success() {
        return Ok(());
    }
    Err(report
        .error
        .map(AppError::from)
        .unwrap_or_else(|| AppError::generic("Upload did not complete")))
}

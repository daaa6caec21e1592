//! s3web: deploy static websites to object storage buckets.
//!
//! Settings come from S3WEB_* environment variables (and `.env`); the global
//! flags below override them.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use s3web_cli::{
    init_tracing, render_labels, render_objects, render_report, report_exit_code, upload_video,
    EXIT_FATAL,
};
use s3web_core::{Config, SiteSettings, StorageBackend};
use s3web_labels::{LabelDetector, PollSettings, RekognitionLabels};
use s3web_storage::create_storage;
use s3web_sync::{BucketConfigurator, CancellationToken, SyncOptions, SyncOrchestrator};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "s3web", about = "Deploy static websites to S3 buckets")]
struct Cli {
    /// Storage backend: s3 or local
    #[arg(long, global = true)]
    backend: Option<String>,
    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,
    /// AWS shared-config profile
    #[arg(long, global = true)]
    profile: Option<String>,
    /// Maximum number of concurrent uploads
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all buckets
    ListBuckets,
    /// List the objects in a bucket
    ListBucketObjects {
        /// Bucket name
        bucket: String,
    },
    /// Create a bucket and configure it for static website hosting
    SetupBucket {
        /// Bucket name
        bucket: String,
        /// Website index document
        #[arg(long)]
        index_document: Option<String>,
        /// Website error document
        #[arg(long)]
        error_document: Option<String>,
    },
    /// Upload new and changed files from a directory to a bucket
    Sync {
        /// Local directory to publish
        pathname: PathBuf,
        /// Bucket name
        bucket: String,
        /// Show what would be uploaded without uploading
        #[arg(long)]
        dry_run: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload a video and run label detection on it
    DetectLabels {
        /// Path to the video file
        video: PathBuf,
        /// Bucket to upload the video to
        bucket: String,
        /// Minimum label confidence (0-100)
        #[arg(long)]
        min_confidence: Option<f32>,
        /// Print every label as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;

    if let Some(backend) = &cli.backend {
        config.storage_backend = backend.parse()?;
    }
    if let Some(region) = &cli.region {
        config.region = Some(region.clone());
    }
    if let Some(profile) = &cli.profile {
        config.aws_profile = Some(profile.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        config.sync_concurrency = concurrency;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };
    init_tracing(config.log_format);

    match run(cli.command, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(command: Commands, config: Config) -> anyhow::Result<u8> {
    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;

    match command {
        Commands::ListBuckets => {
            for bucket in storage.list_buckets().await? {
                println!("{}", bucket);
            }
        }
        Commands::ListBucketObjects { bucket } => {
            let objects = storage
                .list_objects(&bucket)
                .await
                .with_context(|| format!("Failed to list bucket {}", bucket))?;
            print!("{}", render_objects(&objects));
        }
        Commands::SetupBucket {
            bucket,
            index_document,
            error_document,
        } => {
            let settings = SiteSettings::new(
                index_document.unwrap_or_else(|| config.index_document.clone()),
                error_document.unwrap_or_else(|| config.error_document.clone()),
            );
            let bucket_config = BucketConfigurator::new(storage)
                .ensure_bucket(&bucket, &settings)
                .await?;

            println!("Bucket {} is configured for website hosting", bucket_config.name);
            if let (StorageBackend::S3, Some(region)) = (config.storage_backend, &config.region) {
                println!("Website endpoint: {}", bucket_config.website_url(region));
            }
        }
        Commands::Sync {
            pathname,
            bucket,
            dry_run,
            json,
        } => {
            let cancel = CancellationToken::new();
            spawn_interrupt_handler(cancel.clone());

            let options = SyncOptions {
                dry_run,
                ..SyncOptions::from_config(&config)
            };
            let report = SyncOrchestrator::new(storage, options)
                .sync(&pathname, &bucket, &cancel)
                .await?;

            if json {
                print_json(&report)?;
            } else {
                print!("{}", render_report(&report));
            }
            return Ok(report_exit_code(&report));
        }
        Commands::DetectLabels {
            video,
            bucket,
            min_confidence,
            json,
        } => {
            if config.storage_backend != StorageBackend::S3 {
                anyhow::bail!("detect-labels requires the s3 storage backend");
            }

            let key = upload_video(storage.as_ref(), &video, &bucket).await?;
            let api = RekognitionLabels::new(config.region.clone(), config.aws_profile.clone()).await;
            let result = LabelDetector::new(Arc::new(api), PollSettings::from_config(&config))
                .detect(&bucket, &key, min_confidence)
                .await
                .context("Label detection failed")?;

            if json {
                print_json(&result)?;
            } else {
                if let Some(duration_ms) = result.video_duration_ms {
                    println!("Video duration: {:.1} s", duration_ms as f64 / 1000.0);
                }
                print!("{}", render_labels(&result.summary()));
            }
        }
    }

    Ok(0)
}

/// Cancel `token` on Ctrl-C so in-flight uploads finish and the rest are reported.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, waiting for in-flight uploads to finish...");
            token.cancel();
        }
    });
}

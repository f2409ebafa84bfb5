use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::gcs::GcsSink;
use crate::load_config::load_config;
use crate::upload;

/// CLI for gcs-upload: publish build artifacts to a Google Cloud Storage bucket.
///
/// Plugin settings can also be set through `GCS_*` or `PLUGIN_*` environment variables
/// (first one set wins, see [`crate::load_config`]); build variables come from `DRONE_*`.
#[derive(Parser, Debug)]
#[clap(
    name = "gcs-upload",
    version,
    about = "Upload build artifacts to Google Cloud Storage, routed by build trigger"
)]
pub struct Cli {
    /// Optional YAML file with non-secret settings
    #[clap(long, env = "PLUGIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Google Cloud Storage bucket name
    #[clap(long)]
    pub bucket: Option<String>,

    /// Upload files from this source folder
    #[clap(long)]
    pub source: Option<PathBuf>,

    /// Strip this prefix from each source path
    #[clap(long)]
    pub strip_prefix: Option<String>,

    /// Upload files to this target folder
    #[clap(long)]
    pub target: Option<String>,

    /// Append a YYYY/MM-DD date folder to the target
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    pub target_auto_date: Option<bool>,

    /// Folder used for pull requests and non-default branches
    #[clap(long)]
    pub trigger_folder: Option<String>,

    /// Folder used for tag builds
    #[clap(long)]
    pub tag_folder: Option<String>,

    /// Storage API endpoint (for emulators)
    #[clap(long)]
    pub endpoint: Option<String>,

    /// Abort the run after this many seconds
    #[clap(long, env = "PLUGIN_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Show debug logging
    #[clap(long, num_args = 0..=1, default_missing_value = "true")]
    pub debug: Option<bool>,

    #[clap(long = "repo.owner", env = "DRONE_REPO_OWNER")]
    pub repo_owner: Option<String>,

    #[clap(long = "repo.name", env = "DRONE_REPO_NAME")]
    pub repo_name: Option<String>,

    #[clap(long = "commit.sha", env = "DRONE_COMMIT_SHA", default_value = "unsetSHA")]
    pub commit_sha: String,

    #[clap(long = "commit.ref", env = "DRONE_COMMIT_REF", default_value = "refs/heads/master")]
    pub commit_ref: String,

    #[clap(long = "commit.branch", env = "DRONE_COMMIT_BRANCH", default_value = "master")]
    pub commit_branch: String,

    #[clap(long = "commit.author", env = "DRONE_COMMIT_AUTHOR", default_value = "unknown author")]
    pub commit_author: String,

    #[clap(long = "build.event", env = "DRONE_BUILD_EVENT", default_value = "push")]
    pub build_event: String,

    #[clap(long = "build.number", env = "DRONE_BUILD_NUMBER")]
    pub build_number: Option<u64>,

    #[clap(long = "build.tag", env = "DRONE_TAG")]
    pub build_tag: Option<String>,
}

impl Cli {
    /// Debug logging from `--debug`, `GCS_DEBUG` or `PLUGIN_DEBUG`.
    pub fn debug_requested(&self) -> bool {
        self.debug.unwrap_or_else(|| {
            ["GCS_DEBUG", "PLUGIN_DEBUG"]
                .iter()
                .filter_map(|name| std::env::var(name).ok())
                .find(|v| !v.is_empty())
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false)
        })
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let sink = GcsSink::connect(&config.bucket, &config.credentials, config.endpoint.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to construct storage client: {e}"))?;

    let upload = upload::run(&config.task, &config.build, &sink);
    let result = match config.timeout {
        Some(limit) => tokio::time::timeout(limit, upload)
            .await
            .with_context(|| format!("Upload timed out after {}s", limit.as_secs()))?,
        None => upload.await,
    };

    // Process exit code is decided in main(), not here.
    result.with_context(|| format!("Upload to bucket {} failed", config.bucket))
}

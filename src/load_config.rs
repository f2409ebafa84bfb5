use crate::cli::Cli;
use crate::credentials::{Credentials, ServiceAccountKey};
use crate::target::{BuildContext, BuildEvent, BuildMetadata, TriggerContext};
use crate::upload::UploadTask;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// Fully merged runtime configuration for one upload run.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub bucket: String,
    pub credentials: Credentials,
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
    pub task: UploadTask,
    pub build: BuildContext,
}

impl PluginConfig {
    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket,
            source = %self.task.source.display(),
            target_folder = %self.task.target,
            "Loaded plugin config"
        );
        debug!(
            bucket = %self.bucket,
            source = %self.task.source.display(),
            target_folder = %self.task.target,
            trigger_folder = %self.task.trigger_folder,
            tag_folder = %self.task.tag_folder,
            target_date_folder = self.task.target_date_folder,
            trigger_module = %self.build.metadata.trigger_module,
            trigger_event = self.build.submodule.as_ref().map(|s| s.event.as_str()).unwrap_or(""),
            trigger_branch = self.build.submodule.as_ref().map(|s| s.branch.as_str()).unwrap_or(""),
            trigger_sha = %self.build.metadata.trigger_sha,
            build_event = %self.build.main.event,
            build_branch = %self.build.main.branch,
            repo = %format!("{}/{}", self.build.metadata.repo_owner, self.build.metadata.repo_name),
            commit = %self.build.metadata.commit_sha,
            build_number = self.build.metadata.build_number,
            "Parameter.."
        );
    }
}

/// Optional YAML file holding non-secret settings. Flags and env vars take precedence.
#[derive(Debug, Default, Deserialize)]
struct StaticConfig {
    bucket: Option<String>,
    source: Option<PathBuf>,
    target: Option<String>,
    strip_prefix: Option<String>,
    trigger_folder: Option<String>,
    tag_folder: Option<String>,
    target_date_folder: Option<bool>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

fn read_static_config(path: &Path) -> Result<StaticConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })
}

/// First non-empty value of the given environment variables.
fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

fn env_bool(names: &[&str]) -> Result<Option<bool>> {
    match env_any(names) {
        Some(v) => v
            .parse::<bool>()
            .map(Some)
            .with_context(|| format!("{} must be true or false, got {v:?}", names.join("/"))),
        None => Ok(None),
    }
}

/// Credentials from the environment only: an access token (`GCS_TOKEN` / `PLUGIN_TOKEN`)
/// wins over a service-account key (`GCS_KEY` / `PLUGIN_KEY`). The key is either the JSON
/// document itself or the path of a key file.
fn load_credentials() -> Result<Credentials> {
    if let Some(token) = env_any(&["GCS_TOKEN", "PLUGIN_TOKEN"]) {
        debug!("Using access token from environment");
        return Ok(Credentials::AccessToken(token));
    }

    let key = env_any(&["GCS_KEY", "PLUGIN_KEY"]).ok_or_else(|| {
        error!("Neither GCS_KEY / PLUGIN_KEY nor GCS_TOKEN / PLUGIN_TOKEN is set");
        anyhow::anyhow!("credentials missing: set GCS_KEY/PLUGIN_KEY or GCS_TOKEN/PLUGIN_TOKEN")
    })?;

    let json = if key.trim_start().starts_with('{') {
        key
    } else {
        fs::read_to_string(&key).map_err(|e| {
            error!(error = ?e, key_path = %key, "Failed to read service-account key file");
            anyhow::anyhow!("Failed to read service-account key file {key}: {e}")
        })?
    };

    let key = ServiceAccountKey::from_json(&json).map_err(|e| {
        error!(error = %e, "Failed to parse service-account key");
        anyhow::anyhow!("Failed to parse service-account key: {e}")
    })?;
    debug!(client_email = %key.client_email, "Using service-account key");
    Ok(Credentials::ServiceAccount(key))
}

/// Merge flags (`cli`), the `GCS_*` then `PLUGIN_*` environment variables, the optional
/// YAML file and the `DRONE_*` / `T_*` build variables into a [`PluginConfig`].
///
/// Credentials are secrets and are only read from the environment.
pub fn load_config(cli: &Cli) -> Result<PluginConfig> {
    let file = match &cli.config {
        Some(path) => read_static_config(path)?,
        None => StaticConfig::default(),
    };

    let bucket = cli
        .bucket
        .clone()
        .or_else(|| env_any(&["GCS_BUCKET", "PLUGIN_BUCKET"]))
        .or(file.bucket)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            error!("Bucket is not configured");
            anyhow::anyhow!("bucket is required: set --bucket, PLUGIN_BUCKET or GCS_BUCKET")
        })?;

    let credentials = load_credentials()?;

    let source = cli
        .source
        .clone()
        .or_else(|| env_any(&["GCS_SOURCE", "PLUGIN_SOURCE"]).map(PathBuf::from))
        .or(file.source)
        .unwrap_or_else(|| PathBuf::from("."));

    let target_date_folder = match cli.target_auto_date {
        Some(v) => v,
        None => env_bool(&["GCS_TARGET_DATE_FOLDER", "PLUGIN_TARGET_DATE_FOLDER"])?
            .or(file.target_date_folder)
            .unwrap_or(false),
    };

    let task = UploadTask {
        source,
        target: cli
            .target
            .clone()
            .or_else(|| env_any(&["GCS_TARGET", "PLUGIN_TARGET"]))
            .or(file.target)
            .unwrap_or_default(),
        strip_prefix: cli
            .strip_prefix
            .clone()
            .or_else(|| env_any(&["GCS_STRIP_PREFIX", "PLUGIN_STRIP_PREFIX"]))
            .or(file.strip_prefix)
            .unwrap_or_default(),
        trigger_folder: cli
            .trigger_folder
            .clone()
            .or_else(|| env_any(&["GCS_TRIGGER_FOLDER", "PLUGIN_TRIGGER_FOLDER"]))
            .or(file.trigger_folder)
            .unwrap_or_default(),
        tag_folder: cli
            .tag_folder
            .clone()
            .or_else(|| env_any(&["GCS_TAG_FOLDER", "PLUGIN_TAG_FOLDER"]))
            .or(file.tag_folder)
            .unwrap_or_default(),
        target_date_folder,
    };

    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| env_any(&["GCS_ENDPOINT", "PLUGIN_ENDPOINT"]))
        .or(file.endpoint);

    let timeout = cli
        .timeout
        .or(file.timeout_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    // An empty main event routes like any unrecognised one: to the configured target.
    let main = TriggerContext::from_raw(&cli.build_event, &cli.commit_branch).unwrap_or_else(|| {
        debug!("DRONE_BUILD_EVENT is empty, using the normal target");
        TriggerContext::new(BuildEvent::Other(String::new()), cli.commit_branch.as_str())
    });

    let submodule = TriggerContext::from_raw(
        &env_any(&["T_EVEN"]).unwrap_or_default(),
        &env_any(&["T_BRANCH"]).unwrap_or_default(),
    );
    if let Some(sub) = &submodule {
        info!(event = %sub.event, branch = %sub.branch, "Submodule trigger detected");
    }

    let metadata = BuildMetadata {
        repo_owner: cli.repo_owner.clone().unwrap_or_default(),
        repo_name: cli.repo_name.clone().unwrap_or_default(),
        commit_sha: cli.commit_sha.clone(),
        commit_ref: cli.commit_ref.clone(),
        commit_author: cli.commit_author.clone(),
        build_number: cli.build_number.unwrap_or_default(),
        tag: cli.build_tag.clone().unwrap_or_default(),
        trigger_module: env_any(&["T_MODULE"]).unwrap_or_default(),
        trigger_sha: env_any(&["T_SHA"]).unwrap_or_default(),
    };

    let config = PluginConfig {
        bucket,
        credentials,
        endpoint,
        timeout,
        task,
        build: BuildContext::new(main)
            .with_submodule(submodule)
            .with_metadata(metadata),
    };

    config.trace_loaded();
    Ok(config)
}

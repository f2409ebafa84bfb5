//! Destination folder resolution.
//!
//! Picks the upload folder from what triggered the build:
//!   - pull requests and pushes to a non-default branch go to the trigger folder
//!   - tags go to the tag folder
//!   - everything else (including pushes to `master`) keeps the configured target
//!
//! When a submodule trigger is present it replaces the main project's context entirely.
//! The chosen folder is normalized and optionally suffixed with a `YYYY/MM-DD` date
//! partition, computed from the UTC clock.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::path_utils::normalize_folder;
use crate::upload::UploadTask;

/// Branch whose pushes are treated as a normal (non-trigger) build.
pub const DEFAULT_BRANCH: &str = "master";

/// What kind of CI event started the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildEvent {
    Push,
    PullRequest,
    Tag,
    Other(String),
}

impl BuildEvent {
    /// Parse the CI vocabulary (`push`, `pull_request`, `tag`). Empty input is not an event.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" => None,
            "push" => Some(BuildEvent::Push),
            "pull_request" => Some(BuildEvent::PullRequest),
            "tag" => Some(BuildEvent::Tag),
            other => Some(BuildEvent::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BuildEvent::Push => "push",
            BuildEvent::PullRequest => "pull_request",
            BuildEvent::Tag => "tag",
            BuildEvent::Other(other) => other,
        }
    }
}

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event and branch of one trigger (main project or submodule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerContext {
    pub event: BuildEvent,
    pub branch: String,
}

impl TriggerContext {
    pub fn new(event: BuildEvent, branch: impl Into<String>) -> Self {
        Self {
            event,
            branch: branch.into(),
        }
    }

    /// Build a context from raw strings; `None` when the event is empty.
    pub fn from_raw(event: &str, branch: &str) -> Option<Self> {
        BuildEvent::parse(event).map(|event| Self::new(event, branch))
    }
}

/// Informational build metadata, logged but never used for routing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub repo_owner: String,
    pub repo_name: String,
    pub commit_sha: String,
    pub commit_ref: String,
    pub commit_author: String,
    pub build_number: u64,
    pub tag: String,
    pub trigger_module: String,
    pub trigger_sha: String,
}

/// Everything known about the triggering event of this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    pub main: TriggerContext,
    /// Present only when a submodule trigger supplied a non-empty event.
    pub submodule: Option<TriggerContext>,
    #[serde(default)]
    pub metadata: BuildMetadata,
}

impl BuildContext {
    pub fn new(main: TriggerContext) -> Self {
        Self {
            main,
            submodule: None,
            metadata: BuildMetadata::default(),
        }
    }

    pub fn with_submodule(mut self, submodule: Option<TriggerContext>) -> Self {
        self.submodule = submodule;
        self
    }

    pub fn with_metadata(mut self, metadata: BuildMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The context that drives routing: the submodule trigger when present, else the main one.
    pub fn authoritative(&self) -> &TriggerContext {
        self.submodule.as_ref().unwrap_or(&self.main)
    }

    pub fn is_submodule_trigger(&self) -> bool {
        self.submodule.is_some()
    }
}

/// Which folder the decision policy picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    Trigger,
    Tag,
    Normal,
}

/// Apply the routing policy to a single trigger context.
pub fn select_mode(ctx: &TriggerContext) -> TargetMode {
    match &ctx.event {
        BuildEvent::PullRequest => TargetMode::Trigger,
        BuildEvent::Push if ctx.branch != DEFAULT_BRANCH => TargetMode::Trigger,
        BuildEvent::Tag => TargetMode::Tag,
        _ => TargetMode::Normal,
    }
}

/// Resolve the destination folder using today's UTC date for the optional date partition.
pub fn resolve_target(ctx: &BuildContext, task: &UploadTask) -> String {
    resolve_target_on(ctx, task, Utc::now().date_naive())
}

/// Resolve the destination folder, using `today` for the optional date partition.
pub fn resolve_target_on(ctx: &BuildContext, task: &UploadTask, today: NaiveDate) -> String {
    if ctx.is_submodule_trigger() {
        info!("--- Sub Project ---");
    } else {
        info!("--- Main Project ---");
    }

    let trigger = ctx.authoritative();
    let mode = select_mode(trigger);
    let folder = match mode {
        TargetMode::Trigger => {
            info!(event = %trigger.event, branch = %trigger.branch, "Trigger Mode");
            &task.trigger_folder
        }
        TargetMode::Tag => {
            info!(event = %trigger.event, "Tag Mode");
            &task.tag_folder
        }
        TargetMode::Normal => {
            info!(event = %trigger.event, branch = %trigger.branch, "Normal Mode");
            &task.target
        }
    };

    let mut resolved = normalize_folder(folder);
    debug!(target_folder = %resolved, "Target folder resolved");

    if task.target_date_folder {
        let partition = today.format("%Y/%m-%d").to_string();
        resolved = if resolved.is_empty() {
            partition
        } else {
            format!("{resolved}/{partition}")
        };
        debug!(target_folder = %resolved, "Appended date partition");
    }

    resolved
}

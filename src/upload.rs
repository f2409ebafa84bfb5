//! Upload orchestration: resolve → enumerate → write, one file at a time.
//!
//! # Flow
//! 1. Resolve the destination folder from the build context ([`crate::target`]).
//! 2. Enumerate every source file up front ([`crate::path_utils::enumerate_files`]).
//!    Any enumeration error aborts the run before anything is written.
//! 3. For each file, in enumeration order, compute its key and content type and write it
//!    through the [`ObjectSink`].
//!
//! # Error Handling
//! Fail-fast: the first error is returned and no later file is attempted. Objects written
//! before the failure stay in the bucket.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::content_type::infer_content_type;
use crate::contract::ObjectSink;
use crate::error::UploadError;
use crate::path_utils::{compute_destination_key, enumerate_files, key_source_path};
use crate::target::{resolve_target, BuildContext};

/// What to upload and where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTask {
    /// Root directory whose files are uploaded.
    pub source: PathBuf,
    /// Folder used for normal builds.
    pub target: String,
    /// Removed from the front of each source path before joining onto the folder.
    pub strip_prefix: String,
    /// Folder for pull requests and pushes to non-default branches.
    pub trigger_folder: String,
    /// Folder for tag builds.
    pub tag_folder: String,
    /// Append a `YYYY/MM-DD` partition to the resolved folder.
    pub target_date_folder: bool,
}

/// A discovered file, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub source_path: PathBuf,
    pub destination_key: String,
    pub content_type: &'static str,
}

impl FileEntry {
    /// Describe `source_path` (found while walking `root`) for upload below `target_folder`.
    pub fn new(source_path: PathBuf, root: &Path, strip_prefix: &str, target_folder: &str) -> Self {
        let key_source = key_source_path(&source_path, root, strip_prefix);
        let destination_key = compute_destination_key(&key_source, strip_prefix, target_folder);
        let content_type = infer_content_type(&source_path);
        Self {
            source_path,
            destination_key,
            content_type,
        }
    }
}

/// Write one file: upload the bytes, then set its content type.
///
/// A failed content-type update is reported even though the bytes are already stored.
pub async fn write_object<S>(sink: &S, entry: &FileEntry) -> Result<(), UploadError>
where
    S: ObjectSink + ?Sized,
{
    debug!(
        file = %entry.source_path.display(),
        key = %entry.destination_key,
        content_type = entry.content_type,
        "Uploading file"
    );

    sink.put_object(&entry.source_path, &entry.destination_key)
        .await
        .map_err(|source| UploadError::Sink {
            key: entry.destination_key.clone(),
            source,
        })?;

    sink.set_content_type(&entry.destination_key, entry.content_type)
        .await
        .map_err(|source| UploadError::Sink {
            key: entry.destination_key.clone(),
            source,
        })
}

/// Upload every file of `task.source` through `sink`.
pub async fn run<S>(task: &UploadTask, ctx: &BuildContext, sink: &S) -> Result<(), UploadError>
where
    S: ObjectSink + ?Sized,
{
    let target_folder = resolve_target(ctx, task);
    upload_to(task, &target_folder, sink).await
}

/// Upload every file of `task.source` below an already resolved `target_folder`.
pub async fn upload_to<S>(task: &UploadTask, target_folder: &str, sink: &S) -> Result<(), UploadError>
where
    S: ObjectSink + ?Sized,
{
    info!(
        source = %task.source.display(),
        target_folder,
        "[UPLOAD] Starting upload"
    );

    let files = enumerate_files(&task.source)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            error!(source = %task.source.display(), error = %e, "[UPLOAD][ERROR] Source path unreadable");
            UploadError::SourceUnreadable {
                path: task.source.clone(),
                source: e,
            }
        })?;

    debug!(count = files.len(), "[UPLOAD] Enumerated source files");

    let mut uploaded = 0usize;
    for path in files {
        let entry = FileEntry::new(path, &task.source, &task.strip_prefix, target_folder);
        if let Err(e) = write_object(sink, &entry).await {
            error!(
                file = %entry.source_path.display(),
                key = %entry.destination_key,
                error = %e,
                "[UPLOAD][ERROR] Could not upload file"
            );
            return Err(e);
        }
        uploaded += 1;
    }

    info!(uploaded, target_folder, "[UPLOAD] Upload complete");
    Ok(())
}

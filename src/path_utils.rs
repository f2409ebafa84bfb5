//! Path helpers: source enumeration, folder normalization and destination keys.
//!
//! Object keys always use `/` as separator, regardless of the host platform.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Placeholder files that only exist to keep empty directories under version control.
pub const SENTINEL_FILES: &[&str] = &[".gitkeep"];

/// Strip the leading and trailing separator from a target folder.
///
/// `"/builds/"` becomes `"builds"`. The result never starts or ends with `/`, so
/// applying it twice gives the same folder as applying it once.
pub fn normalize_folder(path: &str) -> String {
    path.trim_start_matches('/').trim_end_matches('/').to_string()
}

fn is_sentinel(name: &std::ffi::OsStr) -> bool {
    SENTINEL_FILES.iter().any(|s| name == *s)
}

/// Recursively list the regular files below `root`.
///
/// Symlinks whose target is a file are listed under their own path; symlinked
/// directories are not descended into. Directories and sentinel placeholder files are
/// skipped. Entries are yielded lazily
/// in file-name order within each directory. An unreadable root or entry is yielded as
/// an `Err` item; the caller decides whether to stop.
pub fn enumerate_files(
    root: impl AsRef<Path>,
) -> impl Iterator<Item = Result<PathBuf, walkdir::Error>> {
    WalkDir::new(root.as_ref())
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                let is_file = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
                if !is_file {
                    return None;
                }
                if is_sentinel(entry.file_name()) {
                    debug!(path = %entry.path().display(), "Skipping placeholder file");
                    return None;
                }
                Some(Ok(entry.into_path()))
            }
            Err(e) => Some(Err(e)),
        })
}

/// Compute the object key for a discovered source file.
///
/// `strip_prefix` is removed from the front of the (lexically cleaned) source path when
/// it matches, the remainder is joined onto `target_folder`, and leading separators are
/// dropped from the result.
pub fn compute_destination_key(source_path: &Path, strip_prefix: &str, target_folder: &str) -> String {
    let source = clean(&source_path.to_string_lossy().replace('\\', "/"));
    let remainder = source.strip_prefix(strip_prefix).unwrap_or(source.as_str());

    let joined = match (target_folder.is_empty(), remainder.is_empty()) {
        (true, _) => clean(remainder),
        (false, true) => clean(target_folder),
        (false, false) => clean(&format!("{}/{}", target_folder, remainder)),
    };

    joined.trim_start_matches('/').to_string()
}

/// Pick the path a destination key is derived from.
///
/// When `strip_prefix` matches the walked path (as the source root was given), the walked
/// path is used so the prefix can be removed from it. Otherwise files are keyed by their
/// path relative to `root`.
///
/// The two cases do not nest: for root `/w/dist`, prefix `/w/` keys `a.txt` as `dist/a.txt`,
/// while an empty prefix keys it as `a.txt`. Stripping a prefix can lengthen the key.
pub fn key_source_path(path: &Path, root: &Path, strip_prefix: &str) -> PathBuf {
    if !strip_prefix.is_empty() {
        let walked = clean(&path.to_string_lossy().replace('\\', "/"));
        if walked.starts_with(strip_prefix) {
            return PathBuf::from(walked);
        }
    }

    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
        // The root itself is a file.
        Ok(_) => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Lexical cleanup of a `/`-separated path: collapses repeated separators and resolves
/// `.` and `..` segments without touching the filesystem.
fn clean(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let body = segments.join("/");
    if rooted {
        format!("/{body}")
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_collapses_dots_and_separators() {
        assert_eq!(clean("./dist//a.txt"), "dist/a.txt");
        assert_eq!(clean("/a/./b/../c"), "/a/c");
        assert_eq!(clean("../x"), "../x");
        assert_eq!(clean("/../x"), "/x");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn destination_key_with_empty_target_keeps_relative_path() {
        assert_eq!(compute_destination_key(Path::new("/abs/x.bin"), "", ""), "abs/x.bin");
    }
}

use std::path::Path;

/// Fallback for files without a known extension.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Infer the MIME type of a file from its extension.
///
/// The extension is whatever follows the last `.` of the file name. Unknown or missing
/// extensions map to [`DEFAULT_CONTENT_TYPE`]; this never fails.
pub fn infer_content_type(path: &Path) -> &'static str {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    let Some((_, ext)) = name.rsplit_once('.') else {
        return DEFAULT_CONTENT_TYPE;
    };
    if ext.is_empty() {
        return DEFAULT_CONTENT_TYPE;
    }

    mime_guess::from_ext(ext)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

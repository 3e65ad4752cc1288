//! Filename sanitization for client-declared upload names.

use std::path::Path;

/// Longest sanitized name, in bytes. Leaves room under the usual 255-byte
/// filesystem limit for the `_N` collision suffix.
pub const MAX_FILENAME_BYTES: usize = 200;

/// Reduces an untrusted declared name to a safe bare filename.
///
/// Only the final path segment survives (both `/` and `\` count as
/// separators), and every character outside `[A-Za-z0-9._-]` becomes `_`.
/// Names that end up empty, or that would resolve to `.` or `..`, are
/// replaced by `upload_{index + 1}`. Names longer than
/// [`MAX_FILENAME_BYTES`] lose the tail of their stem; the extension is kept.
pub fn sanitize_filename(raw: &str, index: usize) -> String {
    let trimmed = raw.trim().trim_end_matches(['/', '\\']);
    let last = trimmed.rsplit(['/', '\\']).next().unwrap_or_default();
    let last = if matches!(last, "." | "..") { "" } else { last };

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        format!("upload_{}", index + 1)
    } else {
        truncate_name(cleaned)
    }
}

/// `name` is ASCII here, so byte offsets are char boundaries.
fn truncate_name(name: String) -> String {
    if name.len() <= MAX_FILENAME_BYTES {
        return name;
    }
    let path = Path::new(&name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.len() + 1 < MAX_FILENAME_BYTES => {
            let keep = (MAX_FILENAME_BYTES - ext.len() - 1).min(stem.len());
            format!("{}.{ext}", &stem[..keep])
        }
        _ => name[..MAX_FILENAME_BYTES].to_string(),
    }
}

/// The `attempt`-th candidate name for `name`: the name itself, then
/// `stem_1.ext`, `stem_2.ext`, and so on.
pub(crate) fn candidate_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{attempt}.{ext}"),
        None => format!("{stem}_{attempt}"),
    }
}

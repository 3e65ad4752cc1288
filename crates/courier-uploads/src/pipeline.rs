//! Batch upload ingestion.

use crate::sanitize::{candidate_name, sanitize_filename};
use crate::{UploadError, STAGING_DIR_NAME, UPLOAD_DIR_NAME};
use base64::Engine;
use serde::Deserialize;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Per-file ceiling on decoded content: 5 MiB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// One client-submitted file. Both fields are untrusted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_base64: Option<String>,
}

impl UploadDescriptor {
    fn parse(index: usize, entry: &serde_json::Value) -> Result<Self, UploadError> {
        if !entry.is_object() {
            return Err(UploadError::InvalidEntry { index });
        }
        serde_json::from_value(entry.clone()).map_err(|_| UploadError::InvalidEntry { index })
    }
}

/// Validates and persists a batch of uploads under `<root>/files_uploaded/`.
///
/// Entries are processed in order. The first failure aborts the batch; files
/// written for earlier entries stay on disk. Returns the paths written,
/// relative to `root` and `/`-separated.
pub fn ingest(root: &Path, entries: &[serde_json::Value]) -> Result<Vec<String>, UploadError> {
    if entries.is_empty() {
        return Err(UploadError::EmptyBatch);
    }

    let upload_dir = root.join(UPLOAD_DIR_NAME);
    let staging_dir = root.join(STAGING_DIR_NAME);
    std::fs::create_dir_all(&upload_dir).map_err(UploadError::UploadDirUnavailable)?;
    std::fs::create_dir_all(&staging_dir).map_err(UploadError::UploadDirUnavailable)?;

    let mut saved = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let descriptor = UploadDescriptor::parse(index, entry)?;

        let raw_name = descriptor.name.as_deref().unwrap_or_default().trim();
        let encoded = descriptor
            .content_base64
            .as_deref()
            .unwrap_or_default()
            .trim();
        if raw_name.is_empty() || encoded.is_empty() {
            return Err(UploadError::MissingField { index });
        }

        let name = sanitize_filename(raw_name, index);
        let content = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| UploadError::InvalidBase64 { name: name.clone() })?;

        if content.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                name,
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let stored = persist(&staging_dir, &upload_dir, &name, &content)
            .map_err(|source| UploadError::Storage {
                name: name.clone(),
                source,
            })?;

        tracing::info!(
            declared = %raw_name,
            stored = %stored,
            size_bytes = content.len(),
            "upload stored"
        );
        saved.push(format!("{UPLOAD_DIR_NAME}/{stored}"));
    }

    Ok(saved)
}

/// Writes `content` to a staging file, then renames it onto the first free
/// candidate name in `upload_dir`. The rename never replaces an existing
/// file, so concurrent batches racing on one name each get their own suffix.
fn persist(
    staging_dir: &Path,
    upload_dir: &Path,
    name: &str,
    content: &[u8],
) -> std::io::Result<String> {
    let mut staged = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(staging_dir)?;
    staged.write_all(content)?;
    staged.as_file().sync_all()?;

    let mut attempt = 0;
    loop {
        let candidate = candidate_name(name, attempt);
        match staged.persist_noclobber(upload_dir.join(&candidate)) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                staged = err.file;
                attempt += 1;
            }
            Err(err) => return Err(err.error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn entry(name: &str, content: &[u8]) -> serde_json::Value {
        json!({ "name": name, "content_base64": b64(content) })
    }

    #[test]
    fn stores_file_with_relative_path() {
        let root = tempfile::tempdir().unwrap();
        let saved = ingest(root.path(), &[entry("notes.txt", b"hello")]).unwrap();

        assert_eq!(saved, vec!["files_uploaded/notes.txt"]);
        let written = std::fs::read(root.path().join("files_uploaded/notes.txt")).unwrap();
        assert_eq!(written, b"hello");
    }

    #[test]
    fn traversal_names_stay_inside_upload_dir() {
        let root = tempfile::tempdir().unwrap();
        let saved = ingest(root.path(), &[entry("../../etc/passwd", b"x")]).unwrap();

        assert_eq!(saved, vec!["files_uploaded/passwd"]);
        assert!(root.path().join("files_uploaded/passwd").is_file());
        assert!(!root.path().join("etc").exists());
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let root = tempfile::tempdir().unwrap();
        let saved = ingest(
            root.path(),
            &[entry("report.pdf", b"first"), entry("report.pdf", b"second")],
        )
        .unwrap();

        assert_eq!(
            saved,
            vec!["files_uploaded/report.pdf", "files_uploaded/report_1.pdf"]
        );
        let second = std::fs::read(root.path().join("files_uploaded/report_1.pdf")).unwrap();
        assert_eq!(second, b"second");
    }

    #[test]
    fn existing_files_are_never_overwritten() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("files_uploaded");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"original").unwrap();
        std::fs::write(dir.join("a_1.txt"), b"original").unwrap();

        let saved = ingest(root.path(), &[entry("a.txt", b"new")]).unwrap();
        assert_eq!(saved, vec!["files_uploaded/a_2.txt"]);
        assert_eq!(std::fs::read(dir.join("a.txt")).unwrap(), b"original");
    }

    #[test]
    fn empty_batch_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(ingest(root.path(), &[]), Err(UploadError::EmptyBatch)));
    }

    #[test]
    fn non_object_entry_is_invalid() {
        let root = tempfile::tempdir().unwrap();
        let err = ingest(root.path(), &[json!(["a.txt", "eA=="])]).unwrap_err();
        assert!(matches!(err, UploadError::InvalidEntry { index: 0 }));

        let err = ingest(root.path(), &[json!({ "name": 5, "content_base64": "eA==" })])
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidEntry { index: 0 }));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = ingest(
            root.path(),
            &[
                entry("ok.txt", b"fine"),
                json!({ "name": "  ", "content_base64": "eA==" }),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, UploadError::MissingField { index: 1 }));
        assert_eq!(err.to_string(), "name and content_base64 required for file 1");

        let err = ingest(root.path(), &[json!({ "name": "x.txt" })]).unwrap_err();
        assert!(matches!(err, UploadError::MissingField { index: 0 }));
    }

    #[test]
    fn malformed_base64_names_the_file() {
        let root = tempfile::tempdir().unwrap();
        let err = ingest(
            root.path(),
            &[json!({ "name": "bad file.bin", "content_base64": "not*base64" })],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid base64 content for file bad_file.bin");
    }

    #[test]
    fn oversized_file_aborts_rest_of_batch() {
        let root = tempfile::tempdir().unwrap();
        let big = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let err = ingest(
            root.path(),
            &[
                entry("before.txt", b"kept"),
                entry("big.bin", &big),
                entry("after.txt", b"skipped"),
            ],
        )
        .unwrap_err();

        assert!(matches!(err, UploadError::TooLarge { ref name, .. } if name == "big.bin"));
        assert_eq!(err.to_string(), "file too large: big.bin (max 5MB per file)");
        let dir = root.path().join("files_uploaded");
        assert!(dir.join("before.txt").is_file());
        assert!(!dir.join("big.bin").exists());
        assert!(!dir.join("after.txt").exists());
    }

    #[test]
    fn exactly_at_limit_is_accepted() {
        let root = tempfile::tempdir().unwrap();
        let content = vec![7u8; MAX_UPLOAD_BYTES];
        let saved = ingest(root.path(), &[entry("edge.bin", &content)]).unwrap();
        assert_eq!(saved, vec!["files_uploaded/edge.bin"]);
    }

    #[test]
    fn staging_dir_is_left_empty() {
        let root = tempfile::tempdir().unwrap();
        ingest(root.path(), &[entry("a.txt", b"a"), entry("b.txt", b"b")]).unwrap();
        let leftovers = std::fs::read_dir(root.path().join(STAGING_DIR_NAME))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn unusable_root_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let file_root = root.path().join("not-a-dir");
        std::fs::write(&file_root, b"").unwrap();

        let err = ingest(&file_root, &[entry("a.txt", b"a")]).unwrap_err();
        assert!(matches!(err, UploadError::UploadDirUnavailable(_)));
        assert!(!err.is_client_error());
    }
}

//! Read-only views of the storage root.

use crate::{CACHE_DIR_NAMES, STAGING_DIR_NAME};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use walkdir::WalkDir;

const MEMORY_FILE: &str = "memory/MEMORY.md";
const HISTORY_FILE: &str = "memory/HISTORY.md";

/// The backend's long-term memory and consolidated history, verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub memory: String,
    pub history: String,
}

fn read_optional(path: &Path) -> std::io::Result<String> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Reads `memory/MEMORY.md` and `memory/HISTORY.md` under `root`. Missing
/// files read as empty strings; invalid UTF-8 is replaced, not rejected.
pub fn read_memory(root: &Path) -> std::io::Result<MemorySnapshot> {
    Ok(MemorySnapshot {
        memory: read_optional(&root.join(MEMORY_FILE))?,
        history: read_optional(&root.join(HISTORY_FILE))?,
    })
}

fn is_hidden_artifact(name: &str) -> bool {
    name == STAGING_DIR_NAME || CACHE_DIR_NAMES.contains(&name)
}

/// Lists every regular file under `root` as a `/`-separated relative path,
/// sorted lexicographically. Cache directories and the upload staging area
/// are skipped. A missing root yields an empty list.
pub fn list_files(root: &Path) -> Vec<String> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry.file_name().to_str().is_some_and(is_hidden_artifact))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable workspace entry");
                None
            }
        })
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            Some(parts.join("/"))
        })
        .collect();

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn missing_memory_files_read_as_empty() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(read_memory(root.path()).unwrap(), MemorySnapshot::default());
    }

    #[test]
    fn memory_files_pass_through() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("memory")).unwrap();
        std::fs::write(root.path().join(MEMORY_FILE), "likes rust").unwrap();

        let snapshot = read_memory(root.path()).unwrap();
        assert_eq!(snapshot.memory, "likes rust");
        assert_eq!(snapshot.history, "");
    }

    #[test]
    fn non_utf8_memory_is_read_lossily() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("memory")).unwrap();
        std::fs::write(root.path().join(HISTORY_FILE), b"caf\xe9 notes").unwrap();

        let snapshot = read_memory(root.path()).unwrap();
        assert_eq!(snapshot.history, "caf\u{FFFD} notes");
    }

    #[test]
    fn lists_files_sorted_and_relative() {
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "zeta.txt");
        touch(root.path(), "files_uploaded/report.pdf");
        touch(root.path(), "memory/MEMORY.md");
        touch(root.path(), "alpha.md");

        assert_eq!(
            list_files(root.path()),
            vec![
                "alpha.md",
                "files_uploaded/report.pdf",
                "memory/MEMORY.md",
                "zeta.txt"
            ]
        );
    }

    #[test]
    fn skips_cache_and_staging_artifacts() {
        let root = tempfile::tempdir().unwrap();
        touch(root.path(), "read_pdf.py");
        touch(root.path(), "__pycache__/read_pdf.cpython-312.pyc");
        touch(root.path(), "tools/__pycache__/x.pyc");
        touch(root.path(), ".courier-staging/upload-abc");

        assert_eq!(list_files(root.path()), vec!["read_pdf.py"]);
    }

    #[test]
    fn missing_root_lists_nothing() {
        let root = tempfile::tempdir().unwrap();
        assert!(list_files(&root.path().join("absent")).is_empty());
    }
}

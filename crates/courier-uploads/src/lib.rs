//! Storage-root handling for the Courier HTTP surface.
//!
//! The storage root (the agent's workspace directory) is shared with the
//! conversational backend. This crate owns the three ways the HTTP surface
//! touches it:
//!
//! - [`ingest`] validates client-submitted files and persists them under
//!   `files_uploaded/`,
//! - [`read_memory`] passes the backend's long-term memory files through,
//! - [`list_files`] enumerates the workspace, hiding cache and staging
//!   artifacts.
//!
//! All functions here are synchronous and bounded; async callers should run
//! them on a blocking thread.

pub mod error;
pub mod pipeline;
pub mod sanitize;
pub mod workspace;

pub use error::UploadError;
pub use pipeline::{ingest, UploadDescriptor, MAX_UPLOAD_BYTES};
pub use sanitize::{sanitize_filename, MAX_FILENAME_BYTES};
pub use workspace::{list_files, read_memory, MemorySnapshot};

/// Directory (relative to the storage root) that uploads are written into.
pub const UPLOAD_DIR_NAME: &str = "files_uploaded";

/// Hidden directory (relative to the storage root) where uploads are staged
/// before being renamed into place.
pub const STAGING_DIR_NAME: &str = ".courier-staging";

/// Directory names that are never reported by [`list_files`].
pub const CACHE_DIR_NAMES: &[&str] = &["__pycache__"];

//! Error types for upload ingestion.

/// Reasons an upload batch is rejected. Each variant names the offending
/// file, by its index in the batch or by its sanitized name.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("files list required")]
    EmptyBatch,

    #[error("file entry at index {index} is invalid")]
    InvalidEntry { index: usize },

    #[error("name and content_base64 required for file {index}")]
    MissingField { index: usize },

    #[error("invalid base64 content for file {name}")]
    InvalidBase64 { name: String },

    #[error("file too large: {name} (max {}MB per file)", .limit / (1024 * 1024))]
    TooLarge { name: String, limit: usize },

    #[error("upload directory unavailable: {0}")]
    UploadDirUnavailable(#[source] std::io::Error),

    #[error("failed to store file {name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    /// Whether the error stems from client input rather than the storage root.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::UploadDirUnavailable(_) | Self::Storage { .. }
        )
    }
}

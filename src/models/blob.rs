//! Represents a blob as reported by a storage listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a single blob within a container.
///
/// A `BlobItem` describes the stored object, not its content bytes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BlobItem {
    /// Blob name (path-like identifier within the container).
    pub name: String,

    /// Size in bytes.
    pub size: u64,

    /// When the blob was last written, if the backend reports it.
    pub last_modified: Option<DateTime<Utc>>,

    /// Content type (MIME type), if one was recorded at upload.
    pub content_type: Option<String>,
}

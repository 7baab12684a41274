//! Store adapter traits

use std::path::Path;

use crate::error::Result;
use crate::types::*;

/// Trait for release uploaders
///
/// An implementation publishes every file of one application in a single
/// transaction: either the whole release lands in the store or nothing does.
#[async_trait::async_trait]
pub trait ReleaseUploader: Send + Sync {
    /// Get the store name
    fn name(&self) -> &str;

    /// Upload APKs and expansion files for one application and assign them to a track
    async fn upload_release(&self, upload: &ReleaseUpload) -> Result<UploadResult>;
}

/// Reads identity metadata from an application package
///
/// Reading is blocking I/O.
pub trait PackageInspector: Send + Sync {
    /// Get the reader name
    fn name(&self) -> &str;

    /// Extract application ID and version code
    ///
    /// Returns [`StoreError::InvalidArtifact`](crate::StoreError::InvalidArtifact)
    /// when the file is not a readable package or lacks either field.
    fn inspect(&self, path: &Path) -> Result<PackageInfo>;
}

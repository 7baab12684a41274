//! Application package inspection

use std::path::{Path, PathBuf};
use std::sync::Arc;

use liftoff_stores::{PackageInspector, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ArtifactError, Result};

/// An APK together with the identity read from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Application ID from the manifest
    pub application_id: String,
    /// Location on disk
    pub path: PathBuf,
    /// Version code from the manifest
    pub version_code: u32,
}

/// Reads application ID and version code for discovered APKs
#[derive(Clone)]
pub struct ArtifactInspector {
    reader: Arc<dyn PackageInspector>,
}

impl ArtifactInspector {
    /// Wrap a package reader
    pub fn new(reader: Arc<dyn PackageInspector>) -> Self {
        Self { reader }
    }

    /// Inspect one APK
    pub fn inspect(&self, path: &Path) -> Result<Artifact> {
        let info = self.reader.inspect(path).map_err(|e| match e {
            StoreError::InvalidArtifact { path, reason } => ArtifactError::Parse { path, reason },
            other => ArtifactError::Parse {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;

        debug!(
            path = %path.display(),
            application_id = %info.application_id,
            version_code = info.version_code,
            "inspected APK"
        );

        Ok(Artifact {
            application_id: info.application_id,
            path: path.to_path_buf(),
            version_code: info.version_code,
        })
    }

    /// Inspect every APK under `root`, failing on the first unreadable one
    pub fn inspect_all(&self, root: &Path, relative_paths: &[PathBuf]) -> Result<Vec<Artifact>> {
        info!(count = relative_paths.len(), reader = self.reader.name(), "inspecting APKs");
        relative_paths
            .iter()
            .map(|relative| self.inspect(&root.join(relative)))
            .collect()
    }
}

impl std::fmt::Debug for ArtifactInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactInspector")
            .field("reader", &self.reader.name())
            .finish()
    }
}

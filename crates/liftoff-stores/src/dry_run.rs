//! Uploader that only reports what would be published

use chrono::Utc;
use tracing::info;

use crate::error::{Result, StoreError};
use crate::traits::ReleaseUploader;
use crate::types::*;

/// Checks that every file of a release is readable and logs the plan
/// without contacting any store.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunUploader;

impl DryRunUploader {
    /// Create a dry-run uploader
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ReleaseUploader for DryRunUploader {
    fn name(&self) -> &str {
        "dry run"
    }

    async fn upload_release(&self, upload: &ReleaseUpload) -> Result<UploadResult> {
        for apk in &upload.apk_files {
            tokio::fs::metadata(apk).await?;
            info!("[dry run] would upload {}", apk.display());
        }

        for (version_code, files) in &upload.expansion_files {
            for slot in [ExpansionSlot::Main, ExpansionSlot::Patch] {
                if let Some(path) = files.get(slot) {
                    let meta = tokio::fs::metadata(path).await?;
                    if meta.len() == 0 {
                        return Err(StoreError::ExpansionFile(format!(
                            "{} is empty",
                            path.display()
                        )));
                    }
                    info!(
                        "[dry run] would upload {} expansion file {} for version {}",
                        slot,
                        path.display(),
                        version_code
                    );
                }
            }
        }

        match upload.user_fraction() {
            Some(fraction) => info!(
                "[dry run] would roll out {:?} to {:.1}% of users on '{}'",
                upload.version_codes,
                fraction * 100.0,
                upload.track
            ),
            None => info!(
                "[dry run] would release {:?} on '{}'",
                upload.version_codes, upload.track
            ),
        }

        Ok(UploadResult {
            application_id: upload.application_id.clone(),
            version_codes: upload.version_codes.clone(),
            console_url: None,
            dry_run: true,
            uploaded_at: Utc::now(),
        })
    }
}

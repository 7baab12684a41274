//! Edit workflow for one release, independent of the HTTP transport

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::types::*;

/// Edit operations of the Google Play Developer API
#[async_trait::async_trait]
pub(super) trait EditApi: Send + Sync {
    async fn create_edit(&self, package: &str) -> Result<String>;

    async fn commit_edit(&self, package: &str, edit_id: &str) -> Result<()>;

    async fn delete_edit(&self, package: &str, edit_id: &str) -> Result<()>;

    /// Version codes of APKs already in the edit, newest first
    async fn existing_version_codes(&self, package: &str, edit_id: &str) -> Result<Vec<u32>>;

    /// Whether an APK carries a non-empty expansion file in `slot`
    async fn has_expansion_file(&self, package: &str, edit_id: &str, version_code: u32, slot: ExpansionSlot) -> Result<bool>;

    /// Upload an APK, returning the version code the store read from it
    async fn upload_apk(&self, package: &str, edit_id: &str, path: &Path) -> Result<u32>;

    async fn upload_expansion_file(
        &self,
        package: &str,
        edit_id: &str,
        version_code: u32,
        slot: ExpansionSlot,
        path: &Path,
    ) -> Result<()>;

    /// Point a slot at the file already uploaded for `previous`
    async fn reference_expansion_file(
        &self,
        package: &str,
        edit_id: &str,
        version_code: u32,
        slot: ExpansionSlot,
        previous: u32,
    ) -> Result<()>;

    async fn assign_to_track(&self, package: &str, edit_id: &str, upload: &ReleaseUpload, version_codes: &[u32]) -> Result<()>;
}

/// Newest version codes that already carry an expansion file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct LatestExpansionFiles {
    pub main: Option<u32>,
    pub patch: Option<u32>,
}

impl LatestExpansionFiles {
    pub fn get(&self, slot: ExpansionSlot) -> Option<u32> {
        match slot {
            ExpansionSlot::Main => self.main,
            ExpansionSlot::Patch => self.patch,
        }
    }
}

/// What happens to one expansion slot of a freshly uploaded APK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExpansionAction<'a> {
    Upload(&'a Path),
    Reference(u32),
    Leave,
}

/// A local file always wins; otherwise reuse the newest stored file if allowed
pub(super) fn expansion_action(
    files: Option<&ExpansionFileSet>,
    latest: LatestExpansionFiles,
    slot: ExpansionSlot,
    reuse: bool,
) -> ExpansionAction<'_> {
    if let Some(path) = files.and_then(|f| f.get(slot)) {
        return ExpansionAction::Upload(path.as_path());
    }

    match latest.get(slot) {
        Some(previous) if reuse => ExpansionAction::Reference(previous),
        _ => ExpansionAction::Leave,
    }
}

/// Run a release inside a fresh edit, deleting the edit if anything fails
pub(super) async fn publish_release<A: EditApi + ?Sized>(api: &A, upload: &ReleaseUpload) -> Result<Vec<u32>> {
    let package = upload.application_id.as_str();

    info!("Creating edit session for {}...", package);
    let edit_id = api.create_edit(package).await?;

    let version_codes = match publish_in_edit(api, &edit_id, upload).await {
        Ok(codes) => codes,
        Err(e) => {
            if let Err(delete_err) = api.delete_edit(package, &edit_id).await {
                warn!(edit_id = %edit_id, error = %delete_err, "failed to delete edit");
            }
            return Err(e);
        }
    };

    info!("Committing edit...");
    api.commit_edit(package, &edit_id).await?;
    Ok(version_codes)
}

async fn publish_in_edit<A: EditApi + ?Sized>(api: &A, edit_id: &str, upload: &ReleaseUpload) -> Result<Vec<u32>> {
    let package = upload.application_id.as_str();
    let reuse = upload.use_previous_expansion_files_if_missing;
    let existing = api.existing_version_codes(package, edit_id).await?;

    let latest = if reuse {
        latest_expansion_files(api, package, edit_id, &existing).await?
    } else {
        LatestExpansionFiles::default()
    };

    let mut uploaded = Vec::with_capacity(upload.apk_files.len());
    for apk in &upload.apk_files {
        info!("Uploading {}...", apk.display());
        let version_code = api.upload_apk(package, edit_id, apk).await?;
        if existing.contains(&version_code) {
            return Err(StoreError::VersionCodeExists(version_code));
        }
        uploaded.push(version_code);

        let files = upload.expansion_files.get(&version_code);
        for slot in [ExpansionSlot::Main, ExpansionSlot::Patch] {
            match expansion_action(files, latest, slot, reuse) {
                ExpansionAction::Upload(path) => {
                    info!("Uploading {} expansion file {}...", slot, path.display());
                    api.upload_expansion_file(package, edit_id, version_code, slot, path)
                        .await?;
                }
                ExpansionAction::Reference(previous) => {
                    info!(
                        "Applying {} expansion file from version {} to version {}",
                        slot, previous, version_code
                    );
                    api.reference_expansion_file(package, edit_id, version_code, slot, previous)
                        .await?;
                }
                ExpansionAction::Leave => {}
            }
        }
    }

    info!("Assigning to track '{}'...", upload.track);
    api.assign_to_track(package, edit_id, upload, &uploaded).await?;
    Ok(uploaded)
}

async fn latest_expansion_files<A: EditApi + ?Sized>(
    api: &A,
    package: &str,
    edit_id: &str,
    existing: &[u32],
) -> Result<LatestExpansionFiles> {
    let mut latest = LatestExpansionFiles::default();

    for &version_code in existing {
        for slot in [ExpansionSlot::Main, ExpansionSlot::Patch] {
            if latest.get(slot).is_none() && api.has_expansion_file(package, edit_id, version_code, slot).await? {
                match slot {
                    ExpansionSlot::Main => latest.main = Some(version_code),
                    ExpansionSlot::Patch => latest.patch = Some(version_code),
                }
            }
        }
        if latest.main.is_some() && latest.patch.is_some() {
            break;
        }
    }

    debug!(main = ?latest.main, patch = ?latest.patch, "latest existing expansion files");
    Ok(latest)
}

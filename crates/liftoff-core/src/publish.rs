//! Publish orchestration
//!
//! One run resolves the configured APKs into application groups and uploads
//! each group on its own. Settings, discovery and file-naming problems abort
//! the run before anything is uploaded. A problem inside one group (a patch
//! file without a main file, a rejected upload, a panicking uploader) fails
//! only that group and the remaining groups are still attempted.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use liftoff_stores::{
    ExpansionFileSet, PackageInspector, ReleaseUpload, ReleaseUploader, UploadResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::artifact::ArtifactInspector;
use crate::config::{PublishConfig, ReleaseConfigValidator, ValidatedRelease};
use crate::discovery::FileMatcher;
use crate::error::{DiscoveryError, ExpansionError, Result};
use crate::expansion::ExpansionFileMatcher;
use crate::grouping::{group_artifacts, ApplicationGroup};
use crate::types::BuildResult;

/// Result of publishing a single application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPublishResult {
    /// Application ID
    pub application_id: String,
    /// Version codes in the group
    pub version_codes: Vec<u32>,
    /// Whether the upload succeeded
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Time taken
    pub duration: Duration,
    /// Store console URL if available
    pub console_url: Option<String>,
}

/// Overall result of a publish run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    /// The build result gate skipped the run
    pub skipped: bool,
    /// Results for each application, in first-seen order
    pub groups: Vec<GroupPublishResult>,
    /// Total duration
    pub total_duration: Duration,
    /// Whether every group succeeded (or the run was skipped)
    pub success: bool,
}

impl PublishReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            groups: Vec::new(),
            total_duration: Duration::ZERO,
            success: true,
        }
    }

    /// Get successfully published applications
    pub fn successful(&self) -> Vec<&GroupPublishResult> {
        self.groups.iter().filter(|g| g.success).collect()
    }

    /// Get failed applications
    pub fn failed(&self) -> Vec<&GroupPublishResult> {
        self.groups.iter().filter(|g| !g.success).collect()
    }
}

/// Callback for publish events
pub trait PublishCallback: Send + Sync {
    /// A line of user-facing output
    fn on_message(&self, message: &str);

    /// Called before an application is uploaded
    fn on_group_start(&self, application_id: &str, version_codes: &[u32]);

    /// Called after an application was uploaded or failed
    fn on_group_complete(&self, result: &GroupPublishResult);

    /// Called when the build result gate skips the run
    fn on_skip(&self, build_result: BuildResult, threshold: BuildResult);
}

/// Registry that broadcasts publish events to multiple callbacks
#[derive(Default, Clone)]
pub struct PublishCallbackRegistry {
    callbacks: Vec<Arc<dyn PublishCallback>>,
}

impl PublishCallbackRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback
    pub fn register<C: PublishCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Arc::new(callback));
    }
}

impl PublishCallback for PublishCallbackRegistry {
    fn on_message(&self, message: &str) {
        for cb in &self.callbacks {
            cb.on_message(message);
        }
    }

    fn on_group_start(&self, application_id: &str, version_codes: &[u32]) {
        for cb in &self.callbacks {
            cb.on_group_start(application_id, version_codes);
        }
    }

    fn on_group_complete(&self, result: &GroupPublishResult) {
        for cb in &self.callbacks {
            cb.on_group_complete(result);
        }
    }

    fn on_skip(&self, build_result: BuildResult, threshold: BuildResult) {
        for cb in &self.callbacks {
            cb.on_skip(build_result, threshold);
        }
    }
}

/// Drives discovery, inspection, grouping and upload for one release
pub struct PublishOrchestrator {
    root: PathBuf,
    config: PublishConfig,
    inspector: ArtifactInspector,
    uploader: Arc<dyn ReleaseUploader>,
    callbacks: PublishCallbackRegistry,
}

impl PublishOrchestrator {
    /// Create an orchestrator for `root`
    ///
    /// `config` must already have variables expanded.
    pub fn new(
        root: impl Into<PathBuf>,
        config: PublishConfig,
        reader: Arc<dyn PackageInspector>,
        uploader: Arc<dyn ReleaseUploader>,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            inspector: ArtifactInspector::new(reader),
            uploader,
            callbacks: PublishCallbackRegistry::new(),
        }
    }

    /// Register a progress callback
    pub fn with_callback<C: PublishCallback + 'static>(mut self, callback: C) -> Self {
        self.callbacks.register(callback);
        self
    }

    /// Run the release.
    ///
    /// `Err` means the run was aborted before any upload; the error has
    /// already been reported through the callbacks. `Ok` carries per-group
    /// outcomes.
    pub async fn run(&self, build_result: BuildResult) -> Result<PublishReport> {
        let threshold = self.config.skip_if_worse_than;
        if build_result.is_worse_than(threshold) {
            info!(%build_result, %threshold, "skipping publish");
            self.callbacks
                .on_message("Skipping upload to Google Play due to build result");
            self.callbacks.on_skip(build_result, threshold);
            return Ok(PublishReport::skipped());
        }

        match self.execute().await {
            Ok(report) => Ok(report),
            Err(e) => {
                for line in e.to_string().lines() {
                    self.callbacks.on_message(line);
                }
                Err(e)
            }
        }
    }

    async fn execute(&self) -> Result<PublishReport> {
        let start = Instant::now();
        let release = ReleaseConfigValidator::new().validate(&self.config)?;

        let groups = self.discover_groups()?;
        let expansion = self.discover_expansion_files()?;

        info!(groups = groups.len(), track = %release.track, "publishing");
        let mut results = Vec::with_capacity(groups.len());
        for group in groups.values() {
            let codes: Vec<u32> = group.version_codes.iter().copied().collect();
            self.callbacks.on_group_start(&group.application_id, &codes);

            let group_start = Instant::now();
            let outcome = self.publish_group(group, &expansion, &release).await;

            let result = match outcome {
                Ok(upload) => {
                    if upload.dry_run {
                        self.callbacks
                            .on_message("Dry run complete; no changes were applied to Google Play");
                    } else {
                        self.callbacks
                            .on_message("Changes were successfully applied to Google Play");
                    }
                    debug!(application_id = %group.application_id, "group published");
                    GroupPublishResult {
                        application_id: group.application_id.clone(),
                        version_codes: codes,
                        success: true,
                        error: None,
                        duration: group_start.elapsed(),
                        console_url: upload.console_url,
                    }
                }
                Err(failure) => {
                    warn!(application_id = %group.application_id, error = %failure, "group publish failed");
                    match &failure {
                        GroupFailure::Expansion(e) => {
                            for line in e.to_string().lines() {
                                self.callbacks.on_message(line);
                            }
                        }
                        GroupFailure::Upload(cause) => {
                            self.callbacks.on_message(&format!("Upload failed: {}", cause));
                            self.callbacks
                                .on_message("- No changes have been applied to the Google Play account");
                        }
                    }
                    GroupPublishResult {
                        application_id: group.application_id.clone(),
                        version_codes: codes,
                        success: false,
                        error: Some(failure.to_string()),
                        duration: group_start.elapsed(),
                        console_url: None,
                    }
                }
            };

            self.callbacks.on_group_complete(&result);
            results.push(result);
        }

        let success = results.iter().all(|r| r.success);
        let total_duration = start.elapsed();
        info!(
            success,
            published = results.iter().filter(|r| r.success).count(),
            failed = results.iter().filter(|r| !r.success).count(),
            duration_ms = total_duration.as_millis(),
            "publish complete"
        );

        Ok(PublishReport {
            skipped: false,
            groups: results,
            total_duration,
            success,
        })
    }

    fn discover_groups(&self) -> Result<indexmap::IndexMap<String, ApplicationGroup>> {
        let pattern = self.config.apk_files.as_deref().unwrap_or_default();
        let matcher = FileMatcher::new(&self.root);

        let apks = matcher.find(pattern, self.config.apk_files_exclude.as_deref())?;
        if apks.is_empty() {
            return Err(DiscoveryError::NoMatches {
                pattern: pattern.to_string(),
            }
            .into());
        }

        let artifacts = self.inspector.inspect_all(&self.root, &apks)?;
        Ok(group_artifacts(artifacts))
    }

    fn discover_expansion_files(&self) -> Result<ExpansionFileMatcher> {
        let pattern = match self.config.expansion_files.as_deref() {
            Some(p) if !p.trim().is_empty() => p,
            _ => return Ok(ExpansionFileMatcher::empty(&self.root)),
        };

        let files = FileMatcher::new(&self.root).find(pattern, None)?;
        debug!(pattern, count = files.len(), "expansion files found");
        Ok(ExpansionFileMatcher::parse(&self.root, &files)?)
    }

    async fn publish_group(
        &self,
        group: &ApplicationGroup,
        expansion: &ExpansionFileMatcher,
        release: &ValidatedRelease,
    ) -> std::result::Result<UploadResult, GroupFailure> {
        let reuse = self.config.use_previous_expansion_files_if_missing;
        let expansion_files = expansion
            .resolve(group, reuse)
            .map_err(GroupFailure::Expansion)?;

        self.report_group(group, &expansion_files, release);

        let upload = ReleaseUpload {
            application_id: group.application_id.clone(),
            apk_files: group.artifacts.iter().map(|a| a.path.clone()).collect(),
            version_codes: group.version_codes.iter().copied().collect(),
            expansion_files,
            use_previous_expansion_files_if_missing: reuse,
            track: release.track,
            rollout_percentage: release.rollout_percentage,
            release_notes: self.config.release_notes.clone(),
        };

        let uploader = Arc::clone(&self.uploader);
        let handle = tokio::spawn(async move { uploader.upload_release(&upload).await });

        match handle.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(GroupFailure::Upload(e.to_string())),
            Err(e) if e.is_panic() => Err(GroupFailure::Upload(format!(
                "Unexpected error in {} uploader: {}",
                self.uploader.name(),
                panic_message(e.into_panic())
            ))),
            Err(e) => Err(GroupFailure::Upload(e.to_string())),
        }
    }

    fn report_group(
        &self,
        group: &ApplicationGroup,
        expansion_files: &BTreeMap<u32, ExpansionFileSet>,
        release: &ValidatedRelease,
    ) {
        self.callbacks.on_message(&format!(
            "Uploading {} APK(s) with application ID: {}",
            group.artifacts.len(),
            group.application_id
        ));
        for artifact in &group.artifacts {
            self.callbacks.on_message(&format!(
                "- {} (version code {})",
                self.relative(&artifact.path).display(),
                artifact.version_code
            ));
        }

        for (version_code, set) in expansion_files {
            for path in [&set.main_file, &set.patch_file].into_iter().flatten() {
                self.callbacks.on_message(&format!(
                    "- expansion file {} for version code {}",
                    self.relative(path).display(),
                    version_code
                ));
            }
        }

        let target = if release.track.supports_staged_rollout() && release.rollout_percentage < 100.0 {
            format!("{} ({}% rollout)", release.track, release.rollout_percentage)
        } else {
            release.track.to_string()
        };
        self.callbacks.on_message(&format!("Release track: {}", target));
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Why one group was not published
#[derive(Debug)]
enum GroupFailure {
    /// Expansion files for the group are incomplete; nothing was uploaded
    Expansion(ExpansionError),
    /// The uploader rejected the release or panicked
    Upload(String),
}

impl std::fmt::Display for GroupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expansion(e) => write!(f, "{}", e),
            Self::Upload(cause) => write!(f, "{}", cause),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::tests::{write_package, TextPackageReader};
    use crate::error::{ConfigError, ExpansionError};
    use crate::LiftoffError;
    use liftoff_stores::{ReleaseNote, StoreError, Track};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeUploader {
        calls: Mutex<Vec<ReleaseUpload>>,
        fail: HashSet<String>,
        panic: HashSet<String>,
    }

    impl FakeUploader {
        fn failing(ids: &[&str]) -> Self {
            Self {
                fail: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn panicking(ids: &[&str]) -> Self {
            Self {
                panic: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<ReleaseUpload> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ReleaseUploader for FakeUploader {
        fn name(&self) -> &str {
            "fake"
        }

        async fn upload_release(&self, upload: &ReleaseUpload) -> liftoff_stores::Result<UploadResult> {
            self.calls.lock().unwrap().push(upload.clone());

            if self.panic.contains(&upload.application_id) {
                panic!("uploader exploded");
            }
            if self.fail.contains(&upload.application_id) {
                return Err(StoreError::ApiError {
                    status: 403,
                    message: "APK specifies a version code that has already been used".to_string(),
                });
            }

            Ok(UploadResult {
                application_id: upload.application_id.clone(),
                version_codes: upload.version_codes.clone(),
                console_url: None,
                dry_run: false,
                uploaded_at: chrono::Utc::now(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        messages: Arc<Mutex<Vec<String>>>,
        completed: Arc<Mutex<Vec<GroupPublishResult>>>,
        skips: Arc<Mutex<usize>>,
    }

    impl Recorder {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl PublishCallback for Recorder {
        fn on_message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }

        fn on_group_start(&self, _application_id: &str, _version_codes: &[u32]) {}

        fn on_group_complete(&self, result: &GroupPublishResult) {
            self.completed.lock().unwrap().push(result.clone());
        }

        fn on_skip(&self, _build_result: BuildResult, _threshold: BuildResult) {
            *self.skips.lock().unwrap() += 1;
        }
    }

    fn config(track: &str) -> PublishConfig {
        PublishConfig {
            apk_files: Some("**/*.apk".to_string()),
            expansion_files: Some("**/*.obb".to_string()),
            track: Some(track.to_string()),
            ..Default::default()
        }
    }

    fn orchestrator(
        temp: &TempDir,
        config: PublishConfig,
        uploader: Arc<FakeUploader>,
        recorder: &Recorder,
    ) -> PublishOrchestrator {
        PublishOrchestrator::new(temp.path(), config, Arc::new(TextPackageReader), uploader)
            .with_callback(recorder.clone())
    }

    fn obb(root: &Path, name: &str) {
        std::fs::create_dir_all(root.join("obb")).unwrap();
        std::fs::write(root.join("obb").join(name), b"data").unwrap();
    }

    #[tokio::test]
    async fn test_build_result_gate_skips() {
        let temp = TempDir::new().unwrap();
        let uploader = Arc::new(FakeUploader::default());
        let recorder = Recorder::default();

        let report = orchestrator(&temp, config("beta"), uploader.clone(), &recorder)
            .run(BuildResult::Failure)
            .await
            .unwrap();

        assert!(report.skipped);
        assert!(report.success);
        assert!(uploader.calls().is_empty());
        assert_eq!(*recorder.skips.lock().unwrap(), 1);
        assert_eq!(
            recorder.messages(),
            vec!["Skipping upload to Google Play due to build result"]
        );
    }

    #[tokio::test]
    async fn test_unstable_build_still_publishes() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "app.apk", "com.x", 1);
        let uploader = Arc::new(FakeUploader::default());

        let report = orchestrator(&temp, config("beta"), uploader.clone(), &Recorder::default())
            .run(BuildResult::Unstable)
            .await
            .unwrap();

        assert!(!report.skipped);
        assert!(report.success);
        assert_eq!(uploader.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rollout_aborts_before_discovery() {
        // No APKs exist, so reaching discovery would produce a different error
        let temp = TempDir::new().unwrap();
        let uploader = Arc::new(FakeUploader::default());
        let recorder = Recorder::default();

        let mut config = config("production");
        config.rollout_percentage = Some("37%".to_string());

        let err = orchestrator(&temp, config, uploader.clone(), &recorder)
            .run(BuildResult::Success)
            .await
            .unwrap_err();

        match err {
            LiftoffError::Config(ConfigError::Invalid(errors)) => {
                assert_eq!(errors, vec!["37.00% is not a valid rollout percentage"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            recorder.messages(),
            vec![
                "Cannot upload to Google Play:",
                "- 37.00% is not a valid rollout percentage"
            ]
        );
        assert!(uploader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_apks_found() {
        let temp = TempDir::new().unwrap();
        let recorder = Recorder::default();

        let err = orchestrator(&temp, config("beta"), Arc::new(FakeUploader::default()), &recorder)
            .run(BuildResult::Success)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LiftoffError::Discovery(DiscoveryError::NoMatches { .. })
        ));
        assert_eq!(
            recorder.messages(),
            vec!["No APK files matching the pattern '**/*.apk' could be found"]
        );
    }

    #[tokio::test]
    async fn test_unreadable_apk_aborts_run() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "a.apk", "com.a", 1);
        std::fs::write(temp.path().join("b.apk"), "not a package").unwrap();
        let uploader = Arc::new(FakeUploader::default());

        let err = orchestrator(&temp, config("beta"), uploader.clone(), &Recorder::default())
            .run(BuildResult::Success)
            .await
            .unwrap_err();

        assert!(matches!(err, LiftoffError::Artifact(_)));
        assert!(uploader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_expansion_name_aborts_before_upload() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "a.apk", "com.a", 1);
        obb(temp.path(), "main.1.com.a.obb");
        obb(temp.path(), "textures.obb");
        let uploader = Arc::new(FakeUploader::default());

        let err = orchestrator(&temp, config("beta"), uploader.clone(), &Recorder::default())
            .run(BuildResult::Success)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LiftoffError::Expansion(ExpansionError::NamingConvention { .. })
        ));
        assert!(uploader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_application_id_segment_aborts_run() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "a.apk", "com.a", 1);
        obb(temp.path(), "main.1.com..x.obb");
        let uploader = Arc::new(FakeUploader::default());

        let err = orchestrator(&temp, config("beta"), uploader.clone(), &Recorder::default())
            .run(BuildResult::Success)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LiftoffError::Expansion(ExpansionError::NamingConvention { .. })
        ));
        assert!(uploader.calls().is_empty());
    }

    #[tokio::test]
    async fn test_patch_without_main_fails_only_its_group() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "x100.apk", "com.x", 100);
        write_package(temp.path(), "x200.apk", "com.x", 200);
        write_package(temp.path(), "y.apk", "com.y", 5);
        obb(temp.path(), "main.100.com.x.obb");
        obb(temp.path(), "patch.200.com.x.obb");
        let uploader = Arc::new(FakeUploader::default());
        let recorder = Recorder::default();

        let report = orchestrator(&temp, config("beta"), uploader.clone(), &recorder)
            .run(BuildResult::Success)
            .await
            .unwrap();

        assert!(!report.success);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].application_id, "com.x");
        assert!(failed[0]
            .error
            .as_deref()
            .unwrap()
            .contains("patch.200.com.x.obb"));

        let calls = uploader.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].application_id, "com.y");

        let messages = recorder.messages();
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Patch expansion file 'patch.200.com.x.obb' was provided")));
        assert!(!messages.iter().any(|m| m.starts_with("Upload failed")));
        assert!(!messages.contains(&"- No changes have been applied to the Google Play account".to_string()));
    }

    #[tokio::test]
    async fn test_patch_without_main_allowed_with_reuse() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "x200.apk", "com.x", 200);
        obb(temp.path(), "patch.200.com.x.obb");
        let uploader = Arc::new(FakeUploader::default());

        let mut config = config("beta");
        config.use_previous_expansion_files_if_missing = true;

        let report = orchestrator(&temp, config, uploader.clone(), &Recorder::default())
            .run(BuildResult::Success)
            .await
            .unwrap();

        assert!(report.success);
        let calls = uploader.calls();
        assert!(calls[0].use_previous_expansion_files_if_missing);
        assert!(calls[0].expansion_files[&200].is_patch_only());
    }

    #[tokio::test]
    async fn test_one_upload_with_two_expansion_sets() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "x100.apk", "com.x", 100);
        write_package(temp.path(), "x200.apk", "com.x", 200);
        obb(temp.path(), "main.100.com.x.obb");
        obb(temp.path(), "main.200.com.x.obb");
        let uploader = Arc::new(FakeUploader::default());

        let report = orchestrator(&temp, config("alpha"), uploader.clone(), &Recorder::default())
            .run(BuildResult::Success)
            .await
            .unwrap();

        assert!(report.success);
        let calls = uploader.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].expansion_files.len(), 2);
        assert_eq!(
            calls[0].expansion_files[&200].main_file,
            Some(temp.path().join("obb/main.200.com.x.obb"))
        );
        assert_eq!(calls[0].version_codes, vec![100, 200]);
    }

    #[tokio::test]
    async fn test_failed_group_does_not_stop_others() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "a.apk", "com.a", 1);
        write_package(temp.path(), "b.apk", "com.b", 2);
        let uploader = Arc::new(FakeUploader::failing(&["com.a"]));
        let recorder = Recorder::default();

        let report = orchestrator(&temp, config("beta"), uploader.clone(), &recorder)
            .run(BuildResult::Success)
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(uploader.calls().len(), 2);
        assert_eq!(report.failed()[0].application_id, "com.a");
        assert_eq!(report.successful()[0].application_id, "com.b");
        assert_eq!(recorder.completed.lock().unwrap().len(), 2);

        let messages = recorder.messages();
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Upload failed: API error: 403")));
        assert!(messages.contains(&"Changes were successfully applied to Google Play".to_string()));
    }

    #[tokio::test]
    async fn test_panicking_uploader_is_contained() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "a.apk", "com.a", 1);
        write_package(temp.path(), "b.apk", "com.b", 2);
        let uploader = Arc::new(FakeUploader::panicking(&["com.a"]));

        let report = orchestrator(&temp, config("beta"), uploader.clone(), &Recorder::default())
            .run(BuildResult::Success)
            .await
            .unwrap();

        assert!(!report.success);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error.as_deref().unwrap().contains("uploader exploded"));
        assert_eq!(report.successful().len(), 1);
    }

    #[tokio::test]
    async fn test_release_settings_reach_uploader() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "build/b.apk", "com.x", 20);
        write_package(temp.path(), "build/a.apk", "com.x", 10);
        write_package(temp.path(), "build/a-unaligned.apk", "com.x", 10);
        let uploader = Arc::new(FakeUploader::default());

        let mut config = config("Production");
        config.apk_files_exclude = Some("**/*-unaligned.apk".to_string());
        config.rollout_percentage = Some("10%".to_string());
        config.release_notes = vec![ReleaseNote::new("en-US", "Faster loading")];

        orchestrator(&temp, config, uploader.clone(), &Recorder::default())
            .run(BuildResult::Success)
            .await
            .unwrap();

        let calls = uploader.calls();
        let upload = &calls[0];
        assert_eq!(upload.track, Track::Production);
        assert_eq!(upload.rollout_percentage, 10.0);
        assert_eq!(upload.user_fraction(), Some(0.1));
        assert_eq!(
            upload.apk_files,
            vec![temp.path().join("build/a.apk"), temp.path().join("build/b.apk")]
        );
        assert_eq!(upload.release_notes, vec![ReleaseNote::new("en-US", "Faster loading")]);
        assert!(upload.expansion_files.is_empty());
    }

    #[tokio::test]
    async fn test_groups_follow_first_seen_order() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "1.apk", "com.z", 1);
        write_package(temp.path(), "2.apk", "com.a", 1);
        write_package(temp.path(), "3.apk", "com.z", 2);

        let report = orchestrator(&temp, config("internal"), Arc::new(FakeUploader::default()), &Recorder::default())
            .run(BuildResult::Success)
            .await
            .unwrap();

        let ids: Vec<_> = report.groups.iter().map(|g| g.application_id.as_str()).collect();
        assert_eq!(ids, vec!["com.z", "com.a"]);
        assert_eq!(report.groups[0].version_codes, vec![1, 2]);
    }
}

//! Publish command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::info;

use liftoff_core::config::{Config, InspectorKind};
use liftoff_core::{BuildResult, LiftoffError, PublishOrchestrator, PublishReport};
use liftoff_stores::{
    Aapt2Inspector, DryRunUploader, GooglePlayConfig, GooglePlayStore, ManifestInspector,
    PackageInspector, ReleaseUploader,
};

use super::args::ReleaseArgs;
use crate::cli::output::{self, ConsoleCallback};
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Upload APKs and expansion files to Google Play
#[derive(Debug, Args)]
pub struct PublishCommand {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Result of the build that produced the APKs
    #[arg(long, env = "LIFTOFF_BUILD_RESULT", default_value = "success")]
    pub build_result: BuildResult,

    /// Path to service account JSON key
    #[arg(long, env = "GOOGLE_PLAY_SERVICE_ACCOUNT")]
    pub service_account: Option<PathBuf>,

    /// How to read APK metadata (manifest, aapt2)
    #[arg(long)]
    pub inspector: Option<InspectorKind>,

    /// Path to the aapt2 binary
    #[arg(long)]
    pub aapt2: Option<PathBuf>,

    /// Dry run - validate but don't upload
    #[arg(long)]
    pub dry_run: bool,
}

impl PublishCommand {
    /// Execute the publish command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(dry_run = self.dry_run, build_result = %self.build_result, "executing publish command");
        let cwd = std::env::current_dir()?;

        let mut config = match self.release.resolve(&cwd) {
            Ok((config, _)) => config,
            Err(e) => fail(cli, &e.to_string(), exit_codes::CONFIG_ERROR),
        };
        self.apply_google_play_overrides(&mut config);

        let uploader = match self.uploader(&config) {
            Ok(uploader) => uploader,
            Err(e) => fail(cli, &format!("{:#}", e), exit_codes::CONFIG_ERROR),
        };

        let mut orchestrator = PublishOrchestrator::new(
            &cwd,
            config.publish.clone(),
            self.package_reader(&config),
            uploader,
        );
        if cli.shows_progress() {
            if self.dry_run {
                output::info("Dry run: nothing will be uploaded to Google Play");
            }
            orchestrator = orchestrator.with_callback(ConsoleCallback);
        }

        let rt = tokio::runtime::Runtime::new()?;
        let report = match rt.block_on(orchestrator.run(self.build_result)) {
            Ok(report) => report,
            Err(e) => {
                let code = exit_code_for(&e);
                if cli.format == OutputFormat::Json {
                    fail(cli, &e.to_string(), code);
                }
                // Progress output has already shown the error
                if cli.quiet {
                    output::error(&e.to_string());
                }
                std::process::exit(code);
            }
        };

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    print_summary(&report, self.dry_run);
                }
            }
        }

        let code = report_exit_code(&report);
        if code != exit_codes::SUCCESS {
            std::process::exit(code);
        }

        Ok(())
    }

    fn apply_google_play_overrides(&self, config: &mut Config) {
        if let Some(path) = &self.service_account {
            config.google_play.service_account_key = Some(path.clone());
        }
        if let Some(kind) = self.inspector {
            config.google_play.inspector = kind;
        }
        if let Some(path) = &self.aapt2 {
            config.google_play.aapt2_path = Some(path.clone());
        }
    }

    fn package_reader(&self, config: &Config) -> Arc<dyn PackageInspector> {
        match config.google_play.inspector {
            InspectorKind::Manifest => Arc::new(ManifestInspector::new()),
            InspectorKind::Aapt2 => match &config.google_play.aapt2_path {
                Some(path) => Arc::new(Aapt2Inspector::with_program(expand_home(path))),
                None => Arc::new(Aapt2Inspector::new()),
            },
        }
    }

    fn uploader(&self, config: &Config) -> anyhow::Result<Arc<dyn ReleaseUploader>> {
        if self.dry_run {
            return Ok(Arc::new(DryRunUploader::new()));
        }

        let key = config.google_play.service_account_key.as_ref().context(
            "No service account key configured; pass --service-account or set google_play.service_account_key",
        )?;

        let store = GooglePlayStore::new(GooglePlayConfig {
            service_account_key: expand_home(key),
        })?;
        Ok(Arc::new(store))
    }
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

/// Exit code for a run that was aborted before any upload
fn exit_code_for(error: &LiftoffError) -> i32 {
    match error {
        LiftoffError::Config(_) => exit_codes::CONFIG_ERROR,
        LiftoffError::Discovery(_) | LiftoffError::Artifact(_) | LiftoffError::Expansion(_) => {
            exit_codes::VALIDATION_ERROR
        }
    }
}

fn report_exit_code(report: &PublishReport) -> i32 {
    if report.success {
        exit_codes::SUCCESS
    } else {
        exit_codes::UPLOAD_FAILED
    }
}

fn fail(cli: &Cli, message: &str, code: i32) -> ! {
    match cli.format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "success": false, "error": message });
            println!("{}", output);
        }
        OutputFormat::Text => output::error(message),
    }
    std::process::exit(code);
}

fn print_summary(report: &PublishReport, dry_run: bool) {
    if report.skipped {
        return;
    }

    let published = report.successful().len();
    let total = report.groups.len();
    println!();

    if report.success {
        let verb = if dry_run { "Validated" } else { "Published" };
        output::success(&format!(
            "{} {} application(s) in {:.1}s",
            verb,
            total,
            report.total_duration.as_secs_f64()
        ));
    } else {
        output::error(&format!("{} of {} application(s) published", published, total));
        for failed in report.failed() {
            eprintln!(
                "  {} {}",
                style(&failed.application_id).bold(),
                failed.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_core::{ConfigError, DiscoveryError, ExpansionError, GroupPublishResult};
    use std::time::Duration;

    fn group(success: bool) -> GroupPublishResult {
        GroupPublishResult {
            application_id: "com.x".to_string(),
            version_codes: vec![1],
            success,
            error: (!success).then(|| "boom".to_string()),
            duration: Duration::from_millis(5),
            console_url: None,
        }
    }

    #[test]
    fn test_exit_code_for_aborts() {
        assert_eq!(
            exit_code_for(&ConfigError::Invalid(vec!["x".to_string()]).into()),
            exit_codes::CONFIG_ERROR
        );
        assert_eq!(
            exit_code_for(&DiscoveryError::EmptyPattern.into()),
            exit_codes::VALIDATION_ERROR
        );
        assert_eq!(
            exit_code_for(
                &ExpansionError::NamingConvention {
                    file: "a.obb".to_string()
                }
                .into()
            ),
            exit_codes::VALIDATION_ERROR
        );
    }

    #[test]
    fn test_report_exit_code() {
        let mut report = PublishReport {
            skipped: false,
            groups: vec![group(true), group(false)],
            total_duration: Duration::from_millis(10),
            success: false,
        };
        assert_eq!(report_exit_code(&report), exit_codes::UPLOAD_FAILED);

        report.groups.pop();
        report.success = true;
        assert_eq!(report_exit_code(&report), exit_codes::SUCCESS);
    }

    #[test]
    fn test_package_reader_selection() {
        let cmd = PublishCommand {
            release: ReleaseArgs::default(),
            build_result: BuildResult::Success,
            service_account: None,
            inspector: None,
            aapt2: None,
            dry_run: true,
        };

        let mut config = Config::default();
        assert_eq!(cmd.package_reader(&config).name(), "manifest");

        config.google_play.inspector = InspectorKind::Aapt2;
        assert_eq!(cmd.package_reader(&config).name(), "aapt2");
    }

    #[test]
    fn test_uploader_requires_key_unless_dry_run() {
        let mut cmd = PublishCommand {
            release: ReleaseArgs::default(),
            build_result: BuildResult::Success,
            service_account: None,
            inspector: None,
            aapt2: None,
            dry_run: false,
        };
        let config = Config::default();
        assert!(cmd.uploader(&config).is_err());

        cmd.dry_run = true;
        assert_eq!(cmd.uploader(&config).unwrap().name(), "dry run");
    }
}

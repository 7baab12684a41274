//! Release settings shared by `publish` and `validate`

use std::borrow::Cow;

use anyhow::bail;
use clap::Args;
use tracing::debug;

use liftoff_core::config::{load_config_or_default, validate_config, Config, PublishConfig};
use liftoff_core::BuildResult;
use liftoff_stores::ReleaseNote;

/// Overrides for the `[publish]` section of the config file
#[derive(Debug, Default, Args)]
pub struct ReleaseArgs {
    /// Comma-separated globs for the APKs to upload
    #[arg(long, value_name = "PATTERN")]
    pub apk_files: Option<String>,

    /// Comma-separated globs to leave out of the APK matches
    #[arg(long, value_name = "PATTERN")]
    pub apk_files_exclude: Option<String>,

    /// Comma-separated globs for expansion (.obb) files
    #[arg(long, value_name = "PATTERN")]
    pub expansion_files: Option<String>,

    /// Reference the newest uploaded expansion file when none is supplied
    #[arg(long)]
    pub use_previous_expansion_files: bool,

    /// Release track (internal, alpha, beta, production)
    #[arg(long)]
    pub track: Option<String>,

    /// Staged rollout percentage on production, e.g. "10" or "10%"
    #[arg(long)]
    pub rollout: Option<String>,

    /// Release notes, repeatable (format: "en-US:Bug fixes")
    #[arg(long = "release-notes", value_name = "LANGUAGE:TEXT")]
    pub release_notes: Vec<String>,

    /// Skip publishing when the build result is worse than this
    #[arg(long, value_name = "RESULT")]
    pub skip_if_worse_than: Option<BuildResult>,
}

impl ReleaseArgs {
    /// Load the config file for `dir`, apply overrides and expand variables
    pub fn resolve(&self, dir: &std::path::Path) -> anyhow::Result<(Config, Option<std::path::PathBuf>)> {
        let (mut config, path) = load_config_or_default(dir)?;
        self.apply(&mut config.publish)?;
        expand_publish_config(&mut config.publish, env_var);
        validate_config(&config)?;
        Ok((config, path))
    }

    fn apply(&self, publish: &mut PublishConfig) -> anyhow::Result<()> {
        if let Some(v) = &self.apk_files {
            publish.apk_files = Some(v.clone());
        }
        if let Some(v) = &self.apk_files_exclude {
            publish.apk_files_exclude = Some(v.clone());
        }
        if let Some(v) = &self.expansion_files {
            publish.expansion_files = Some(v.clone());
        }
        if self.use_previous_expansion_files {
            publish.use_previous_expansion_files_if_missing = true;
        }
        if let Some(v) = &self.track {
            publish.track = Some(v.clone());
        }
        if let Some(v) = &self.rollout {
            publish.rollout_percentage = Some(v.clone());
        }
        if let Some(v) = self.skip_if_worse_than {
            publish.skip_if_worse_than = v;
        }
        if !self.release_notes.is_empty() {
            publish.release_notes = self
                .release_notes
                .iter()
                .map(|n| parse_release_note(n))
                .collect::<anyhow::Result<_>>()?;
        }
        Ok(())
    }
}

fn parse_release_note(value: &str) -> anyhow::Result<ReleaseNote> {
    let Some((language, text)) = value.split_once(':') else {
        bail!("Release notes must look like LANGUAGE:TEXT, got '{}'", value);
    };
    let language = language.trim();
    if language.is_empty() {
        bail!("Release notes '{}' have no language", value);
    }
    Ok(ReleaseNote::new(language, text.trim()))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Expand `$VAR` and `${VAR}` references; unknown variables stay as written
fn expand<F>(value: &str, lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let expanded: Cow<'_, str> = shellexpand::env_with_context_no_errors(value, lookup);
    expanded.into_owned()
}

fn expand_publish_config<F>(publish: &mut PublishConfig, mut lookup: F)
where
    F: FnMut(&str) -> Option<String>,
{
    for field in [
        &mut publish.apk_files,
        &mut publish.apk_files_exclude,
        &mut publish.expansion_files,
        &mut publish.track,
        &mut publish.rollout_percentage,
    ] {
        if let Some(value) = field.as_mut() {
            *value = expand(value, &mut lookup);
        }
    }

    for note in &mut publish.release_notes {
        note.language = expand(&note.language, &mut lookup);
        note.text = expand(&note.text, &mut lookup);
    }

    debug!(?publish, "expanded publish settings");
}

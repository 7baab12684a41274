//! Configuration validation
//!
//! Two stages: [`validate_config`] runs when a file is loaded and rejects
//! values no release could use; [`ReleaseConfigValidator`] runs once per
//! publish, after CLI overrides are applied, and collects every problem with
//! the release settings before any file is touched.

use std::sync::LazyLock;

use liftoff_stores::Track;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};

use super::defaults::MAX_RELEASE_NOTES_LENGTH;
use super::types::{Config, PublishConfig};

/// Staged rollout percentages Google Play accepts on production
pub const ROLLOUT_PERCENTAGES: [f64; 8] = [0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0];

/// Rollout used when none is given or it cannot be parsed
pub const DEFAULT_ROLLOUT_PERCENTAGE: f64 = 100.0;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_release_notes(&config.publish)?;
    debug!("configuration validation passed");
    Ok(())
}

/// Loose shape of a BCP 47 language tag: `en`, `en-GB`, `zh_TW`
static LANGUAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,3}([-_][0-9A-Za-z]{2,})?$").expect("Invalid regex"));

fn validate_release_notes(publish: &PublishConfig) -> Result<()> {
    for (i, note) in publish.release_notes.iter().enumerate() {
        if note.language.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("publish.release_notes[{}].language", i),
                message: "language cannot be empty".to_string(),
            }
            .into());
        }

        let length = note.text.chars().count();
        if length > MAX_RELEASE_NOTES_LENGTH {
            return Err(ConfigError::InvalidValue {
                field: format!("publish.release_notes[{}].text", i),
                message: format!(
                    "'{}' text is {} characters, the limit is {}",
                    note.language, length, MAX_RELEASE_NOTES_LENGTH
                ),
            }
            .into());
        }

        if !LANGUAGE_TAG.is_match(note.language.trim()) {
            warn!(language = %note.language, "release notes language does not look like a language tag");
        }
    }

    Ok(())
}

/// Parse a rollout value such as `"10"`, `"10%"` or `"0.5 %"`.
///
/// Missing or unparseable values fall back to [`DEFAULT_ROLLOUT_PERCENTAGE`].
pub fn parse_rollout_percentage(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.replace('%', "").trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(DEFAULT_ROLLOUT_PERCENTAGE)
}

/// Release settings that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedRelease {
    /// Resolved track
    pub track: Track,
    /// Parsed rollout percentage
    pub rollout_percentage: f64,
}

/// Checks the release settings of a publish run
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseConfigValidator;

impl ReleaseConfigValidator {
    /// Create a validator
    pub fn new() -> Self {
        Self
    }

    /// Validate, returning every problem at once as [`ConfigError::Invalid`]
    pub fn validate(&self, publish: &PublishConfig) -> std::result::Result<ValidatedRelease, ConfigError> {
        let mut errors = Vec::new();

        if is_blank(publish.apk_files.as_deref()) {
            errors.push("Path or pattern to APK file was not specified".to_string());
        }

        let track = self.resolve_track(publish.track.as_deref(), &mut errors);
        let rollout_percentage = parse_rollout_percentage(publish.rollout_percentage.as_deref());

        if track.is_some_and(|t| t.supports_staged_rollout())
            && !ROLLOUT_PERCENTAGES.contains(&rollout_percentage)
        {
            errors.push(format!(
                "{:.2}% is not a valid rollout percentage",
                rollout_percentage
            ));
        }

        match track {
            Some(track) if errors.is_empty() => {
                debug!(%track, rollout_percentage, "release settings valid");
                Ok(ValidatedRelease {
                    track,
                    rollout_percentage,
                })
            }
            _ => Err(ConfigError::Invalid(errors)),
        }
    }

    fn resolve_track(&self, name: Option<&str>, errors: &mut Vec<String>) -> Option<Track> {
        let name = name.map(str::trim).unwrap_or_default();
        if name.is_empty() {
            errors.push("Release track was not specified".to_string());
            return None;
        }

        let canonical = name.to_lowercase();
        let track = Track::from_config_value(&canonical);
        if track.is_none() {
            errors.push(format!("'{}' is not a valid release track", canonical));
        }
        track
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

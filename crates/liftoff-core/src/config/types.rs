//! Configuration types

use std::path::PathBuf;

use liftoff_stores::ReleaseNote;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::BuildResult;

/// Main configuration for liftoff
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What to publish and where
    pub publish: PublishConfig,

    /// Google Play credentials and package reader
    pub google_play: GooglePlaySection,
}

/// Publishing configuration
///
/// Values are taken literally; variable expansion happens before they get here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Comma-separated globs for the APKs to upload
    pub apk_files: Option<String>,

    /// Comma-separated globs removed from the APK matches
    pub apk_files_exclude: Option<String>,

    /// Comma-separated globs for `.obb` expansion files
    pub expansion_files: Option<String>,

    /// Reference the newest uploaded expansion file when one is not supplied
    pub use_previous_expansion_files_if_missing: bool,

    /// Release track name
    pub track: Option<String>,

    /// Rollout percentage, `"10"` or `"10%"`
    #[serde(deserialize_with = "string_or_number")]
    pub rollout_percentage: Option<String>,

    /// Skip publishing when the build result is worse than this
    pub skip_if_worse_than: BuildResult,

    /// "What's new" text per language
    pub release_notes: Vec<ReleaseNote>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            apk_files: None,
            apk_files_exclude: None,
            expansion_files: None,
            use_previous_expansion_files_if_missing: false,
            track: None,
            rollout_percentage: None,
            skip_if_worse_than: BuildResult::Unstable,
            release_notes: Vec::new(),
        }
    }
}

/// Which reader extracts package metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectorKind {
    /// Decode the compiled manifest inside the APK
    #[default]
    Manifest,
    /// Run `aapt2 dump badging`
    Aapt2,
}

impl std::str::FromStr for InspectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manifest" => Ok(Self::Manifest),
            "aapt2" | "aapt" => Ok(Self::Aapt2),
            _ => Err(format!("Unknown inspector: {}", s)),
        }
    }
}

/// Google Play configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GooglePlaySection {
    /// Path to the service account JSON key
    pub service_account_key: Option<PathBuf>,

    /// Package reader
    pub inspector: InspectorKind,

    /// `aapt2` binary, when not on `PATH`
    pub aapt2_path: Option<PathBuf>,
}

/// Accept `rollout_percentage = 10` as well as `rollout_percentage = "10%"`
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Integer(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    }))
}

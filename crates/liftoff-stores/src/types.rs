//! Common types for store adapters

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Release track on Google Play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Internal testing
    Internal,
    /// Closed testing
    Alpha,
    /// Open testing
    Beta,
    /// Production, the only track with staged rollouts
    Production,
}

impl Track {
    /// All known tracks, lowest tier first
    pub const ALL: [Track; 4] = [Track::Internal, Track::Alpha, Track::Beta, Track::Production];

    /// Resolve a track from its configuration value.
    ///
    /// The value must already be case-folded; `"Production"` does not match.
    pub fn from_config_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.api_value() == value)
    }

    /// Name used by the Play Developer API
    pub fn api_value(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Production => "production",
        }
    }

    /// Whether rollout percentages apply to this track
    pub fn supports_staged_rollout(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.api_value())
    }
}

/// Slot an expansion file occupies for one version code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionSlot {
    /// Primary expansion file
    Main,
    /// Incremental update to the main file
    Patch,
}

impl ExpansionSlot {
    /// Path segment used by the Play Developer API
    pub fn api_value(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Patch => "patch",
        }
    }
}

impl std::fmt::Display for ExpansionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.api_value())
    }
}

/// Main and patch expansion files for a single version code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionFileSet {
    /// Main expansion file
    pub main_file: Option<PathBuf>,
    /// Patch expansion file
    pub patch_file: Option<PathBuf>,
}

impl ExpansionFileSet {
    /// Get the file for a slot
    pub fn get(&self, slot: ExpansionSlot) -> Option<&PathBuf> {
        match slot {
            ExpansionSlot::Main => self.main_file.as_ref(),
            ExpansionSlot::Patch => self.patch_file.as_ref(),
        }
    }

    /// Put a file into a slot, replacing whatever was there
    pub fn set(&mut self, slot: ExpansionSlot, path: PathBuf) {
        match slot {
            ExpansionSlot::Main => self.main_file = Some(path),
            ExpansionSlot::Patch => self.patch_file = Some(path),
        }
    }

    /// A patch without a main file
    pub fn is_patch_only(&self) -> bool {
        self.patch_file.is_some() && self.main_file.is_none()
    }
}

/// Localized "what's new" text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNote {
    /// Language tag, e.g. `en-US`
    pub language: String,
    /// Free text
    pub text: String,
}

impl ReleaseNote {
    /// Create a release note
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text: text.into(),
        }
    }
}

/// Identity metadata read from an application package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Application ID (manifest `package`)
    pub application_id: String,
    /// Numeric version code
    pub version_code: u32,
    /// Human readable version name, if declared
    pub version_name: Option<String>,
}

/// Everything needed to publish one application
#[derive(Debug, Clone)]
pub struct ReleaseUpload {
    /// Application ID all files belong to
    pub application_id: String,

    /// APK files, in discovery order
    pub apk_files: Vec<PathBuf>,

    /// Version codes read from the APKs, ascending
    pub version_codes: Vec<u32>,

    /// Expansion files keyed by version code
    pub expansion_files: BTreeMap<u32, ExpansionFileSet>,

    /// Reference the newest existing expansion file when a slot is empty
    pub use_previous_expansion_files_if_missing: bool,

    /// Target track
    pub track: Track,

    /// Rollout percentage (0-100); only honoured on production
    pub rollout_percentage: f64,

    /// Release notes per language
    pub release_notes: Vec<ReleaseNote>,
}

impl ReleaseUpload {
    /// Fraction of users for a staged rollout, `None` for a full release
    pub fn user_fraction(&self) -> Option<f64> {
        if self.track.supports_staged_rollout() && self.rollout_percentage < 100.0 {
            Some(self.rollout_percentage / 100.0)
        } else {
            None
        }
    }
}

/// Google Play adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GooglePlayConfig {
    /// Path to the service account JSON key
    pub service_account_key: PathBuf,
}

/// Result of an upload operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    /// Application ID that was published
    pub application_id: String,

    /// Version codes assigned to the track
    pub version_codes: Vec<u32>,

    /// URL to view the release in the store console
    pub console_url: Option<String>,

    /// Whether this was a dry run
    pub dry_run: bool,

    /// Timestamp of completion
    pub uploaded_at: DateTime<Utc>,
}

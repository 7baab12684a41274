//! Error types for liftoff

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LiftoffError
pub type Result<T> = std::result::Result<T, LiftoffError>;

/// Main error type for liftoff operations
#[derive(Debug, Error)]
pub enum LiftoffError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Artifact discovery errors
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Unreadable artifacts
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Expansion file errors
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more release settings are unusable
    #[error("Cannot upload to Google Play:{}", bullet_list(.0))]
    Invalid(Vec<String>),

    /// Glob pattern could not be compiled
    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// The individual problems, one per line of user output
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Invalid(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|i| format!("\n- {}", i)).collect()
}

/// Artifact discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Include pattern is blank
    #[error("Path or pattern to APK file was not specified")]
    EmptyPattern,

    /// Nothing matched the include pattern
    #[error("No APK files matching the pattern '{pattern}' could be found")]
    NoMatches { pattern: String },

    /// Directory walk failed
    #[error("Failed to search {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

/// Artifact inspection errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Package could not be read or lacks an application ID or version code
    #[error("Could not read APK '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Expansion file errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpansionError {
    /// File name does not follow `<main|patch>.<versionCode>.<applicationId>.<ext>`
    #[error("Expansion file '{file}' doesn't match the required naming scheme")]
    NamingConvention { file: String },

    /// Patch file for a version code that has no main file
    #[error(
        "Patch expansion file '{patch_file}' was provided, but no main expansion file was provided, \
         and the option to reuse a pre-existing expansion file was disabled.\n\
         Google Play requires that each APK with a patch file also has a main file."
    )]
    MissingMainFile { patch_file: String },
}

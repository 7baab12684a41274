//! Pattern-based file discovery
//!
//! Patterns are comma-separated glob lists relative to the working directory,
//! e.g. `app/build/**/*.apk, extra/*.apk`. `*` stays within one directory and
//! `**` crosses directories.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ConfigError, DiscoveryError, Result};

/// Resolves include/exclude patterns against a directory tree
#[derive(Debug, Clone)]
pub struct FileMatcher {
    root: PathBuf,
}

impl FileMatcher {
    /// Create a matcher rooted at the working directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find regular files matching `include` but not `exclude`.
    ///
    /// Paths are relative to the root and returned in a stable, name-sorted
    /// walk order. Zero matches is not an error here.
    pub fn find(&self, include: &str, exclude: Option<&str>) -> Result<Vec<PathBuf>> {
        if split_patterns(include).is_empty() {
            return Err(DiscoveryError::EmptyPattern.into());
        }

        let include_set = build_glob_set(include)?;
        let exclude_set = exclude
            .filter(|p| !split_patterns(p).is_empty())
            .map(build_glob_set)
            .transpose()?;

        let mut matches = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| DiscoveryError::Walk {
                path: e.path().unwrap_or(&self.root).to_path_buf(),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let candidate = slash_path(relative);

            if !include_set.is_match(&candidate) {
                continue;
            }
            if exclude_set.as_ref().is_some_and(|set| set.is_match(&candidate)) {
                debug!(path = %candidate, "excluded by pattern");
                continue;
            }

            matches.push(relative.to_path_buf());
        }

        debug!(pattern = include, count = matches.len(), "file discovery complete");
        Ok(matches)
    }
}

fn split_patterns(pattern: &str) -> Vec<&str> {
    pattern
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

fn build_glob_set(pattern: &str) -> Result<GlobSet> {
    let invalid = |message: String| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message,
    };

    let mut builder = GlobSetBuilder::new();
    for part in split_patterns(pattern) {
        let part = part.strip_prefix("./").unwrap_or(part);
        let glob = GlobBuilder::new(part)
            .literal_separator(true)
            .build()
            .map_err(|e| invalid(e.to_string()))?;
        builder.add(glob);
    }

    Ok(builder.build().map_err(|e| invalid(e.to_string()))?)
}

/// Relative path with `/` separators on every platform
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

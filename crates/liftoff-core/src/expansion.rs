//! Expansion file (`.obb`) association
//!
//! Expansion files are tied to an APK purely by name:
//!
//! ```text
//! <main|patch>.<versionCode>.<applicationId>.<extension>
//! main.100.com.example.game.obb
//! ```
//!
//! Every name is parsed up front. A name outside the convention aborts the
//! whole run, while a well-formed name for another application or an unknown
//! version code is just not relevant to the group being published.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use liftoff_stores::{ExpansionFileSet, ExpansionSlot};
use thiserror::Error;
use tracing::debug;

use crate::error::ExpansionError;
use crate::grouping::ApplicationGroup;

/// Parsed expansion file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionFileName {
    /// Main or patch
    pub slot: ExpansionSlot,
    /// APK version code the file belongs to
    pub version_code: u32,
    /// Application ID the file belongs to
    pub application_id: String,
    /// File extension, usually `obb`
    pub extension: String,
}

/// Why a name does not follow the convention
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FileNameError {
    #[error("expected '<main|patch>.<versionCode>.<applicationId>.<extension>'")]
    MissingSeparator,

    #[error("'{0}' is neither 'main' nor 'patch'")]
    UnknownSlot(String),

    #[error("'{0}' is not a version code")]
    InvalidVersionCode(String),

    #[error("'{0}' is not an application ID")]
    InvalidApplicationId(String),

    #[error("'{0}' is not a file extension")]
    InvalidExtension(String),
}

/// Walks a file name one `.`-separated field at a time
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    /// Consume up to and including the next `.`
    fn field(&mut self) -> Result<&'a str, FileNameError> {
        let (field, rest) = self
            .rest
            .split_once('.')
            .ok_or(FileNameError::MissingSeparator)?;
        self.rest = rest;
        Ok(field)
    }

    /// Split what is left at its last `.`
    fn tail(self) -> Result<(&'a str, &'a str), FileNameError> {
        self.rest
            .rsplit_once('.')
            .ok_or(FileNameError::MissingSeparator)
    }
}

impl ExpansionFileName {
    /// Parse a bare file name (no directories)
    ///
    /// The application ID must be dot-separated segments of ASCII letters,
    /// digits and `_`. An empty segment (`main.1.com..x.obb`) or a leading or
    /// trailing dot is a naming error that aborts the run; such a file is not
    /// skipped as belonging to another application.
    pub fn parse(name: &str) -> Result<Self, FileNameError> {
        let mut cursor = Cursor::new(name);

        let slot = cursor.field()?;
        let slot = if slot.eq_ignore_ascii_case("main") {
            ExpansionSlot::Main
        } else if slot.eq_ignore_ascii_case("patch") {
            ExpansionSlot::Patch
        } else {
            return Err(FileNameError::UnknownSlot(slot.to_string()));
        };

        let version = cursor.field()?;
        if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FileNameError::InvalidVersionCode(version.to_string()));
        }
        let version_code = version
            .parse::<u32>()
            .map_err(|_| FileNameError::InvalidVersionCode(version.to_string()))?;

        let (application_id, extension) = cursor.tail()?;
        let valid_segment =
            |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !application_id.split('.').all(valid_segment) {
            return Err(FileNameError::InvalidApplicationId(application_id.to_string()));
        }
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FileNameError::InvalidExtension(extension.to_string()));
        }

        Ok(Self {
            slot,
            version_code,
            application_id: application_id.to_string(),
            extension: extension.to_string(),
        })
    }
}

impl std::str::FromStr for ExpansionFileName {
    type Err = FileNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A discovered expansion file and what its name says
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionFile {
    /// Path relative to the working directory
    pub path: PathBuf,
    /// Parsed file name
    pub name: ExpansionFileName,
}

/// Associates expansion files with the APKs of an application group
#[derive(Debug, Clone)]
pub struct ExpansionFileMatcher {
    root: PathBuf,
    files: Vec<ExpansionFile>,
}

impl ExpansionFileMatcher {
    /// Parse every discovered file name, failing on the first one that does
    /// not follow the naming convention.
    pub fn parse(root: impl Into<PathBuf>, relative_paths: &[PathBuf]) -> Result<Self, ExpansionError> {
        let files = relative_paths
            .iter()
            .map(|path| {
                let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                ExpansionFileName::parse(&file_name)
                    .map(|name| ExpansionFile {
                        path: path.clone(),
                        name,
                    })
                    .map_err(|e| {
                        debug!(path = %path.display(), reason = %e, "bad expansion file name");
                        ExpansionError::NamingConvention {
                            file: path.display().to_string(),
                        }
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root: root.into(),
            files,
        })
    }

    /// Matcher with no files
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Vec::new(),
        }
    }

    /// Expansion files for one group, keyed by version code.
    ///
    /// Later files overwrite earlier ones in the same slot.
    pub fn match_group(&self, group: &ApplicationGroup) -> BTreeMap<u32, ExpansionFileSet> {
        let mut sets: BTreeMap<u32, ExpansionFileSet> = BTreeMap::new();

        for file in &self.files {
            if file.name.application_id != group.application_id {
                debug!(path = %file.path.display(), group = %group.application_id, "expansion file is for another application");
                continue;
            }
            if !group.version_codes.contains(&file.name.version_code) {
                debug!(path = %file.path.display(), version_code = file.name.version_code, "no APK with this version code");
                continue;
            }

            debug!(path = %file.path.display(), slot = %file.name.slot, "matched expansion file");
            sets.entry(file.name.version_code)
                .or_default()
                .set(file.name.slot, self.root.join(&file.path));
        }

        sets
    }

    /// Match a group and enforce that every patch file has a main file,
    /// unless a previously uploaded main file may be reused.
    pub fn resolve(
        &self,
        group: &ApplicationGroup,
        allow_reuse: bool,
    ) -> Result<BTreeMap<u32, ExpansionFileSet>, ExpansionError> {
        let sets = self.match_group(group);
        check_complete(&sets, allow_reuse)?;
        Ok(sets)
    }
}

/// Every version code with a patch file must also have a main file
pub fn check_complete(sets: &BTreeMap<u32, ExpansionFileSet>, allow_reuse: bool) -> Result<(), ExpansionError> {
    if allow_reuse {
        return Ok(());
    }

    for set in sets.values() {
        if set.main_file.is_some() {
            continue;
        }
        if let Some(patch) = &set.patch_file {
            return Err(ExpansionError::MissingMainFile {
                patch_file: display_name(patch),
            });
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

//! Package reader backed by the `aapt2` build tool

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::PackageInspector;
use crate::types::PackageInfo;

/// Runs `aapt2 dump badging` and parses its `package:` line
#[derive(Debug, Clone)]
pub struct Aapt2Inspector {
    program: PathBuf,
}

impl Aapt2Inspector {
    /// Use `aapt2` from `PATH`
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("aapt2"),
        }
    }

    /// Use a specific `aapt2` binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Aapt2Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageInspector for Aapt2Inspector {
    fn name(&self) -> &str {
        "aapt2"
    }

    fn inspect(&self, path: &Path) -> Result<PackageInfo> {
        debug!(program = %self.program.display(), path = %path.display(), "running aapt2");
        let output = Command::new(&self.program)
            .arg("dump")
            .arg("badging")
            .arg(path)
            .output()
            .map_err(|e| StoreError::CommandFailed(format!("aapt2 failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoreError::invalid_artifact(path, stderr.trim().to_string()));
        }

        parse_badging(&String::from_utf8_lossy(&output.stdout))
            .map_err(|reason| StoreError::invalid_artifact(path, reason))
    }
}

/// Parse `aapt2 dump badging` output
///
/// `package: name='com.example' versionCode='1' versionName='1.0.0' ...`
pub fn parse_badging(stdout: &str) -> std::result::Result<PackageInfo, String> {
    let line = stdout
        .lines()
        .find(|l| l.starts_with("package:"))
        .ok_or_else(|| "no package line in aapt2 output".to_string())?;

    let mut package_name = String::new();
    let mut version_code = String::new();
    let mut version_name = None;

    for part in line.split_whitespace() {
        if let Some(value) = quoted_value(part, "name=") {
            package_name = value.to_string();
        } else if let Some(value) = quoted_value(part, "versionCode=") {
            version_code = value.to_string();
        } else if let Some(value) = quoted_value(part, "versionName=") {
            version_name = Some(value.to_string());
        }
    }

    if package_name.is_empty() {
        return Err("could not determine package name".to_string());
    }

    let version_code = version_code
        .parse()
        .map_err(|_| format!("invalid or missing version code '{}'", version_code))?;

    Ok(PackageInfo {
        application_id: package_name,
        version_code,
        version_name,
    })
}

fn quoted_value<'a>(part: &'a str, key: &str) -> Option<&'a str> {
    part.strip_prefix(key)
        .map(|v| v.trim_start_matches('\'').trim_end_matches('\''))
}

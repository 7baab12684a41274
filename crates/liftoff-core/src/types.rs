//! Core types for liftoff

use serde::{Deserialize, Serialize};

/// Outcome reported by the build that produced the artifacts
///
/// Variants are ordered from best to worst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    /// Build succeeded
    #[default]
    Success,
    /// Build succeeded with test failures
    Unstable,
    /// Build failed
    Failure,
    /// Build never ran
    NotBuilt,
    /// Build was cancelled
    Aborted,
}

impl BuildResult {
    /// Returns the string representation of the build result
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Unstable => "unstable",
            Self::Failure => "failure",
            Self::NotBuilt => "not_built",
            Self::Aborted => "aborted",
        }
    }

    /// Whether this result is strictly worse than `other`
    pub fn is_worse_than(&self, other: BuildResult) -> bool {
        *self > other
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BuildResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "success" => Ok(Self::Success),
            "unstable" => Ok(Self::Unstable),
            "failure" | "failed" => Ok(Self::Failure),
            "not_built" => Ok(Self::NotBuilt),
            "aborted" => Ok(Self::Aborted),
            _ => Err(format!("Unknown build result: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(BuildResult::Failure.is_worse_than(BuildResult::Unstable));
        assert!(BuildResult::Aborted.is_worse_than(BuildResult::NotBuilt));
        assert!(!BuildResult::Unstable.is_worse_than(BuildResult::Unstable));
        assert!(!BuildResult::Success.is_worse_than(BuildResult::Unstable));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("UNSTABLE".parse::<BuildResult>(), Ok(BuildResult::Unstable));
        assert_eq!("not-built".parse::<BuildResult>(), Ok(BuildResult::NotBuilt));
        assert!("broken".parse::<BuildResult>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&BuildResult::NotBuilt).unwrap();
        assert_eq!(json, "\"not_built\"");
    }
}

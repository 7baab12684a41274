//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// Each level is checked for `<dir>/<name>` and then `<dir>/.github/<name>`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.is_file() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            let github_path = current.join(".github").join(name);
            if github_path.is_file() {
                info!(path = %github_path.display(), "found config file in .github/");
                return Some(github_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load the config found from `dir`, or defaults when there is none.
///
/// A config file that exists but fails to parse or validate is an error.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            debug!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuildResult;
    use crate::LiftoffError;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_walks_up() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("liftoff.toml");
        std::fs::write(&config_path, "[publish]\ntrack = \"beta\"\n").unwrap();
        let nested = temp.path().join("app").join("build");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_find_config_in_github_dir() {
        let temp = TempDir::new().unwrap();
        let github_dir = temp.path().join(".github");
        std::fs::create_dir_all(&github_dir).unwrap();
        let config_path = github_dir.join("liftoff.yaml");
        std::fs::write(&config_path, "publish:\n  track: beta\n").unwrap();

        assert_eq!(find_config(temp.path()), Some(config_path));
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("liftoff.toml");
        std::fs::write(
            &config_path,
            r#"
[publish]
apk_files = "**/*.apk"
expansion_files = "**/*.obb"
track = "production"
rollout_percentage = "10%"
skip_if_worse_than = "success"

[google_play]
service_account_key = "key.json"
inspector = "aapt2"
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.publish.apk_files.as_deref(), Some("**/*.apk"));
        assert_eq!(config.publish.track.as_deref(), Some("production"));
        assert_eq!(config.publish.skip_if_worse_than, BuildResult::Success);
        assert_eq!(
            config.google_play.service_account_key,
            Some(PathBuf::from("key.json"))
        );
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("liftoff.yaml");
        std::fs::write(
            &config_path,
            "publish:\n  track: alpha\n  release_notes:\n    - language: de-DE\n      text: Fehlerbehebungen\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.publish.track.as_deref(), Some("alpha"));
        assert_eq!(config.publish.release_notes.len(), 1);
    }

    #[test]
    fn test_load_config_rejects_long_release_notes() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("liftoff.toml");
        std::fs::write(
            &config_path,
            format!(
                "[[publish.release_notes]]\nlanguage = \"en-US\"\ntext = \"{}\"\n",
                "x".repeat(501)
            ),
        )
        .unwrap();

        let err = load_config(&config_path).unwrap_err();
        assert!(matches!(
            err,
            LiftoffError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert!(config.publish.track.is_none());
    }
}

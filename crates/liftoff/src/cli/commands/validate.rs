//! Validate command

use clap::Args;
use console::style;
use tracing::info;

use liftoff_core::config::ReleaseConfigValidator;

use super::args::ReleaseArgs;
use crate::cli::output;
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Check the release settings without touching any files
#[derive(Debug, Args)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub release: ReleaseArgs,
}

impl ValidateCommand {
    /// Execute the validate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing validate command");
        let cwd = std::env::current_dir()?;

        let mut errors: Vec<String> = Vec::new();
        let mut config_path = None;
        let mut validated = None;

        match self.release.resolve(&cwd) {
            Ok((config, path)) => {
                config_path = path;
                match ReleaseConfigValidator::new().validate(&config.publish) {
                    Ok(release) => validated = Some(release),
                    Err(e) => errors.extend(e.messages()),
                }
            }
            Err(e) => errors.push(format!("Configuration: {}", e)),
        }

        let passed = errors.is_empty();

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "valid": passed,
                    "config_path": config_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                    "track": validated.map(|r| r.track.to_string()),
                    "rollout_percentage": validated.map(|r| r.rollout_percentage),
                    "errors": errors,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", style("Validation Results").bold());
                    println!();

                    match &config_path {
                        Some(path) => println!("{}", output::key_value("Config", &path.display().to_string())),
                        None => println!("{}", output::key_value("Config", "none (flags only)")),
                    }
                    if let Some(release) = validated {
                        println!("{}", output::key_value("Track", &release.track.to_string()));
                        if release.track.supports_staged_rollout() {
                            println!(
                                "{}",
                                output::key_value("Rollout", &format!("{}%", release.rollout_percentage))
                            );
                        }
                    }
                    println!();
                }

                if passed {
                    if !cli.quiet {
                        output::success("Release settings are valid");
                    }
                } else {
                    output::error("Cannot upload to Google Play:");
                    for error in &errors {
                        eprintln!("  - {}", error);
                    }
                }
            }
        }

        if !passed {
            std::process::exit(exit_codes::CONFIG_ERROR);
        }

        Ok(())
    }
}

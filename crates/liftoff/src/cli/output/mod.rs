//! Output formatting utilities

use console::{style, Style};

use liftoff_core::{BuildResult, GroupPublishResult, PublishCallback};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Prints publish progress to the terminal
pub struct ConsoleCallback;

impl PublishCallback for ConsoleCallback {
    fn on_message(&self, message: &str) {
        if message.starts_with("Upload failed") || message.starts_with("Cannot upload") {
            eprintln!("{}", style(message).red());
        } else if message.starts_with("- ") {
            println!("  {}", style(message).dim());
        } else {
            println!("{}", message);
        }
    }

    fn on_group_start(&self, application_id: &str, version_codes: &[u32]) {
        let codes: Vec<String> = version_codes.iter().map(|v| v.to_string()).collect();
        println!();
        println!(
            "{} {}",
            header(application_id),
            style(format!("[{}]", codes.join(", "))).dim()
        );
    }

    fn on_group_complete(&self, result: &GroupPublishResult) {
        if result.success {
            success(&format!(
                "{} published in {:.1}s",
                result.application_id,
                result.duration.as_secs_f64()
            ));
            if let Some(url) = &result.console_url {
                println!("{}", key_value("Console", &path_style().apply_to(url).to_string()));
            }
        } else {
            error(&format!("{} was not published", result.application_id));
        }
    }

    fn on_skip(&self, build_result: BuildResult, threshold: BuildResult) {
        warning(&format!(
            "Build result '{}' is worse than '{}'",
            build_result, threshold
        ));
    }
}

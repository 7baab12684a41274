//! CLI commands

mod args;
mod completions;
mod publish;
mod validate;

pub use completions::CompletionsCommand;
pub use publish::PublishCommand;
pub use validate::ValidateCommand;

//! liftoff core - artifact resolution and publish orchestration
//!
//! This crate turns a directory of build outputs into per-application
//! releases: it finds APKs and expansion files by pattern, reads their
//! identity, groups them by application, validates the release settings and
//! drives an uploader once per application.

pub mod artifact;
pub mod config;
pub mod discovery;
pub mod error;
pub mod expansion;
pub mod grouping;
pub mod publish;
pub mod types;

pub use artifact::{Artifact, ArtifactInspector};
pub use discovery::FileMatcher;
pub use error::{
    ArtifactError, ConfigError, DiscoveryError, ExpansionError, LiftoffError, Result,
};
pub use expansion::{ExpansionFileMatcher, ExpansionFileName, FileNameError};
pub use grouping::{group_artifacts, ApplicationGroup};
pub use publish::{
    GroupPublishResult, PublishCallback, PublishCallbackRegistry,
    PublishOrchestrator, PublishReport,
};
pub use types::BuildResult;

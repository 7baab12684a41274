//! Store upload adapters and package readers for liftoff
//!
//! This crate talks to the outside world: it reads identity metadata out of
//! Android packages and publishes releases to Google Play.
//!
//! ## Package readers
//! - [`ManifestInspector`]: decodes the compiled `AndroidManifest.xml` inside the APK
//! - [`Aapt2Inspector`]: shells out to `aapt2 dump badging`
//!
//! ## Uploaders
//! - [`GooglePlayStore`]: Google Play Developer API, one edit per application
//! - [`DryRunUploader`]: validates and logs, never uploads
//!
//! ## Usage
//!
//! ```ignore
//! use liftoff_stores::{GooglePlayStore, ReleaseUploader};
//!
//! let store = GooglePlayStore::new(config)?;
//! let result = store.upload_release(&upload).await?;
//! ```

pub mod dry_run;
pub mod error;
pub mod google_play;
pub mod traits;
pub mod types;

pub use dry_run::DryRunUploader;
pub use error::{Result, StoreError};
pub use google_play::{Aapt2Inspector, GooglePlayStore, ManifestInspector};
pub use traits::{PackageInspector, ReleaseUploader};
pub use types::*;

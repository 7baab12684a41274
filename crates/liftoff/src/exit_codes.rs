//! Exit codes for the CLI

/// Success, including a run skipped because of the build result
pub const SUCCESS: i32 = 0;

/// At least one application failed to upload
pub const UPLOAD_FAILED: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Artifacts could not be found, read or matched
pub const VALIDATION_ERROR: i32 = 5;

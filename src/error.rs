//! Stage failure taxonomy for the build pipeline.
//!
//! Every pipeline stage resolves to a `Result<_, StageError>`; the coordinator
//! short-circuits on the first error and carries it into the failure
//! notification. Variants mirror the stages themselves so a callback consumer
//! can tell *where* a job died from the message alone.

use thiserror::Error;

/// A terminal failure of one pipeline stage.
///
/// The contained string is the human-readable cause (tool exit code, missing
/// file, unsupported input) that ends up in the notification payload's
/// `message` field.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// Request rejected before a job (or workspace) existed. Never notified.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Clone, download or extraction failed, or the workspace could not be
    /// allocated.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// No manifest, or no decision-table entry matched.
    #[error("detection failed: {0}")]
    Detection(String),

    /// Non-zero install/build exit, or missing output after a zero exit.
    #[error("build failed: {0}")]
    Build(String),

    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("publish failed: {0}")]
    Publish(String),
}

impl StageError {
    /// Short stage name, used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::InvalidRequest(_) => "request",
            StageError::Fetch(_) => "fetch",
            StageError::Detection(_) => "detect",
            StageError::Build(_) => "build",
            StageError::Packaging(_) => "package",
            StageError::Publish(_) => "publish",
        }
    }
}

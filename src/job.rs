//! Job types: the incoming request, source classification, and per-job state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::detect::{Framework, PackageManager};
use crate::error::StageError;
use crate::notify::NotifyOutcome;

/// An incoming build request, as accepted by `POST /build`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Git repository (`.git`) or archive (`.zip`, `.tar.gz`, `.tgz`) URL.
    pub source_url: String,

    /// Branch to check out; defaults to the configured primary branch.
    #[serde(default)]
    pub branch: Option<String>,

    /// Caller-supplied correlation string, echoed in the callback payload.
    pub client_id: String,

    /// Endpoint notified of the terminal outcome. Absent means the
    /// notification stage is a no-op.
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl BuildRequest {
    /// Validates the request and classifies the source reference.
    ///
    /// Rejection here is synchronous: no workspace is allocated and no
    /// callback will ever fire for an invalid request.
    pub fn validate(&self) -> Result<SourceRef, StageError> {
        if self.source_url.trim().is_empty() {
            return Err(StageError::InvalidRequest(
                "source_url is required".to_string(),
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err(StageError::InvalidRequest(
                "client_id is required".to_string(),
            ));
        }
        SourceRef::classify(&self.source_url).ok_or_else(|| {
            StageError::InvalidRequest(format!(
                "unsupported source type: {} (expected a .git repository or .zip/.tar.gz archive)",
                self.source_url
            ))
        })
    }
}

/// Archive container format, recognized by URL suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

/// A source reference tagged by suffix inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Git { url: String },
    Archive { url: String, kind: ArchiveKind },
}

impl SourceRef {
    /// Classifies a URL by its suffix, or `None` if unrecognized.
    pub fn classify(url: &str) -> Option<SourceRef> {
        let url = url.trim();
        if url.ends_with(".git") {
            Some(SourceRef::Git {
                url: url.to_string(),
            })
        } else if url.ends_with(".zip") {
            Some(SourceRef::Archive {
                url: url.to_string(),
                kind: ArchiveKind::Zip,
            })
        } else if url.ends_with(".tar.gz") || url.ends_with(".tgz") {
            Some(SourceRef::Archive {
                url: url.to_string(),
                kind: ArchiveKind::TarGz,
            })
        } else {
            None
        }
    }

    pub fn url(&self) -> &str {
        match self {
            SourceRef::Git { url } => url,
            SourceRef::Archive { url, .. } => url,
        }
    }
}

/// Pipeline stages, in strict forward order. Each state is reachable only
/// from its predecessor; any failure short-circuits to failure notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Fetching,
    Detecting,
    Installing,
    Building,
    Packaging,
    Publishing,
    Notifying,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Fetching => "fetching",
            JobState::Detecting => "detecting",
            JobState::Installing => "installing",
            JobState::Building => "building",
            JobState::Packaging => "packaging",
            JobState::Publishing => "publishing",
            JobState::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

/// One unit of work: a single request moving through the pipeline.
///
/// Mutated only by the coordinator as stages advance or fail. The workspace
/// it builds in is exclusively owned and reclaimed after the terminal
/// notification attempt resolves.
#[derive(Debug)]
pub struct BuildJob {
    pub id: Uuid,
    pub client_id: String,
    pub source: SourceRef,
    pub branch: String,
    pub callback_url: Option<String>,
    pub state: JobState,
    pub package_manager: Option<PackageManager>,
    pub framework: Option<Framework>,
    pub output_dir: Option<PathBuf>,
    pub artifact_path: Option<PathBuf>,
}

impl BuildJob {
    pub fn new(
        id: Uuid,
        client_id: String,
        source: SourceRef,
        branch: String,
        callback_url: Option<String>,
    ) -> Self {
        Self {
            id,
            client_id,
            source,
            branch,
            callback_url,
            state: JobState::Fetching,
            package_manager: None,
            framework: None,
            output_dir: None,
            artifact_path: None,
        }
    }

    /// Advances the job to the next stage, logging the transition.
    pub fn advance(&mut self, next: JobState) {
        tracing::debug!(job_id = %self.id, from = %self.state, to = %next, "stage transition");
        self.state = next;
    }
}

/// Terminal result of a job: exactly one of artifact URL or error is set,
/// enforced by construction.
#[derive(Debug, Clone)]
pub enum JobResult {
    Success {
        artifact_name: String,
        artifact_url: String,
    },
    Failure {
        error: StageError,
    },
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }
}

/// What `JobPipeline::run` hands back once a job is terminal.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: Uuid,
    pub client_id: String,
    pub result: JobResult,
    pub delivery: NotifyOutcome,
}

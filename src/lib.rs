//! shipwright - build service for static web projects
//!
//! This library turns a source reference (a git repository or a zip/tar.gz
//! archive) into a deployable static build artifact, publishes it to object
//! storage, and notifies a caller-supplied endpoint of the outcome.
//!
//! # Core Concepts
//!
//! - **Job**: one request moving through a strictly linear pipeline:
//!   fetch → detect → install → build → package → publish → notify. The
//!   first stage failure short-circuits to failure notification.
//! - **Detection**: package manager from lockfile presence, framework and
//!   output directory from a fixed-priority decision table over manifest
//!   dependencies.
//! - **Capabilities**: source acquisition, command execution, object storage
//!   and callback delivery sit behind narrow traits so the pipeline's state
//!   transitions and error mapping are testable with deterministic fakes.
//! - **Reliable notification**: the terminal payload is delivered with
//!   bounded retries and exponential backoff; delivery failure never changes
//!   the job's recorded outcome.
//!
//! # Example Usage
//!
//! ```ignore
//! use shipwright::{BuilderConfig, BuildRequest, JobPipeline};
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! async fn build_one() {
//!     let pipeline = Arc::new(JobPipeline::new(BuilderConfig::default()));
//!
//!     let request = BuildRequest {
//!         source_url: "https://github.com/acme/site.git".to_string(),
//!         branch: None,
//!         client_id: "acme".to_string(),
//!         callback_url: Some("https://acme.example/hooks/build".to_string()),
//!     };
//!
//!     let outcome = pipeline.run(request, Uuid::new_v4()).await;
//!     println!("job {} finished: {:?}", outcome.job_id, outcome.result);
//! }
//! ```

// Public modules
pub mod api;
pub mod build;
pub mod config;
pub mod detect;
pub mod error;
pub mod exec;
pub mod job;
pub mod notify;
pub mod package;
pub mod pipeline;
pub mod publish;
pub mod source;
pub mod storage;
pub mod util;
pub mod workspace;

// Re-export key types for convenient access
pub use config::{BuilderConfig, ConfigError, RetryPolicy};
pub use detect::{Detection, Framework, PackageManager, FRAMEWORK_RULES};
pub use error::StageError;
pub use exec::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use job::{ArchiveKind, BuildJob, BuildRequest, JobOutcome, JobResult, JobState, SourceRef};
pub use notify::{CallbackPayload, CallbackTransport, Notifier, NotifyOutcome, NotifyStatus};
pub use pipeline::JobPipeline;
pub use source::{HttpGitFetcher, SourceFetcher};
pub use storage::{LocalObjectStore, ObjectStore, StoredObject};
pub use workspace::Workspace;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

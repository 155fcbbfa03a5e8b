//! Job pipeline coordination.
//!
//! Drives a job through fetch → detect → install → build → package →
//! publish → notify, short-circuiting to failure notification on the first
//! stage error. The coordinator owns per-job state and never retries a
//! stage; retries exist only at the notification boundary.

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::build::BuildExecutor;
use crate::config::BuilderConfig;
use crate::detect;
use crate::error::StageError;
use crate::exec::{CommandRunner, TokioCommandRunner};
use crate::job::{BuildJob, BuildRequest, JobOutcome, JobResult, JobState, SourceRef};
use crate::notify::{
    CallbackPayload, CallbackTransport, HttpCallbackTransport, Notifier, NotifyOutcome,
};
use crate::package::{self, Packager};
use crate::publish::Publisher;
use crate::source::{HttpGitFetcher, SourceFetcher};
use crate::storage::{LocalObjectStore, ObjectStore};
use crate::workspace::Workspace;

/// Coordinates build jobs. One instance serves the whole process; each job
/// runs on its own task with its own workspace.
pub struct JobPipeline {
    config: BuilderConfig,
    fetcher: Arc<dyn SourceFetcher>,
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn ObjectStore>,
    transport: Arc<dyn CallbackTransport>,
}

impl JobPipeline {
    /// Production wiring: git CLI + reqwest fetcher, tokio process runner,
    /// local object store, reqwest callback transport.
    pub fn new(config: BuilderConfig) -> Self {
        let http = reqwest::Client::new();
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner);
        let fetcher = Arc::new(HttpGitFetcher::new(http.clone(), runner.clone()));
        let store = Arc::new(LocalObjectStore::new(
            config.storage_root.clone(),
            config.public_base_url.clone(),
        ));
        let transport = Arc::new(HttpCallbackTransport::new(http));

        Self {
            config,
            fetcher,
            runner,
            store,
            transport,
        }
    }

    /// Wiring with explicit capabilities, the substitution point for tests.
    pub fn with_capabilities(
        config: BuilderConfig,
        fetcher: Arc<dyn SourceFetcher>,
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn ObjectStore>,
        transport: Arc<dyn CallbackTransport>,
    ) -> Self {
        Self {
            config,
            fetcher,
            runner,
            store,
            transport,
        }
    }

    /// Validates a request and, if acceptable, spawns its job.
    ///
    /// Returns the assigned job id immediately; the caller learns the
    /// terminal outcome through the callback contract.
    pub fn submit(self: &Arc<Self>, request: BuildRequest) -> Result<Uuid, StageError> {
        request.validate()?;

        let job_id = Uuid::new_v4();
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.run(request, job_id).await;
        });
        Ok(job_id)
    }

    /// Runs one job to its terminal outcome.
    ///
    /// An invalid request fails synchronously: no workspace is allocated and
    /// no notification sequence starts. Every other failure path produces
    /// exactly one failure-notification attempt sequence, and the workspace
    /// is reclaimed after the notification attempt resolves.
    pub async fn run(&self, request: BuildRequest, job_id: Uuid) -> JobOutcome {
        let source = match request.validate() {
            Ok(source) => source,
            Err(error) => {
                warn!(%job_id, %error, "request rejected");
                return JobOutcome {
                    job_id,
                    client_id: request.client_id,
                    result: JobResult::Failure { error },
                    delivery: NotifyOutcome::Skipped,
                };
            }
        };

        let branch = request
            .branch
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| self.config.default_branch.clone());

        let mut job = BuildJob::new(
            job_id,
            request.client_id,
            source,
            branch,
            request.callback_url,
        );

        info!(
            job_id = %job.id,
            client_id = %job.client_id,
            source = job.source.url(),
            branch = %job.branch,
            "job accepted"
        );

        let (workspace, staged) = match Workspace::create(&self.config.workspace_root) {
            Ok(workspace) => {
                let staged = self.execute(&mut job, &workspace).await;
                (Some(workspace), staged)
            }
            Err(error) => (None, Err(error)),
        };

        let result = match staged {
            Ok((artifact_name, artifact_url)) => {
                info!(job_id = %job.id, artifact = %artifact_name, "build succeeded");
                JobResult::Success {
                    artifact_name,
                    artifact_url,
                }
            }
            Err(error) => {
                error!(job_id = %job.id, stage = error.stage(), %error, "job failed");
                JobResult::Failure { error }
            }
        };

        job.advance(JobState::Notifying);
        let delivery = match &job.callback_url {
            Some(url) => {
                let payload = CallbackPayload::from_result(job.id, &job.client_id, &result);
                Notifier::new(self.transport.clone(), self.config.retry)
                    .notify(url, &payload)
                    .await
            }
            None => {
                debug!(job_id = %job.id, "no callback URL, skipping notification");
                NotifyOutcome::Skipped
            }
        };

        // Reclamation happens after the notification attempt resolves, on
        // success and failure paths alike.
        if let Some(workspace) = workspace {
            workspace.cleanup();
        }

        JobOutcome {
            job_id: job.id,
            client_id: job.client_id,
            result,
            delivery,
        }
    }

    /// The fetch-through-publish stage sequence. Any error here short-circuits
    /// straight back to `run`, which owns notification and cleanup.
    async fn execute(
        &self,
        job: &mut BuildJob,
        workspace: &Workspace,
    ) -> Result<(String, String), StageError> {
        let deadline = self.config.stage_timeout;
        let timed_out =
            |stage: &str| format!("{} timed out after {}s", stage, deadline.as_secs());

        let fetched = tokio::time::timeout(deadline, async {
            match &job.source {
                SourceRef::Git { url } => {
                    self.fetcher
                        .clone_repo(url, &job.branch, workspace.path())
                        .await
                }
                SourceRef::Archive { url, kind } => {
                    self.fetcher
                        .fetch_archive(url, *kind, workspace.path())
                        .await
                }
            }
        })
        .await;
        match fetched {
            Err(_) => return Err(StageError::Fetch(timed_out("fetch"))),
            Ok(result) => result.map_err(|e| StageError::Fetch(format!("{:#}", e)))?,
        }

        let project_root = workspace.project_root()?;

        job.advance(JobState::Detecting);
        let detection = detect::inspect(&project_root)?;
        info!(
            job_id = %job.id,
            package_manager = %detection.package_manager,
            framework = %detection.framework,
            output_dir = %detection.output_dir.display(),
            "project detected"
        );
        job.package_manager = Some(detection.package_manager);
        job.framework = Some(detection.framework);
        job.output_dir = Some(detection.output_dir.clone());

        let executor = BuildExecutor::new(self.runner.clone());

        job.advance(JobState::Installing);
        match tokio::time::timeout(deadline, executor.install(&project_root, &detection)).await {
            Err(_) => return Err(StageError::Build(timed_out("install"))),
            Ok(result) => result?,
        }

        job.advance(JobState::Building);
        match tokio::time::timeout(deadline, executor.build(&project_root, &detection)).await {
            Err(_) => return Err(StageError::Build(timed_out("build"))),
            Ok(result) => result?,
        }
        let output_path = executor.verify_output(&project_root, &detection)?;

        job.advance(JobState::Packaging);
        let artifact_name = package::artifact_name(&job.client_id, job.id);
        let artifact_path = workspace.path().join(&artifact_name);
        Packager.pack(&output_path, &artifact_path).await?;
        job.artifact_path = Some(artifact_path.clone());

        job.advance(JobState::Publishing);
        let publisher = Publisher::new(
            self.store.clone(),
            self.config.storage_key_prefix.clone(),
            self.config.url_ttl,
        );
        let artifact_url =
            match tokio::time::timeout(deadline, publisher.publish(&artifact_path, &artifact_name))
                .await
            {
                Err(_) => return Err(StageError::Publish(timed_out("publish"))),
                Ok(result) => result?,
            };

        Ok((artifact_name, artifact_url))
    }
}

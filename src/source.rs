//! Source acquisition capability: git checkout and archive download/extract.
//!
//! Normalizes a remote reference into a materialized project directory inside
//! the job's workspace. Checkout is shallow and single-branch; archives are
//! downloaded in full and extracted in a blocking task.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::exec::CommandRunner;
use crate::job::ArchiveKind;

/// Acquires source code into a target directory.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Checks out a single branch at shallow depth into `dest`.
    async fn clone_repo(&self, url: &str, branch: &str, dest: &Path) -> Result<()>;

    /// Downloads an archive and extracts it into `dest`.
    async fn fetch_archive(&self, url: &str, kind: ArchiveKind, dest: &Path) -> Result<()>;
}

/// Production fetcher: `git` CLI for repositories, reqwest for archives.
pub struct HttpGitFetcher {
    http: reqwest::Client,
    runner: Arc<dyn CommandRunner>,
}

impl HttpGitFetcher {
    pub fn new(http: reqwest::Client, runner: Arc<dyn CommandRunner>) -> Self {
        Self { http, runner }
    }
}

#[async_trait]
impl SourceFetcher for HttpGitFetcher {
    async fn clone_repo(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        info!(url, branch, "cloning repository");

        let output = self
            .runner
            .run(
                "git",
                &[
                    "clone",
                    "--depth",
                    "1",
                    "--single-branch",
                    "--branch",
                    branch,
                    url,
                    ".",
                ],
                dest,
            )
            .await
            .context("failed to invoke git")?;

        if !output.success() {
            bail!(
                "git clone exited with status {}: {}",
                output
                    .status
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                output.tail(500)
            );
        }
        Ok(())
    }

    async fn fetch_archive(&self, url: &str, kind: ArchiveKind, dest: &Path) -> Result<()> {
        info!(url, "downloading archive");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("archive download failed for {}", url))?;

        if !response.status().is_success() {
            bail!("archive download failed with HTTP {} from {}", response.status(), url);
        }

        let bytes = response
            .bytes()
            .await
            .context("failed to read archive download body")?;

        if bytes.is_empty() {
            bail!("archive download from {} was empty", url);
        }

        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract(&bytes, kind, &dest))
            .await
            .context("archive extraction task panicked")?
    }
}

fn extract(bytes: &[u8], kind: ArchiveKind, dest: &Path) -> Result<()> {
    match kind {
        ArchiveKind::Zip => {
            let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
                .context("failed to open zip archive (invalid format)")?;
            archive
                .extract(dest)
                .context("failed to extract zip archive")?;
        }
        ArchiveKind::TarGz => {
            let mut archive = tar::Archive::new(GzDecoder::new(bytes));
            archive
                .unpack(dest)
                .context("failed to extract tar.gz archive")?;
        }
    }
    Ok(())
}

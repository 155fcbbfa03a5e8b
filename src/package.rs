//! Artifact packaging: deflate-zip the verified output directory.
//!
//! Entry names are relative to the output directory root, so the archive
//! unpacks to the site itself rather than a wrapping folder.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::CompressionMethod;

use crate::error::StageError;

/// Deterministic artifact name for one job.
///
/// Carries both correlation identifiers: the client id for payload consumers
/// scanning by client, the job id to keep repeated jobs for one client from
/// colliding.
pub fn artifact_name(client_id: &str, job_id: Uuid) -> String {
    format!("shipwright_{}_{}.zip", sanitize(client_id), job_id)
}

/// Restricts a caller-supplied id to a filename-safe alphabet.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub struct Packager;

impl Packager {
    /// Compresses `output_dir` into a zip at `artifact_path`.
    pub async fn pack(&self, output_dir: &Path, artifact_path: &Path) -> Result<(), StageError> {
        let output_dir = output_dir.to_path_buf();
        let artifact_path = artifact_path.to_path_buf();

        let files = tokio::task::spawn_blocking(move || compress_dir(&output_dir, &artifact_path))
            .await
            .map_err(|e| StageError::Packaging(format!("packaging task panicked: {}", e)))?
            .map_err(|e| StageError::Packaging(format!("{:#}", e)))?;

        info!(files, "artifact packaged");
        Ok(())
    }
}

/// Walks `src` and writes every file into a deflate zip at `dest`.
/// Returns the number of files archived.
fn compress_dir(src: &Path, dest: &Path) -> Result<usize> {
    let file = File::create(dest)
        .with_context(|| format!("failed to create artifact {}", dest.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = Vec::new();
    collect_files(src, &mut files).context("failed to walk output directory")?;

    if files.is_empty() {
        bail!("output directory {} contains no files", src.display());
    }

    for path in &files {
        let name = path
            .strip_prefix(src)
            .context("archive entry escaped the output directory")?
            .to_string_lossy()
            .replace('\\', "/");

        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("failed to start archive entry {}", name))?;
        let mut reader = File::open(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        io::copy(&mut reader, &mut writer)
            .with_context(|| format!("failed to compress {}", path.display()))?;
    }

    writer.finish().context("failed to finalize artifact")?;
    Ok(files.len())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

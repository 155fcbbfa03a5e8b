//! Deterministic capability fakes for pipeline tests.
//!
//! No network, no processes: the fakes materialize fixture projects, script
//! command exit codes, record store keys and capture callback payloads.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shipwright::config::RetryPolicy;
use shipwright::exec::CommandOutput;
use shipwright::notify::CallbackPayload;
use shipwright::storage::StoredObject;
use shipwright::{
    ArchiveKind, BuilderConfig, CallbackTransport, CommandRunner, JobPipeline, ObjectStore,
    SourceFetcher,
};

/// Writes a fixture project into the workspace instead of touching the
/// network. `fail_with` simulates an acquisition error instead.
pub struct FakeFetcher {
    /// package.json content; `None` leaves the project without a manifest.
    pub manifest: Option<String>,
    /// Extra empty files (lockfiles) at the project root.
    pub extra_files: Vec<String>,
    /// Materialize the project inside a single wrapping directory.
    pub wrap_dir: Option<String>,
    /// Fail acquisition with this message.
    pub fail_with: Option<String>,
}

impl FakeFetcher {
    pub fn for_manifest(manifest: &str) -> Self {
        Self {
            manifest: Some(manifest.to_string()),
            extra_files: Vec::new(),
            wrap_dir: None,
            fail_with: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            manifest: None,
            extra_files: Vec::new(),
            wrap_dir: None,
            fail_with: Some(message.to_string()),
        }
    }

    fn materialize(&self, dest: &Path) -> Result<()> {
        if let Some(message) = &self.fail_with {
            bail!("{}", message);
        }

        let root = match &self.wrap_dir {
            Some(wrapper) => dest.join(wrapper),
            None => dest.to_path_buf(),
        };
        fs::create_dir_all(&root)?;

        if let Some(manifest) = &self.manifest {
            fs::write(root.join("package.json"), manifest)?;
        }
        for name in &self.extra_files {
            fs::write(root.join(name), "")?;
        }
        fs::create_dir_all(root.join("src"))?;
        fs::write(root.join("src/index.js"), "console.log('hi')")?;
        Ok(())
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn clone_repo(&self, _url: &str, _branch: &str, dest: &Path) -> Result<()> {
        self.materialize(dest)
    }

    async fn fetch_archive(&self, _url: &str, _kind: ArchiveKind, dest: &Path) -> Result<()> {
        self.materialize(dest)
    }
}

/// Scripts install/build exit codes and optionally materializes the build
/// output directory, the way a real `run build` would.
pub struct FakeRunner {
    pub calls: Mutex<Vec<String>>,
    pub install_exit: i32,
    pub build_exit: i32,
    /// Created under the working directory when the build step succeeds.
    pub create_output: Option<PathBuf>,
}

impl FakeRunner {
    pub fn succeeding(output_dir: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            install_exit: 0,
            build_exit: 0,
            create_output: Some(PathBuf::from(output_dir)),
        }
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", program, args.join(" ")));

        let exit = match args {
            ["install"] => self.install_exit,
            ["run", "build"] => {
                if self.build_exit == 0 {
                    if let Some(dir) = &self.create_output {
                        let out = cwd.join(dir);
                        fs::create_dir_all(&out)?;
                        fs::write(out.join("index.html"), "<html></html>")?;
                    }
                }
                self.build_exit
            }
            _ => 0,
        };

        Ok(CommandOutput {
            status: Some(exit),
            stdout: "tool output".to_string(),
            stderr: if exit == 0 {
                String::new()
            } else {
                "ERR! build script blew up".to_string()
            },
        })
    }
}

/// Records uploaded keys and mints predictable URLs.
#[derive(Default)]
pub struct FakeStore {
    pub puts: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put(&self, key: &str, _file: &Path) -> Result<StoredObject> {
        self.puts.lock().unwrap().push(key.to_string());
        Ok(StoredObject {
            key: key.to_string(),
        })
    }

    fn signed_read_url(&self, object: &StoredObject, _ttl: Duration) -> String {
        format!("https://store.example/{}", object.key)
    }
}

/// Captures callback payloads; the first `fail_attempts` posts error out,
/// the rest answer `status_code`.
pub struct FakeTransport {
    pub payloads: Mutex<Vec<CallbackPayload>>,
    pub attempts: AtomicU32,
    pub fail_attempts: u32,
    pub status_code: u16,
}

impl FakeTransport {
    pub fn delivering() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            attempts: AtomicU32::new(0),
            fail_attempts: 0,
            status_code: 200,
        }
    }

    pub fn failing_first(n: u32) -> Self {
        Self {
            fail_attempts: n,
            ..Self::delivering()
        }
    }

    pub fn rejecting_with(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::delivering()
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<CallbackPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackTransport for FakeTransport {
    async fn post(&self, _url: &str, payload: &CallbackPayload) -> Result<u16> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_attempts {
            bail!("connection refused");
        }
        if (200..300).contains(&self.status_code) {
            self.payloads.lock().unwrap().push(payload.clone());
        }
        Ok(self.status_code)
    }
}

/// Config with fast backoff and an isolated workspace root.
pub fn test_config(root: &Path) -> BuilderConfig {
    BuilderConfig {
        workspace_root: root.join("workspaces"),
        storage_root: root.join("store"),
        retry: RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
        },
        stage_timeout: Duration::from_secs(30),
        ..BuilderConfig::default()
    }
}

/// Wires a pipeline from the given fakes.
pub fn pipeline_with(
    config: BuilderConfig,
    fetcher: Arc<FakeFetcher>,
    runner: Arc<FakeRunner>,
    store: Arc<FakeStore>,
    transport: Arc<FakeTransport>,
) -> JobPipeline {
    JobPipeline::with_capabilities(config, fetcher, runner, store, transport)
}

//! Project inspection: package manager and framework/output-directory policy.
//!
//! Both detections are deterministic functions of the project root, resolved
//! exactly once before any build command runs and never re-evaluated
//! mid-build. The framework mapping is a fixed-priority decision table
//! ([`FRAMEWORK_RULES`]) kept as data so new entries never touch the
//! coordinator.

use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StageError;

/// Supported Node.js package managers, selected by lockfile presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    /// The executable invoked for install/build steps.
    pub fn command(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Frameworks the decision table recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    Next,
    Vue,
    React,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Framework::Next => "next",
            Framework::Vue => "vue",
            Framework::React => "react",
        };
        f.write_str(name)
    }
}

/// One row of the framework decision table.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkRule {
    /// Manifest dependency that selects this row.
    pub dependency: &'static str,
    pub framework: Framework,
    /// Output directory, relative to the project root.
    pub output_dir: &'static str,
    /// Preferred directory used instead of `output_dir` when it already
    /// exists at detection time (Next.js static export).
    pub preferred_output_dir: Option<&'static str>,
    /// Whether a tolerated `run export` step follows the build.
    pub export_step: bool,
}

/// The canonical decision table, evaluated top to bottom; first match wins.
pub const FRAMEWORK_RULES: &[FrameworkRule] = &[
    FrameworkRule {
        dependency: "next",
        framework: Framework::Next,
        output_dir: ".next",
        preferred_output_dir: Some("out"),
        export_step: true,
    },
    FrameworkRule {
        dependency: "vue",
        framework: Framework::Vue,
        output_dir: "dist",
        preferred_output_dir: None,
        export_step: false,
    },
    FrameworkRule {
        dependency: "react",
        framework: Framework::React,
        output_dir: "build",
        preferred_output_dir: None,
        export_step: false,
    },
];

/// Everything the build executor needs, resolved once per job.
#[derive(Debug, Clone)]
pub struct Detection {
    pub package_manager: PackageManager,
    pub framework: Framework,
    /// Relative to the project root.
    pub output_dir: PathBuf,
    pub export_step: bool,
}

/// Selects a package manager from lockfile presence, in fixed priority order.
/// Pure function of file presence; manifest contents are irrelevant.
pub fn detect_package_manager(root: &Path) -> PackageManager {
    if root.join("yarn.lock").exists() {
        PackageManager::Yarn
    } else if root.join("pnpm-lock.yaml").exists() {
        PackageManager::Pnpm
    } else {
        PackageManager::Npm
    }
}

/// Inspects the project root: package manager, framework, output directory.
pub fn inspect(root: &Path) -> Result<Detection, StageError> {
    let package_manager = detect_package_manager(root);

    let manifest_path = root.join("package.json");
    if !manifest_path.is_file() {
        return Err(StageError::Detection(format!(
            "no package.json manifest found in {}",
            root.display()
        )));
    }

    let raw = fs::read_to_string(&manifest_path)
        .map_err(|e| StageError::Detection(format!("failed to read package.json: {}", e)))?;
    let manifest: Value = serde_json::from_str(&raw)
        .map_err(|e| StageError::Detection(format!("failed to parse package.json: {}", e)))?;

    let empty = serde_json::Map::new();
    let dependencies = manifest
        .get("dependencies")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let rule = FRAMEWORK_RULES
        .iter()
        .find(|rule| dependencies.contains_key(rule.dependency))
        .ok_or_else(|| {
            StageError::Detection(
                "unsupported framework: no known framework dependency in package.json".to_string(),
            )
        })?;

    let output_dir = match rule.preferred_output_dir {
        Some(preferred) if root.join(preferred).exists() => PathBuf::from(preferred),
        _ => PathBuf::from(rule.output_dir),
    };

    debug!(
        package_manager = %package_manager,
        framework = %rule.framework,
        output_dir = %output_dir.display(),
        "project inspected"
    );

    Ok(Detection {
        package_manager,
        framework: rule.framework,
        output_dir,
        export_step: rule.export_step,
    })
}

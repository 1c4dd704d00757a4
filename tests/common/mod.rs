//! Shared fixtures: a scratch BatCave project and a recording tool stub.

#![allow(dead_code)]

use batcave_cicd::cli::RuntimeConfig;
use batcave_cicd::config::Settings;
use batcave_cicd::error::{CliError, Result};
use batcave_cicd::github::{ReleaseHost, ReleaseRecord};
use batcave_cicd::pipeline::{Action, ActionSelection, DispatchOutcome, Dispatcher};
use batcave_cicd::platform::host_for;
use batcave_cicd::process::{Invocation, ToolRunner};
use batcave_cicd::version::{VersionIdentifier, VersionStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const STARTING_VERSION: &str = "39.1.0rc3";

/// Minimal BatCave checkout with a bumpver record and a `__version__` mirror
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self::in_dir(TempDir::new().expect("Failed to create temp dir"))
    }

    /// Project created under the current directory, for relative-root runs
    pub fn new_in_cwd() -> Self {
        Self::in_dir(TempDir::new_in(".").expect("Failed to create temp dir"))
    }

    fn in_dir(dir: TempDir) -> Self {
        fs::write(
            dir.path().join("pyproject.toml"),
            format!(
                r#"[project]
name = "BatCave"
dynamic = ["version"]

[tool.bumpver]
current_version = "v{STARTING_VERSION}"
commit = true
"#
            ),
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("batcave")).unwrap();
        fs::write(
            dir.path().join("batcave/__init__.py"),
            format!("\"\"\"BatCave\"\"\"\n\n__version__ = '{STARTING_VERSION}'\n"),
        )
        .unwrap();
        Self { dir }
    }

    /// Project with an artifact set already built
    pub fn with_artifacts() -> Self {
        let project = Self::new();
        let dist = project.root().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("batcave-39.1.0rc3-py3-none-any.whl"), b"wheel").unwrap();
        fs::write(dist.join("batcave-39.1.0rc3.tar.gz"), b"sdist").unwrap();
        project
    }

    /// Path of the project relative to the current directory
    pub fn relative_root(&self) -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        self.root().strip_prefix(&cwd).unwrap().to_path_buf()
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn settings(&self) -> Settings {
        Settings::for_project(self.root(), "batcave")
    }

    pub fn version(&self) -> VersionIdentifier {
        let settings = self.settings();
        VersionStore::new(settings.version_file, settings.version_mirrors)
            .load()
            .unwrap()
            .version
    }

    pub fn mirror(&self) -> String {
        fs::read_to_string(self.root().join("batcave/__init__.py")).unwrap()
    }
}

/// Records every tool invocation and release-host call in order.
///
/// Creating a venv writes `pyvenv.cfg`; `python -m build --outdir D` writes a
/// wheel into `D`. With `fail_at` set, the call at that index fails. Captured
/// output comes from the first `with_output` needle the call contains, else
/// an empty package list for `--format=json` and nothing otherwise.
#[derive(Debug, Default)]
pub struct FakeTools {
    calls: Mutex<Vec<String>>,
    fail_at: Option<usize>,
    outputs: Vec<(String, String)>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, needle: &str, output: &str) -> Self {
        self.outputs.push((needle.to_string(), output.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, needle: &str) -> bool {
        self.calls().iter().any(|c| c.contains(needle))
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.contains(needle))
    }

    fn record(&self, call: String) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(call.clone());
        if self.fail_at == Some(index) {
            return Err(CliError::ExecutionFailed {
                command: call,
                reason: "exit status: 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn arg_after(invocation: &Invocation, flag: &str) -> Option<PathBuf> {
    invocation
        .args
        .iter()
        .position(|a| a == flag)
        .and_then(|i| invocation.args.get(i + 1))
        .map(PathBuf::from)
}

impl ToolRunner for FakeTools {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        self.record(invocation.to_string())?;

        let module = arg_after(invocation, "-m");
        if module.as_deref() == Some(Path::new("venv")) {
            let target = PathBuf::from(invocation.args.last().unwrap());
            fs::create_dir_all(&target)?;
            fs::write(target.join("pyvenv.cfg"), "home = /usr/bin\n")?;
        } else if module.as_deref() == Some(Path::new("build")) {
            let outdir = arg_after(invocation, "--outdir").unwrap();
            fs::create_dir_all(&outdir)?;
            fs::write(outdir.join("batcave-0.0.0-py3-none-any.whl"), b"wheel")?;
        }
        Ok(())
    }

    async fn capture(&self, invocation: &Invocation) -> Result<String> {
        let call = invocation.to_string();
        self.record(call.clone())?;

        let canned = self
            .outputs
            .iter()
            .find(|(needle, _)| call.contains(needle.as_str()))
            .map(|(_, output)| output.clone());
        Ok(canned.unwrap_or_else(|| {
            if call.contains("--format=json") {
                "[]".to_string()
            } else {
                String::new()
            }
        }))
    }
}

impl ReleaseHost for FakeTools {
    async fn create_release(&self, version: &VersionIdentifier) -> Result<ReleaseRecord> {
        self.record(format!("release create {}", version.tag_name()))?;
        Ok(ReleaseRecord {
            release_id: 42,
            html_url: format!(
                "https://github.com/tardis4500/batcave/releases/tag/{}",
                version.tag_name()
            ),
            tag_name: version.tag_name(),
        })
    }

    async fn delete_release(&self, version: &VersionIdentifier) -> Result<()> {
        self.record(format!("release delete {}", version.tag_name()))
    }
}

/// Dispatch `action` against `settings` with `tools` standing in for every collaborator
pub async fn run_action(
    settings: &Settings,
    tools: &FakeTools,
    action: Action,
) -> Result<DispatchOutcome> {
    dispatch(settings, tools, &ActionSelection::Known(action)).await
}

pub async fn dispatch(
    settings: &Settings,
    tools: &FakeTools,
    selection: &ActionSelection,
) -> Result<DispatchOutcome> {
    let platform = host_for("linux")?;
    let config = RuntimeConfig::new(true);
    let dispatcher = Dispatcher::new(settings, platform.as_ref(), tools, Some(tools), &config);
    dispatcher.dispatch(selection).await
}

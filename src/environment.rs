//! Isolated Python environment preparation.
//!
//! A run owns exactly one virtual environment. It is created on first use and
//! reused afterwards; activation is expressed as an environment-variable
//! overlay that every later invocation carries.

use crate::error::{EnvironmentError, Result};
use crate::platform::HostPlatform;
use crate::process::{Invocation, ToolRunner};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Tooling upgraded before dependencies are installed
const BOOTSTRAP_PACKAGES: &[&str] = &["pip", "setuptools", "wheel", "build"];

/// An activated virtual environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    root: PathBuf,
    scripts_dir: PathBuf,
    python: PathBuf,
    overlay: Vec<(OsString, OsString)>,
}

impl Environment {
    /// Environment root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the environment's executables
    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Interpreter inside the environment
    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Whether the environment's variables are applied to invocations
    pub fn is_active(&self) -> bool {
        !self.overlay.is_empty()
    }

    /// Apply the activation overlay to an invocation
    pub fn activate(&self, mut invocation: Invocation) -> Invocation {
        invocation.env.extend(self.overlay.iter().cloned());
        invocation
    }

    /// `python -m <module> <args...>` inside the environment
    pub fn python_module<I, S>(&self, module: &str, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.activate(
            Invocation::new(&self.python)
                .arg("-m")
                .arg(module)
                .args(args),
        )
    }

    fn activated(root: &Path, platform: &dyn HostPlatform) -> Self {
        let scripts_dir = platform.scripts_dir(root);
        let python = platform.venv_python(root);

        let mut path = OsString::from(scripts_dir.as_os_str());
        if let Some(existing) = std::env::var_os("PATH")
            && !existing.is_empty()
        {
            path.push(platform.path_separator().to_string());
            path.push(existing);
        }

        let overlay = vec![
            (OsString::from("VIRTUAL_ENV"), root.as_os_str().to_owned()),
            (OsString::from("PATH"), path),
        ];

        Self {
            root: root.to_path_buf(),
            scripts_dir,
            python,
            overlay,
        }
    }
}

/// Creates and activates the run's virtual environment
pub struct EnvironmentPreparer<'a, R> {
    platform: &'a dyn HostPlatform,
    runner: R,
    project_root: PathBuf,
    requirements: Vec<PathBuf>,
}

impl<'a, R: ToolRunner> EnvironmentPreparer<'a, R> {
    /// Create a preparer
    pub fn new(
        platform: &'a dyn HostPlatform,
        runner: R,
        project_root: impl Into<PathBuf>,
        requirements: Vec<PathBuf>,
    ) -> Self {
        Self {
            platform,
            runner,
            project_root: project_root.into(),
            requirements,
        }
    }

    /// Whether `path` already holds a virtual environment
    pub fn exists(path: &Path) -> bool {
        path.join("pyvenv.cfg").is_file()
    }

    /// Ensure an environment exists at `path` and return it activated.
    ///
    /// With `skip_dependencies` set only creation and activation happen.
    pub async fn prepare(&self, path: &Path, skip_dependencies: bool) -> Result<Environment> {
        if Self::exists(path) {
            log::info!("Reusing virtual environment at {}", path.display());
        } else {
            log::info!("Creating virtual environment at {}", path.display());
            let create = Invocation::new(self.platform.base_python())
                .args(["-m", "venv"])
                .arg(path.as_os_str())
                .current_dir(&self.project_root);
            self.runner.run(&create).await.map_err(|e| EnvironmentError::CreateFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let env = Environment::activated(path, self.platform);
        if skip_dependencies {
            log::debug!("Skipping dependency installation");
            return Ok(env);
        }

        let upgrade = env
            .python_module("pip", ["install", "--upgrade"])
            .args(BOOTSTRAP_PACKAGES.iter().copied())
            .current_dir(&self.project_root);
        self.runner.run(&upgrade).await?;

        for requirements in self.existing_requirements() {
            log::info!("Installing {}", requirements.display());
            let install = env
                .python_module("pip", ["install", "--upgrade", "-r"])
                .arg(requirements.as_os_str())
                .current_dir(&self.project_root);
            self.runner.run(&install).await?;
        }

        Ok(env)
    }

    fn existing_requirements(&self) -> Vec<PathBuf> {
        self.requirements
            .iter()
            .map(|r| self.project_root.join(r))
            .filter(|r| r.is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::host_for;

    #[test]
    fn test_activation_overlay_points_into_venv() {
        let host = host_for("linux").unwrap();
        let env = Environment::activated(Path::new("/tmp/venv"), host.as_ref());
        assert!(env.is_active());
        assert_eq!(env.python(), Path::new("/tmp/venv/bin/python"));

        let inv = env.python_module("mypy", ["batcave"]);
        let virtual_env = inv
            .env
            .iter()
            .find(|(k, _)| k == "VIRTUAL_ENV")
            .map(|(_, v)| v.clone());
        assert_eq!(virtual_env, Some(OsString::from("/tmp/venv")));

        let path = inv.env.iter().find(|(k, _)| k == "PATH").unwrap();
        assert!(path.1.to_string_lossy().starts_with("/tmp/venv/bin"));
    }
}

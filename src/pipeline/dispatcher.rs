//! Action dispatch: prepare the environment, then run a recipe step by step.
//!
//! Steps run strictly in order and the first failure ends the run. Nothing
//! after a failed step executes, so a failed build never reaches a version
//! bump and a failed bump never reaches the release host.

use crate::cli::RuntimeConfig;
use crate::config::Settings;
use crate::environment::{Environment, EnvironmentPreparer};
use crate::error::{CliError, EnvironmentError, PublishError, Result};
use crate::git::GitRepository;
use crate::github::ReleaseHost;
use crate::pipeline::freeze;
use crate::pipeline::{Action, ActionSelection, Linter, OutputDir, Step, UnknownActionPolicy, recipe};
use crate::platform::HostPlatform;
use crate::process::{Invocation, ToolRunner};
use crate::release::{BumpMode, BumpOutcome, VersionCoordinator};
use crate::state::{ReleasePhase, ReleaseState, StateManager};
use crate::version::{VersionBump, VersionIdentifier, VersionStore};
use std::path::{Path, PathBuf};

/// How a dispatch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every step of the action's recipe succeeded
    Completed {
        /// Action that ran
        action: Action,
        /// Number of steps executed
        steps: usize,
    },
    /// Identifier without a recipe, ignored by policy
    Ignored {
        /// Identifier as given
        identifier: String,
    },
}

/// Mutable state carried between the steps of one run
#[derive(Debug, Default)]
struct RunContext {
    environment: Option<Environment>,
    release: Option<ReleaseState>,
}

impl RunContext {
    fn environment(&self, step: Step) -> Result<&Environment> {
        self.environment.as_ref().ok_or_else(|| {
            CliError::ExecutionFailed {
                command: step.to_string(),
                reason: "no virtual environment is active".to_string(),
            }
            .into()
        })
    }
}

/// Runs actions against one project
pub struct Dispatcher<'a, R, H> {
    settings: &'a Settings,
    platform: &'a dyn HostPlatform,
    runner: R,
    host: Option<H>,
    config: &'a RuntimeConfig,
}

impl<'a, R: ToolRunner, H: ReleaseHost> Dispatcher<'a, R, H> {
    /// Create a dispatcher. `host` is only needed by recipes that touch release records.
    pub fn new(
        settings: &'a Settings,
        platform: &'a dyn HostPlatform,
        runner: R,
        host: Option<H>,
        config: &'a RuntimeConfig,
    ) -> Self {
        Self {
            settings,
            platform,
            runner,
            host,
            config,
        }
    }

    /// Dispatch an identifier according to the unknown-action policy
    pub async fn dispatch(&self, selection: &ActionSelection) -> Result<DispatchOutcome> {
        match selection {
            ActionSelection::Known(action) => self.run_action(*action).await,
            ActionSelection::Unknown(identifier) => match self.settings.unknown_action {
                UnknownActionPolicy::Error => Err(CliError::UnknownAction {
                    action: identifier.clone(),
                }
                .into()),
                UnknownActionPolicy::Ignore => {
                    log::warn!("Ignoring unknown action '{}'", identifier);
                    self.config
                        .warning_println(&format!("Unknown action '{}' ignored", identifier));
                    Ok(DispatchOutcome::Ignored {
                        identifier: identifier.clone(),
                    })
                }
            },
        }
    }

    /// Prepare the environment and run every step of `action`'s recipe
    pub async fn run_action(&self, action: Action) -> Result<DispatchOutcome> {
        let steps = recipe(action);
        self.preflight(steps)?;

        self.config.section(&format!("batcave_cicd {}", action));
        let mut ctx = RunContext::default();

        if action.needs_environment() {
            let preparer = EnvironmentPreparer::new(
                self.platform,
                &self.runner,
                &self.settings.project_root,
                self.settings.requirements.clone(),
            );
            let env = if action.needs_fresh_environment() {
                let fresh = &self.settings.install_test_venv_dir;
                if fresh.exists() {
                    log::debug!("Discarding previous environment {}", fresh.display());
                    std::fs::remove_dir_all(fresh)?;
                }
                preparer.prepare(fresh, true).await?
            } else {
                preparer
                    .prepare(&self.settings.venv_dir, action.skips_environment_setup())
                    .await?
            };
            self.config
                .info_println(&format!("Environment: {}", env.root().display()));
            ctx.environment = Some(env);
        }

        if action == Action::Publish {
            let starting = self.version_store().load()?.version;
            ctx.release = Some(ReleaseState::new(starting));
        }

        for (index, step) in steps.iter().enumerate() {
            self.config.step_println(index + 1, steps.len(), &step.to_string());
            if let Err(e) = self.run_step(*step, &mut ctx).await {
                log::error!("Step '{}' of '{}' failed: {}", step, action, e);
                return Err(e);
            }
        }

        self.config
            .success_println(&format!("{} completed ({} steps)", action, steps.len()));
        Ok(DispatchOutcome::Completed {
            action,
            steps: steps.len(),
        })
    }

    /// Reject a recipe that cannot finish before any of it runs
    fn preflight(&self, steps: &[Step]) -> Result<()> {
        if self.host.is_none() && steps.iter().any(|s| s.needs_release_host()) {
            return Err(PublishError::NotConfigured {
                reason: "no repository or token for release records".to_string(),
            }
            .into());
        }
        if steps.contains(&Step::DeleteRelease) {
            self.release_version()?;
        }
        Ok(())
    }

    async fn run_step(&self, step: Step, ctx: &mut RunContext) -> Result<()> {
        let settings = self.settings;
        match step {
            Step::RequireArtifacts => {
                let artifacts = self.artifact_set()?;
                self.config
                    .indent(&format!("{} artifact(s) in {}", artifacts.len(), settings.artifacts_dir.display()));
                Ok(())
            }
            Step::RemakeDir(dir) => remake_dir(self.output_dir(dir)),
            Step::Lint(linter) => {
                let env = ctx.environment(step)?;
                self.run(env.python_module(linter.module(), lint_args(linter, &settings.package)))
                    .await
            }
            Step::UnitTests => {
                let env = ctx.environment(step)?;
                let inv = env
                    .python_module("xmlrunner", ["discover", "-s", "tests", "-o"])
                    .arg(settings.unit_test_dir.as_os_str());
                self.run(inv).await
            }
            Step::BuildArtifacts => {
                let env = ctx.environment(step)?;
                let inv = env
                    .python_module("build", ["--outdir"])
                    .arg(settings.artifacts_dir.as_os_str());
                self.run(inv).await?;
                let artifacts = self.artifact_set()?;
                for artifact in &artifacts {
                    self.config.indent(&artifact.display().to_string());
                }
                Ok(())
            }
            Step::InstallArtifacts => {
                let env = ctx.environment(step)?;
                let artifacts = self.artifact_set()?;
                let wheels: Vec<&PathBuf> = artifacts
                    .iter()
                    .filter(|p| p.extension().is_some_and(|e| e == "whl"))
                    .collect();
                let targets: Vec<&PathBuf> = if wheels.is_empty() {
                    artifacts.iter().collect()
                } else {
                    wheels
                };
                let inv = env
                    .python_module("pip", ["install", "--force-reinstall"])
                    .args(targets.into_iter().map(|p| p.as_os_str().to_owned()));
                self.run(inv).await
            }
            Step::SmokeTest => {
                let env = ctx.environment(step)?;
                // outside the source tree, so the installed copy is the one imported
                let inv = env
                    .activate(Invocation::new(env.python()).arg("-c").arg(&settings.smoke_command))
                    .current_dir(&settings.artifacts_dir);
                self.runner.run(&inv).await
            }
            Step::Bump(bump, mode) => {
                let outcome = self.bump(bump, mode).await?;
                self.config.success_println(&format!(
                    "Version v{} → v{}",
                    outcome.previous, outcome.current
                ));
                if let Some(state) = ctx.release.as_mut() {
                    let data = serde_json::json!({ "version": outcome.current.to_string() });
                    match bump {
                        VersionBump::Final => {
                            state.final_version = Some(outcome.current.clone());
                            state.advance(ReleasePhase::TaggedFinal, Some(data))?;
                        }
                        VersionBump::NextPrerelease => {
                            state.next_version = Some(outcome.current.clone());
                            state.advance(ReleasePhase::NextDraft, Some(data))?;
                        }
                        VersionBump::PrereleaseNum => return Ok(()),
                    }
                    self.state_manager().save_state(state)?;
                }
                Ok(())
            }
            Step::CreateRelease => {
                let host = self.host()?;
                let version = match ctx.release.as_ref().and_then(|s| s.final_version.clone()) {
                    Some(version) => version,
                    None => self.version_store().load()?.version,
                };
                if version.is_prerelease() {
                    return Err(PublishError::NotFinal {
                        version: version.to_string(),
                    }
                    .into());
                }

                let record = host.create_release(&version).await?;
                self.config
                    .success_println(&format!("Created release {}", record.html_url));
                if let Some(state) = ctx.release.as_mut() {
                    state.release_url = Some(record.html_url.clone());
                    state.advance(
                        ReleasePhase::Released,
                        Some(serde_json::json!({
                            "release_id": record.release_id,
                            "tag_name": record.tag_name,
                        })),
                    )?;
                    self.state_manager().save_state(state)?;
                }
                Ok(())
            }
            Step::Upload => {
                let env = ctx.environment(step)?;
                let artifacts = self.artifact_set()?;
                let inv = env
                    .python_module("twine", ["upload", "--non-interactive", "--repository-url"])
                    .arg(settings.package_index.repository_url())
                    .args(artifacts.iter().map(|p| p.as_os_str().to_owned()));
                self.run(inv).await
            }
            Step::DeleteRelease => {
                let version = self.release_version()?;
                self.host()?.delete_release(&version).await?;
                self.config
                    .success_println(&format!("Deleted release {}", version.tag_name()));
                Ok(())
            }
            Step::ShowStatus => self.show_status(),
            Step::Freeze => self.freeze(ctx.environment(step)?).await,
        }
    }

    /// Reduce the environment to the runtime requirements and pin them
    async fn freeze(&self, env: &Environment) -> Result<()> {
        let settings = self.settings;
        let requirements_file = settings.project_root.join(
            settings
                .requirements
                .first()
                .cloned()
                .unwrap_or_else(|| "requirements.txt".into()),
        );
        if !requirements_file.is_file() {
            return Err(EnvironmentError::MissingRequirements {
                path: requirements_file,
            }
            .into());
        }
        let requirements = std::fs::read_to_string(&requirements_file)?;

        let listing = self
            .capture(env.python_module("pip", ["list", "--format=json"]))
            .await?;
        let dev = freeze::dev_packages(&listing, &requirements)?;
        if dev.is_empty() {
            self.config.indent("No development packages installed");
        } else {
            self.config
                .indent(&format!("Uninstalling {} development package(s)", dev.len()));
            self.run(env.python_module("pip", ["uninstall", "-y"]).args(dev))
                .await?;
        }

        let reinstall = env
            .python_module("pip", ["install", "--upgrade", "--upgrade-strategy", "eager", "-r"])
            .arg(requirements_file.as_os_str());
        self.run(reinstall).await?;

        let frozen = self.capture(env.python_module("pip", ["freeze"])).await?;
        std::fs::write(&settings.freeze_file, freeze::add_platform_markers(&frozen))?;
        self.config
            .success_println(&format!("Wrote {}", settings.freeze_file.display()));
        Ok(())
    }

    async fn run(&self, invocation: Invocation) -> Result<()> {
        let invocation = invocation.current_dir(&self.settings.project_root);
        self.config.indent(&format!("$ {}", invocation));
        self.runner.run(&invocation).await
    }

    async fn capture(&self, invocation: Invocation) -> Result<String> {
        let invocation = invocation.current_dir(&self.settings.project_root);
        self.config.indent(&format!("$ {}", invocation));
        self.runner.capture(&invocation).await
    }

    async fn bump(&self, bump: VersionBump, mode: BumpMode) -> Result<BumpOutcome> {
        let git = GitRepository::new(
            self.settings.project_root.clone(),
            &self.runner,
            self.settings.git.clone(),
        );
        let coordinator =
            VersionCoordinator::new(self.version_store(), git, self.settings.prerelease_tag.clone());
        coordinator.bump(bump, mode).await
    }

    fn show_status(&self) -> Result<()> {
        let record = self.version_store().load()?;
        let kind = if record.version.is_prerelease() {
            "pre-release"
        } else {
            "final"
        };
        self.config
            .println(&format!("Version: v{} ({})", record.version, kind));

        match self.state_manager().load_state()? {
            Some(state) => {
                state.validate()?;
                self.config.println(&state.summary());
            }
            None => self.config.println("No release in progress or recorded"),
        }
        Ok(())
    }

    fn host(&self) -> Result<&H> {
        self.host.as_ref().ok_or_else(|| {
            PublishError::NotConfigured {
                reason: "no repository or token for release records".to_string(),
            }
            .into()
        })
    }

    fn release_version(&self) -> Result<VersionIdentifier> {
        let raw = self
            .settings
            .release_version
            .as_deref()
            .ok_or_else(|| CliError::MissingArgument {
                argument: "--release-version".to_string(),
            })?;
        let version = raw
            .parse::<VersionIdentifier>()
            .map_err(|e| CliError::InvalidArguments {
                reason: e.to_string(),
            })?;
        Ok(version)
    }

    fn version_store(&self) -> VersionStore {
        VersionStore::new(
            self.settings.version_file.clone(),
            self.settings.version_mirrors.clone(),
        )
    }

    fn state_manager(&self) -> StateManager {
        StateManager::new(&self.settings.state_file)
    }

    fn output_dir(&self, dir: OutputDir) -> &Path {
        match dir {
            OutputDir::Artifacts => &self.settings.artifacts_dir,
            OutputDir::UnitTestResults => &self.settings.unit_test_dir,
        }
    }

    /// Wheels and source distributions in the artifacts directory, sorted
    fn artifact_set(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.settings.artifacts_dir;
        let mut artifacts = Vec::new();
        for pattern in ["*.whl", "*.tar.gz"] {
            let pattern = dir.join(pattern);
            let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| {
                CliError::InvalidArguments {
                    reason: format!("bad artifacts directory {}: {}", dir.display(), e),
                }
            })?;
            artifacts.extend(entries.filter_map(|entry| entry.ok()));
        }

        if artifacts.is_empty() {
            return Err(PublishError::MissingArtifacts { dir: dir.clone() }.into());
        }
        artifacts.sort();
        Ok(artifacts)
    }
}

fn lint_args(linter: Linter, package: &str) -> Vec<String> {
    match linter {
        Linter::Pylint | Linter::Flake8 => vec![package.to_string()],
        Linter::Mypy => vec!["--package".to_string(), package.to_string()],
    }
}

/// Remove `path` if present and create it empty
fn remake_dir(path: &Path) -> Result<()> {
    if path.exists() {
        log::debug!("Removing {}", path.display());
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remake_dir_clears_contents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("dist");
        std::fs::create_dir_all(target.join("nested")).unwrap();
        std::fs::write(target.join("stale-0.1.0.whl"), b"old").unwrap();

        remake_dir(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_remake_dir_creates_missing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("build/unit_test_results");
        remake_dir(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_mypy_targets_package() {
        assert_eq!(lint_args(Linter::Mypy, "batcave"), vec!["--package", "batcave"]);
        assert_eq!(lint_args(Linter::Pylint, "batcave"), vec!["batcave"]);
    }
}

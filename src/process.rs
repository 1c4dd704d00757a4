//! External tool invocation.
//!
//! Every external program the pipeline touches (interpreters, linters, git,
//! twine) is described as an [`Invocation`] and handed to a [`ToolRunner`].
//! The production runner spawns the process with inherited stdio and turns a
//! non-zero exit status into an error. [`ToolRunner::capture`] is the same but
//! collects stdout for commands whose output the pipeline parses.

use crate::error::{CliError, EnvironmentError, Result};
use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path
    pub program: PathBuf,
    /// Arguments
    pub args: Vec<OsString>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(OsString, OsString)>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program file name without directories
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program_name())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs external commands
pub trait ToolRunner {
    /// Run the command to completion, failing on a non-zero exit status
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<()>>;

    /// Run the command to completion and return its standard output
    fn capture(&self, invocation: &Invocation) -> impl Future<Output = Result<String>>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<()>> {
        (**self).run(invocation)
    }

    fn capture(&self, invocation: &Invocation) -> impl Future<Output = Result<String>> {
        (**self).capture(invocation)
    }
}

/// Spawns real processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a process runner
    pub fn new() -> Self {
        Self
    }

    fn resolve(&self, invocation: &Invocation) -> Result<PathBuf> {
        if invocation.program.components().count() > 1 {
            return Ok(invocation.program.clone());
        }

        let search_path = invocation
            .env
            .iter()
            .find(|(k, _)| k == "PATH")
            .map(|(_, v)| v.clone())
            .or_else(|| std::env::var_os("PATH"));
        let cwd = match &invocation.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        which::which_in(&invocation.program, search_path, cwd).map_err(|_| {
            EnvironmentError::ToolNotFound {
                tool: invocation.program_name(),
            }
            .into()
        })
    }

    fn command(&self, invocation: &Invocation) -> Result<tokio::process::Command> {
        let program = self.resolve(invocation)?;
        log::debug!("Running: {}", invocation);

        let mut command = tokio::process::Command::new(&program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        Ok(command)
    }
}

fn spawn_failed(invocation: &Invocation, e: std::io::Error) -> CliError {
    CliError::ExecutionFailed {
        command: invocation.to_string(),
        reason: e.to_string(),
    }
}

fn check_status(invocation: &Invocation, status: std::process::ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(CliError::ExecutionFailed {
        command: invocation.to_string(),
        reason: match status.code() {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        },
    }
    .into())
}

impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        let status = self
            .command(invocation)?
            .status()
            .await
            .map_err(|e| spawn_failed(invocation, e))?;
        check_status(invocation, status)
    }

    async fn capture(&self, invocation: &Invocation) -> Result<String> {
        let output = self
            .command(invocation)?
            .stderr(std::process::Stdio::inherit())
            .output()
            .await
            .map_err(|e| spawn_failed(invocation, e))?;
        check_status(invocation, output.status)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

//! Host platform detection and capability queries.
//!
//! The host is resolved once at startup; everything that differs between
//! operating systems (interpreter name, virtual environment layout, PATH
//! separator) is answered by the resolved [`HostPlatform`].

use crate::error::{EnvironmentError, Result};
use std::path::{Path, PathBuf};

/// Capabilities that vary by host operating system
pub trait HostPlatform: std::fmt::Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Interpreter used to create virtual environments
    fn base_python(&self) -> &'static str;

    /// Directory inside a virtual environment holding its executables
    fn scripts_dir(&self, venv: &Path) -> PathBuf;

    /// Suffix appended to executable names
    fn exe_suffix(&self) -> &'static str {
        ""
    }

    /// Separator between PATH entries
    fn path_separator(&self) -> char {
        ':'
    }

    /// Interpreter inside a virtual environment
    fn venv_python(&self, venv: &Path) -> PathBuf {
        self.scripts_dir(venv)
            .join(format!("python{}", self.exe_suffix()))
    }
}

/// Linux and macOS hosts
#[derive(Debug, Clone, Copy)]
pub struct UnixHost {
    name: &'static str,
}

impl HostPlatform for UnixHost {
    fn name(&self) -> &'static str {
        self.name
    }

    fn base_python(&self) -> &'static str {
        "python3"
    }

    fn scripts_dir(&self, venv: &Path) -> PathBuf {
        venv.join("bin")
    }
}

/// Windows hosts
#[derive(Debug, Clone, Copy)]
pub struct WindowsHost;

impl HostPlatform for WindowsHost {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn base_python(&self) -> &'static str {
        "python"
    }

    fn scripts_dir(&self, venv: &Path) -> PathBuf {
        venv.join("Scripts")
    }

    fn exe_suffix(&self) -> &'static str {
        ".exe"
    }

    fn path_separator(&self) -> char {
        ';'
    }
}

/// Resolve a host from an OS name as reported by `std::env::consts::OS`
pub fn host_for(os: &str) -> Result<Box<dyn HostPlatform>> {
    match os {
        "linux" => Ok(Box::new(UnixHost { name: "linux" })),
        "macos" => Ok(Box::new(UnixHost { name: "macos" })),
        "windows" => Ok(Box::new(WindowsHost)),
        other => Err(EnvironmentError::UnsupportedPlatform {
            os: other.to_string(),
        }
        .into()),
    }
}

/// Resolve the host this process runs on
pub fn detect() -> Result<Box<dyn HostPlatform>> {
    let host = host_for(std::env::consts::OS)?;
    log::debug!("Detected host platform: {}", host.name());
    Ok(host)
}

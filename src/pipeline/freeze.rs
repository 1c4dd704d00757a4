//! Pinned runtime requirements.
//!
//! `freeze` strips the development tools out of the environment, reinstalls
//! the runtime requirements at their newest versions and records what pip
//! ends up with. The helpers here are the pure parts of that sequence.

use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Packages kept even when no requirements file names them
const ALWAYS_KEPT: &[&str] = &["pip", "setuptools"];

/// Name fragments of platform packages that must never be uninstalled
const PROTECTED_FRAGMENTS: &[&str] = &["PyQt5", "pywin32"];

/// One entry of `pip list --format=json`
#[derive(Debug, Deserialize)]
struct InstalledPackage {
    name: String,
}

/// Normalized distribution name of a requirements line, if it names one.
///
/// Environment markers, extras and version specifiers are dropped; case, `_`
/// and `.` are folded so `Foo_Bar` and `foo-bar` compare equal.
pub fn requirement_name(line: &str) -> Option<String> {
    let line = line.split('#').next().unwrap_or_default();
    let spec = line.split(';').next().unwrap_or_default().trim();
    if spec.is_empty() || spec.starts_with('-') {
        return None;
    }
    let end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(spec.len());
    let name = &spec[..end];
    if name.is_empty() {
        return None;
    }
    Some(normalize(name))
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase().replace(['_', '.'], "-")
}

/// Installed packages that are neither runtime requirements nor protected
pub fn dev_packages(pip_list_json: &str, requirements: &str) -> Result<Vec<String>> {
    let installed: Vec<InstalledPackage> =
        serde_json::from_str(pip_list_json).map_err(|e| CliError::ExecutionFailed {
            command: "pip list --format=json".to_string(),
            reason: format!("unreadable package list: {}", e),
        })?;

    let mut keep: BTreeSet<String> = requirements.lines().filter_map(requirement_name).collect();
    keep.extend(ALWAYS_KEPT.iter().map(|n| n.to_string()));

    Ok(installed
        .into_iter()
        .map(|p| p.name)
        .filter(|name| !keep.contains(&normalize(name)))
        .filter(|name| !PROTECTED_FRAGMENTS.iter().any(|f| name.contains(f)))
        .collect())
}

/// Append platform markers to `pip freeze` output
pub fn add_platform_markers(freeze_output: &str) -> String {
    let mut pinned = String::new();
    for line in freeze_output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        pinned.push_str(line);
        if line.contains("win32") {
            pinned.push_str("; sys_platform == 'win32'");
        } else if line.contains("systemd") {
            pinned.push_str("; sys_platform != 'win32'");
        }
        pinned.push('\n');
    }
    pinned
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIREMENTS: &str = "\
# runtime
requests>=2.31
PyYAML ~= 6.0
docker[ssh]==7.1.0
pywin32; sys_platform == 'win32'
-r extra.txt
";

    #[test]
    fn test_requirement_name() {
        assert_eq!(requirement_name("requests>=2.31").as_deref(), Some("requests"));
        assert_eq!(requirement_name("PyYAML ~= 6.0").as_deref(), Some("pyyaml"));
        assert_eq!(requirement_name("docker[ssh]==7.1.0").as_deref(), Some("docker"));
        assert_eq!(requirement_name("zope.interface").as_deref(), Some("zope-interface"));
        assert_eq!(requirement_name("  # comment"), None);
        assert_eq!(requirement_name("-r extra.txt"), None);
        assert_eq!(requirement_name(""), None);
    }

    #[test]
    fn test_dev_packages_excludes_runtime_and_protected() {
        let pip_list = r#"[
            {"name": "requests", "version": "2.32.3"},
            {"name": "pyyaml", "version": "6.0.2"},
            {"name": "docker", "version": "7.1.0"},
            {"name": "pip", "version": "24.2"},
            {"name": "setuptools", "version": "75.1.0"},
            {"name": "PyQt5-sip", "version": "12.15.0"},
            {"name": "pywin32-ctypes", "version": "0.2.3"},
            {"name": "pylint", "version": "3.3.1"},
            {"name": "mypy", "version": "1.13.0"}
        ]"#;

        let dev = dev_packages(pip_list, REQUIREMENTS).unwrap();
        assert_eq!(dev, vec!["pylint", "mypy"]);
    }

    #[test]
    fn test_dev_packages_rejects_garbage() {
        assert!(dev_packages("not json", REQUIREMENTS).is_err());
    }

    #[test]
    fn test_platform_markers() {
        let frozen = "requests==2.32.3\npywin32==306\nsystemd-python==235\n\n";
        assert_eq!(
            add_platform_markers(frozen),
            "requests==2.32.3\n\
             pywin32==306; sys_platform == 'win32'\n\
             systemd-python==235; sys_platform != 'win32'\n"
        );
    }
}

//! Persisted version record with optimistic read-modify-write.
//!
//! The record lives in `pyproject.toml` (`tool.bumpver.current_version`, or
//! `project.version` when no bumpver table exists). Python sources that carry
//! a `__version__` assignment are kept in sync as mirrors.

use crate::error::{Result, VersionError};
use crate::version::VersionIdentifier;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static MIRROR_PATTERN: OnceLock<Regex> = OnceLock::new();

fn mirror_pattern() -> &'static Regex {
    MIRROR_PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^(__version__\s*=\s*)(['"])[^'"]*(['"])"#)
            .unwrap_or_else(|e| panic!("invalid mirror pattern: {e}"))
    })
}

/// Which key of the project file holds the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey {
    /// `[tool.bumpver] current_version`, stored with a `v` prefix
    BumpverCurrentVersion,
    /// `[project] version`, stored without prefix
    ProjectVersion,
}

/// Version as last read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Current version
    pub version: VersionIdentifier,
    /// Where it was read from
    pub key: RecordKey,
}

/// Owns the version file and its mirrors
#[derive(Debug, Clone)]
pub struct VersionStore {
    project_file: PathBuf,
    mirrors: Vec<PathBuf>,
    lock_path: PathBuf,
}

/// Exclusive lock held while the record is rewritten
#[derive(Debug)]
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: &Path) -> Result<Self> {
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(VersionError::Locked {
                    path: path.to_path_buf(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove version lock {}: {}", self.path.display(), e);
        }
    }
}

impl VersionStore {
    /// Create a store over `project_file` with the given mirror files
    pub fn new(project_file: impl Into<PathBuf>, mirrors: Vec<PathBuf>) -> Self {
        let project_file = project_file.into();
        let lock_path = project_file.with_file_name(".batcave_cicd_version.lock");
        Self {
            project_file,
            mirrors,
            lock_path,
        }
    }

    /// Path of the primary record
    pub fn project_file(&self) -> &Path {
        &self.project_file
    }

    /// Read the current record
    pub fn load(&self) -> Result<VersionRecord> {
        let doc = self.read_document()?;
        self.record_from(&doc)
    }

    /// Replace `expected` with `new`, failing if the record moved in between.
    ///
    /// Returns every file that was rewritten.
    pub fn replace(
        &self,
        expected: &VersionIdentifier,
        new: &VersionIdentifier,
    ) -> Result<Vec<PathBuf>> {
        let _lock = LockGuard::acquire(&self.lock_path)?;

        let mut doc = self.read_document()?;
        let current = self.record_from(&doc)?;
        if &current.version != expected {
            return Err(VersionError::Conflict {
                expected: expected.to_string(),
                found: current.version.to_string(),
            }
            .into());
        }

        if current.key == RecordKey::BumpverCurrentVersion {
            doc["tool"]["bumpver"]["current_version"] = toml_edit::value(new.tag_name());
        }
        if doc
            .get("project")
            .and_then(|p| p.get("version"))
            .is_some()
        {
            doc["project"]["version"] = toml_edit::value(new.to_string());
        }

        self.write_atomically(&self.project_file, &doc.to_string())?;
        let mut modified = vec![self.project_file.clone()];

        for mirror in &self.mirrors {
            if self.update_mirror(mirror, new)? {
                modified.push(mirror.clone());
            }
        }

        log::info!("Version v{} -> v{}", expected, new);
        Ok(modified)
    }

    fn read_document(&self) -> Result<toml_edit::DocumentMut> {
        let content =
            fs::read_to_string(&self.project_file).map_err(|e| VersionError::UpdateFailed {
                path: self.project_file.clone(),
                reason: format!("Failed to read file: {}", e),
            })?;
        Ok(content.parse::<toml_edit::DocumentMut>()?)
    }

    fn record_from(&self, doc: &toml_edit::DocumentMut) -> Result<VersionRecord> {
        let bumpver = doc
            .get("tool")
            .and_then(|t| t.get("bumpver"))
            .and_then(|b| b.get("current_version"))
            .and_then(|v| v.as_str());
        let project = doc
            .get("project")
            .and_then(|p| p.get("version"))
            .and_then(|v| v.as_str());

        let (raw, key) = match (bumpver, project) {
            (Some(raw), _) => (raw, RecordKey::BumpverCurrentVersion),
            (None, Some(raw)) => (raw, RecordKey::ProjectVersion),
            (None, None) => {
                return Err(VersionError::RecordNotFound {
                    path: self.project_file.clone(),
                }
                .into());
            }
        };

        Ok(VersionRecord {
            version: VersionIdentifier::parse(raw)?,
            key,
        })
    }

    fn update_mirror(&self, path: &Path, new: &VersionIdentifier) -> Result<bool> {
        if !path.exists() {
            log::warn!("Version mirror {} does not exist, skipping", path.display());
            return Ok(false);
        }

        let content = fs::read_to_string(path)?;
        if !mirror_pattern().is_match(&content) {
            log::warn!("No __version__ assignment in {}, skipping", path.display());
            return Ok(false);
        }

        let replacement = format!("${{1}}${{2}}{}${{3}}", new);
        let updated = mirror_pattern().replace(&content, replacement.as_str());
        self.write_atomically(path, &updated)?;
        Ok(true)
    }

    fn write_atomically(&self, path: &Path, content: &str) -> Result<()> {
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            VersionError::UpdateFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PYPROJECT: &str = r#"[project]
name = "BatCave"
version = "43.2.3rc1"

# managed by bumpver
[tool.bumpver]
current_version = "v43.2.3rc1"
version_pattern = "MAJOR.MINOR.PATCH[PYTAGNUM]"
"#;

    fn fixture() -> (TempDir, VersionStore) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("pyproject.toml"), PYPROJECT).unwrap();
        fs::create_dir(dir.path().join("batcave")).unwrap();
        fs::write(
            dir.path().join("batcave/__init__.py"),
            "__title__ = 'BatCave'\n__version__ = '43.2.3rc1'\n",
        )
        .unwrap();
        let store = VersionStore::new(
            dir.path().join("pyproject.toml"),
            vec![dir.path().join("batcave/__init__.py")],
        );
        (dir, store)
    }

    #[test]
    fn test_load_prefers_bumpver_key() {
        let (_dir, store) = fixture();
        let record = store.load().unwrap();
        assert_eq!(record.key, RecordKey::BumpverCurrentVersion);
        assert_eq!(record.version, VersionIdentifier::parse("43.2.3rc1").unwrap());
    }

    #[test]
    fn test_replace_updates_record_and_mirrors() {
        let (dir, store) = fixture();
        let old = store.load().unwrap().version;
        let new = VersionIdentifier::parse("43.2.3rc2").unwrap();

        let modified = store.replace(&old, &new).unwrap();
        assert_eq!(modified.len(), 2);

        let pyproject = fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(pyproject.contains(r#"current_version = "v43.2.3rc2""#));
        assert!(pyproject.contains(r#"version = "43.2.3rc2""#));
        assert!(pyproject.contains("# managed by bumpver"));

        let init = fs::read_to_string(dir.path().join("batcave/__init__.py")).unwrap();
        assert!(init.contains("__version__ = '43.2.3rc2'"));
        assert!(init.contains("__title__ = 'BatCave'"));

        assert!(!dir.path().join(".batcave_cicd_version.lock").exists());
    }

    #[test]
    fn test_replace_detects_conflict() {
        let (_dir, store) = fixture();
        let stale = VersionIdentifier::parse("43.2.3rc0").unwrap();
        let new = VersionIdentifier::parse("43.2.3rc1").unwrap();

        let err = store.replace(&stale, &new).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CicdError::Version(VersionError::Conflict { .. })
        ));
        assert_eq!(
            store.load().unwrap().version,
            VersionIdentifier::parse("43.2.3rc1").unwrap()
        );
    }

    #[test]
    fn test_replace_refuses_while_locked() {
        let (dir, store) = fixture();
        fs::write(dir.path().join(".batcave_cicd_version.lock"), "999").unwrap();
        let old = store.load().unwrap().version;
        let new = VersionIdentifier::parse("43.2.3rc2").unwrap();

        assert!(store.replace(&old, &new).is_err());
        assert_eq!(store.load().unwrap().version, old);
    }

    #[test]
    fn test_project_version_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pyproject.toml");
        fs::write(&path, "[project]\nname = \"x\"\nversion = \"1.0.0\"\n").unwrap();
        let store = VersionStore::new(&path, Vec::new());

        let record = store.load().unwrap();
        assert_eq!(record.key, RecordKey::ProjectVersion);

        let next = VersionIdentifier::parse("1.0.1rc0").unwrap();
        store.replace(&record.version, &next).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(r#"version = "1.0.1rc0""#));
        assert!(!content.contains("bumpver"));
    }

    #[test]
    fn test_missing_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pyproject.toml");
        fs::write(&path, "[project]\nname = \"x\"\n").unwrap();
        assert!(VersionStore::new(&path, Vec::new()).load().is_err());
    }
}

//! Sandbox output tree
//!
//! Fixed files never overwrite the originals. They land in a sandbox tree
//! that mirrors the target directory layout; generated tests go into a
//! flat `tests/` subdirectory of the same tree.

use std::path::{Path, PathBuf};
use swarm_core::config::PathsConfig;
use swarm_core::Result;

/// Location of fixed files and generated tests
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    tests_subdir: String,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>, tests_subdir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            tests_subdir: tests_subdir.into(),
        }
    }

    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(paths.sandbox_dir.clone(), paths.tests_subdir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.root.join(&self.tests_subdir)
    }

    /// Sandbox counterpart of `file`: the `target_dir` prefix is replaced
    /// by the sandbox root. Files outside `target_dir` keep only their name.
    pub fn mirror_path(&self, target_dir: &Path, file: &Path) -> PathBuf {
        match file.strip_prefix(target_dir) {
            Ok(relative) => self.root.join(relative),
            Err(_) => self.root.join(file.file_name().unwrap_or(file.as_os_str())),
        }
    }

    /// Path of the generated test file for `file`: `tests/test_<basename>`
    pub fn test_path(&self, file: &Path) -> PathBuf {
        let basename = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.tests_dir().join(format!("test_{}", basename))
    }

    /// Create parent directories, then write `content` to `path`
    pub async fn write(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mirror_path_replaces_target_prefix() {
        let sandbox = Sandbox::new("sandbox", "tests");
        let mirrored = sandbox.mirror_path(Path::new("proj"), Path::new("proj/pkg/a.py"));
        assert_eq!(mirrored, PathBuf::from("sandbox/pkg/a.py"));
    }

    #[test]
    fn test_mirror_path_outside_target() {
        let sandbox = Sandbox::new("sandbox", "tests");
        let mirrored = sandbox.mirror_path(Path::new("proj"), Path::new("/elsewhere/b.py"));
        assert_eq!(mirrored, PathBuf::from("sandbox/b.py"));
    }

    #[test]
    fn test_test_path_uses_basename() {
        let sandbox = Sandbox::new("out", "tests");
        assert_eq!(
            sandbox.test_path(Path::new("proj/pkg/calc.py")),
            PathBuf::from("out/tests/test_calc.py")
        );
    }

    #[tokio::test]
    async fn test_write_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let sandbox = Sandbox::new(temp_dir.path().join("sandbox"), "tests");
        let path = sandbox.test_path(Path::new("a.py"));

        sandbox.write(&path, "def test_a(): pass").await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "def test_a(): pass");
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// Resolve paths from `RAGLOOP_ROOT` / `RAGLOOP_DATA_DIR`, falling back
    /// to the current directory.
    pub fn discover() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = env::var("RAGLOOP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.clone());
        Self::with_dirs(project_root, user_data_dir)
    }

    pub fn with_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let secrets_path = user_data_dir.join("secrets.yaml");

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            secrets_path,
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.user_data_dir, &self.log_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Relative paths are taken from the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("RAGLOOP_ROOT") {
        return PathBuf::from(root);
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_data_dir() {
        let paths = AppPaths::with_dirs(PathBuf::from("/srv/app"), PathBuf::from("/var/ragloop"));
        assert_eq!(paths.log_dir, PathBuf::from("/var/ragloop/logs"));
        assert_eq!(paths.secrets_path, PathBuf::from("/var/ragloop/secrets.yaml"));
    }

    #[test]
    fn resolve_joins_relative_paths_to_project_root() {
        let paths = AppPaths::with_dirs(PathBuf::from("/srv/app"), PathBuf::from("/srv/app"));
        assert_eq!(paths.resolve(Path::new("data")), PathBuf::from("/srv/app/data"));
        assert_eq!(paths.resolve(Path::new("/abs/db")), PathBuf::from("/abs/db"));
    }

    #[test]
    fn ensure_dirs_creates_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_dirs(tmp.path().to_path_buf(), tmp.path().join("state"));
        paths.ensure_dirs().unwrap();
        assert!(paths.log_dir.is_dir());
    }
}

use std::path::{Path, PathBuf};

/// Storage locations shared by the server binary and tests.
///
/// Only the data directory is mandatory in practice; the individual store
/// paths fall back to well-known file names inside it.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Directory holding all persistent state.
    pub data_dir: Option<PathBuf>,

    /// Path to the redb file (ad access grants).
    /// Defaults to `{data_dir}/data.redb`.
    pub db_path: Option<PathBuf>,

    /// Path to the SQLite file (profiles, links, analytics, tips, forum).
    /// Defaults to `{data_dir}/data.sqlite`.
    pub sqlite_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Config rooted at `data_dir` with default file names.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: Some(data_dir.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Resolve the redb database path, falling back to `{data_dir}/data.redb`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("data.redb"))
    }

    /// Resolve the SQLite database path, falling back to `{data_dir}/data.sqlite`.
    pub fn resolve_sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("data.sqlite"))
    }

    fn resolve_data_subpath(&self, name: &str) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(|d| d.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}

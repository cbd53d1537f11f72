//! Resolves the on-disk workspace layout: one data directory holding the
//! durable graph store, the KV document store, and the webhook
//! permission allow-list, all beneath the path `mnemo_core::resolve_workspace_path`
//! picks out.

use std::path::PathBuf;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn resolve(explicit_path: Option<&str>) -> Result<Self> {
        let data_dir = mnemo_core::resolve_workspace_path(explicit_path)?;
        Ok(Self { data_dir })
    }

    pub fn graph_db_path(&self) -> PathBuf {
        self.data_dir.join("graph.sqlite3")
    }

    pub fn kv_db_path(&self) -> PathBuf {
        self.data_dir.join("store.sqlite3")
    }

    pub fn permissions_path(&self) -> PathBuf {
        self.data_dir.join("permissions.toml")
    }

    pub fn captures_dir(&self) -> PathBuf {
        self.data_dir.join("captures")
    }

    /// Creates `data_dir` (and `captures_dir`) if they don't exist yet.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.captures_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_drives_every_derived_path() {
        let config = Config::resolve(Some("/tmp/mnemo-test-workspace")).unwrap();
        assert_eq!(config.graph_db_path(), PathBuf::from("/tmp/mnemo-test-workspace/graph.sqlite3"));
        assert_eq!(config.kv_db_path(), PathBuf::from("/tmp/mnemo-test-workspace/store.sqlite3"));
        assert_eq!(
            config.permissions_path(),
            PathBuf::from("/tmp/mnemo-test-workspace/permissions.toml")
        );
    }
}

//! Host-permission preflight. The browser's own host-permission grant model
//! is out of scope, so the dispatcher asks a `PermissionOracle` rather than
//! a browser API directly — the trait boundary is where a real grant check
//! would plug in.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub trait PermissionOracle: Send + Sync {
    /// Whether `origin` (e.g. `https://hooks.example.com/*`) may be reached.
    fn is_allowed(&self, origin: &str) -> bool;
}

/// Grants every origin. Used by the CLI and tests where preflight isn't the
/// point.
pub struct AllowAll;

impl PermissionOracle for AllowAll {
    fn is_allowed(&self, _origin: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AllowListFile {
    #[serde(default)]
    allowed_origins: Vec<String>,
}

/// A config-file allow-list: `allowed_origins = ["https://hooks.example.com/*"]`
/// in a TOML file, loaded once and checked by exact match.
pub struct AllowListOracle {
    allowed: HashSet<String>,
}

impl AllowListOracle {
    pub fn load(path: &Path) -> Result<Self> {
        let allowed = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                mnemo_index::Error::Io(e)
            })?;
            let parsed: AllowListFile = toml::from_str(&raw).unwrap_or_default();
            parsed.allowed_origins.into_iter().collect()
        } else {
            HashSet::new()
        };
        Ok(Self { allowed })
    }

    pub fn empty() -> Self {
        Self { allowed: HashSet::new() }
    }
}

impl PermissionOracle for AllowListOracle {
    fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.contains(origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_oracle_denies_everything() {
        let oracle = AllowListOracle::empty();
        assert!(!oracle.is_allowed("https://hooks.example.com/*"));
    }

    #[test]
    fn allow_all_grants_everything() {
        assert!(AllowAll.is_allowed("https://anywhere.example/*"));
    }

    #[test]
    fn loads_allow_list_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permissions.toml");
        std::fs::write(&path, r#"allowed_origins = ["https://hooks.example.com/*"]"#).unwrap();

        let oracle = AllowListOracle::load(&path).unwrap();
        assert!(oracle.is_allowed("https://hooks.example.com/*"));
        assert!(!oracle.is_allowed("https://other.example/*"));
    }
}

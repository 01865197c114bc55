//! Subcommand implementations

pub mod deps;
pub mod index;
pub mod init;
pub mod parse;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Canonical repository root: `path` or the current directory.
pub fn resolve_root(path: Option<PathBuf>) -> Result<PathBuf> {
    let root = match path {
        Some(p) => p,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    root.canonicalize()
        .with_context(|| format!("Repository root {} does not exist", root.display()))
}

/// Default repository id: the root directory's name.
pub fn default_repo_id(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_repo_id() {
        assert_eq!(default_repo_id(Path::new("/work/my-service")), "my-service");
        assert_eq!(default_repo_id(Path::new("/")), "repo");
    }

    #[test]
    fn test_resolve_root_missing() {
        assert!(resolve_root(Some(PathBuf::from("/definitely/not/here"))).is_err());
    }
}

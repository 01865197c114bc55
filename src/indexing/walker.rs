use ignore::WalkBuilder;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::errors::{ErrorCollector, ProcessingStage};
use crate::config::IndexerConfig;
use crate::language::Language;
use crate::resolver::ALIAS_CONFIG_FILES;

/// Files the resolver needs whatever their extension.
const GO_MODULE_FILE: &str = "go.mod";

/// A repository file read into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Repository-relative, `/`-separated
    pub path: String,
    pub language: Option<Language>,
    pub content: String,
    /// Hex SHA-256 of `content`
    pub content_hash: String,
    pub size: u64,
}

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Walks a repository respecting .gitignore and configured ignore patterns
pub struct Walker {
    root: PathBuf,
    extensions: HashSet<String>,
    ignore_patterns: Vec<String>,
    max_file_bytes: u64,
}

impl Walker {
    pub fn new(root: PathBuf, config: &IndexerConfig) -> Self {
        Self {
            root,
            extensions: config.extensions.iter().cloned().collect(),
            ignore_patterns: config.ignore_patterns.clone(),
            max_file_bytes: config.max_file_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn wanted(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(OsStr::to_str).unwrap_or_default();
        if ALIAS_CONFIG_FILES.contains(&name) || name == GO_MODULE_FILE {
            return true;
        }
        path.extension()
            .and_then(OsStr::to_str)
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    fn ignored(&self, rel: &Path) -> bool {
        rel.components().any(|c| match c {
            Component::Normal(part) => self
                .ignore_patterns
                .iter()
                .any(|p| part.to_str() == Some(p.as_str())),
            _ => false,
        })
    }

    /// Absolute paths of every file to index, sorted.
    pub fn collect_files(&self) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(&self.root);
        builder.git_ignore(true);
        builder.git_global(true);
        builder.git_exclude(true);
        builder.hidden(true);
        // honour .gitignore outside a git checkout too
        builder.require_git(false);

        let mut override_builder = ignore::overrides::OverrideBuilder::new(&self.root);
        for pattern in &self.ignore_patterns {
            let _ = override_builder.add(&format!("!{}", pattern));
            let _ = override_builder.add(&format!("!{}/**", pattern));
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let mut files: Vec<PathBuf> = builder
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|entry| entry.into_path())
            .filter(|path| {
                let rel = path.strip_prefix(&self.root).unwrap_or(path);
                !self.ignored(rel) && self.wanted(path)
            })
            .collect();
        files.sort();
        files
    }

    /// `/`-separated path of `abs` relative to the root.
    pub fn relative_path(&self, abs: &Path) -> String {
        let rel = abs.strip_prefix(&self.root).unwrap_or(abs);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read every file in parallel. Unreadable, non-UTF-8 and oversized files
    /// are recorded and skipped.
    pub fn read_sources(&self, errors: &ErrorCollector) -> Vec<SourceFile> {
        let paths = self.collect_files();
        let mut sources: Vec<SourceFile> = paths
            .par_iter()
            .filter_map(|abs| {
                let rel = self.relative_path(abs);
                match std::fs::metadata(abs) {
                    Ok(meta) if meta.len() > self.max_file_bytes => {
                        debug!(path = %rel, size = meta.len(), "skipping oversized file");
                        return None;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        errors.record(rel, e, ProcessingStage::FileRead);
                        return None;
                    }
                }
                match std::fs::read_to_string(abs) {
                    Ok(content) => Some(SourceFile {
                        language: Language::detect(abs),
                        content_hash: content_hash(&content),
                        size: content.len() as u64,
                        content,
                        path: rel,
                    }),
                    Err(e) => {
                        errors.record(rel, e, ProcessingStage::FileRead);
                        None
                    }
                }
            })
            .collect();
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn test_config() -> IndexerConfig {
        IndexerConfig {
            extensions: vec!["rs".to_string(), "py".to_string()],
            ignore_patterns: vec!["target".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_walker_respects_extensions() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("script.py"), "print('hello')").unwrap();
        fs::write(dir.path().join("index.js"), "console.log('hi')").unwrap();
        fs::write(dir.path().join("readme.md"), "# Readme").unwrap();

        let walker = Walker::new(dir.path().to_path_buf(), &test_config());
        assert_eq!(walker.collect_files().len(), 2);
    }

    #[test]
    fn test_walker_ignores_directories_by_component() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::create_dir_all(dir.path().join("retarget")).unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("target/build.rs"), "fn build() {}").unwrap();
        fs::write(dir.path().join("retarget/lib.rs"), "fn lib() {}").unwrap();

        let walker = Walker::new(dir.path().to_path_buf(), &test_config());
        let rels: Vec<_> = walker
            .collect_files()
            .iter()
            .map(|p| walker.relative_path(p))
            .collect();
        assert_eq!(rels, vec!["main.rs", "retarget/lib.rs"]);
    }

    #[test]
    fn test_walker_keeps_resolver_configs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("web")).unwrap();
        fs::write(dir.path().join("go.mod"), "module example.com/app\n").unwrap();
        fs::write(dir.path().join("web/tsconfig.json"), "{}").unwrap();
        fs::write(dir.path().join("web/package.json"), "{}").unwrap();

        let walker = Walker::new(dir.path().to_path_buf(), &test_config());
        let rels: Vec<_> = walker
            .collect_files()
            .iter()
            .map(|p| walker.relative_path(p))
            .collect();
        assert_eq!(rels, vec!["go.mod", "web/tsconfig.json"]);
    }

    #[test]
    fn test_read_sources_hash_and_size_limit() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/a.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("big.py"), "#".repeat(64)).unwrap();
        fs::write(dir.path().join("bad.py"), [0xff, 0xfe, 0x00]).unwrap();

        let config = IndexerConfig {
            max_file_bytes: 32,
            ..test_config()
        };
        let walker = Walker::new(dir.path().to_path_buf(), &config);
        let errors = ErrorCollector::new();
        let sources = walker.read_sources(&errors);

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].path, "pkg/a.py");
        assert_eq!(sources[0].language, Some(Language::Python));
        assert_eq!(sources[0].content_hash, content_hash("x = 1\n"));
        assert_eq!(sources[0].content_hash.len(), 64);
        assert_eq!(errors.get_report().count(ProcessingStage::FileRead), 1);
    }
}

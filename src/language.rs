//! Language tags and extension tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Source languages known to the indexer.
///
/// `Php` is recognised for dependency resolution and change detection but
/// has no structural parser registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    Rust,
    C,
    Cpp,
    Php,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Java,
        Language::Rust,
        Language::C,
        Language::Cpp,
        Language::Php,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::Rust => "rust",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Php => "php",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.as_str() == tag)
    }

    /// Detect the language of a file from its extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "go" => Some(Language::Go),
            "java" => Some(Language::Java),
            "rs" => Some(Language::Rust),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Language::Cpp),
            "php" => Some(Language::Php),
            _ => None,
        }
    }

    /// Extensions tried, in order, when resolving an import to a file.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &[".py"],
            Language::JavaScript => &[".js", ".jsx", ".mjs", ".cjs"],
            Language::TypeScript => &[".ts", ".tsx", ".mts", ".cts"],
            Language::Go => &[".go"],
            Language::Java => &[".java"],
            Language::Rust => &[".rs"],
            Language::C => &[".c", ".h"],
            Language::Cpp => &[".cpp", ".cc", ".cxx", ".hpp", ".h"],
            Language::Php => &[".php"],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_path() {
        assert_eq!(Language::detect(Path::new("src/app.tsx")), Some(Language::TypeScript));
        assert_eq!(Language::detect(Path::new("lib/util.MJS")), Some(Language::JavaScript));
        assert_eq!(Language::detect(Path::new("include/x.h")), Some(Language::C));
        assert_eq!(Language::detect(Path::new("README.md")), None);
        assert_eq!(Language::detect(Path::new("Makefile")), None);
    }

    #[test]
    fn test_tag_roundtrip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_tag(lang.as_str()), Some(lang));
        }
        assert_eq!(Language::from_tag("cobol"), None);
    }

    #[test]
    fn test_extension_order() {
        assert_eq!(Language::Cpp.extensions()[0], ".cpp");
        assert!(Language::C.extensions().contains(&".h"));
    }
}

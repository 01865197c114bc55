//! Best-effort classification of imports as external packages.
//!
//! These lists are heuristics. A miss here is harmless: anything that does
//! not resolve to a repository file is demoted to an external reference
//! anyway.

use super::paths::is_relative;
use crate::language::Language;

const NODE_BUILTINS: &[&str] = &[
    "fs", "path", "http", "https", "crypto", "buffer", "stream", "url", "util", "events", "os",
    "net", "tls", "child_process",
];

const PYTHON_DENYLIST: &[&str] = &[
    "os", "sys", "json", "re", "datetime", "asyncio", "typing", "pathlib", "collections",
    "itertools", "functools", "unittest", "pytest", "flask", "django", "pandas", "numpy",
    "requests",
];

const RUST_STD: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

const JAVA_PLATFORM: &[&str] = &["java.", "javax.", "jdk.", "sun."];

/// Whether `spec` is known to name something outside the repository.
pub fn is_external(spec: &str, language: Language) -> bool {
    if is_relative(spec) {
        return false;
    }

    match language {
        Language::JavaScript | Language::TypeScript => {
            if spec.starts_with("node:") {
                return true;
            }
            let base = spec.split('/').next().unwrap_or(spec);
            NODE_BUILTINS.contains(&base)
        }
        Language::Python => {
            let base = spec.split('.').next().unwrap_or(spec);
            PYTHON_DENYLIST.contains(&base)
        }
        Language::Go => spec
            .split('/')
            .next()
            .is_some_and(|first| first.contains('.')),
        Language::Java => JAVA_PLATFORM.iter().any(|p| spec.starts_with(p)),
        Language::Rust => {
            let base = spec.split("::").next().unwrap_or(spec);
            RUST_STD.contains(&base)
        }
        Language::C | Language::Cpp => spec.starts_with('<'),
        Language::Php => false,
    }
}

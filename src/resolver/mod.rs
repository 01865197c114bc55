//! Repository-wide import graph construction.
//!
//! Resolution runs in two passes: every file's imports are resolved
//! independently (in parallel, read-only over the shared indices), then the
//! reverse `imported_by` edges are built sequentially from the complete
//! first-pass output.

mod alias;
mod external;
mod imports;
mod paths;

pub use alias::{strip_jsonc, AliasEntry, AliasScope, AliasScopes, ALIAS_CONFIG_FILES};
pub use external::is_external;
pub use imports::normalize;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::language::Language;
use crate::metrics::{IMPORTS_EXTERNAL, IMPORTS_RESOLVED};
use paths::{file_name, file_stem, is_relative, join, parent_dir};

/// Package-entry file names tried under a directory, in order.
const PACKAGE_ENTRIES: &[&str] = &["index", "__init__"];

const GO_MOD: &str = "go.mod";

/// How many files the ranked statistics report.
const TOP_N: usize = 10;

/// One repository file as seen by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct ResolverFile<'a> {
    /// Repository-relative, `/`-separated.
    pub path: &'a str,
    /// `None` for non-source files such as alias configurations.
    pub language: Option<Language>,
    /// Raw import statements from the parser.
    pub imports: &'a [String],
    pub content: &'a str,
}

/// Resolved dependencies of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDependencies {
    /// Repository files this file imports.
    pub imports: Vec<String>,
    /// Repository files importing this file.
    pub imported_by: Vec<String>,
    /// Import specifiers that did not resolve to a repository file.
    pub external_imports: Vec<String>,
}

pub struct DependencyResolver<'a> {
    files: &'a [ResolverFile<'a>],
    file_set: HashSet<&'a str>,
    /// File stem -> sorted paths.
    by_stem: HashMap<&'a str, Vec<&'a str>>,
    /// Directory -> sorted paths of files directly inside it.
    by_dir: HashMap<&'a str, Vec<&'a str>>,
    aliases: AliasScopes,
    /// `(module path, module directory)`, longest module path first.
    go_modules: Vec<(String, String)>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(files: &'a [ResolverFile<'a>]) -> Self {
        let mut file_set = HashSet::with_capacity(files.len());
        let mut by_stem: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut by_dir: HashMap<&str, Vec<&str>> = HashMap::new();

        for file in files {
            file_set.insert(file.path);
            by_stem.entry(file_stem(file.path)).or_default().push(file.path);
            by_dir.entry(parent_dir(file.path)).or_default().push(file.path);
        }
        for paths in by_stem.values_mut().chain(by_dir.values_mut()) {
            paths.sort_unstable();
        }

        let aliases = AliasScopes::discover(files.iter().map(|f| (f.path, f.content)));

        let mut go_modules: Vec<(String, String)> = files
            .iter()
            .filter(|f| file_name(f.path) == GO_MOD)
            .filter_map(|f| {
                go_module_path(f.content).map(|m| (m, parent_dir(f.path).to_string()))
            })
            .collect();
        go_modules.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));

        debug!(
            files = files.len(),
            alias_scopes = aliases.len(),
            go_modules = go_modules.len(),
            "built resolver indices"
        );

        Self {
            files,
            file_set,
            by_stem,
            by_dir,
            aliases,
            go_modules,
        }
    }

    /// Resolve every file's imports and build the reverse edges.
    pub fn resolve_all(&self) -> BTreeMap<String, FileDependencies> {
        let forward: Vec<(&str, Vec<String>, Vec<String>)> = self
            .files
            .par_iter()
            .map(|file| {
                let (internal, external) = self.resolve_file(file);
                (file.path, internal, external)
            })
            .collect();

        let mut graph: BTreeMap<String, FileDependencies> = self
            .files
            .iter()
            .map(|f| (f.path.to_string(), FileDependencies::default()))
            .collect();

        let mut reverse: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut resolved = 0usize;
        let mut unresolved = 0usize;
        for (path, internal, external) in forward {
            resolved += internal.len();
            unresolved += external.len();
            for target in &internal {
                reverse
                    .entry(target.clone())
                    .or_default()
                    .insert(path.to_string());
            }
            if let Some(entry) = graph.get_mut(path) {
                entry.imports = internal;
                entry.external_imports = external;
            }
        }
        for (target, importers) in reverse {
            if let Some(entry) = graph.get_mut(&target) {
                entry.imported_by = importers.into_iter().collect();
            }
        }

        IMPORTS_RESOLVED.inc_by(resolved as f64);
        IMPORTS_EXTERNAL.inc_by(unresolved as f64);
        info!(
            files = graph.len(),
            internal = resolved,
            external = unresolved,
            "resolved dependency graph"
        );
        graph
    }

    /// First pass for one file: `(internal targets, external specifiers)`,
    /// both sorted and deduplicated.
    fn resolve_file(&self, file: &ResolverFile<'_>) -> (Vec<String>, Vec<String>) {
        let Some(language) = file.language else {
            return (Vec::new(), Vec::new());
        };

        let mut internal = BTreeSet::new();
        let mut external = BTreeSet::new();
        for raw in file.imports {
            for spec in normalize(raw, language, file.path) {
                match self.resolve_import(&spec, language, file.path) {
                    Some(target) if target == file.path => {}
                    Some(target) => {
                        internal.insert(target);
                    }
                    None => {
                        external.insert(spec);
                    }
                }
            }
        }
        (internal.into_iter().collect(), external.into_iter().collect())
    }

    /// Map one normalized specifier to a repository file.
    pub fn resolve_import(&self, spec: &str, language: Language, importer: &str) -> Option<String> {
        match language {
            Language::Go => self.resolve_go(spec, importer),
            _ if is_external(spec, language) => None,
            Language::Rust => self.resolve_rust(spec, importer),
            Language::Python | Language::Java => self.resolve_dotted(spec, language, importer),
            _ => self.resolve_path(spec, language, importer),
        }
    }

    fn resolve_path(&self, spec: &str, language: Language, importer: &str) -> Option<String> {
        if is_relative(spec) {
            let target = join(parent_dir(importer), spec);
            let hit = self.find_with_extension(&target, language);
            if hit.is_some() || !matches!(language, Language::C | Language::Cpp) {
                return hit;
            }
            // include paths: try from the repository root, then a unique suffix match
            let rooted = spec.trim_start_matches("./");
            return self
                .find_with_extension(&join("", rooted), language)
                .or_else(|| self.suffix_match(rooted, language, true));
        }

        if let Some(expanded) = self.aliases.expand(importer, spec) {
            return self.find_with_extension(&join("", &expanded), language);
        }

        self.find_with_extension(&join("", spec), language).or_else(|| {
            let base = self.aliases.base_root(importer)?;
            self.find_with_extension(&join(base, spec), language)
        })
    }

    fn resolve_dotted(&self, spec: &str, language: Language, importer: &str) -> Option<String> {
        if is_relative(spec) {
            return self.find_with_extension(&join(parent_dir(importer), spec), language);
        }

        if let Some(package) = spec.strip_suffix(".*") {
            return self.first_in_package(&package.replace('.', "/"), language);
        }

        let rel = spec.replace('.', "/");
        if language == Language::Python {
            // script-style imports see siblings first; a suffix hit must be unambiguous
            return self
                .find_with_extension(&join(parent_dir(importer), &rel), language)
                .or_else(|| self.find_with_extension(&rel, language))
                .or_else(|| self.suffix_match(&rel, language, true));
        }

        let mut candidate = rel.as_str();
        loop {
            let hit = self
                .find_with_extension(candidate, language)
                .or_else(|| self.suffix_match(candidate, language, false));
            if hit.is_some() {
                return hit;
            }
            // static imports and nested classes name members of a file
            match candidate.rfind('/') {
                Some(i) => candidate = &candidate[..i],
                None => return None,
            }
        }
    }

    fn resolve_go(&self, spec: &str, importer: &str) -> Option<String> {
        for (module, dir) in &self.go_modules {
            let rest = if spec == module {
                Some("")
            } else {
                spec.strip_prefix(module.as_str()).and_then(|r| r.strip_prefix('/'))
            };
            if let Some(rest) = rest {
                return self.first_in_dir(&join(dir, rest), Language::Go);
            }
        }

        if is_external(spec, Language::Go) {
            return None;
        }
        let dir = if is_relative(spec) {
            join(parent_dir(importer), spec)
        } else {
            join("", spec)
        };
        self.first_in_dir(&dir, Language::Go)
    }

    fn resolve_rust(&self, spec: &str, importer: &str) -> Option<String> {
        if is_relative(spec) {
            return self.find_with_extension(&join(parent_dir(importer), spec), Language::Rust);
        }

        let mut segments: Vec<&str> = spec.split("::").filter(|s| !s.is_empty()).collect();
        let module_dir = rust_module_dir(importer);
        let head = segments.first().copied();
        let anchored = matches!(head, Some("crate" | "self" | "super"));
        let base = match head {
            Some("crate") => {
                segments.remove(0);
                self.rust_crate_root(importer)
            }
            Some("self") => {
                segments.remove(0);
                module_dir
            }
            Some("super") => {
                let mut dir = module_dir;
                while segments.first() == Some(&"super") {
                    segments.remove(0);
                    dir = parent_dir(&dir).to_string();
                }
                dir
            }
            _ => module_dir,
        };

        // trailing segments may name items rather than modules
        while !segments.is_empty() {
            let candidate = join(&base, &segments.join("/"));
            if let Some(hit) = self.find_with_extension(&candidate, Language::Rust) {
                return Some(hit);
            }
            segments.pop();
        }

        if anchored {
            self.rust_module_file(&base)
        } else {
            None
        }
    }

    /// Nearest ancestor directory holding `lib.rs` or `main.rs`, else `src`
    /// when present, else the repository root.
    fn rust_crate_root(&self, importer: &str) -> String {
        let mut dir = parent_dir(importer);
        loop {
            if ["lib.rs", "main.rs"]
                .iter()
                .any(|entry| self.file_set.contains(join(dir, entry).as_str()))
            {
                return dir.to_string();
            }
            if dir.is_empty() {
                break;
            }
            dir = parent_dir(dir);
        }
        if self.by_dir.keys().any(|d| *d == "src" || d.starts_with("src/")) {
            "src".to_string()
        } else {
            String::new()
        }
    }

    /// The file defining the module rooted at `dir`.
    fn rust_module_file(&self, dir: &str) -> Option<String> {
        ["lib.rs", "main.rs"]
            .iter()
            .map(|entry| join(dir, entry))
            .find(|p| self.file_set.contains(p.as_str()))
            .or_else(|| self.find_with_extension(dir, Language::Rust))
    }

    /// Exact path, then `base<ext>`, then `base/<entry><ext>` for each
    /// package-entry name. First hit wins.
    fn find_with_extension(&self, base: &str, language: Language) -> Option<String> {
        let base = base.trim_end_matches('/');
        let exts = language.extensions();

        if !base.is_empty() {
            if self.file_set.contains(base) {
                return Some(base.to_string());
            }
            for ext in exts {
                let candidate = format!("{}{}", base, ext);
                if self.file_set.contains(candidate.as_str()) {
                    return Some(candidate);
                }
            }
        }

        let rust_entry: &[&str] = if language == Language::Rust { &["mod"] } else { &[] };
        for entry in PACKAGE_ENTRIES.iter().chain(rust_entry) {
            for ext in exts {
                let candidate = join(base, &format!("{}{}", entry, ext));
                if self.file_set.contains(candidate.as_str()) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// A file whose path ends with `rel` (with or without an extension of
    /// the language). With `unique`, ambiguous matches are rejected;
    /// otherwise the lexicographically first one wins.
    fn suffix_match(&self, rel: &str, language: Language, unique: bool) -> Option<String> {
        let candidates = self.by_stem.get(file_stem(rel))?;
        let suffix = format!("/{}", rel);
        let mut matches = candidates.iter().filter(|path| {
            let without_ext = strip_language_ext(path, language);
            without_ext.map_or(false, |p| p == rel || p.ends_with(&suffix))
                || **path == rel
                || path.ends_with(&suffix)
        });

        let first = matches.next()?;
        if unique && matches.next().is_some() {
            return None;
        }
        Some(first.to_string())
    }

    /// First source file (non-test preferred) directly inside `dir`.
    fn first_in_dir(&self, dir: &str, language: Language) -> Option<String> {
        let sources: Vec<&str> = self
            .by_dir
            .get(dir)?
            .iter()
            .copied()
            .filter(|p| strip_language_ext(p, language).is_some())
            .collect();
        sources
            .iter()
            .find(|p| !file_stem(p).ends_with("_test"))
            .or_else(|| sources.first())
            .map(|p| p.to_string())
    }

    /// `first_in_dir` for a package directory given relative to any source
    /// root: the exact directory, else the first directory ending with it.
    fn first_in_package(&self, rel_dir: &str, language: Language) -> Option<String> {
        if let Some(hit) = self.first_in_dir(rel_dir, language) {
            return Some(hit);
        }
        let suffix = format!("/{}", rel_dir);
        let mut dirs: Vec<&&str> = self.by_dir.keys().filter(|d| d.ends_with(&suffix)).collect();
        dirs.sort();
        dirs.into_iter()
            .find_map(|dir| self.first_in_dir(dir, language))
    }
}

fn strip_language_ext<'p>(path: &'p str, language: Language) -> Option<&'p str> {
    language
        .extensions()
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
}

/// Directory holding the child modules of a Rust source file.
fn rust_module_dir(importer: &str) -> String {
    let dir = parent_dir(importer);
    match file_stem(importer) {
        "lib" | "main" | "mod" => dir.to_string(),
        stem => join(dir, stem),
    }
}

/// The `module` path declared by a `go.mod` file.
fn go_module_path(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}

/// A file and how often it appears on one side of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedFile {
    pub path: String,
    pub count: usize,
}

/// Summary figures over a resolved dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyStats {
    pub total_files: usize,
    pub total_internal_dependencies: usize,
    pub total_external_dependencies: usize,
    pub average_dependencies_per_file: f64,
    /// Files with the most importers.
    pub most_imported: Vec<RankedFile>,
    /// Files with the most internal imports.
    pub most_dependent: Vec<RankedFile>,
}

impl DependencyStats {
    pub fn from_graph(graph: &BTreeMap<String, FileDependencies>) -> Self {
        let total_files = graph.len();
        let total_internal: usize = graph.values().map(|d| d.imports.len()).sum();
        let total_external: usize = graph.values().map(|d| d.external_imports.len()).sum();
        let average = if total_files == 0 {
            0.0
        } else {
            total_internal as f64 / total_files as f64
        };

        Self {
            total_files,
            total_internal_dependencies: total_internal,
            total_external_dependencies: total_external,
            average_dependencies_per_file: average,
            most_imported: top_ranked(graph, |d| d.imported_by.len()),
            most_dependent: top_ranked(graph, |d| d.imports.len()),
        }
    }
}

fn top_ranked(
    graph: &BTreeMap<String, FileDependencies>,
    count: impl Fn(&FileDependencies) -> usize,
) -> Vec<RankedFile> {
    let mut ranked: Vec<RankedFile> = graph
        .iter()
        .map(|(path, deps)| RankedFile {
            path: path.clone(),
            count: count(deps),
        })
        .filter(|r| r.count > 0)
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
    ranked.truncate(TOP_N);
    ranked
}

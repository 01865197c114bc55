//! Module-alias scopes read from `tsconfig.json` / `jsconfig.json`.
//!
//! Scopes are keyed by the directory holding the configuration file. A file
//! expands an alias with the nearest enclosing scope that defines a matching
//! prefix, falling back to the built-in default scope.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use super::paths::{join, parent_dir, file_name};
use crate::error::ResolverError;

/// Configuration file names that define alias scopes, in priority order.
pub const ALIAS_CONFIG_FILES: &[&str] = &["tsconfig.json", "jsconfig.json"];

const DEFAULT_ALIASES: &[(&str, &str)] = &[("@/", "src/"), ("~/", "")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// Import prefix, e.g. `@/` (from `@/*`).
    pub prefix: String,
    /// Repository-relative replacement prefix.
    pub target: String,
    /// The key had no trailing `*` and only matches verbatim.
    pub exact: bool,
}

#[derive(Debug, Clone)]
pub struct AliasScope {
    /// Directory holding the configuration file (`""` for the root).
    pub scope_dir: String,
    /// Resolved `compilerOptions.baseUrl`, if set.
    pub base_root: Option<String>,
    /// Longest prefix first.
    pub aliases: Vec<AliasEntry>,
}

impl AliasScope {
    /// The scope used when no configuration file encloses an importer.
    pub fn builtin() -> Self {
        let mut scope = Self {
            scope_dir: String::new(),
            base_root: None,
            aliases: Vec::new(),
        };
        scope.merge_defaults("");
        scope
    }

    /// Parse one configuration file. `path` is repository-relative.
    pub fn parse(path: &str, content: &str) -> Result<Self, ResolverError> {
        let cleaned = strip_jsonc(content);
        let value: Value =
            serde_json::from_str(&cleaned).map_err(|e| ResolverError::ConfigParse {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        if !value.is_object() {
            return Err(ResolverError::ConfigParse {
                path: path.to_string(),
                reason: "top-level value is not an object".to_string(),
            });
        }

        let scope_dir = parent_dir(path).to_string();
        let options = value.get("compilerOptions");
        let base_root = options
            .and_then(|o| o.get("baseUrl"))
            .and_then(Value::as_str)
            .map(|base| join(&scope_dir, base));
        let anchor = base_root.clone().unwrap_or_else(|| scope_dir.clone());

        let mut aliases = Vec::new();
        if let Some(paths) = options.and_then(|o| o.get("paths")).and_then(Value::as_object) {
            for (key, targets) in paths {
                let first = match targets {
                    Value::Array(items) => items.first().and_then(Value::as_str),
                    Value::String(s) => Some(s.as_str()),
                    _ => None,
                };
                let Some(first) = first else {
                    debug!(config = path, alias = key, "alias has no string target");
                    continue;
                };
                let exact = !key.ends_with('*');
                aliases.push(AliasEntry {
                    prefix: key.trim_end_matches('*').to_string(),
                    target: target_prefix(&anchor, first.trim_end_matches('*')),
                    exact,
                });
            }
        }

        let mut scope = Self {
            scope_dir,
            base_root,
            aliases,
        };
        scope.merge_defaults(&anchor);
        Ok(scope)
    }

    fn merge_defaults(&mut self, anchor: &str) {
        for (prefix, target) in DEFAULT_ALIASES {
            if self.aliases.iter().any(|a| a.prefix == *prefix) {
                continue;
            }
            self.aliases.push(AliasEntry {
                prefix: prefix.to_string(),
                target: target_prefix(anchor, target),
                exact: false,
            });
        }
        self.aliases
            .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
    }

    /// Expand `spec` with the longest matching alias.
    pub fn expand(&self, spec: &str) -> Option<String> {
        self.aliases.iter().find_map(|alias| {
            if alias.exact {
                (spec == alias.prefix).then(|| alias.target.clone())
            } else {
                spec.strip_prefix(alias.prefix.as_str())
                    .map(|rest| format!("{}{}", alias.target, rest))
            }
        })
    }
}

/// Replacement prefix relative to `anchor`, keeping a trailing `/` when the
/// configured target had one.
fn target_prefix(anchor: &str, target: &str) -> String {
    let joined = join(anchor, target);
    if joined.is_empty() || !(target.ends_with('/') || target.is_empty()) {
        joined
    } else {
        format!("{}/", joined)
    }
}

/// All alias scopes of a repository.
#[derive(Debug, Clone)]
pub struct AliasScopes {
    scopes: HashMap<String, AliasScope>,
    fallback: AliasScope,
}

impl Default for AliasScopes {
    fn default() -> Self {
        Self {
            scopes: HashMap::new(),
            fallback: AliasScope::builtin(),
        }
    }
}

impl AliasScopes {
    /// Build scopes from `(path, content)` pairs. Non-configuration paths are
    /// ignored; malformed files are logged and skipped.
    pub fn discover<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut candidates: Vec<(usize, &str, &str)> = files
            .into_iter()
            .filter_map(|(path, content)| {
                let rank = ALIAS_CONFIG_FILES
                    .iter()
                    .position(|name| *name == file_name(path))?;
                Some((rank, path, content))
            })
            .collect();
        candidates.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(&b.0)));

        let mut scopes: HashMap<String, AliasScope> = HashMap::new();
        let mut ranks: HashMap<String, usize> = HashMap::new();
        for (rank, path, content) in candidates {
            let dir = parent_dir(path).to_string();
            if ranks.get(&dir).is_some_and(|&r| r <= rank) {
                continue;
            }
            match AliasScope::parse(path, content) {
                Ok(scope) => {
                    debug!(
                        config = path,
                        aliases = scope.aliases.len(),
                        "discovered alias scope"
                    );
                    ranks.insert(dir.clone(), rank);
                    scopes.insert(dir, scope);
                }
                Err(e) => warn!("{}", e),
            }
        }

        Self {
            scopes,
            fallback: AliasScope::builtin(),
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scopes enclosing `file_path`, nearest first.
    pub fn enclosing<'s>(&'s self, file_path: &str) -> Vec<&'s AliasScope> {
        let mut found = Vec::new();
        let mut dir = parent_dir(file_path);
        loop {
            if let Some(scope) = self.scopes.get(dir) {
                found.push(scope);
            }
            if dir.is_empty() {
                break;
            }
            dir = parent_dir(dir);
        }
        found
    }

    /// Nearest enclosing scope, or the built-in one.
    pub fn nearest(&self, file_path: &str) -> &AliasScope {
        self.enclosing(file_path)
            .into_iter()
            .next()
            .unwrap_or(&self.fallback)
    }

    /// Expand an aliased import for a file, if any alias matches.
    pub fn expand(&self, file_path: &str, spec: &str) -> Option<String> {
        self.enclosing(file_path)
            .into_iter()
            .find_map(|scope| scope.expand(spec))
            .or_else(|| self.fallback.expand(spec))
    }

    /// Base resolution root of the nearest scope.
    pub fn base_root(&self, file_path: &str) -> Option<&str> {
        self.nearest(file_path).base_root.as_deref()
    }
}

/// Strip `//` and `/* */` comments and trailing commas so a relaxed
/// JSON configuration parses as standard JSON.
pub fn strip_jsonc(input: &str) -> String {
    let mut without_comments = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            without_comments.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        without_comments.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                without_comments.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        without_comments.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        without_comments.push('\n');
                    }
                    prev = next;
                }
            }
            _ => without_comments.push(c),
        }
    }

    // trailing commas: a ',' whose next significant char closes a container
    let chars: Vec<char> = without_comments.chars().collect();
    let mut output = String::with_capacity(chars.len());
    let mut in_string = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            output.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    output.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            output.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                output.push(c);
            }
        } else {
            output.push(c);
        }
        i += 1;
    }
    output
}

//! Normalization of raw import statements into module specifiers.
//!
//! Inputs that do not look like an import statement of their language are
//! treated as specifiers already and passed through unchanged.

use super::paths::{file_stem, is_relative};
use crate::language::Language;

/// Module specifiers named by one raw import statement.
///
/// Never returns an empty list for non-blank input, so an unparseable
/// statement still surfaces as an external reference.
pub fn normalize(raw: &str, language: Language, importer: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let specs = match language {
        Language::Python => python(raw),
        Language::JavaScript | Language::TypeScript => javascript(raw),
        Language::Go => go(raw),
        Language::Java => java(raw),
        Language::Rust => rust(raw, importer),
        Language::C | Language::Cpp => include(raw),
        Language::Php => Vec::new(),
    };

    if specs.is_empty() {
        vec![raw.to_string()]
    } else {
        specs
    }
}

fn python(raw: &str) -> Vec<String> {
    if let Some(rest) = raw.strip_prefix("from ") {
        let module = rest.split(" import").next().unwrap_or("").trim();
        return vec![python_module(module)];
    }
    if let Some(rest) = raw.strip_prefix("import ") {
        return rest
            .split(',')
            .map(|part| part.split(" as ").next().unwrap_or("").trim())
            .filter(|m| !m.is_empty())
            .map(python_module)
            .collect();
    }
    Vec::new()
}

/// `..pkg.mod` -> `../pkg/mod`; absolute dotted names stay dotted.
fn python_module(module: &str) -> String {
    if is_relative(module) && module.contains('/') {
        return module.to_string();
    }
    let level = module.chars().take_while(|c| *c == '.').count();
    if level == 0 {
        return module.to_string();
    }
    let rest = module[level..].replace('.', "/");
    let mut spec = if level == 1 {
        ".".to_string()
    } else {
        vec![".."; level - 1].join("/")
    };
    if !rest.is_empty() {
        spec.push('/');
        spec.push_str(&rest);
    }
    spec
}

fn javascript(raw: &str) -> Vec<String> {
    let literals = quoted_literals(raw);
    if raw.starts_with("import") && !raw.starts_with("import(") || raw.starts_with("export") {
        return literals.last().cloned().into_iter().collect();
    }
    if raw.starts_with("require") || raw.starts_with("import(") {
        return literals.first().cloned().into_iter().collect();
    }
    Vec::new()
}

fn go(raw: &str) -> Vec<String> {
    if raw.starts_with("import") {
        quoted_literals(raw)
    } else {
        Vec::new()
    }
}

fn java(raw: &str) -> Vec<String> {
    let Some(rest) = raw.strip_prefix("import ") else {
        return Vec::new();
    };
    let rest = rest.trim().trim_end_matches(';').trim();
    let rest = rest.strip_prefix("static ").unwrap_or(rest).trim();
    vec![rest.to_string()]
}

fn include(raw: &str) -> Vec<String> {
    let Some(rest) = raw.strip_prefix('#') else {
        return Vec::new();
    };
    let Some(target) = rest.trim_start().strip_prefix("include") else {
        return Vec::new();
    };
    let target = target.trim();
    if let Some(local) = target.strip_prefix('"').and_then(|t| t.split('"').next()) {
        return vec![if is_relative(local) {
            local.to_string()
        } else {
            format!("./{}", local)
        }];
    }
    if target.starts_with('<') {
        let end = target.find('>').map(|i| i + 1).unwrap_or(target.len());
        return vec![target[..end].to_string()];
    }
    Vec::new()
}

fn rust(raw: &str, importer: &str) -> Vec<String> {
    let stmt = strip_visibility(raw.trim_end_matches(';').trim());

    if let Some(name) = stmt.strip_prefix("mod ") {
        let name = name.trim();
        // children of lib.rs/main.rs/mod.rs live beside them, others in a subdirectory
        return match file_stem(importer) {
            "lib" | "main" | "mod" => vec![format!("./{}", name)],
            stem => vec![format!("./{}/{}", stem, name)],
        };
    }

    if let Some(tree) = stmt.strip_prefix("use ") {
        let tree = tree.trim().trim_start_matches("::");
        return expand_use_tree(tree);
    }

    Vec::new()
}

fn strip_visibility(stmt: &str) -> &str {
    let Some(rest) = stmt.strip_prefix("pub") else {
        return stmt;
    };
    let rest = rest.trim_start();
    if rest.starts_with('(') {
        match rest.find(')') {
            Some(close) => rest[close + 1..].trim_start(),
            None => rest,
        }
    } else {
        rest
    }
}

/// `a::{b, c::{d, e as f}}` -> `a::b`, `a::c::d`, `a::c::e`
fn expand_use_tree(tree: &str) -> Vec<String> {
    let tree = tree.trim();
    let Some(open) = tree.find('{') else {
        let path = tree.split(" as ").next().unwrap_or(tree).trim();
        return if path.is_empty() { Vec::new() } else { vec![path.to_string()] };
    };
    let close = tree.rfind('}').unwrap_or(tree.len());
    let prefix = tree[..open].trim().trim_end_matches("::");
    let inner = if open + 1 <= close { &tree[open + 1..close] } else { "" };

    let mut out = Vec::new();
    for item in split_top_level(inner) {
        for sub in expand_use_tree(item) {
            let full = match (prefix.is_empty(), sub.as_str()) {
                (true, _) => sub.clone(),
                (false, "self") => prefix.to_string(),
                (false, _) => format!("{}::{}", prefix, sub),
            };
            out.push(full);
        }
    }
    out
}

fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Contents of every `'...'`, `"..."` or `` `...` `` literal, in order.
fn quoted_literals(text: &str) -> Vec<String> {
    let mut literals = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '"' || c == '\'' || c == '`' {
            let mut literal = String::new();
            let mut closed = false;
            while let Some(inner) = chars.next() {
                if inner == '\\' {
                    if let Some(escaped) = chars.next() {
                        literal.push(escaped);
                    }
                    continue;
                }
                if inner == c {
                    closed = true;
                    break;
                }
                literal.push(inner);
            }
            if closed {
                literals.push(literal);
            }
        }
    }
    literals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_forms() {
        assert_eq!(normalize("import os, app.models as m", Language::Python, "a.py"), vec!["os", "app.models"]);
        assert_eq!(normalize("from . import utils", Language::Python, "pkg/a.py"), vec!["."]);
        assert_eq!(normalize("from .utils import x", Language::Python, "a.py"), vec!["./utils"]);
        assert_eq!(
            normalize("from ...core.models import User", Language::Python, "a.py"),
            vec!["../../core/models"]
        );
        assert_eq!(normalize("./b", Language::Python, "a.py"), vec!["./b"]);
    }

    #[test]
    fn test_javascript_forms() {
        assert_eq!(normalize("import { a } from './a';", Language::TypeScript, "x.ts"), vec!["./a"]);
        assert_eq!(normalize("import './styles.css'", Language::JavaScript, "x.js"), vec!["./styles.css"]);
        assert_eq!(normalize("export * from \"@/lib\"", Language::TypeScript, "x.ts"), vec!["@/lib"]);
        assert_eq!(normalize("require('../util')", Language::JavaScript, "x.js"), vec!["../util"]);
        assert_eq!(normalize("import('./lazy')", Language::JavaScript, "x.js"), vec!["./lazy"]);
        assert_eq!(normalize("lodash", Language::JavaScript, "x.js"), vec!["lodash"]);
    }

    #[test]
    fn test_go_block() {
        let raw = "import (\n\t\"fmt\"\n\tlog \"github.com/acme/app/log\"\n)";
        assert_eq!(normalize(raw, Language::Go, "main.go"), vec!["fmt", "github.com/acme/app/log"]);
    }

    #[test]
    fn test_java_forms() {
        assert_eq!(normalize("import com.acme.Foo;", Language::Java, "A.java"), vec!["com.acme.Foo"]);
        assert_eq!(
            normalize("import static com.acme.Util.max;", Language::Java, "A.java"),
            vec!["com.acme.Util.max"]
        );
        assert_eq!(normalize("import com.acme.*;", Language::Java, "A.java"), vec!["com.acme.*"]);
    }

    #[test]
    fn test_rust_forms() {
        assert_eq!(
            normalize("use crate::config::{self, Loader, nested::{A, B as C}};", Language::Rust, "src/lib.rs"),
            vec!["crate::config", "crate::config::Loader", "crate::config::nested::A", "crate::config::nested::B"]
        );
        assert_eq!(normalize("pub(crate) mod store;", Language::Rust, "src/lib.rs"), vec!["./store"]);
        assert_eq!(normalize("mod parse;", Language::Rust, "src/query.rs"), vec!["./query/parse"]);
    }

    #[test]
    fn test_includes() {
        assert_eq!(normalize("#include \"util.h\"", Language::C, "src/main.c"), vec!["./util.h"]);
        assert_eq!(normalize("#include \"../inc/a.h\"", Language::Cpp, "src/main.cpp"), vec!["../inc/a.h"]);
        assert_eq!(normalize("#include <vector>", Language::Cpp, "a.cpp"), vec!["<vector>"]);
    }
}

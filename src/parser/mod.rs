//! Structural parsing: source text to functions, classes and raw imports.
//!
//! Every parser implements [`StructuralParser`] and is looked up by language
//! tag in a [`ParserRegistry`]. Parsers never fail past their boundary: a
//! syntax error or an unknown language comes back as
//! [`ParseResult::parse_error`] with empty lists.

mod generic;
mod grammars;
mod python;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tree_sitter::{Node, Tree};

use crate::metrics::{FILES_PARSED, PARSE_ERRORS};

pub use generic::GenericParser;
pub use grammars::{grammar_key, ParserPool};
pub use python::PythonParser;

/// A function or method found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    /// 1-indexed, inclusive.
    pub line_start: usize,
    /// 1-indexed, inclusive.
    pub line_end: usize,
    /// Parameter names; variadics keep their marker (`*args`, `**kwargs`, `...rest`).
    pub params: Vec<String>,
    pub is_async: bool,
    pub return_type: Option<String>,
    pub docstring: Option<String>,
    /// Name of the enclosing class, if any. A name lookup, not ownership.
    pub parent_class: Option<String>,
}

/// A class-like type (class, struct, interface, trait, enum).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub line_start: usize,
    pub line_end: usize,
    pub methods: Vec<String>,
    /// Base or parent type names, reduced to simple names.
    pub bases: Vec<String>,
    pub docstring: Option<String>,
}

/// Output of one parse. Missing optional fields mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    /// Raw import statements, verbatim and unnormalized.
    pub imports: Vec<String>,
    pub parse_error: Option<String>,
}

impl ParseResult {
    /// An empty result carrying an error marker.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            parse_error: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.parse_error.is_none()
    }

    /// Functions whose lines no class or enclosing function of this file
    /// already spans: standalone functions, and methods defined away from
    /// their type (Rust `impl` blocks, Go receivers, out-of-line C++ members).
    pub fn uncovered_functions(&self) -> impl Iterator<Item = &FunctionInfo> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(i, f)| !self.inside_own_class(f) && !self.inside_earlier_function(*i, f))
            .map(|(_, f)| f)
    }

    fn inside_own_class(&self, func: &FunctionInfo) -> bool {
        let Some(parent) = func.parent_class.as_deref() else {
            return false;
        };
        self.classes.iter().any(|c| {
            c.name == parent && c.line_start <= func.line_start && func.line_end <= c.line_end
        })
    }

    // parsers emit an enclosing function before the functions inside it
    fn inside_earlier_function(&self, index: usize, func: &FunctionInfo) -> bool {
        self.functions[..index]
            .iter()
            .any(|outer| outer.line_start <= func.line_start && func.line_end <= outer.line_end)
    }
}

/// A per-language structural extractor.
pub trait StructuralParser: Send + Sync {
    /// Language tag this parser is registered under.
    fn language_id(&self) -> &'static str;

    /// Extract structure from `source`. `path` only informs grammar choice
    /// (e.g. `.tsx` vs `.ts`); it is never read.
    fn parse(&self, source: &str, path: &Path) -> ParseResult;
}

/// Capability table from language tag to parser.
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn StructuralParser>>,
}

impl ParserRegistry {
    /// Registry with every built-in parser.
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };

        registry.register(Arc::new(PythonParser));
        registry.register(Arc::new(GenericParser::javascript()));
        registry.register(Arc::new(GenericParser::typescript()));
        registry.register(Arc::new(GenericParser::go()));
        registry.register(Arc::new(GenericParser::java()));
        registry.register(Arc::new(GenericParser::rust()));
        registry.register(Arc::new(GenericParser::c()));
        registry.register(Arc::new(GenericParser::cpp()));

        registry
    }

    /// Register or replace the parser for its language tag.
    pub fn register(&mut self, parser: Arc<dyn StructuralParser>) {
        self.parsers
            .insert(parser.language_id().to_string(), parser);
    }

    pub fn get(&self, language: &str) -> Option<&dyn StructuralParser> {
        self.parsers.get(language).map(|p| p.as_ref())
    }

    pub fn supports(&self, language: &str) -> bool {
        self.parsers.contains_key(language)
    }

    pub fn supported_languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.parsers.keys().map(|s| s.as_str()).collect();
        langs.sort_unstable();
        langs
    }

    /// Parse `source` with the parser registered for `language`.
    pub fn parse(&self, source: &str, path: &Path, language: &str) -> ParseResult {
        let result = match self.parsers.get(language) {
            Some(parser) => parser.parse(source, path),
            None => ParseResult::failed(format!("Unsupported language: {}", language)),
        };

        FILES_PARSED.inc();
        if let Some(err) = &result.parse_error {
            PARSE_ERRORS.inc();
            tracing::debug!(path = %path.display(), language, error = %err, "parse failed");
        }

        result
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Text covered by `node`.
pub(crate) fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

pub(crate) fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn all_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// 1-indexed inclusive line span of a node.
pub(crate) fn line_span(node: &Node) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

/// Describe the first syntax error in `tree`, if any.
pub(crate) fn syntax_error(tree: &Tree) -> Option<String> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }
    let node = first_error_node(root).unwrap_or(root);
    let line = node.start_position().row + 1;
    if node.is_missing() {
        Some(format!("invalid syntax at line {}: missing '{}'", line, node.kind()))
    } else {
        Some(format!("invalid syntax at line {}", line))
    }
}

fn first_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    all_children(&node).into_iter().find_map(first_error_node)
}

/// Reduce a heritage clause like `extends a.Base<T> implements I` to simple names.
pub(crate) fn simple_type_names(text: &str) -> Vec<String> {
    const KEYWORDS: &[&str] = &[
        "extends", "implements", "public", "private", "protected", "virtual", "final",
    ];

    let mut stripped = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }

    stripped
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|tok| tok.trim_matches(|c: char| c == ':' || c == '{' || c == '&' || c == '*'))
        .filter(|tok| !tok.is_empty() && !KEYWORDS.contains(tok))
        .map(|tok| {
            tok.rsplit(|c: char| c == '.' || c == ':')
                .next()
                .unwrap_or(tok)
                .to_string()
        })
        .filter(|tok| !tok.is_empty())
        .collect()
}

/// Order-preserving dedup.
pub(crate) fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_languages() {
        let registry = ParserRegistry::new();
        let langs = registry.supported_languages();
        for lang in ["c", "cpp", "go", "java", "javascript", "python", "rust", "typescript"] {
            assert!(langs.contains(&lang), "missing {}", lang);
        }
        assert!(!registry.supports("php"));
    }

    #[test]
    fn test_unsupported_language_is_marker() {
        let registry = ParserRegistry::new();
        let result = registry.parse("<?php echo 1;", Path::new("a.php"), "php");
        assert_eq!(result.parse_error.as_deref(), Some("Unsupported language: php"));
        assert!(result.functions.is_empty());
        assert!(result.classes.is_empty());
        assert!(result.imports.is_empty());
    }

    #[test]
    fn test_simple_type_names() {
        assert_eq!(
            simple_type_names("extends React.Component<Props> implements IFoo, bar.IBar"),
            vec!["Component", "IFoo", "IBar"]
        );
        assert_eq!(simple_type_names(": public ns::Base, private Other"), vec!["Base", "Other"]);
    }

    fn func(name: &str, span: (usize, usize), parent: Option<&str>) -> FunctionInfo {
        FunctionInfo {
            name: name.into(),
            line_start: span.0,
            line_end: span.1,
            params: vec![],
            is_async: false,
            return_type: None,
            docstring: None,
            parent_class: parent.map(str::to_string),
        }
    }

    fn uncovered(result: &ParseResult) -> Vec<&str> {
        result.uncovered_functions().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_uncovered_functions_by_span() {
        let result = ParseResult {
            classes: vec![ClassInfo {
                name: "Cache".into(),
                line_start: 1,
                line_end: 3,
                methods: vec![],
                bases: vec![],
                docstring: None,
            }],
            functions: vec![
                // impl method below the struct
                func("lookup", (6, 8), Some("Cache")),
                func("outer", (10, 14), None),
                func("inner", (11, 12), None),
                // method of a type declared elsewhere
                func("resize", (16, 18), Some("Widget")),
                func("inline", (2, 2), Some("Cache")),
            ],
            ..Default::default()
        };
        assert_eq!(uncovered(&result), vec!["lookup", "outer", "resize"]);
    }

    #[test]
    fn test_rust_impl_and_go_receiver_methods_are_uncovered() {
        let registry = ParserRegistry::new();
        let rust = "struct Cache {\n    items: Vec<u8>,\n}\n\nimpl Cache {\n    fn lookup_secret_value(&self) -> u8 {\n        self.items[0]\n    }\n}\n";
        let result = registry.parse(rust, Path::new("cache.rs"), "rust");
        assert!(result.is_ok());
        assert_eq!(uncovered(&result), vec!["lookup_secret_value"]);

        let go = "package store\n\nfunc (s *Store) Lookup(key string) string {\n\treturn key\n}\n";
        let result = registry.parse(go, Path::new("store.go"), "go");
        assert_eq!(uncovered(&result), vec!["Lookup"]);

        let cpp = "class Widget {\n public:\n  void resize(int w);\n};\n\nvoid Widget::resize(int w) {\n  width = w;\n}\n";
        let result = registry.parse(cpp, Path::new("widget.cpp"), "cpp");
        assert_eq!(uncovered(&result), vec!["resize"]);
    }

    #[test]
    fn test_python_nested_function_is_covered() {
        let registry = ParserRegistry::new();
        let source = "def outer(x):\n    def helper(y):\n        return y\n    return helper(x)\n\nclass A:\n    def run(self):\n        def step():\n            pass\n";
        let result = registry.parse(source, Path::new("a.py"), "python");
        assert_eq!(result.functions.len(), 4);
        assert_eq!(uncovered(&result), vec!["outer"]);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let registry = ParserRegistry::new();
        let source = "import os\n\nclass A(Base):\n    def run(self, *args, **kw):\n        pass\n\ndef main():\n    return 1\n";
        let first = registry.parse(source, Path::new("a.py"), "python");
        let second = registry.parse(source, Path::new("a.py"), "python");
        assert!(first.is_ok());
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

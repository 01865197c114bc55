//! Tree-sitter grammar registration and per-thread parser reuse.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use tree_sitter::{Language, Parser, Tree};

/// Lazily-configured tree-sitter parsers keyed by grammar name.
///
/// `tree_sitter::Parser` is not `Sync`, so each worker thread holds its own
/// pool (see [`parse_source`]).
pub struct ParserPool {
    parsers: HashMap<String, Parser>,
    languages: HashMap<String, Language>,
}

impl ParserPool {
    pub fn new() -> Self {
        let mut pool = Self {
            parsers: HashMap::new(),
            languages: HashMap::new(),
        };

        pool.register_language("python", tree_sitter_python::LANGUAGE.into());
        pool.register_language("javascript", tree_sitter_javascript::LANGUAGE.into());
        pool.register_language("typescript", tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into());
        pool.register_language("tsx", tree_sitter_typescript::LANGUAGE_TSX.into());
        pool.register_language("go", tree_sitter_go::LANGUAGE.into());
        pool.register_language("java", tree_sitter_java::LANGUAGE.into());
        pool.register_language("rust", tree_sitter_rust::LANGUAGE.into());
        pool.register_language("c", tree_sitter_c::LANGUAGE.into());
        pool.register_language("cpp", tree_sitter_cpp::LANGUAGE.into());

        pool
    }

    fn register_language(&mut self, id: &str, language: Language) {
        self.languages.insert(id.to_string(), language);
    }

    /// Parser for `grammar`, created on first use.
    pub fn get_parser(&mut self, grammar: &str) -> Option<&mut Parser> {
        if self.parsers.contains_key(grammar) {
            return self.parsers.get_mut(grammar);
        }

        let language = self.languages.get(grammar)?;
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(language) {
            debug!("Failed to set grammar '{}': {:?}", grammar, e);
            return None;
        }

        self.parsers.insert(grammar.to_string(), parser);
        self.parsers.get_mut(grammar)
    }

    pub fn supports(&self, grammar: &str) -> bool {
        self.languages.contains_key(grammar)
    }
}

impl Default for ParserPool {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static POOL: RefCell<ParserPool> = RefCell::new(ParserPool::new());
}

/// Grammar to use for a language tag, refined by the file extension.
pub fn grammar_key(language: &str, path: &Path) -> Option<&'static str> {
    let is_tsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tsx"));

    match language {
        "typescript" if is_tsx => Some("tsx"),
        "typescript" => Some("typescript"),
        "javascript" => Some("javascript"),
        "python" => Some("python"),
        "go" => Some("go"),
        "java" => Some("java"),
        "rust" => Some("rust"),
        "c" => Some("c"),
        "cpp" => Some("cpp"),
        _ => None,
    }
}

/// Parse `source` with this thread's parser for `grammar`.
pub(crate) fn parse_source(grammar: &str, source: &str) -> Option<Tree> {
    POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        let parser = pool.get_parser(grammar)?;
        parser.parse(source, None)
    })
}

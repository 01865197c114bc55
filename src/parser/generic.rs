//! Table-driven tree-sitter parser shared by every non-Python language.
//!
//! Each language supplies the node kinds that count as functions, classes
//! and imports. Docstrings are not extracted here and stay `None`.

use std::path::Path;

use tree_sitter::Node;

use super::grammars::{grammar_key, parse_source};
use super::{
    dedup_preserving_order, line_span, named_children, node_text, all_children,
    simple_type_names, syntax_error, ClassInfo, FunctionInfo, ParseResult, StructuralParser,
};

struct NodeKinds {
    functions: &'static [&'static str],
    classes: &'static [&'static str],
    imports: &'static [&'static str],
}

/// A tree-sitter backed parser configured for one language tag.
pub struct GenericParser {
    language: &'static str,
    kinds: NodeKinds,
}

impl GenericParser {
    pub fn javascript() -> Self {
        Self {
            language: "javascript",
            kinds: NodeKinds {
                functions: &[
                    "function_declaration",
                    "generator_function_declaration",
                    "method_definition",
                ],
                classes: &["class_declaration"],
                imports: &["import_statement"],
            },
        }
    }

    /// TypeScript; `.tsx` files switch to the TSX grammar.
    pub fn typescript() -> Self {
        Self {
            language: "typescript",
            kinds: NodeKinds {
                functions: &[
                    "function_declaration",
                    "generator_function_declaration",
                    "method_definition",
                ],
                classes: &[
                    "class_declaration",
                    "abstract_class_declaration",
                    "interface_declaration",
                ],
                imports: &["import_statement"],
            },
        }
    }

    pub fn go() -> Self {
        Self {
            language: "go",
            kinds: NodeKinds {
                functions: &["function_declaration", "method_declaration"],
                classes: &["type_declaration"],
                imports: &["import_declaration"],
            },
        }
    }

    pub fn java() -> Self {
        Self {
            language: "java",
            kinds: NodeKinds {
                functions: &["method_declaration", "constructor_declaration"],
                classes: &[
                    "class_declaration",
                    "interface_declaration",
                    "enum_declaration",
                    "record_declaration",
                ],
                imports: &["import_declaration"],
            },
        }
    }

    pub fn rust() -> Self {
        Self {
            language: "rust",
            kinds: NodeKinds {
                functions: &["function_item"],
                classes: &["struct_item", "enum_item", "trait_item", "union_item"],
                imports: &["use_declaration"],
            },
        }
    }

    pub fn c() -> Self {
        Self {
            language: "c",
            kinds: NodeKinds {
                functions: &["function_definition"],
                classes: &["struct_specifier"],
                imports: &["preproc_include"],
            },
        }
    }

    pub fn cpp() -> Self {
        Self {
            language: "cpp",
            kinds: NodeKinds {
                functions: &["function_definition"],
                classes: &["class_specifier", "struct_specifier"],
                imports: &["preproc_include"],
            },
        }
    }

    fn is_js_family(&self) -> bool {
        matches!(self.language, "javascript" | "typescript")
    }

    fn is_c_family(&self) -> bool {
        matches!(self.language, "c" | "cpp")
    }
}

impl StructuralParser for GenericParser {
    fn language_id(&self) -> &'static str {
        self.language
    }

    fn parse(&self, source: &str, path: &Path) -> ParseResult {
        let Some(grammar) = grammar_key(self.language, path) else {
            return ParseResult::failed(format!("Unsupported language: {}", self.language));
        };
        let Some(tree) = parse_source(grammar, source) else {
            return ParseResult::failed("parser produced no syntax tree");
        };
        if let Some(err) = syntax_error(&tree) {
            return ParseResult::failed(err);
        }

        let mut collector = Collector::new(source.as_bytes());
        self.visit(tree.root_node(), &mut collector, &Scope::default());
        collector.finish()
    }
}

/// Enclosing class context while walking the tree.
#[derive(Clone, Default)]
struct Scope {
    class: Option<String>,
    /// Inside a function body below `class`.
    nested: bool,
}

struct Collector<'s> {
    source: &'s [u8],
    functions: Vec<FunctionInfo>,
    /// Indices into `functions` of direct class members.
    members: Vec<usize>,
    classes: Vec<ClassInfo>,
    imports: Vec<String>,
}

impl<'s> Collector<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            functions: Vec::new(),
            members: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
        }
    }

    fn push_function(&mut self, func: FunctionInfo, scope: &Scope) {
        if func.parent_class.is_some() && !scope.nested {
            self.members.push(self.functions.len());
        }
        self.functions.push(func);
    }

    fn finish(mut self) -> ParseResult {
        for class in &mut self.classes {
            let methods = self
                .members
                .iter()
                .map(|&i| &self.functions[i])
                .filter(|f| f.parent_class.as_deref() == Some(class.name.as_str()))
                .map(|f| f.name.clone())
                .collect();
            class.methods = dedup_preserving_order(methods);
        }

        ParseResult {
            functions: self.functions,
            classes: self.classes,
            imports: dedup_preserving_order(self.imports),
            parse_error: None,
        }
    }
}

impl GenericParser {
    fn visit(&self, node: Node, out: &mut Collector, scope: &Scope) {
        let src = out.source;

        if self.is_import(&node, src) {
            out.imports.push(node_text(&node, src).trim().to_string());
            return;
        }

        let kind = node.kind();
        let mut inner = scope.clone();

        if self.kinds.classes.contains(&kind) {
            let classes = self.class_infos(&node, src);
            if let Some(last) = classes.last() {
                inner = Scope {
                    class: Some(last.name.clone()),
                    nested: false,
                };
            }
            out.classes.extend(classes);
        } else if self.kinds.functions.contains(&kind) {
            let func = self.function_info(&node, src, scope);
            out.push_function(func, scope);
            inner.nested = inner.class.is_some();
        } else if matches!(
            kind,
            "variable_declarator" | "field_definition" | "public_field_definition"
        ) {
            if let Some(func) = self.bound_function(&node, src, scope) {
                out.push_function(func, scope);
                inner.nested = inner.class.is_some();
            }
        } else if kind == "impl_item" {
            if let Some(ty) = node.child_by_field_name("type") {
                inner = Scope {
                    class: Some(strip_generics(node_text(&ty, src))),
                    nested: false,
                };
            }
        }

        for child in named_children(&node) {
            self.visit(child, out, &inner);
        }
    }

    fn is_import(&self, node: &Node, src: &[u8]) -> bool {
        let kind = node.kind();
        if self.kinds.imports.contains(&kind) {
            return true;
        }
        match self.language {
            "rust" => kind == "mod_item" && node.child_by_field_name("body").is_none(),
            "javascript" | "typescript" => match kind {
                "export_statement" => node.child_by_field_name("source").is_some(),
                "call_expression" => node
                    .child_by_field_name("function")
                    .map(|f| f.kind() == "import" || node_text(&f, src) == "require")
                    .unwrap_or(false),
                _ => false,
            },
            _ => false,
        }
    }

    fn class_infos(&self, node: &Node, src: &[u8]) -> Vec<ClassInfo> {
        if node.kind() == "type_declaration" {
            return named_children(node)
                .into_iter()
                .filter(|spec| spec.kind() == "type_spec")
                .filter(|spec| {
                    spec.child_by_field_name("type")
                        .is_some_and(|t| matches!(t.kind(), "struct_type" | "interface_type"))
                })
                .map(|spec| {
                    let name = field_text(&spec, "name", src).unwrap_or_else(anonymous);
                    new_class(name, &spec, Vec::new())
                })
                .collect();
        }

        if self.is_c_family() && node.child_by_field_name("body").is_none() {
            // forward declaration or `struct x` used as a type
            return Vec::new();
        }

        let name = field_text(node, "name", src)
            .or_else(|| self.typedef_name(node, src))
            .unwrap_or_else(anonymous);
        let bases = self.class_bases(node, src);
        vec![new_class(name, node, bases)]
    }

    /// `typedef struct { ... } Name;`
    fn typedef_name(&self, node: &Node, src: &[u8]) -> Option<String> {
        let parent = node.parent()?;
        if parent.kind() != "type_definition" {
            return None;
        }
        field_text(&parent, "declarator", src)
    }

    fn class_bases(&self, node: &Node, src: &[u8]) -> Vec<String> {
        let mut text = String::new();
        match self.language {
            "java" => {
                for field in ["superclass", "interfaces"] {
                    if let Some(t) = field_text(node, field, src) {
                        text.push_str(&t);
                        text.push(' ');
                    }
                }
                for child in named_children(node) {
                    if child.kind() == "extends_interfaces" {
                        text.push_str(node_text(&child, src));
                    }
                }
            }
            "javascript" | "typescript" | "cpp" => {
                for child in named_children(node) {
                    if matches!(child.kind(), "class_heritage" | "extends_type_clause" | "base_class_clause") {
                        text.push_str(node_text(&child, src));
                        text.push(' ');
                    }
                }
            }
            _ => {}
        }
        simple_type_names(&text)
    }

    fn function_info(&self, node: &Node, src: &[u8], scope: &Scope) -> FunctionInfo {
        let (line_start, line_end) = line_span(node);
        let (name, qualifier) = self.function_name(node, src);

        let parent_class = if self.language == "go" {
            node.child_by_field_name("receiver")
                .map(|r| go_receiver_type(node_text(&r, src)))
        } else {
            scope.class.clone().or(qualifier)
        };

        let params = self
            .params_node(node)
            .map(|p| parameter_names(&p, src))
            .unwrap_or_default();

        FunctionInfo {
            name,
            line_start,
            line_end,
            params,
            is_async: has_async(node, src),
            return_type: self.return_type(node, src),
            docstring: None,
            parent_class,
        }
    }

    /// `const f = async (a) => ...` and class fields holding functions.
    fn bound_function(&self, node: &Node, src: &[u8], scope: &Scope) -> Option<FunctionInfo> {
        if !self.is_js_family() {
            return None;
        }
        let value = node.child_by_field_name("value")?;
        if !matches!(
            value.kind(),
            "arrow_function" | "function_expression" | "function" | "generator_function"
        ) {
            return None;
        }
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"))?;
        if !matches!(
            name_node.kind(),
            "identifier" | "property_identifier" | "private_property_identifier"
        ) {
            return None;
        }

        let span_node = match node.parent() {
            Some(p)
                if node.kind() == "variable_declarator"
                    && matches!(p.kind(), "lexical_declaration" | "variable_declaration") =>
            {
                p
            }
            _ => *node,
        };
        let (line_start, line_end) = line_span(&span_node);

        let params = match value.child_by_field_name("parameters") {
            Some(p) => parameter_names(&p, src),
            None => value
                .child_by_field_name("parameter")
                .map(|p| vec![node_text(&p, src).to_string()])
                .unwrap_or_default(),
        };

        Some(FunctionInfo {
            name: node_text(&name_node, src).to_string(),
            line_start,
            line_end,
            params,
            is_async: has_async(&value, src),
            return_type: field_text(&value, "return_type", src).map(|t| clean_annotation(&t)),
            docstring: None,
            parent_class: scope.class.clone(),
        })
    }

    /// Function name plus an optional qualifying type (`Foo::bar` in C++).
    fn function_name(&self, node: &Node, src: &[u8]) -> (String, Option<String>) {
        if self.is_c_family() {
            if let Some(decl) = c_function_declarator(node) {
                if let Some(inner) = decl.child_by_field_name("declarator") {
                    if inner.kind() == "qualified_identifier" {
                        let scope = field_text(&inner, "scope", src).map(|s| strip_generics(&s));
                        let name = field_text(&inner, "name", src)
                            .unwrap_or_else(|| node_text(&inner, src).to_string());
                        return (name, scope);
                    }
                    return (node_text(&inner, src).to_string(), None);
                }
            }
            return (anonymous(), None);
        }

        (field_text(node, "name", src).unwrap_or_else(anonymous), None)
    }

    fn params_node<'t>(&self, node: &Node<'t>) -> Option<Node<'t>> {
        if self.is_c_family() {
            return c_function_declarator(node)?.child_by_field_name("parameters");
        }
        node.child_by_field_name("parameters")
    }

    fn return_type(&self, node: &Node, src: &[u8]) -> Option<String> {
        let field = match self.language {
            "go" => "result",
            "java" | "c" | "cpp" => "type",
            _ => "return_type",
        };
        field_text(node, field, src).map(|t| clean_annotation(&t))
    }
}

fn new_class(name: String, node: &Node, bases: Vec<String>) -> ClassInfo {
    let (line_start, line_end) = line_span(node);
    ClassInfo {
        name,
        line_start,
        line_end,
        methods: Vec::new(),
        bases,
        docstring: None,
    }
}

fn anonymous() -> String {
    "anonymous".to_string()
}

fn field_text(node: &Node, field: &str, src: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| node_text(&n, src).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `: Promise<void>` and `-> Result<()>` style annotations without the leader.
fn clean_annotation(text: &str) -> String {
    text.trim().trim_start_matches(':').trim().to_string()
}

fn strip_generics(text: &str) -> String {
    let end = text.find(['<', '[']).unwrap_or(text.len());
    text[..end].trim().to_string()
}

/// `(s *Server[T])` -> `Server`
fn go_receiver_type(receiver: &str) -> String {
    let inner = receiver.trim().trim_start_matches('(').trim_end_matches(')');
    let ty = inner.split_whitespace().last().unwrap_or(inner);
    strip_generics(ty.trim_start_matches('*'))
}

/// Walk `declarator` fields down to the `function_declarator`.
fn c_function_declarator<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        if current.kind() == "function_declarator" {
            return Some(current);
        }
        current = current.child_by_field_name("declarator")?;
    }
}

fn has_async(node: &Node, src: &[u8]) -> bool {
    all_children(node).iter().any(|child| match child.kind() {
        "async" => true,
        "function_modifiers" => node_text(child, src).split_whitespace().any(|m| m == "async"),
        _ => false,
    })
}

fn parameter_names(params: &Node, src: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    for child in named_children(params) {
        collect_param(&child, src, &mut names);
    }
    names
}

fn collect_param(node: &Node, src: &[u8], out: &mut Vec<String>) {
    match node.kind() {
        "comment" | "line_comment" | "block_comment" | "attribute_item" | "decorator"
        | "type_identifier" | "primitive_type" | "sized_type_specifier" => {}
        "identifier" | "shorthand_property_identifier_pattern" | "field_identifier" => {
            out.push(node_text(node, src).to_string());
        }
        "self_parameter" => out.push("self".to_string()),
        "variadic_parameter" => out.push("...".to_string()),
        "rest_pattern" | "variadic_parameter_declaration" | "spread_parameter" => {
            let mut inner = Vec::new();
            match node.child_by_field_name("name") {
                Some(name) => inner.push(node_text(&name, src).to_string()),
                None => {
                    for child in named_children(node) {
                        if matches!(child.kind(), "identifier" | "variable_declarator") {
                            collect_param(&child, src, &mut inner);
                        }
                    }
                }
            }
            out.extend(inner.into_iter().take(1).map(|n| format!("...{}", n)));
        }
        "variable_declarator" => {
            if let Some(name) = node.child_by_field_name("name") {
                out.push(node_text(&name, src).to_string());
            }
        }
        "assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                collect_param(&left, src, out);
            }
        }
        "required_parameter" | "optional_parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                collect_param(&pattern, src, out);
            }
        }
        "parameter" => {
            if let Some(pattern) = node.child_by_field_name("pattern") {
                let text = node_text(&pattern, src);
                out.push(text.trim_start_matches("mut ").trim().to_string());
            }
        }
        "formal_parameter" | "parameter_declaration" | "optional_parameter_declaration"
        | "pointer_declarator" | "reference_declarator" | "array_declarator"
        | "init_declarator" | "function_declarator" | "parenthesized_declarator" => {
            let mut cursor = node.walk();
            let named: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
            if !named.is_empty() {
                out.extend(named.iter().map(|n| node_text(n, src).to_string()));
            } else if let Some(decl) = node.child_by_field_name("declarator") {
                collect_param(&decl, src, out);
            } else if node.kind().ends_with("_declarator") {
                if let Some(last) = named_children(node).last() {
                    collect_param(last, src, out);
                }
            }
        }
        _ => out.push(node_text(node, src).trim().to_string()),
    }
}

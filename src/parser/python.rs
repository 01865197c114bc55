//! Deep parser for Python.
//!
//! Reports docstrings, return annotations and variadic parameter markers
//! on top of what the generic parser extracts.

use std::path::Path;

use tree_sitter::Node;

use super::grammars::parse_source;
use super::{
    all_children, dedup_preserving_order, line_span, named_children, node_text, syntax_error,
    ClassInfo, FunctionInfo, ParseResult, StructuralParser,
};

pub struct PythonParser;

impl StructuralParser for PythonParser {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn parse(&self, source: &str, _path: &Path) -> ParseResult {
        let Some(tree) = parse_source("python", source) else {
            return ParseResult::failed("parser produced no syntax tree");
        };
        if let Some(err) = syntax_error(&tree) {
            return ParseResult::failed(err);
        }

        let src = source.as_bytes();
        let mut result = ParseResult::default();
        walk(tree.root_node(), src, None, &mut result);
        result.imports = dedup_preserving_order(std::mem::take(&mut result.imports));
        result
    }
}

fn walk(node: Node, src: &[u8], class: Option<&str>, out: &mut ParseResult) {
    match node.kind() {
        "import_statement" | "import_from_statement" | "future_import_statement" => {
            out.imports.push(node_text(&node, src).trim().to_string());
            return;
        }
        "function_definition" => {
            out.functions.push(function_info(&node, src, class));
        }
        "class_definition" => {
            let info = class_info(&node, src);
            let name = info.name.clone();
            out.classes.push(info);
            for child in named_children(&node) {
                walk(child, src, Some(&name), out);
            }
            return;
        }
        _ => {}
    }

    for child in named_children(&node) {
        walk(child, src, class, out);
    }
}

fn function_info(node: &Node, src: &[u8], class: Option<&str>) -> FunctionInfo {
    let (line_start, line_end) = line_span(node);
    FunctionInfo {
        name: name_of(node, src),
        line_start,
        line_end,
        params: node
            .child_by_field_name("parameters")
            .map(|p| parameters(&p, src))
            .unwrap_or_default(),
        is_async: all_children(node).iter().any(|c| c.kind() == "async"),
        return_type: node
            .child_by_field_name("return_type")
            .map(|r| node_text(&r, src).trim().to_string()),
        docstring: docstring(node, src),
        parent_class: class.map(str::to_string),
    }
}

fn class_info(node: &Node, src: &[u8]) -> ClassInfo {
    let (line_start, line_end) = line_span(node);

    let methods = node
        .child_by_field_name("body")
        .map(|body| {
            named_children(&body)
                .into_iter()
                .filter_map(|stmt| match stmt.kind() {
                    "function_definition" => Some(stmt),
                    "decorated_definition" => stmt
                        .child_by_field_name("definition")
                        .filter(|d| d.kind() == "function_definition"),
                    _ => None,
                })
                .map(|f| name_of(&f, src))
                .collect()
        })
        .unwrap_or_default();

    let bases = node
        .child_by_field_name("superclasses")
        .map(|args| {
            named_children(&args)
                .iter()
                .filter_map(|arg| base_name(arg, src))
                .collect()
        })
        .unwrap_or_default();

    ClassInfo {
        name: name_of(node, src),
        line_start,
        line_end,
        methods,
        bases,
        docstring: docstring(node, src),
    }
}

fn name_of(node: &Node, src: &[u8]) -> String {
    node.child_by_field_name("name")
        .map(|n| node_text(&n, src).to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Simple name of a base class expression; keyword arguments are skipped.
fn base_name(arg: &Node, src: &[u8]) -> Option<String> {
    match arg.kind() {
        "keyword_argument" | "comment" | "list_splat" | "dictionary_splat" => None,
        "identifier" => Some(node_text(arg, src).to_string()),
        "attribute" => arg
            .child_by_field_name("attribute")
            .map(|a| node_text(&a, src).to_string()),
        "subscript" => arg
            .child_by_field_name("value")
            .and_then(|v| base_name(&v, src)),
        _ => {
            let text = node_text(arg, src);
            text.rsplit('.').next().map(|s| s.trim().to_string())
        }
    }
}

fn parameters(params: &Node, src: &[u8]) -> Vec<String> {
    named_children(params)
        .iter()
        .filter_map(|p| parameter_name(p, src))
        .collect()
}

fn parameter_name(param: &Node, src: &[u8]) -> Option<String> {
    match param.kind() {
        "identifier" => Some(node_text(param, src).to_string()),
        "list_splat_pattern" => splat_inner(param, src).map(|n| format!("*{}", n)),
        "dictionary_splat_pattern" => splat_inner(param, src).map(|n| format!("**{}", n)),
        "default_parameter" | "typed_default_parameter" => param
            .child_by_field_name("name")
            .and_then(|n| parameter_name(&n, src)),
        // typed_parameter has no name field; the first named child is the pattern
        "typed_parameter" => named_children(param)
            .first()
            .and_then(|n| parameter_name(n, src)),
        _ => None,
    }
}

fn splat_inner(node: &Node, src: &[u8]) -> Option<String> {
    named_children(node)
        .into_iter()
        .find(|c| c.kind() == "identifier")
        .map(|c| node_text(&c, src).to_string())
}

fn docstring(node: &Node, src: &[u8]) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = named_children(&body).into_iter().next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = named_children(&first).into_iter().next()?;
    if expr.kind() != "string" {
        return None;
    }
    Some(clean_docstring(node_text(&expr, src)))
}

fn strip_string_quotes(literal: &str) -> &str {
    let body = literal.trim_start_matches(|c: char| "rRuUbBfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return &body[quote.len()..body.len() - quote.len()];
        }
    }
    body
}

/// Dedent a docstring the way `inspect.cleandoc` does.
fn clean_docstring(literal: &str) -> String {
    let body = strip_string_quotes(literal);
    let lines: Vec<&str> = body.lines().collect();

    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<&str> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            cleaned.push(line.trim());
            continue;
        }
        let lead = line.len() - line.trim_start().len();
        let cut = lead.min(indent);
        let cut = if line.is_char_boundary(cut) { cut } else { lead };
        cleaned.push(line[cut..].trim_end());
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

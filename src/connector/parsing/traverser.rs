use tree_sitter::Node;

use super::registry::LanguageSpec;
use crate::domain::ChunkKind;

/// A chunk-worthy node discovered by the traversal, before metadata
/// extraction. `node` is the span the chunk covers; for variable-bound
/// function expressions it is the whole declaration, while `body` points at
/// the function expression the metrics run over.
pub struct ChunkCandidate<'a> {
    pub node: Node<'a>,
    pub body: Node<'a>,
    pub kind: ChunkKind,
    pub name: String,
    pub symbol_type: &'static str,
    pub parent_class: Option<String>,
}

/// Walks container bodies and collects every node that starts a chunk.
///
/// Class chunks enclose their method chunks (the only allowed overlap);
/// nothing else is descended into, so nested functions stay part of their
/// parent's chunk.
pub fn collect_chunks<'a>(
    spec: &LanguageSpec,
    root: Node<'a>,
    source: &str,
) -> Vec<ChunkCandidate<'a>> {
    let mut out = Vec::new();
    visit_children(spec, root, source, None, &mut out);
    out.sort_by_key(|c| (c.node.start_byte(), c.node.end_byte()));
    out
}

fn visit_children<'a>(
    spec: &LanguageSpec,
    node: Node<'a>,
    source: &str,
    class_ctx: Option<&str>,
    out: &mut Vec<ChunkCandidate<'a>>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        classify(spec, child, source, class_ctx, out);
    }
}

fn classify<'a>(
    spec: &LanguageSpec,
    node: Node<'a>,
    source: &str,
    class_ctx: Option<&str>,
    out: &mut Vec<ChunkCandidate<'a>>,
) {
    let kind = node.kind();

    if spec.chunk_targets.contains(&kind) {
        if spec.class_kinds.contains(&kind) {
            let name = field_text(node, "name", source);
            if !name.is_empty() {
                out.push(ChunkCandidate {
                    node,
                    body: node,
                    kind: ChunkKind::Class,
                    name: name.clone(),
                    symbol_type: "class",
                    parent_class: class_ctx.map(str::to_string),
                });
            }
            if let Some(body) = node.child_by_field_name("body") {
                visit_children(spec, body, source, Some(&name), out);
            }
            return;
        }

        if spec.interface_kinds.contains(&kind) {
            let name = field_text(node, "name", source);
            if !name.is_empty() {
                out.push(ChunkCandidate {
                    node,
                    body: node,
                    kind: ChunkKind::Interface,
                    name,
                    symbol_type: "interface",
                    parent_class: None,
                });
            }
            return;
        }

        // Function-like target. Inside a class body it is a method.
        let is_method = class_ctx.is_some()
            || kind == "method_definition"
            || kind == "method_declaration";
        let name = field_text(node, "name", source);
        if name.is_empty() {
            return;
        }
        let (chunk_kind, symbol_type) = if is_method {
            (ChunkKind::Method, "method")
        } else {
            (ChunkKind::Function, "function")
        };
        out.push(ChunkCandidate {
            node,
            body: node,
            kind: chunk_kind,
            name,
            symbol_type,
            parent_class: class_ctx.map(str::to_string),
        });
        return;
    }

    if spec.variable_declaration_kinds.contains(&kind) {
        collect_bound_functions(spec, node, source, out);
        return;
    }

    if spec.containers.contains(&kind) {
        visit_children(spec, node, source, class_ctx, out);
    }
}

/// `const handler = async (req) => ...` produces a single function chunk
/// spanning the declaration's lines, named after the variable.
fn collect_bound_functions<'a>(
    spec: &LanguageSpec,
    declaration: Node<'a>,
    source: &str,
    out: &mut Vec<ChunkCandidate<'a>>,
) {
    let mut cursor = declaration.walk();
    for declarator in declaration.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let value = match declarator.child_by_field_name("value") {
            Some(v) => v,
            None => continue,
        };
        if !spec.function_value_kinds.contains(&value.kind()) {
            continue;
        }
        let name = field_text(declarator, "name", source);
        if name.is_empty() {
            continue;
        }
        out.push(ChunkCandidate {
            node: declaration,
            body: value,
            kind: ChunkKind::Function,
            name,
            symbol_type: "function",
            parent_class: None,
        });
    }
}

/// Text of a node's named field, or empty when absent.
pub fn field_text(node: Node<'_>, field: &str, source: &str) -> String {
    node.child_by_field_name(field)
        .map(|n| source[n.byte_range()].to_string())
        .unwrap_or_default()
}

/// 1-based inclusive line span of a node.
pub fn line_span(node: Node<'_>) -> (u32, u32) {
    (
        node.start_position().row as u32 + 1,
        node.end_position().row as u32 + 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::parsing::registry::{grammar_for, spec_for};
    use crate::domain::Language;
    use tree_sitter::Parser;

    fn parse(language: Language, source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&grammar_for(language, language.extensions()[0]).unwrap())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn test_typescript_functions_and_classes() {
        let source = r#"
export function handle(req: Request): Response {
    return respond(req);
}

class Service {
    start(): void {}
    stop(): void {}
}
"#;
        let tree = parse(Language::TypeScript, source);
        let spec = spec_for(Language::TypeScript).unwrap();
        let chunks = collect_chunks(spec, tree.root_node(), source);

        let names: Vec<(&str, ChunkKind)> = chunks
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("handle", ChunkKind::Function),
                ("Service", ChunkKind::Class),
                ("start", ChunkKind::Method),
                ("stop", ChunkKind::Method),
            ]
        );
        assert_eq!(chunks[2].parent_class.as_deref(), Some("Service"));
    }

    #[test]
    fn test_variable_bound_arrow_function() {
        let source = "export const add = (a: number, b: number) => a + b;\n";
        let tree = parse(Language::TypeScript, source);
        let spec = spec_for(Language::TypeScript).unwrap();
        let chunks = collect_chunks(spec, tree.root_node(), source);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "add");
        assert_eq!(chunks[0].kind, ChunkKind::Function);
        // The chunk spans the whole declaration, not just the arrow body.
        assert!(source[chunks[0].node.byte_range()].starts_with("const add"));
    }

    #[test]
    fn test_python_methods_get_parent_class() {
        let source = r#"
class Calculator:
    def add(self, a, b):
        return a + b

def free():
    pass
"#;
        let tree = parse(Language::Python, source);
        let spec = spec_for(Language::Python).unwrap();
        let chunks = collect_chunks(spec, tree.root_node(), source);

        let add = chunks.iter().find(|c| c.name == "add").unwrap();
        assert_eq!(add.kind, ChunkKind::Method);
        assert_eq!(add.parent_class.as_deref(), Some("Calculator"));

        let free = chunks.iter().find(|c| c.name == "free").unwrap();
        assert_eq!(free.kind, ChunkKind::Function);
        assert!(free.parent_class.is_none());
    }

    #[test]
    fn test_nested_functions_are_not_chunked() {
        let source = r#"
def outer():
    def inner():
        pass
    return inner
"#;
        let tree = parse(Language::Python, source);
        let spec = spec_for(Language::Python).unwrap();
        let chunks = collect_chunks(spec, tree.root_node(), source);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "outer");
    }

    #[test]
    fn test_php_class_and_interface() {
        let source = r#"<?php
interface Shape {
    public function area(): float;
}

class Circle {
    public function area(): float {
        return 3.14 * $this->r * $this->r;
    }
}

function main(): void {}
"#;
        let tree = parse(Language::Php, source);
        let spec = spec_for(Language::Php).unwrap();
        let chunks = collect_chunks(spec, tree.root_node(), source);

        assert!(chunks
            .iter()
            .any(|c| c.name == "Shape" && c.kind == ChunkKind::Interface));
        assert!(chunks
            .iter()
            .any(|c| c.name == "Circle" && c.kind == ChunkKind::Class));
        let area = chunks
            .iter()
            .find(|c| c.name == "area" && c.kind == ChunkKind::Method)
            .expect("method chunk");
        assert_eq!(area.parent_class.as_deref(), Some("Circle"));
        assert!(chunks
            .iter()
            .any(|c| c.name == "main" && c.kind == ChunkKind::Function));
    }
}

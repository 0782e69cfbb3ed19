use tree_sitter::Node;

use super::registry::LanguageSpec;
use super::traverser::field_text;
use crate::domain::ChunkSymbols;

/// Maximum length of a persisted signature.
const SIGNATURE_LIMIT: usize = 200;

/// The declaration header: everything up to the opening brace/arrow,
/// clipped to 200 characters.
pub fn extract_signature(node: Node<'_>, source: &str) -> Option<String> {
    let text = &source[node.byte_range()];

    // Prefer structure: the header ends after the parameter list and
    // optional return type.
    let structural_end = node
        .child_by_field_name("return_type")
        .or_else(|| node.child_by_field_name("parameters"))
        .map(|n| n.end_byte().saturating_sub(node.start_byte()));

    let end = structural_end.or_else(|| {
        // Fall back to scanning for the body opener.
        text.find("=>").or_else(|| text.find('{'))
    });

    let header = match end {
        Some(e) => text[..e.min(text.len())].trim(),
        None => text.lines().next().unwrap_or("").trim(),
    };
    if header.is_empty() {
        return None;
    }

    let mut signature = header.split_whitespace().collect::<Vec<_>>().join(" ");
    if signature.len() > SIGNATURE_LIMIT {
        signature.truncate(SIGNATURE_LIMIT);
    }
    Some(signature)
}

/// The declared parameters, one entry per parameter, verbatim.
pub fn extract_parameters(node: Node<'_>, source: &str) -> Vec<String> {
    let params = match node.child_by_field_name("parameters") {
        Some(p) => p,
        None => return Vec::new(),
    };
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        if param.kind() == "comment" {
            continue;
        }
        let text = source[param.byte_range()].trim().to_string();
        if !text.is_empty() {
            out.push(text);
        }
    }
    out
}

/// Names defined inside a chunk's subtree, bucketed by construct.
pub fn extract_chunk_symbols(spec: &LanguageSpec, node: Node<'_>, source: &str) -> ChunkSymbols {
    let mut symbols = ChunkSymbols::default();
    collect(spec, node, source, &mut symbols);
    symbols
}

fn collect(spec: &LanguageSpec, node: Node<'_>, source: &str, out: &mut ChunkSymbols) {
    let kind = node.kind();
    if spec.chunk_targets.contains(&kind) {
        let name = field_text(node, "name", source);
        if !name.is_empty() {
            if spec.class_kinds.contains(&kind) {
                push_unique(&mut out.classes, name);
            } else if spec.interface_kinds.contains(&kind) {
                push_unique(&mut out.interfaces, name);
            } else {
                push_unique(&mut out.functions, name);
            }
        }
    } else if spec.variable_declaration_kinds.contains(&kind) {
        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let bound_fn = declarator
                .child_by_field_name("value")
                .map(|v| spec.function_value_kinds.contains(&v.kind()))
                .unwrap_or(false);
            if bound_fn {
                let name = field_text(declarator, "name", source);
                if !name.is_empty() {
                    push_unique(&mut out.functions, name);
                }
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(spec, child, source, out);
    }
}

fn push_unique(bucket: &mut Vec<String>, name: String) {
    if !bucket.contains(&name) {
        bucket.push(name);
    }
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

    fn find<'a>(node: tree_sitter::Node<'a>, kind: &str) -> Option<tree_sitter::Node<'a>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(found) = find(child, kind) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn test_signature_stops_before_body() {
        let source = "function greet(name: string): string {\n    return name;\n}";
        let tree = parse(Language::TypeScript, source);
        let node = find(tree.root_node(), "function_declaration").unwrap();
        let signature = extract_signature(node, source).unwrap();
        assert_eq!(signature, "function greet(name: string): string");
    }

    #[test]
    fn test_signature_is_clipped() {
        let long_params: Vec<String> = (0..40).map(|i| format!("parameter_{i}: number")).collect();
        let source = format!("function f({}) {{}}", long_params.join(", "));
        let tree = parse(Language::TypeScript, &source);
        let node = find(tree.root_node(), "function_declaration").unwrap();
        let signature = extract_signature(node, &source).unwrap();
        assert!(signature.len() <= 200);
    }

    #[test]
    fn test_parameters_extraction() {
        let source = "def fetch(url, timeout=30, *args, **kwargs):\n    pass\n";
        let tree = parse(Language::Python, source);
        let node = find(tree.root_node(), "function_definition").unwrap();
        let params = extract_parameters(node, source);
        assert_eq!(params, vec!["url", "timeout=30", "*args", "**kwargs"]);
    }

    #[test]
    fn test_chunk_symbols_buckets() {
        let source = r#"
export class Service {}
export interface Options {}
export function run() {}
const go = () => 1;
"#;
        let tree = parse(Language::TypeScript, source);
        let spec = spec_for(Language::TypeScript).unwrap();
        let symbols = extract_chunk_symbols(spec, tree.root_node(), source);
        assert_eq!(symbols.classes, vec!["Service"]);
        assert_eq!(symbols.interfaces, vec!["Options"]);
        assert_eq!(symbols.functions, vec!["run", "go"]);
    }
}

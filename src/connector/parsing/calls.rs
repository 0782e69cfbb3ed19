use tree_sitter::Node;

use super::registry::LanguageSpec;
use crate::domain::CallSite;

/// Names that show up as call expressions but are import machinery, not
/// call-graph signal.
const SKIPPED_CALLEES: &[&str] = &["require", "import"];

/// Collects every call site in the file, in source order. The chunker
/// filters them down to each chunk's line span.
pub fn collect_call_sites(spec: &LanguageSpec, root: Node<'_>, source: &str) -> Vec<CallSite> {
    let mut sites = Vec::new();
    walk(spec, root, source, &mut sites);
    sites
}

fn walk(spec: &LanguageSpec, node: Node<'_>, source: &str, out: &mut Vec<CallSite>) {
    if spec.call_kinds.contains(&node.kind()) {
        if let Some(symbol) = callee_name(node, source) {
            if !symbol.is_empty() && !SKIPPED_CALLEES.contains(&symbol.as_str()) {
                out.push(CallSite {
                    symbol,
                    line: node.start_position().row as u32 + 1,
                });
            }
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(spec, child, source, out);
    }
}

/// Resolves the called symbol for a call-expression node. Member calls
/// resolve to the member name (`logger.warn(..)` -> `warn`).
fn callee_name(node: Node<'_>, source: &str) -> Option<String> {
    // TS/JS call_expression / new_expression, Python call.
    for field in ["function", "constructor"] {
        if let Some(target) = node.child_by_field_name(field) {
            return target_name(target, source);
        }
    }
    // PHP member/scoped calls carry the method under `name`; object
    // creation carries the class as its first named child.
    if let Some(name) = node.child_by_field_name("name") {
        return Some(source[name.byte_range()].to_string());
    }
    node.named_child(0)
        .filter(|c| matches!(c.kind(), "name" | "qualified_name" | "identifier"))
        .map(|c| source[c.byte_range()].to_string())
}

fn target_name(target: Node<'_>, source: &str) -> Option<String> {
    match target.kind() {
        "identifier" | "name" => Some(source[target.byte_range()].to_string()),
        "member_expression" => target
            .child_by_field_name("property")
            .map(|p| source[p.byte_range()].to_string()),
        "attribute" => target
            .child_by_field_name("attribute")
            .map(|a| source[a.byte_range()].to_string()),
        "variable_name" => Some(source[target.byte_range()].trim_start_matches('$').to_string()),
        _ => None,
    }
}

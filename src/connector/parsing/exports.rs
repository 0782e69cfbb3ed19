use tree_sitter::Node;

use super::registry::LanguageSpec;
use super::traverser::field_text;

/// Extracts the names a file makes importable.
///
/// TS/JS walk top-level export statements; implicit-export languages
/// (Python, PHP) list every top-level declaration instead.
pub fn extract_exports(spec: &LanguageSpec, root: Node<'_>, source: &str) -> Vec<String> {
    let mut exports = Vec::new();
    if spec.language.has_explicit_exports() {
        collect_explicit_exports(root, source, &mut exports);
    } else {
        collect_top_level_declarations(spec, root, source, &mut exports);
    }
    exports.dedup();
    exports
}

fn collect_explicit_exports(root: Node<'_>, source: &str, exports: &mut Vec<String>) {
    let mut cursor = root.walk();
    for statement in root.named_children(&mut cursor) {
        if statement.kind() != "export_statement" {
            continue;
        }

        if let Some(declaration) = statement.child_by_field_name("declaration") {
            collect_declaration_names(declaration, source, exports);
            continue;
        }

        let mut names = Vec::new();
        let mut inner = statement.walk();
        for child in statement.named_children(&mut inner) {
            match child.kind() {
                "export_clause" => {
                    let mut spec_cursor = child.walk();
                    for specifier in child.named_children(&mut spec_cursor) {
                        // `export { a as b }` exposes `b`.
                        let alias = field_text(specifier, "alias", source);
                        let name = if alias.is_empty() {
                            field_text(specifier, "name", source)
                        } else {
                            alias
                        };
                        if !name.is_empty() {
                            names.push(name);
                        }
                    }
                }
                // `export default expr` with no named declaration.
                "identifier" => names.push(source[child.byte_range()].to_string()),
                _ => {}
            }
        }
        if names.is_empty() && is_default_export(statement) {
            names.push("default".to_string());
        }
        exports.extend(names);
    }
}

fn collect_declaration_names(declaration: Node<'_>, source: &str, exports: &mut Vec<String>) {
    match declaration.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = declaration.walk();
            for declarator in declaration.named_children(&mut cursor) {
                if declarator.kind() == "variable_declarator" {
                    let name = field_text(declarator, "name", source);
                    if !name.is_empty() {
                        exports.push(name);
                    }
                }
            }
        }
        _ => {
            let name = field_text(declaration, "name", source);
            if !name.is_empty() {
                exports.push(name);
            } else if declaration
                .parent()
                .map(is_default_export)
                .unwrap_or(false)
            {
                exports.push("default".to_string());
            }
        }
    }
}

fn is_default_export(statement: Node<'_>) -> bool {
    let mut cursor = statement.walk();
    let result = statement
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == "default");
    result
}

fn collect_top_level_declarations(
    spec: &LanguageSpec,
    node: Node<'_>,
    source: &str,
    exports: &mut Vec<String>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let kind = child.kind();
        if spec.chunk_targets.contains(&kind) {
            let name = field_text(child, "name", source);
            if !name.is_empty() {
                exports.push(name);
            }
            continue;
        }
        // Descend through namespaces and decorators, not into bodies.
        if spec.containers.contains(&kind) {
            collect_top_level_declarations(spec, child, source, exports);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::parsing::registry::{grammar_for, spec_for};
    use crate::domain::Language;
    use tree_sitter::Parser;

    fn exports_of(language: Language, source: &str) -> Vec<String> {
        let mut parser = Parser::new();
        parser
            .set_language(&grammar_for(language, language.extensions()[0]).unwrap())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        extract_exports(spec_for(language).unwrap(), tree.root_node(), source)
    }

    #[test]
    fn test_typescript_export_forms() {
        let exports = exports_of(
            Language::TypeScript,
            r#"
export const x = 1;
export function handle(): void {}
export class Service {}
export interface Options {}
const hidden = 2;
export { hidden as visible };
"#,
        );
        assert_eq!(exports, vec!["x", "handle", "Service", "Options", "visible"]);
    }

    #[test]
    fn test_default_export() {
        let exports = exports_of(Language::TypeScript, "export default function main() {}\n");
        assert_eq!(exports, vec!["main"]);

        let anonymous = exports_of(Language::JavaScript, "export default { a: 1 };\n");
        assert_eq!(anonymous, vec!["default"]);
    }

    #[test]
    fn test_python_lists_top_level_declarations() {
        let exports = exports_of(
            Language::Python,
            r#"
import os

def fetch():
    def inner():
        pass

class Client:
    def get(self):
        pass
"#,
        );
        // Nested defs and methods are not top-level.
        assert_eq!(exports, vec!["fetch", "Client"]);
    }

    #[test]
    fn test_php_lists_top_level_declarations() {
        let exports = exports_of(
            Language::Php,
            r#"<?php
namespace App;

function helper(): void {}

class Worker {}
interface Runnable {}
"#,
        );
        assert_eq!(exports, vec!["helper", "Worker", "Runnable"]);
    }
}

use std::collections::BTreeMap;

use tree_sitter::Node;

use crate::domain::Language;

/// Import information extracted once at the file root and attached to every
/// chunk of the file.
#[derive(Debug, Clone, Default)]
pub struct FileImports {
    /// Raw import/require paths, in source order, deduplicated.
    pub paths: Vec<String>,
    /// Mapping `import path -> imported symbols`.
    pub symbols: BTreeMap<String, Vec<String>>,
}

impl FileImports {
    fn record(&mut self, path: String, symbols: Vec<String>) {
        if path.is_empty() {
            return;
        }
        if !self.paths.contains(&path) {
            self.paths.push(path.clone());
        }
        let entry = self.symbols.entry(path).or_default();
        for symbol in symbols {
            if !symbol.is_empty() && !entry.contains(&symbol) {
                entry.push(symbol);
            }
        }
    }
}

/// Extracts raw import paths and the per-path symbol lists.
pub fn extract_imports(language: Language, root: Node<'_>, source: &str) -> FileImports {
    let mut imports = FileImports::default();
    match language {
        Language::TypeScript | Language::JavaScript => {
            walk(root, &mut |node| visit_js(node, source, &mut imports))
        }
        Language::Python => walk(root, &mut |node| visit_python(node, source, &mut imports)),
        Language::Php => walk(root, &mut |node| visit_php(node, source, &mut imports)),
        Language::Unknown => {}
    }
    imports
}

fn walk<'a>(node: Node<'a>, f: &mut impl FnMut(Node<'a>)) {
    f(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, f);
    }
}

fn visit_js(node: Node<'_>, source: &str, imports: &mut FileImports) {
    match node.kind() {
        "import_statement" | "export_statement" => {
            let path = match node.child_by_field_name("source") {
                Some(s) => strip_quotes(&source[s.byte_range()]),
                None => return,
            };
            let mut symbols = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "import_clause" => collect_import_clause(child, source, &mut symbols),
                    "export_clause" => collect_specifiers(child, source, &mut symbols),
                    _ => {}
                }
            }
            imports.record(path, symbols);
        }
        "call_expression" => {
            // const x = require('./y') and bare require('./y')
            let callee = node
                .child_by_field_name("function")
                .map(|f| &source[f.byte_range()]);
            if callee != Some("require") {
                return;
            }
            let argument = node
                .child_by_field_name("arguments")
                .and_then(|args| args.named_child(0))
                .filter(|arg| arg.kind() == "string")
                .map(|arg| strip_quotes(&source[arg.byte_range()]));
            let path = match argument {
                Some(p) => p,
                None => return,
            };
            let mut symbols = Vec::new();
            if let Some(declarator) = enclosing_declarator(node) {
                if let Some(name) = declarator.child_by_field_name("name") {
                    match name.kind() {
                        "identifier" => symbols.push(source[name.byte_range()].to_string()),
                        "object_pattern" => {
                            let mut cursor = name.walk();
                            for prop in name.named_children(&mut cursor) {
                                symbols.push(source[prop.byte_range()].to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            imports.record(path, symbols);
        }
        _ => {}
    }
}

fn collect_import_clause(clause: Node<'_>, source: &str, symbols: &mut Vec<String>) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => symbols.push(source[child.byte_range()].to_string()),
            "named_imports" => collect_specifiers(child, source, symbols),
            "namespace_import" => symbols.push("*".to_string()),
            _ => {}
        }
    }
}

fn collect_specifiers(node: Node<'_>, source: &str, symbols: &mut Vec<String>) {
    let mut cursor = node.walk();
    for specifier in node.named_children(&mut cursor) {
        if let Some(name) = specifier.child_by_field_name("name") {
            symbols.push(source[name.byte_range()].to_string());
        }
    }
}

fn enclosing_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "variable_declarator" {
            return Some(n);
        }
        // Stop at statement boundaries.
        if n.kind().ends_with("_statement") || n.kind() == "program" {
            return None;
        }
        current = n.parent();
    }
    None
}

fn visit_python(node: Node<'_>, source: &str, imports: &mut FileImports) {
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                let path_node = if child.kind() == "aliased_import" {
                    child.child_by_field_name("name")
                } else {
                    Some(child)
                };
                if let Some(p) = path_node.filter(|p| p.kind() == "dotted_name") {
                    imports.record(source[p.byte_range()].to_string(), Vec::new());
                }
            }
        }
        "import_from_statement" => {
            let path = match node.child_by_field_name("module_name") {
                Some(m) => source[m.byte_range()].to_string(),
                None => return,
            };
            let mut symbols = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if Some(child) == node.child_by_field_name("module_name") {
                    continue;
                }
                match child.kind() {
                    "dotted_name" => symbols.push(source[child.byte_range()].to_string()),
                    "aliased_import" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            symbols.push(source[name.byte_range()].to_string());
                        }
                    }
                    "wildcard_import" => symbols.push("*".to_string()),
                    _ => {}
                }
            }
            imports.record(path, symbols);
        }
        _ => {}
    }
}

fn visit_php(node: Node<'_>, source: &str, imports: &mut FileImports) {
    match node.kind() {
        "namespace_use_clause" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if matches!(child.kind(), "qualified_name" | "name") {
                    let path = source[child.byte_range()].to_string();
                    let symbol = path.rsplit('\\').next().unwrap_or("").to_string();
                    imports.record(path, vec![symbol]);
                }
            }
        }
        "require_expression" | "require_once_expression" | "include_expression"
        | "include_once_expression" => {
            if let Some(string) = first_string_descendant(node) {
                imports.record(strip_quotes(&source[string.byte_range()]), Vec::new());
            }
        }
        _ => {}
    }
}

fn first_string_descendant(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if matches!(child.kind(), "string" | "encapsed_string") {
            return Some(child);
        }
        if let Some(found) = first_string_descendant(child) {
            return Some(found);
        }
    }
    None
}

/// Strips matching quotes from an import path literal.
pub fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 {
        let bytes = trimmed.as_bytes();
        let (first, last) = (bytes[0], bytes[trimmed.len() - 1]);
        if first == last && matches!(first, b'"' | b'\'' | b'`') {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::parsing::registry::grammar_for;
    use tree_sitter::Parser;

    fn imports_of(language: Language, source: &str) -> FileImports {
        let mut parser = Parser::new();
        parser
            .set_language(&grammar_for(language, language.extensions()[0]).unwrap())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        extract_imports(language, tree.root_node(), source)
    }

    #[test]
    fn test_typescript_named_imports() {
        let imports = imports_of(
            Language::TypeScript,
            r#"
import { log, warn } from './logger';
import fs from 'fs';
import * as path from 'path';
"#,
        );
        assert_eq!(imports.paths, vec!["./logger", "fs", "path"]);
        assert_eq!(imports.symbols["./logger"], vec!["log", "warn"]);
        assert_eq!(imports.symbols["fs"], vec!["fs"]);
        assert_eq!(imports.symbols["path"], vec!["*"]);
    }

    #[test]
    fn test_javascript_require() {
        let imports = imports_of(
            Language::JavaScript,
            r#"
const express = require('express');
const { join, resolve } = require('path');
require('./side-effect');
"#,
        );
        assert_eq!(imports.paths, vec!["express", "path", "./side-effect"]);
        assert_eq!(imports.symbols["express"], vec!["express"]);
        assert_eq!(imports.symbols["path"], vec!["join", "resolve"]);
        assert!(imports.symbols["./side-effect"].is_empty());
    }

    #[test]
    fn test_reexport_records_source() {
        let imports = imports_of(
            Language::TypeScript,
            "export { helper } from './helpers';\n",
        );
        assert_eq!(imports.paths, vec!["./helpers"]);
        assert_eq!(imports.symbols["./helpers"], vec!["helper"]);
    }

    #[test]
    fn test_python_imports() {
        let imports = imports_of(
            Language::Python,
            r#"
import os
import json as j
from collections import OrderedDict, defaultdict
from .util import *
"#,
        );
        assert_eq!(imports.paths, vec!["os", "json", "collections", ".util"]);
        assert!(imports.symbols["os"].is_empty());
        assert_eq!(
            imports.symbols["collections"],
            vec!["OrderedDict", "defaultdict"]
        );
        assert_eq!(imports.symbols[".util"], vec!["*"]);
    }

    #[test]
    fn test_php_use_and_require() {
        let imports = imports_of(
            Language::Php,
            r#"<?php
use App\Services\Mailer;
require_once 'bootstrap.php';
"#,
        );
        assert_eq!(imports.paths, vec!["App\\Services\\Mailer", "bootstrap.php"]);
        assert_eq!(imports.symbols["App\\Services\\Mailer"], vec!["Mailer"]);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'./logger'"), "./logger");
        assert_eq!(strip_quotes("\"fs\""), "fs");
        assert_eq!(strip_quotes("bare"), "bare");
    }
}

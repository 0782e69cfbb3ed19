use crate::domain::Language;

/// Per-language classification tables driving the AST traverser, the
/// complexity engine, and the metadata extractors.
///
/// The underlying parser is stringly-typed, so the tables are too; the rest
/// of the crate only sees the strongly-typed values the traverser produces.
/// Extension goes through adding a `Language` variant plus one entry here.
pub struct LanguageSpec {
    pub language: Language,
    /// Node kinds that start a chunk.
    pub chunk_targets: &'static [&'static str],
    /// Node kinds whose bodies the traverser descends into.
    pub containers: &'static [&'static str],
    /// Class-like kinds: produce `class` chunks and resolve method parents.
    pub class_kinds: &'static [&'static str],
    pub interface_kinds: &'static [&'static str],
    /// Declaration kinds that may bind a function expression to a variable
    /// (`const x = () => ...`).
    pub variable_declaration_kinds: &'static [&'static str],
    /// Function-expression kinds valid as a variable binding's value.
    pub function_value_kinds: &'static [&'static str],

    // Complexity tables.
    pub decision_points: &'static [&'static str],
    pub nesting_kinds: &'static [&'static str],
    /// `else`/`elif`-style kinds: fixed +1 cognitive, no nesting increment.
    pub flat_increment_kinds: &'static [&'static str],
    /// Lambda kinds: +1 cognitive only when already nested.
    pub lambda_kinds: &'static [&'static str],
    /// Binary-expression kinds whose operator must be inspected.
    pub binary_kinds: &'static [&'static str],
    /// Logical operator tokens counted by both metrics.
    pub logical_operators: &'static [&'static str],

    /// Call-expression kinds used to build `call_sites`.
    pub call_kinds: &'static [&'static str],

    /// Named leaf kinds classified as Halstead operands (counted opaquely,
    /// without descending).
    pub halstead_operand_kinds: &'static [&'static str],
}

/// Delimiters excluded from Halstead operator counts.
pub const HALSTEAD_IGNORED_TOKENS: &[&str] = &["(", ")", "[", "]", "{", "}"];

static TYPESCRIPT: LanguageSpec = LanguageSpec {
    language: Language::TypeScript,
    chunk_targets: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "class_declaration",
        "abstract_class_declaration",
        "interface_declaration",
    ],
    containers: &[
        "program",
        "export_statement",
        "class_body",
        "internal_module",
        "ambient_declaration",
    ],
    class_kinds: &["class_declaration", "abstract_class_declaration"],
    interface_kinds: &["interface_declaration"],
    variable_declaration_kinds: &["lexical_declaration", "variable_declaration"],
    function_value_kinds: &["arrow_function", "function_expression", "function"],
    decision_points: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
        "ternary_expression",
        "binary_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "catch_clause",
        "ternary_expression",
    ],
    flat_increment_kinds: &["else_clause"],
    lambda_kinds: &["arrow_function", "function_expression", "function"],
    binary_kinds: &["binary_expression"],
    logical_operators: &["&&", "||", "??"],
    call_kinds: &["call_expression", "new_expression"],
    halstead_operand_kinds: &[
        "identifier",
        "property_identifier",
        "shorthand_property_identifier",
        "private_property_identifier",
        "type_identifier",
        "string",
        "template_string",
        "number",
        "true",
        "false",
        "null",
        "undefined",
        "regex",
    ],
};

static JAVASCRIPT: LanguageSpec = LanguageSpec {
    language: Language::JavaScript,
    chunk_targets: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "class_declaration",
    ],
    containers: &["program", "export_statement", "class_body"],
    class_kinds: &["class_declaration"],
    interface_kinds: &[],
    variable_declaration_kinds: &["lexical_declaration", "variable_declaration"],
    function_value_kinds: &["arrow_function", "function_expression", "function"],
    decision_points: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
        "ternary_expression",
        "binary_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "catch_clause",
        "ternary_expression",
    ],
    flat_increment_kinds: &["else_clause"],
    lambda_kinds: &["arrow_function", "function_expression", "function"],
    binary_kinds: &["binary_expression"],
    logical_operators: &["&&", "||", "??"],
    call_kinds: &["call_expression", "new_expression"],
    halstead_operand_kinds: &[
        "identifier",
        "property_identifier",
        "shorthand_property_identifier",
        "private_property_identifier",
        "string",
        "template_string",
        "number",
        "true",
        "false",
        "null",
        "undefined",
        "regex",
    ],
};

static PYTHON: LanguageSpec = LanguageSpec {
    language: Language::Python,
    chunk_targets: &["function_definition", "class_definition"],
    containers: &["module", "decorated_definition"],
    class_kinds: &["class_definition"],
    interface_kinds: &[],
    variable_declaration_kinds: &[],
    function_value_kinds: &[],
    decision_points: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "except_clause",
        "case_clause",
        "conditional_expression",
        "boolean_operator",
        "elif_clause",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "except_clause",
        "match_statement",
        "conditional_expression",
    ],
    flat_increment_kinds: &["else_clause", "elif_clause"],
    lambda_kinds: &["lambda"],
    binary_kinds: &["boolean_operator"],
    logical_operators: &["and", "or"],
    call_kinds: &["call"],
    halstead_operand_kinds: &[
        "identifier",
        "string",
        "integer",
        "float",
        "true",
        "false",
        "none",
    ],
};

static PHP: LanguageSpec = LanguageSpec {
    language: Language::Php,
    chunk_targets: &[
        "function_definition",
        "method_declaration",
        "class_declaration",
        "interface_declaration",
        "trait_declaration",
    ],
    containers: &["program", "declaration_list", "namespace_definition"],
    class_kinds: &["class_declaration", "trait_declaration"],
    interface_kinds: &["interface_declaration"],
    variable_declaration_kinds: &[],
    function_value_kinds: &[],
    decision_points: &[
        "if_statement",
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
        "case_statement",
        "catch_clause",
        "conditional_expression",
        "binary_expression",
    ],
    nesting_kinds: &[
        "if_statement",
        "for_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
        "switch_statement",
        "catch_clause",
        "conditional_expression",
    ],
    flat_increment_kinds: &["else_clause", "else_if_clause"],
    lambda_kinds: &["anonymous_function", "arrow_function"],
    binary_kinds: &["binary_expression"],
    logical_operators: &["&&", "||", "and", "or", "xor", "??"],
    call_kinds: &[
        "function_call_expression",
        "member_call_expression",
        "scoped_call_expression",
        "object_creation_expression",
    ],
    halstead_operand_kinds: &[
        "name",
        "variable_name",
        "string",
        "encapsed_string",
        "integer",
        "float",
        "boolean",
        "null",
    ],
};

/// Resolves the classification tables for a language.
pub fn spec_for(language: Language) -> Option<&'static LanguageSpec> {
    match language {
        Language::TypeScript => Some(&TYPESCRIPT),
        Language::JavaScript => Some(&JAVASCRIPT),
        Language::Python => Some(&PYTHON),
        Language::Php => Some(&PHP),
        Language::Unknown => None,
    }
}

/// Resolves the grammar handle. The `tsx` extension uses the TSX grammar of
/// the TypeScript crate; everything else is keyed by language alone.
pub fn grammar_for(language: Language, extension: &str) -> Option<tree_sitter::Language> {
    match language {
        Language::TypeScript => {
            if extension.eq_ignore_ascii_case("tsx") {
                Some(tree_sitter_typescript::LANGUAGE_TSX.into())
            } else {
                Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            }
        }
        Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        Language::Php => Some(tree_sitter_php::LANGUAGE_PHP.into()),
        Language::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_language_has_a_spec() {
        for language in Language::all_supported() {
            let spec = spec_for(language).expect("missing spec");
            assert_eq!(spec.language, language);
            assert!(!spec.chunk_targets.is_empty());
            assert!(!spec.decision_points.is_empty());
        }
        assert!(spec_for(Language::Unknown).is_none());
    }

    #[test]
    fn test_grammars_resolve() {
        assert!(grammar_for(Language::TypeScript, "ts").is_some());
        assert!(grammar_for(Language::TypeScript, "tsx").is_some());
        assert!(grammar_for(Language::JavaScript, "js").is_some());
        assert!(grammar_for(Language::Python, "py").is_some());
        assert!(grammar_for(Language::Php, "php").is_some());
        assert!(grammar_for(Language::Unknown, "liquid").is_none());
    }

    #[test]
    fn test_class_kinds_are_chunk_targets() {
        for language in Language::all_supported() {
            let spec = spec_for(language).unwrap();
            for kind in spec.class_kinds {
                assert!(spec.chunk_targets.contains(kind), "{kind} not a target");
            }
        }
    }
}

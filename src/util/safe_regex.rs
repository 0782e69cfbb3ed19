use regex::{Regex, RegexBuilder};

use crate::domain::LienError;

/// Quantifier characters that can compound inside a group.
fn is_quantifier(c: char) -> bool {
    matches!(c, '+' | '*' | '{')
}

/// Rejects patterns with nested quantifiers (`(a+)+`, `(\d*){2,}`) that can
/// trigger catastrophic backtracking on backtracking engines. The pattern is
/// rejected before it is ever compiled.
pub fn validate_pattern(pattern: &str) -> Result<(), LienError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut group_starts: Vec<usize> = Vec::new();
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' => group_starts.push(i),
            ')' => {
                let start = match group_starts.pop() {
                    Some(s) => s,
                    None => continue,
                };
                let quantified = chars.get(i + 1).copied().map(is_quantifier).unwrap_or(false);
                if quantified && contains_unescaped_quantifier(&chars[start + 1..i]) {
                    return Err(LienError::invalid_input(format!(
                        "pattern rejected: nested quantifier in '{pattern}'"
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn contains_unescaped_quantifier(chars: &[char]) -> bool {
    let mut escaped = false;
    for &c in chars {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if is_quantifier(c) || c == '?' {
            return true;
        }
    }
    false
}

/// Validates and compiles a case-insensitive matcher.
pub fn compile_case_insensitive(pattern: &str) -> Result<Regex, LienError> {
    validate_pattern(pattern)?;
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| LienError::invalid_input(format!("invalid pattern '{pattern}': {e}")))
}

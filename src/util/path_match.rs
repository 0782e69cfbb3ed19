//! Path-boundary matching used by the reverse-dependency engine.
//!
//! Import strings and workspace paths rarely agree verbatim: imports drop
//! extensions, use relative segments, or carry Windows separators. The
//! matcher normalizes both sides and then requires alignment at path
//! component boundaries so that `logger` never matches `logger-utils`.

/// Extensions stripped during normalization.
const STRIPPED_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx"];

/// Normalizes an import string or workspace path for matching: strips
/// quotes, trims, converts backslashes, drops known extensions, and removes
/// the workspace prefix when given.
pub fn normalize_path(raw: &str, workspace_root: Option<&str>) -> String {
    let mut path = raw.trim().trim_matches(|c| c == '"' || c == '\'').replace('\\', "/");

    if let Some(root) = workspace_root {
        let root = root.trim_end_matches('/');
        if !root.is_empty() {
            if let Some(stripped) = path.strip_prefix(root) {
                path = stripped.trim_start_matches('/').to_string();
            }
        }
    }

    for ext in STRIPPED_EXTENSIONS {
        if path.to_ascii_lowercase().ends_with(ext) {
            path.truncate(path.len() - ext.len());
            break;
        }
    }

    path.trim_end_matches('/').to_string()
}

/// Resolves a relative import (`./x`, `../../x`) against the importer's
/// directory. Excess `..` segments are dropped rather than escaping the
/// workspace. Non-relative imports are returned unchanged.
pub fn resolve_relative(import: &str, importer_dir: &str) -> String {
    if !import.starts_with("./") && !import.starts_with("../") && import != "." && import != ".." {
        return import.to_string();
    }

    let mut components: Vec<&str> = importer_dir
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();

    for segment in import.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }
    components.join("/")
}

/// True when `needle` occurs in `hay` starting and ending at a path
/// component boundary.
fn contains_at_boundary(hay: &str, needle: &str) -> bool {
    if needle.is_empty() || hay.len() < needle.len() {
        return false;
    }
    let mut from = 0;
    while let Some(pos) = hay[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        let starts_ok = start == 0 || hay.as_bytes()[start - 1] == b'/';
        let ends_ok = end == hay.len() || hay.as_bytes()[end] == b'/';
        if starts_ok && ends_ok {
            return true;
        }
        from = start + 1;
    }
    false
}

/// True when the shorter path's components appear in order within the
/// longer's, anchored on an equal final component. This is what lets an
/// import of `src/logger` match the file `src/utils/logger.ts` while
/// rejecting `src/logger-utils`.
fn component_subsequence(shorter: &str, longer: &str) -> bool {
    let s: Vec<&str> = shorter.split('/').filter(|c| !c.is_empty()).collect();
    let l: Vec<&str> = longer.split('/').filter(|c| !c.is_empty()).collect();
    if s.is_empty() || l.is_empty() || s.last() != l.last() {
        return false;
    }
    let mut it = l.iter();
    s.iter().all(|c| it.any(|x| x == c))
}

/// Boundary match between two normalized paths: either contains the other at
/// a component boundary, or their components align as a basename-anchored
/// subsequence. Bare substring containment is never enough.
pub fn paths_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    if contains_at_boundary(a, b) || contains_at_boundary(b, a) {
        return true;
    }
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    component_subsequence(shorter, longer)
}

/// Full matcher: does `import_raw`, written inside `importer_file`, refer to
/// `target` (a workspace-relative path)?
pub fn import_matches_target(
    import_raw: &str,
    importer_file: &str,
    target: &str,
    workspace_root: Option<&str>,
) -> bool {
    let import = normalize_path(import_raw, workspace_root);
    // Absolute paths outside the workspace never match.
    if import.starts_with('/') {
        return false;
    }
    let importer_dir = parent_dir(&normalize_path(importer_file, workspace_root));
    let resolved = resolve_relative(&import, &importer_dir);
    let target = normalize_path(target, workspace_root);
    paths_match(&resolved, &target)
}

fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(pos) => path[..pos].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_quotes_and_extensions() {
        assert_eq!(normalize_path("'./logger.ts'", None), "./logger");
        assert_eq!(normalize_path("src\\utils\\db.tsx", None), "src/utils/db");
        assert_eq!(normalize_path("pkg/mod.py", None), "pkg/mod.py");
    }

    #[test]
    fn test_normalize_strips_workspace_prefix() {
        assert_eq!(
            normalize_path("/home/me/app/src/a.ts", Some("/home/me/app")),
            "src/a"
        );
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve_relative("./logger", "src/utils"), "src/utils/logger");
        assert_eq!(resolve_relative("../logger", "src/utils"), "src/logger");
        assert_eq!(resolve_relative("../../logger", "src/utils"), "logger");
        // Excess parent segments are dropped, not allowed to escape.
        assert_eq!(resolve_relative("../../../logger", "src"), "logger");
        assert_eq!(resolve_relative("src/db", "anything"), "src/db");
    }

    #[test]
    fn test_boundary_matching_for_logger_target() {
        // Matcher contract for target src/logger.
        let target = "src/logger";
        assert!(paths_match("logger", target)); // from "./logger"
        assert!(paths_match("src/utils/logger", target));
        assert!(!paths_match("src/logger-utils", target));
        assert!(!paths_match("loggers", target));
    }

    #[test]
    fn test_directory_import_matches_contents() {
        assert!(paths_match("src/db", "src/db/index"));
        assert!(paths_match("src/db/index", "src/db"));
    }

    #[test]
    fn test_import_matches_target_end_to_end() {
        let target = "src/utils/logger";
        assert!(import_matches_target("'./logger'", "src/utils/a.ts", target, None));
        assert!(import_matches_target("src/utils/logger", "b.ts", target, None));
        assert!(!import_matches_target(
            "src/utils/logger-utils",
            "c.ts",
            target,
            None
        ));
        // Relative import from the repo root.
        assert!(import_matches_target("./logger", "a.ts", target, None));
        // Absolute paths outside the workspace are skipped.
        assert!(!import_matches_target("/etc/passwd", "a.ts", target, None));
    }
}

//! Small shared libraries: gitignore semantics, path-boundary matching, and
//! safe regex validation.

pub mod gitignore;
pub mod path_match;
pub mod safe_regex;

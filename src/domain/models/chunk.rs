use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Language;

/// The kind of construct a chunk was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Function,
    Method,
    Class,
    Interface,
    Block,
    Template,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::Method => "method",
            ChunkKind::Class => "class",
            ChunkKind::Interface => "interface",
            ChunkKind::Block => "block",
            ChunkKind::Template => "template",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "function" => ChunkKind::Function,
            "method" => ChunkKind::Method,
            "class" => ChunkKind::Class,
            "interface" => ChunkKind::Interface,
            "template" => ChunkKind::Template,
            _ => ChunkKind::Block,
        }
    }

    /// Kinds that must carry a non-empty `symbol_name`.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            ChunkKind::Function | ChunkKind::Method | ChunkKind::Class | ChunkKind::Interface
        )
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A call expression observed inside a chunk's line span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub symbol: String,
    pub line: u32,
}

/// Names defined within a single chunk, bucketed by construct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSymbols {
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub interfaces: Vec<String>,
}

impl ChunkSymbols {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.classes.is_empty() && self.interfaces.is_empty()
    }
}

/// Metadata attached to every indexed chunk.
///
/// `imports`, `imported_symbols` and `exports` are extracted once at the file
/// root and attached to every chunk of that file, so dependency queries never
/// need to re-read the source. Line numbers are 1-based inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Workspace-relative path, forward slashes.
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub kind: ChunkKind,
    pub language: Language,
    /// Non-empty for function/method/class/interface chunks, empty for blocks.
    pub symbol_name: String,
    pub symbol_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub symbols: ChunkSymbols,
    /// Raw import/require paths from the file root.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Mapping `import path -> imported symbols`.
    #[serde(default)]
    pub imported_symbols: BTreeMap<String, Vec<String>>,
    /// Names this file makes importable.
    #[serde(default)]
    pub exports: Vec<String>,
    #[serde(default)]
    pub call_sites: Vec<CallSite>,
    /// Cyclomatic complexity; 0 = absent (e.g. line chunks).
    #[serde(default)]
    pub complexity: u32,
    #[serde(default)]
    pub cognitive_complexity: u32,
    #[serde(default)]
    pub halstead_volume: f64,
    #[serde(default)]
    pub halstead_difficulty: f64,
    #[serde(default)]
    pub halstead_effort: f64,
    #[serde(default)]
    pub halstead_bugs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

impl ChunkMetadata {
    /// A minimal metadata record for the given span. Extractors fill in the
    /// rest field by field.
    pub fn new(
        file: impl Into<String>,
        start_line: u32,
        end_line: u32,
        kind: ChunkKind,
        language: Language,
    ) -> Self {
        debug_assert!(start_line <= end_line);
        Self {
            file: file.into(),
            start_line,
            end_line,
            kind,
            language,
            symbol_name: String::new(),
            symbol_type: String::new(),
            parent_class: None,
            signature: None,
            parameters: Vec::new(),
            symbols: ChunkSymbols::default(),
            imports: Vec::new(),
            imported_symbols: BTreeMap::new(),
            exports: Vec::new(),
            call_sites: Vec::new(),
            complexity: 0,
            cognitive_complexity: 0,
            halstead_volume: 0.0,
            halstead_difficulty: 0.0,
            halstead_effort: 0.0,
            halstead_bugs: 0.0,
            repo_id: None,
            org_id: None,
            branch: None,
            commit_sha: None,
        }
    }

    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

/// The unit of ingestion and retrieval: verbatim source text plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    id: String,
    content: String,
    metadata: ChunkMetadata,
}

impl CodeChunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            metadata,
        }
    }

    /// Reconstitutes from persisted data (used by store adapters).
    pub fn reconstitute(id: String, content: String, metadata: ChunkMetadata) -> Self {
        Self {
            id,
            content,
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &ChunkMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ChunkMetadata {
        &mut self.metadata
    }

    /// Per-chunk store key: `(repo_id, file, start_line, end_line)`.
    pub fn key(&self) -> (String, String, u32, u32) {
        (
            self.metadata.repo_id.clone().unwrap_or_default(),
            self.metadata.file.clone(),
            self.metadata.start_line,
            self.metadata.end_line,
        )
    }

    pub fn location(&self) -> String {
        format!(
            "{}:{}-{}",
            self.metadata.file, self.metadata.start_line, self.metadata.end_line
        )
    }

    /// Checks the structural invariants the chunker promises.
    pub fn is_well_formed(&self) -> bool {
        let m = &self.metadata;
        if m.start_line > m.end_line {
            return false;
        }
        if m.kind.is_named() && m.symbol_name.is_empty() {
            return false;
        }
        if m.kind == ChunkKind::Block && !m.symbol_name.is_empty() {
            return false;
        }
        m.call_sites.iter().all(|c| m.contains_line(c.line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(kind: ChunkKind, name: &str, start: u32, end: u32) -> CodeChunk {
        let mut metadata = ChunkMetadata::new("src/a.ts", start, end, kind, Language::TypeScript);
        metadata.symbol_name = name.to_string();
        CodeChunk::new("const x = 1;", metadata)
    }

    #[test]
    fn test_named_kinds_require_symbol_name() {
        assert!(chunk(ChunkKind::Function, "handle", 1, 4).is_well_formed());
        assert!(!chunk(ChunkKind::Function, "", 1, 4).is_well_formed());
        assert!(chunk(ChunkKind::Block, "", 1, 4).is_well_formed());
        assert!(!chunk(ChunkKind::Block, "oops", 1, 4).is_well_formed());
    }

    #[test]
    fn test_call_sites_must_be_within_span() {
        let mut c = chunk(ChunkKind::Function, "handle", 10, 20);
        c.metadata_mut().call_sites.push(CallSite {
            symbol: "log".to_string(),
            line: 15,
        });
        assert!(c.is_well_formed());

        c.metadata_mut().call_sites.push(CallSite {
            symbol: "stray".to_string(),
            line: 25,
        });
        assert!(!c.is_well_formed());
    }

    #[test]
    fn test_key_includes_repo_and_span() {
        let mut c = chunk(ChunkKind::Function, "handle", 3, 9);
        c.metadata_mut().repo_id = Some("repo-1".to_string());
        assert_eq!(
            c.key(),
            ("repo-1".to_string(), "src/a.ts".to_string(), 3, 9)
        );
    }

    #[test]
    fn test_metadata_round_trips_through_json() {
        let mut metadata =
            ChunkMetadata::new("src/a.ts", 1, 3, ChunkKind::Function, Language::TypeScript);
        metadata.symbol_name = "handle".to_string();
        metadata
            .imported_symbols
            .insert("./logger".to_string(), vec!["log".to_string()]);

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"startLine\":1"));
        assert!(json.contains("\"symbolName\":\"handle\""));

        let back: ChunkMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.symbol_name, "handle");
        assert_eq!(back.imported_symbols["./logger"], vec!["log"]);
    }
}

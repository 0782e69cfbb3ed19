use std::path::Path;

use tracing::debug;
use tree_sitter::Parser;

use super::calls::collect_call_sites;
use super::complexity::compute_metrics;
use super::exports::extract_exports;
use super::imports::extract_imports;
use super::registry::{grammar_for, spec_for, LanguageSpec};
use super::symbols::{extract_chunk_symbols, extract_parameters, extract_signature};
use super::traverser::{collect_chunks, line_span};
use crate::domain::{ChunkKind, ChunkMetadata, CodeChunk, Language, LienError};

/// What to do when AST parsing fails for a supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstFallback {
    /// Retry the file with line chunking.
    LineBased,
    /// Propagate the parse error to the caller.
    Error,
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub use_ast: bool,
    pub fallback: AstFallback,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 75,
            chunk_overlap: 10,
            use_ast: true,
            fallback: AstFallback::LineBased,
        }
    }
}

/// Turns `(path, content)` into chunks.
///
/// For identical content and configuration the chunk set is byte-identical:
/// traversal order is source order, maps are ordered, and nothing depends on
/// ambient state.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ChunkerConfig::default())
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunks one file. `path` is workspace-relative with forward slashes.
    pub fn chunk_file(&self, path: &str, content: &str) -> Result<Vec<CodeChunk>, LienError> {
        if is_template_path(path) {
            return Ok(self.template_chunk(path, content));
        }

        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let language = Language::from_extension(extension);

        if !self.config.use_ast || !language.is_known() {
            return Ok(self.line_chunks(path, content, language));
        }

        match self.ast_chunks(path, content, language, extension) {
            Ok(chunks) => Ok(chunks),
            Err(err) if self.config.fallback == AstFallback::LineBased => {
                debug!("AST chunking failed for {}, using line fallback: {}", path, err);
                Ok(self.line_chunks(path, content, language))
            }
            Err(err) => Err(err),
        }
    }

    fn ast_chunks(
        &self,
        path: &str,
        content: &str,
        language: Language,
        extension: &str,
    ) -> Result<Vec<CodeChunk>, LienError> {
        let spec = spec_for(language)
            .ok_or_else(|| LienError::indexing(path, "no language spec"))?;
        let grammar = grammar_for(language, extension)
            .ok_or_else(|| LienError::indexing(path, "no grammar"))?;

        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .map_err(|e| LienError::indexing(path, format!("grammar rejected: {e}")))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| LienError::indexing(path, "parser returned no tree"))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(LienError::indexing(path, "syntax errors in file"));
        }

        // File-root extraction, attached to every chunk of the file.
        let imports = extract_imports(language, root, content);
        let exports = extract_exports(spec, root, content);
        let call_sites = collect_call_sites(spec, root, content);

        let candidates = collect_chunks(spec, root, content);
        let mut chunks = Vec::with_capacity(candidates.len().max(1));

        if candidates.is_empty() {
            // Top-level-only files (constants, config modules) still get one
            // block chunk so their exports are addressable.
            if content.trim().is_empty() {
                return Ok(Vec::new());
            }
            let total_lines = count_lines(content) as u32;
            let mut metadata = ChunkMetadata::new(path, 1, total_lines.max(1), ChunkKind::Block, language);
            metadata.symbols = extract_chunk_symbols(spec, root, content);
            metadata.imports = imports.paths.clone();
            metadata.imported_symbols = imports.symbols.clone();
            metadata.exports = exports.clone();
            metadata.call_sites = call_sites.clone();
            apply_metrics(&mut metadata, spec, root, content);
            chunks.push(CodeChunk::new(content.to_string(), metadata));
            return Ok(chunks);
        }

        for candidate in candidates {
            let (start_line, end_line) = line_span(candidate.node);
            let mut metadata = ChunkMetadata::new(path, start_line, end_line, candidate.kind, language);
            metadata.symbol_name = candidate.name.clone();
            metadata.symbol_type = candidate.symbol_type.to_string();
            metadata.parent_class = candidate.parent_class.clone();
            metadata.signature = extract_signature(candidate.node, content);
            metadata.parameters = extract_parameters(candidate.body, content);
            metadata.symbols = extract_chunk_symbols(spec, candidate.node, content);
            metadata.imports = imports.paths.clone();
            metadata.imported_symbols = imports.symbols.clone();
            metadata.exports = exports.clone();
            metadata.call_sites = call_sites
                .iter()
                .filter(|site| metadata.contains_line(site.line))
                .cloned()
                .collect();
            apply_metrics(&mut metadata, spec, candidate.body, content);

            chunks.push(CodeChunk::new(
                content[candidate.node.byte_range()].to_string(),
                metadata,
            ));
        }

        chunks.sort_by_key(|c| (c.metadata().start_line, c.metadata().end_line));
        debug!("Chunked {} into {} AST chunks ({})", path, chunks.len(), language);
        Ok(chunks)
    }

    /// Windows the file into overlapping line blocks, skipping all-whitespace
    /// windows. The last window terminates once it reaches the final line.
    fn line_chunks(&self, path: &str, content: &str, language: Language) -> Vec<CodeChunk> {
        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();
        if total == 0 {
            return Vec::new();
        }
        let size = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap.min(size.saturating_sub(1));

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + size).min(total);
            let window = &lines[start..end];
            if window.iter().any(|line| !line.trim().is_empty()) {
                let metadata = ChunkMetadata::new(
                    path,
                    start as u32 + 1,
                    end as u32,
                    ChunkKind::Block,
                    language,
                );
                chunks.push(CodeChunk::new(window.join("\n"), metadata));
            }
            if end >= total {
                break;
            }
            start = end - overlap;
        }
        debug!("Chunked {} into {} line chunks", path, chunks.len());
        chunks
    }

    /// Template families (`*.liquid`, JSON under a `templates/` segment) are
    /// indexed as a single template chunk.
    fn template_chunk(&self, path: &str, content: &str) -> Vec<CodeChunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }
        let total_lines = count_lines(content) as u32;
        let metadata = ChunkMetadata::new(
            path,
            1,
            total_lines.max(1),
            ChunkKind::Template,
            Language::Unknown,
        );
        vec![CodeChunk::new(content.to_string(), metadata)]
    }
}

fn apply_metrics(
    metadata: &mut ChunkMetadata,
    spec: &LanguageSpec,
    node: tree_sitter::Node<'_>,
    content: &str,
) {
    let metrics = compute_metrics(spec, node, content);
    metadata.complexity = metrics.cyclomatic;
    metadata.cognitive_complexity = metrics.cognitive;
    metadata.halstead_volume = metrics.halstead.volume;
    metadata.halstead_difficulty = metrics.halstead.difficulty;
    metadata.halstead_effort = metrics.halstead.effort;
    metadata.halstead_bugs = metrics.halstead.bugs;
}

fn count_lines(content: &str) -> usize {
    content.lines().count()
}

/// Template detection: a `.liquid` extension, or a JSON file under a
/// `templates/` path segment.
pub fn is_template_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".liquid") {
        return true;
    }
    lower.ends_with(".json")
        && lower
            .split('/')
            .rev()
            .skip(1)
            .any(|segment| segment == "templates")
}

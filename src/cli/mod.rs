//! CLI surface: command definitions and handlers. The handlers wire the
//! connector adapters into the application use cases and format results for
//! humans (text), tooling (json), or code-scanning uploads (sarif).

pub mod sarif;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use tracing::{info, warn};

use crate::application::{
    build_graph_in, dependent_counts_in, scan_indexable, ChangeHandler, ComplexityAnalyzer,
    FileChangeEvent, IndexWorkspaceUseCase, QuerySession, ReindexCoordinator, VectorStore,
};
use crate::config::LienConfig;
use crate::connector::embedding::MockEmbedder;
use crate::connector::parsing::Chunker;
use crate::connector::storage::{
    GitStateTracker, ManifestManager, MemoryVectorStore, StateLayout, VersionStamp,
};
use crate::connector::watch::FileWatcher;
use crate::domain::{CodeChunk, GraphDirection, Severity};

#[derive(Subcommand)]
pub enum Commands {
    /// Create the .lien state directory and a default config file
    Init,

    /// Index the workspace into the vector store
    Index {
        /// Force full re-index, ignoring cached content hashes
        #[arg(short, long)]
        force: bool,
    },

    /// Run the indexer with file watching and git-change polling
    Serve {
        /// Disable file watching (index once, then poll git only)
        #[arg(long)]
        no_watch: bool,

        /// Workspace root to serve (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Show manifest, version, and git state
    Status,

    /// Analyze complexity and report violations
    Complexity {
        /// Restrict the analysis to these files
        #[arg(long, num_args = 1..)]
        files: Option<Vec<String>>,

        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,

        /// Override the cyclomatic (method) threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Exit non-zero when the given severity is present
        #[arg(long, value_enum)]
        fail_on: Option<FailOn>,
    },

    /// Print the dependency graph reachable from a root file
    Graph {
        root_file: String,

        /// Maximum traversal depth in hops
        #[arg(long)]
        depth: Option<usize>,

        #[arg(long, value_enum, default_value_t = DirectionArg::Forward)]
        direction: DirectionArg,

        /// Collapse files into their leading directory
        #[arg(long)]
        module_level: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
    Sarif,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailOn {
    Error,
    Warning,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Forward,
    Reverse,
    Both,
}

impl From<DirectionArg> for GraphDirection {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Forward => GraphDirection::Forward,
            DirectionArg::Reverse => GraphDirection::Reverse,
            DirectionArg::Both => GraphDirection::Both,
        }
    }
}

/// Everything one workspace needs wired together.
pub struct Pipeline {
    pub config: LienConfig,
    pub layout: StateLayout,
    pub store: Arc<MemoryVectorStore>,
    pub coordinator: Arc<ReindexCoordinator>,
    pub indexer: Arc<IndexWorkspaceUseCase>,
}

pub fn build_pipeline(workspace_root: &Path) -> Result<Pipeline> {
    let layout = StateLayout::new(workspace_root);
    let config = LienConfig::load(&layout.config_path())?;

    let chunker = Arc::new(Chunker::new(config.chunker_config()));
    let embedder = Arc::new(MockEmbedder::new());
    let store = Arc::new(MemoryVectorStore::with_version_file(layout.version_path()));
    let manifest = Arc::new(ManifestManager::new(layout.manifest_path()));
    let coordinator = Arc::new(ReindexCoordinator::new());

    let indexer = Arc::new(IndexWorkspaceUseCase::new(
        workspace_root,
        chunker,
        embedder,
        store.clone(),
        manifest,
        coordinator.clone(),
        config.core.concurrency,
        config.core.embedding_batch_size,
    ));

    Ok(Pipeline {
        config,
        layout,
        store,
        coordinator,
        indexer,
    })
}

pub fn run_init(workspace_root: &Path) -> Result<i32> {
    let layout = StateLayout::new(workspace_root);
    std::fs::create_dir_all(layout.indices_dir())?;

    let config_path = layout.config_path();
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        let defaults = serde_json::to_string_pretty(&LienConfig::default())?;
        std::fs::write(&config_path, defaults)?;
        println!("Wrote {}", config_path.display());
    }
    println!("Initialized {}", layout.state_dir().display());
    Ok(0)
}

pub async fn run_index(workspace_root: &Path, force: bool) -> Result<i32> {
    let pipeline = build_pipeline(workspace_root)?;
    pipeline.store.initialize().await?;

    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("  {spinner:.green} {msg:.dim}")
            .expect("Invalid progress template"),
    );
    spinner.set_message("indexing");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let outcome = pipeline.indexer.execute(force).await;
    spinner.finish_and_clear();
    let outcome = outcome?;
    println!(
        "Indexed {} files ({} chunks), {} unchanged, {} deleted in {}ms",
        outcome.indexed_files,
        outcome.chunk_count,
        outcome.unchanged_files,
        outcome.deleted_files,
        outcome.duration_ms
    );
    for (language, stats) in &outcome.language_stats {
        println!("  {language}: {} files, {} chunks", stats.file_count, stats.chunk_count);
    }
    if !outcome.errors.is_empty() {
        println!("{} files skipped:", outcome.errors.len());
        for error in &outcome.errors {
            println!("  {error}");
        }
    }
    Ok(0)
}

pub async fn run_serve(workspace_root: &Path, no_watch: bool) -> Result<i32> {
    let pipeline = build_pipeline(workspace_root)?;
    pipeline.store.initialize().await?;

    info!("Initial index of {}", workspace_root.display());
    pipeline.indexer.execute(false).await?;

    let store: Arc<dyn VectorStore> = pipeline.store.clone();
    let session = Arc::new(QuerySession::open(store).await?);
    let handler = Arc::new(ChangeHandler::new(
        workspace_root,
        pipeline.indexer.clone(),
        session,
    ));

    let watching = pipeline.config.file_watching.enabled && !no_watch;
    let mut batch_rx = if watching {
        let (watcher, rx) = FileWatcher::spawn(
            workspace_root.to_path_buf(),
            pipeline.config.file_watching.debounce_ms,
        )?;
        // Keep the watcher alive for the lifetime of the serve loop.
        Some((watcher, rx))
    } else {
        None
    };

    let git_tracker = GitStateTracker::new(workspace_root, pipeline.layout.git_state_path());
    let mut git_poll = tokio::time::interval(std::time::Duration::from_millis(
        pipeline.config.git_detection.poll_interval_ms.max(100),
    ));
    git_poll.tick().await; // immediate first tick is not a change signal
    let git_enabled = pipeline.config.git_detection.enabled;

    println!("Serving. Press Ctrl-C to stop.");
    loop {
        tokio::select! {
            batch = recv_or_pending(&mut batch_rx) => {
                match batch {
                    Some(event) => {
                        if let Err(err) = handler.handle(event).await {
                            warn!("Change batch failed: {}", err);
                        }
                    }
                    // Watcher channel closed; stop polling it.
                    None => batch_rx = None,
                }
            }
            _ = git_poll.tick() => {
                if git_enabled {
                    match git_tracker.detect_change() {
                        Ok(Some(state)) => {
                            info!("Git head moved to {}@{}; running catch-up", state.branch, state.commit);
                            if let Err(err) = pipeline.indexer.execute(false).await {
                                warn!("Git catch-up reindex failed: {}", err);
                            }
                        }
                        Ok(None) => {}
                        Err(err) => warn!("Git state check failed: {}", err),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopping.");
                break;
            }
        }
    }
    Ok(0)
}

async fn recv_or_pending(
    watch: &mut Option<(FileWatcher, tokio::sync::mpsc::Receiver<FileChangeEvent>)>,
) -> Option<FileChangeEvent> {
    match watch {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}

pub async fn run_status(workspace_root: &Path) -> Result<i32> {
    let layout = StateLayout::new(workspace_root);
    let manifest = ManifestManager::new(layout.manifest_path()).load();
    let stamp = VersionStamp::at(layout.version_path());

    println!("Workspace: {}", workspace_root.display());
    println!(
        "Manifest:  {} files, {} chunks",
        manifest.len(),
        manifest.total_chunks()
    );
    match stamp.date()? {
        Some(date) => println!("Index:     version {} ({})", stamp.read()?, date.to_rfc3339()),
        None => println!("Index:     not built yet"),
    }

    let tracker = GitStateTracker::new(workspace_root, layout.git_state_path());
    match tracker.current() {
        Some(state) => println!(
            "Git:       {}@{}",
            state.branch,
            state.commit.get(..8).unwrap_or(&state.commit)
        ),
        None => println!("Git:       not a repository"),
    }
    Ok(0)
}

pub async fn run_complexity(
    workspace_root: &Path,
    files: Option<Vec<String>>,
    format: ReportFormat,
    threshold: Option<f64>,
    fail_on: Option<FailOn>,
) -> Result<i32> {
    let layout = StateLayout::new(workspace_root);
    let mut config = LienConfig::load(&layout.config_path())?;
    if let Some(method) = threshold {
        config.complexity.thresholds.method = method;
        config.complexity.thresholds.validate()?;
    }

    let paths = match files {
        Some(list) => list,
        None => scan_indexable(workspace_root),
    };
    let (chunks, errors) = chunk_paths(workspace_root, &config, &paths);
    for error in &errors {
        warn!("{}", error);
    }

    let dependents = dependent_counts_in(&chunks);
    let analyzer = ComplexityAnalyzer::new(
        config.complexity.thresholds.clone(),
        config.complexity.severity.clone(),
    );
    let report = analyzer.analyze(&chunks, &dependents);

    match format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Sarif => println!("{}", serde_json::to_string_pretty(&sarif::to_sarif(&report))?),
        ReportFormat::Text => print_text_report(&report),
    }

    let failed = match fail_on {
        Some(FailOn::Error) => report.summary.error_count > 0,
        Some(FailOn::Warning) => report.summary.error_count + report.summary.warning_count > 0,
        None => false,
    };
    Ok(if failed { 1 } else { 0 })
}

fn print_text_report(report: &crate::domain::ComplexityReport) {
    let s = &report.summary;
    println!(
        "{} files analyzed, {} violations ({} errors, {} warnings)",
        s.files_analyzed, s.total_violations, s.error_count, s.warning_count
    );
    println!(
        "complexity avg {:.1}, max {}",
        s.average_complexity, s.max_complexity
    );
    for file in &report.files {
        if file.violations.is_empty() {
            continue;
        }
        println!(
            "\n{} [{} risk, {} dependents]",
            file.file,
            file.risk_level.as_str(),
            file.dependent_count
        );
        for v in &file.violations {
            let label = if v.symbol_name.is_empty() {
                "<file>"
            } else {
                v.symbol_name.as_str()
            };
            println!(
                "  {}:{} {} {} = {:.1} (threshold {:.1})",
                severity_tag(v.severity),
                v.line,
                label,
                v.metric.as_str(),
                v.value,
                v.threshold
            );
        }
    }
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

pub async fn run_graph(
    workspace_root: &Path,
    root_file: String,
    depth: Option<usize>,
    direction: DirectionArg,
    module_level: bool,
) -> Result<i32> {
    let layout = StateLayout::new(workspace_root);
    let config = LienConfig::load(&layout.config_path())?;

    let paths = scan_indexable(workspace_root);
    let (chunks, errors) = chunk_paths(workspace_root, &config, &paths);
    for error in &errors {
        warn!("{}", error);
    }

    let graph = build_graph_in(&chunks, &[root_file.clone()], direction.into(), depth, module_level);
    if graph.nodes.is_empty() {
        println!("No indexed file matches {root_file}");
        return Ok(1);
    }

    println!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len());
    for node in &graph.nodes {
        match node.complexity {
            Some(c) => println!("  {} (max complexity {})", node.id, c),
            None => println!("  {}", node.id),
        }
    }
    for edge in &graph.edges {
        println!("  {} -{}-> {}", edge.from, edge.kind.as_str(), edge.to);
    }
    Ok(0)
}

/// Chunks the given workspace-relative paths directly from disk; store-free
/// analyses (complexity, graph) use this.
fn chunk_paths(
    workspace_root: &Path,
    config: &LienConfig,
    paths: &[String],
) -> (Vec<CodeChunk>, Vec<crate::domain::LienError>) {
    let chunker = Chunker::new(config.chunker_config());
    let mut chunks = Vec::new();
    let mut errors = Vec::new();
    let mut sorted: Vec<&String> = paths.iter().collect();
    sorted.sort();
    sorted.dedup();

    for path in sorted {
        let absolute = workspace_root.join(path);
        let content = match std::fs::read_to_string(&absolute) {
            Ok(content) => content,
            Err(err) => {
                errors.push(crate::domain::LienError::file_not_readable(
                    path.clone(),
                    err.to_string(),
                ));
                continue;
            }
        };
        match chunker.chunk_file(path, &content) {
            Ok(mut file_chunks) => chunks.append(&mut file_chunks),
            Err(err) => errors.push(err),
        }
    }
    (chunks, errors)
}

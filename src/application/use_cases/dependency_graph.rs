use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use crate::application::{ScanFilter, VectorStore};
use crate::domain::{
    CodeChunk, DependencyGraph, EdgeKind, GraphDirection, GraphEdge, GraphNode, GraphNodeKind,
    LienError,
};
use crate::util::path_match::import_matches_target;

/// Per-file view assembled from chunk metadata; the only inputs the graph
/// engine uses.
#[derive(Debug, Default, Clone)]
struct FileFacts {
    imports: Vec<String>,
    imported_symbols: BTreeMap<String, Vec<String>>,
    exports: Vec<String>,
    call_symbols: BTreeSet<String>,
    max_complexity: u32,
}

/// Reverse-dependency lookups and graph assembly over the indexed chunks.
pub struct DependencyGraphUseCase {
    store: Arc<dyn VectorStore>,
}

impl DependencyGraphUseCase {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Files whose imports resolve to `target` under path-boundary matching.
    pub async fn reverse_dependencies(&self, target: &str) -> Result<Vec<String>, LienError> {
        let chunks = self.store.scan_with_filter(&ScanFilter::default()).await?;
        Ok(reverse_dependencies_in(&chunks, target))
    }

    /// Reverse-dependency counts for every indexed file, keyed by path.
    pub async fn dependent_counts(&self) -> Result<BTreeMap<String, usize>, LienError> {
        let chunks = self.store.scan_with_filter(&ScanFilter::default()).await?;
        let facts = gather_facts(&chunks);
        let mut counts = BTreeMap::new();
        for target in facts.keys() {
            let dependents = reverse_dependencies_of(&facts, target);
            counts.insert(target.clone(), dependents.len());
        }
        Ok(counts)
    }

    /// BFS from `roots` in the requested direction, up to `depth` hops.
    pub async fn build_graph(
        &self,
        roots: &[String],
        direction: GraphDirection,
        depth: Option<usize>,
        module_level: bool,
    ) -> Result<DependencyGraph, LienError> {
        let chunks = self.store.scan_with_filter(&ScanFilter::default()).await?;
        Ok(build_graph_in(&chunks, roots, direction, depth, module_level))
    }
}

fn gather_facts(chunks: &[CodeChunk]) -> BTreeMap<String, FileFacts> {
    let mut facts: BTreeMap<String, FileFacts> = BTreeMap::new();
    for chunk in chunks {
        let m = chunk.metadata();
        let entry = facts.entry(m.file.clone()).or_default();
        for import in &m.imports {
            if !entry.imports.contains(import) {
                entry.imports.push(import.clone());
            }
        }
        for (path, symbols) in &m.imported_symbols {
            let bucket = entry.imported_symbols.entry(path.clone()).or_default();
            for symbol in symbols {
                if !bucket.contains(symbol) {
                    bucket.push(symbol.clone());
                }
            }
        }
        for export in &m.exports {
            if !entry.exports.contains(export) {
                entry.exports.push(export.clone());
            }
        }
        entry
            .call_symbols
            .extend(m.call_sites.iter().map(|c| c.symbol.clone()));
        entry.max_complexity = entry.max_complexity.max(m.complexity);
    }
    facts
}

fn reverse_dependencies_of(facts: &BTreeMap<String, FileFacts>, target: &str) -> Vec<String> {
    let mut dependents = Vec::new();
    for (file, file_facts) in facts {
        if file == target {
            continue;
        }
        let depends = file_facts
            .imports
            .iter()
            .any(|import| import_matches_target(import, file, target, None));
        if depends {
            dependents.push(file.clone());
        }
    }
    dependents
}

/// Pure-slice variant used directly by tests and callers that already hold
/// the chunks.
pub fn reverse_dependencies_in(chunks: &[CodeChunk], target: &str) -> Vec<String> {
    reverse_dependencies_of(&gather_facts(chunks), target)
}

/// Reverse-dependency counts over a chunk slice, keyed by file path.
pub fn dependent_counts_in(chunks: &[CodeChunk]) -> BTreeMap<String, usize> {
    let facts = gather_facts(chunks);
    facts
        .keys()
        .map(|target| (target.clone(), reverse_dependencies_of(&facts, target).len()))
        .collect()
}

pub fn build_graph_in(
    chunks: &[CodeChunk],
    roots: &[String],
    direction: GraphDirection,
    depth: Option<usize>,
    module_level: bool,
) -> DependencyGraph {
    let facts = gather_facts(chunks);

    // Assemble the full file graph first.
    let mut graph: DiGraph<String, EdgeKind> = DiGraph::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();
    for file in facts.keys() {
        let index = graph.add_node(file.clone());
        indices.insert(file.clone(), index);
    }

    for (file, file_facts) in &facts {
        let from = indices[file];
        for target in facts.keys() {
            if target == file {
                continue;
            }
            let to = indices[target];
            let imports_target = file_facts
                .imports
                .iter()
                .any(|import| import_matches_target(import, file, target, None));
            if imports_target {
                graph.update_edge(from, to, EdgeKind::Imports);

                // A call edge requires an imported symbol from the target
                // that is actually invoked in this file.
                let target_exports = &facts[target].exports;
                let calls_target = file_facts
                    .imported_symbols
                    .iter()
                    .filter(|(path, _)| import_matches_target(path, file, target, None))
                    .flat_map(|(_, symbols)| symbols)
                    .any(|symbol| {
                        file_facts.call_symbols.contains(symbol)
                            && (target_exports.contains(symbol) || symbol == "*")
                    });
                if calls_target {
                    graph.add_edge(from, to, EdgeKind::Calls);
                }
            }
        }
    }

    // BFS from the roots with an optional depth cap.
    let mut visited: BTreeSet<NodeIndex> = BTreeSet::new();
    let mut kept_edges: BTreeSet<(String, String, EdgeKind)> = BTreeSet::new();
    let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::new();
    for root in roots {
        if let Some(&index) = indices.get(root) {
            visited.insert(index);
            queue.push_back((index, 0));
        } else {
            debug!("Graph root {} is not indexed", root);
        }
    }

    let walk_directions: &[Direction] = match direction {
        GraphDirection::Forward => &[Direction::Outgoing],
        GraphDirection::Reverse => &[Direction::Incoming],
        GraphDirection::Both => &[Direction::Outgoing, Direction::Incoming],
    };

    while let Some((index, distance)) = queue.pop_front() {
        if let Some(max) = depth {
            if distance >= max {
                continue;
            }
        }
        for walk in walk_directions {
            for edge in graph.edges_directed(index, *walk) {
                let (source, sink) = (edge.source(), edge.target());
                kept_edges.insert((graph[source].clone(), graph[sink].clone(), *edge.weight()));
                let neighbor = if *walk == Direction::Outgoing { sink } else { source };
                if visited.insert(neighbor) {
                    queue.push_back((neighbor, distance + 1));
                }
            }
        }
    }

    let mut node_ids: Vec<String> = visited.iter().map(|&i| graph[i].clone()).collect();
    node_ids.sort();

    if module_level {
        return collapse_to_modules(&facts, &node_ids, &kept_edges);
    }

    DependencyGraph {
        nodes: node_ids
            .into_iter()
            .map(|id| {
                let complexity = facts.get(&id).map(|f| f.max_complexity).filter(|&c| c > 0);
                GraphNode {
                    id,
                    kind: GraphNodeKind::File,
                    complexity,
                }
            })
            .collect(),
        edges: kept_edges
            .into_iter()
            .map(|(from, to, kind)| GraphEdge { from, to, kind })
            .collect(),
    }
}

/// Collapses files into their leading directory.
fn collapse_to_modules(
    facts: &BTreeMap<String, FileFacts>,
    node_ids: &[String],
    edges: &BTreeSet<(String, String, EdgeKind)>,
) -> DependencyGraph {
    let module_of = |path: &str| -> String {
        match path.split_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => ".".to_string(),
        }
    };

    let mut modules: BTreeMap<String, Option<u32>> = BTreeMap::new();
    for id in node_ids {
        let module = module_of(id);
        let complexity = facts.get(id).map(|f| f.max_complexity).unwrap_or(0);
        let entry = modules.entry(module).or_insert(None);
        if complexity > 0 {
            *entry = Some(entry.unwrap_or(0).max(complexity));
        }
    }

    let mut module_edges: BTreeSet<(String, String, EdgeKind)> = BTreeSet::new();
    for (from, to, kind) in edges {
        let (from_module, to_module) = (module_of(from), module_of(to));
        if from_module != to_module {
            module_edges.insert((from_module, to_module, *kind));
        }
    }

    DependencyGraph {
        nodes: modules
            .into_iter()
            .map(|(id, complexity)| GraphNode {
                id,
                kind: GraphNodeKind::Module,
                complexity,
            })
            .collect(),
        edges: module_edges
            .into_iter()
            .map(|(from, to, kind)| GraphEdge { from, to, kind })
            .collect(),
    }
}

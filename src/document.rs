//! JSON interchange for graphs.
//!
//! A [`GraphDocument`] is a flat list of node records and edge records:
//!
//! ```json
//! {
//!   "nodes": [{"id": "A", "reference": "A", "tags": ["core"], "duration": 2.0, "status": "pending"}],
//!   "edges": [{"source": "A", "target": "B", "attributes": {"weight": 1}}]
//! }
//! ```
//!
//! Loading also accepts the checksum wrapper written by
//! [`wrap_with_checksum`](crate::checksum::wrap_with_checksum),
//! `{"checksum": "blake2b: <hex>", "graph": {...}}`. When a checksum is
//! embedded, the loaded graph must hash to it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::checksum::{extract_checksum, wrap_with_checksum};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::store::NodeStore;
use crate::style::{EdgeStyler, NodeLabeler, PlainEdgeStyler, ReferenceLabeler};
use crate::types::{Attributes, NodeId, DEFAULT_STATUS};

/// Errors from reading or writing graph documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Reading or writing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The text is not a valid graph document.
    #[error("Invalid graph document: {0}")]
    Json(#[from] serde_json::Error),

    /// The document describes an invalid graph.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The embedded checksum does not match the loaded graph.
    #[error("Checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch {
        /// Digest found in the document.
        expected: String,
        /// Digest of the loaded graph.
        computed: String,
    },

    /// An edge names a node id that no node record declares.
    #[error("Edge references unknown node id: {0}")]
    UnknownNode(String),

    /// Two node records share an id.
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),
}

/// Where a document comes from. Callers say which; nothing is guessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file on disk.
    Path(PathBuf),
    /// Document text held in memory.
    Text(String),
}

impl Source {
    /// Document text.
    pub fn read(&self) -> Result<String, DocumentError> {
        match self {
            Self::Path(path) => {
                tracing::debug!(path = %path.display(), "Reading graph document");
                Ok(std::fs::read_to_string(path)?)
            }
            Self::Text(text) => Ok(text.clone()),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn is_default_status(status: &str) -> bool {
    status == DEFAULT_STATUS
}

fn is_zero(duration: &f64) -> bool {
    *duration == 0.0
}

/// One node of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Identifier used by edge records. Unique within a document.
    pub id: String,
    /// Node reference; the id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Scheduling duration.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: f64,
    /// Scheduling status.
    #[serde(default = "default_status", skip_serializing_if = "is_default_status")]
    pub status: String,
}

impl NodeRecord {
    /// A record with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reference: None,
            tags: BTreeSet::new(),
            duration: 0.0,
            status: default_status(),
        }
    }

    /// The reference the node will carry once loaded.
    pub fn reference(&self) -> &str {
        self.reference.as_deref().unwrap_or(&self.id)
    }
}

/// One edge of a document: `source` is a dependency of `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Id of the dependency.
    pub source: String,
    /// Id of the dependent.
    pub target: String,
    /// Edge attributes.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl EdgeRecord {
    /// An edge without attributes.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            attributes: Attributes::new(),
        }
    }
}

/// Serializable form of a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Node records.
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Edge records.
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Deserialize)]
struct Wrapped {
    checksum: String,
    graph: GraphDocument,
}

/// A graph loaded from a document, with its own store.
#[derive(Debug)]
pub struct LoadedGraph {
    /// Store holding the loaded nodes.
    pub store: NodeStore<String>,
    /// Graph over every loaded node.
    pub graph: Graph<String>,
    /// Handle of each node record, by id.
    pub ids: BTreeMap<String, NodeId>,
    /// Digest embedded in the document, if any. Already verified.
    pub checksum: Option<String>,
}

impl LoadedGraph {
    /// Handle of the node record `id`.
    pub fn id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }
}

impl GraphDocument {
    /// Parse document text, returning the document and any embedded digest.
    pub fn parse(text: &str) -> Result<(Self, Option<String>), DocumentError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let is_wrapped = value.get("graph").is_some() && value.get("checksum").is_some();
        if is_wrapped {
            let wrapped: Wrapped = serde_json::from_value(value)?;
            let checksum = extract_checksum(&wrapped.checksum).or_else(|| {
                let bare = wrapped.checksum.trim();
                (!bare.is_empty() && bare.chars().all(|c| c.is_ascii_hexdigit())).then(|| bare.to_lowercase())
            });
            return Ok((wrapped.graph, checksum));
        }
        Ok((serde_json::from_value(value)?, None))
    }

    /// Build a fresh store and graph from the records.
    ///
    /// Creates one node per record, orphans included, then links edges in
    /// record order.
    pub fn build(&self) -> Result<(NodeStore<String>, Graph<String>, BTreeMap<String, NodeId>), DocumentError> {
        let mut store = NodeStore::with_capacity(self.nodes.len());
        let mut ids: BTreeMap<String, NodeId> = BTreeMap::new();

        for record in &self.nodes {
            if ids.contains_key(&record.id) {
                return Err(DocumentError::DuplicateNode(record.id.clone()));
            }
            let id = store.insert(record.reference().to_string());
            for tag in &record.tags {
                store.add_tag(id, tag.clone())?;
            }
            store.set_duration(id, record.duration)?;
            store.set_status(id, record.status.clone())?;
            ids.insert(record.id.clone(), id);
        }

        let mut graph = Graph::from_nodes(&store, ids.values().copied(), false)?;
        for edge in &self.edges {
            let source = *ids
                .get(&edge.source)
                .ok_or_else(|| DocumentError::UnknownNode(edge.source.clone()))?;
            let target = *ids
                .get(&edge.target)
                .ok_or_else(|| DocumentError::UnknownNode(edge.target.clone()))?;
            graph.add_edge(&mut store, source, target, edge.attributes.clone())?;
        }

        Ok((store, graph, ids))
    }

    /// Export a graph in topological order with default labels and styles.
    pub fn from_graph<T: fmt::Display>(graph: &Graph<T>, store: &NodeStore<T>) -> Result<Self, GraphError> {
        Self::from_graph_with(graph, store, &ReferenceLabeler, &PlainEdgeStyler)
    }

    /// Export a graph in topological order.
    ///
    /// `labeler` provides each node's id; ids that repeat get the first free
    /// `#n` suffix so edge records stay unambiguous.
    pub fn from_graph_with<T: fmt::Display>(
        graph: &Graph<T>,
        store: &NodeStore<T>,
        labeler: &dyn NodeLabeler<T>,
        styler: &dyn EdgeStyler<T>,
    ) -> Result<Self, GraphError> {
        let order = graph.topological_order(store)?;

        let mut names: BTreeMap<NodeId, String> = BTreeMap::new();
        let mut used: BTreeSet<String> = BTreeSet::new();
        let mut suffixes: BTreeMap<String, usize> = BTreeMap::new();
        let mut document = GraphDocument::default();

        for id in &order {
            let node = store.try_node(*id)?;
            let label = labeler.label(*id, node);
            let name = if used.contains(&label) {
                let suffix = suffixes.entry(label.clone()).or_insert(1);
                loop {
                    *suffix += 1;
                    let candidate = format!("{}#{}", label, suffix);
                    if !used.contains(&candidate) {
                        break candidate;
                    }
                }
            } else {
                label
            };
            used.insert(name.clone());

            let reference = node.reference().to_string();
            document.nodes.push(NodeRecord {
                id: name.clone(),
                reference: (reference != name).then_some(reference),
                tags: node.tags(),
                duration: node.duration(),
                status: node.status().to_string(),
            });
            names.insert(*id, name);
        }

        for id in &order {
            let node = store.try_node(*id)?;
            for (dependent, attributes) in graph.internal_dependents(store, *id) {
                let (Some(source), Some(target)) = (names.get(id), names.get(&dependent)) else {
                    continue;
                };
                let target_node = store.try_node(dependent)?;
                document.edges.push(EdgeRecord {
                    source: source.clone(),
                    target: target.clone(),
                    attributes: styler.style(node, target_node, attributes),
                });
            }
        }

        Ok(document)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Load a graph, verifying any embedded checksum.
pub fn load(source: &Source) -> Result<LoadedGraph, DocumentError> {
    let text = source.read()?;
    let (document, checksum) = GraphDocument::parse(&text)?;
    let (store, graph, ids) = document.build()?;

    if let Some(expected) = &checksum {
        if !graph.validate_checksum(&store, expected) {
            let computed = graph.checksum(&store);
            tracing::error!(expected = %expected, computed = %computed, "Embedded checksum mismatch");
            return Err(DocumentError::ChecksumMismatch {
                expected: expected.clone(),
                computed,
            });
        }
    }

    tracing::info!(nodes = graph.len(), edges = graph.edge_count(&store), "Loaded graph document");
    Ok(LoadedGraph {
        store,
        graph,
        ids,
        checksum,
    })
}

/// Render a graph as JSON, optionally wrapped with its checksum.
pub fn to_json<T: fmt::Display>(
    graph: &Graph<T>,
    store: &NodeStore<T>,
    embed_checksum: bool,
) -> Result<String, DocumentError> {
    let rendered = GraphDocument::from_graph(graph, store)?.to_json()?;
    if embed_checksum {
        return Ok(wrap_with_checksum(&rendered, &graph.checksum(store), ".json"));
    }
    Ok(rendered)
}

/// Write a graph as JSON to `path`.
pub fn save<T: fmt::Display>(
    graph: &Graph<T>,
    store: &NodeStore<T>,
    path: impl AsRef<Path>,
    embed_checksum: bool,
) -> Result<(), DocumentError> {
    let path = path.as_ref();
    let rendered = to_json(graph, store, embed_checksum)?;
    tracing::info!(path = %path.display(), embed_checksum, "Writing graph document");
    std::fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PIPELINE: &str = r#"{
        "nodes": [
            {"id": "fetch", "tags": ["io"], "duration": 2},
            {"id": "build", "duration": 3, "status": "running"},
            {"id": "test", "duration": 1},
            {"id": "docs"}
        ],
        "edges": [
            {"source": "fetch", "target": "build", "attributes": {"weight": 2}},
            {"source": "build", "target": "test"}
        ]
    }"#;

    fn load_text(text: &str) -> Result<LoadedGraph, DocumentError> {
        load(&Source::Text(text.to_string()))
    }

    #[test]
    fn test_load_document() {
        let loaded = load_text(PIPELINE).unwrap();
        let (store, graph) = (&loaded.store, &loaded.graph);

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.edge_count(store), 2);

        let fetch = loaded.id("fetch").unwrap();
        let build = loaded.id("build").unwrap();
        let docs = loaded.id("docs").unwrap();
        assert!(store.is_tagged(fetch, "io"));
        assert_eq!(store.node(build).unwrap().status(), "running");
        assert_eq!(store.node(docs).unwrap().status(), "pending");
        assert!(graph.contains(docs));
        assert_eq!(
            store.edge_attributes(fetch, build).unwrap().get("weight"),
            Some(&json!(2))
        );
        assert_eq!(graph.project_duration(store).unwrap(), 6.0);
        assert!(loaded.checksum.is_none());
    }

    #[test]
    fn test_round_trip_preserves_checksum() {
        let loaded = load_text(PIPELINE).unwrap();
        let rendered = to_json(&loaded.graph, &loaded.store, false).unwrap();
        let reloaded = load_text(&rendered).unwrap();

        assert_eq!(
            loaded.graph.checksum(&loaded.store),
            reloaded.graph.checksum(&reloaded.store)
        );
    }

    #[test]
    fn test_embedded_checksum_verified() {
        let loaded = load_text(PIPELINE).unwrap();
        let digest = loaded.graph.checksum(&loaded.store);
        let wrapped = to_json(&loaded.graph, &loaded.store, true).unwrap();

        let reloaded = load_text(&wrapped).unwrap();
        assert_eq!(reloaded.checksum, Some(digest));

        let tampered = wrapped.replace("\"running\"", "\"done\"");
        match load_text(&tampered) {
            Err(DocumentError::ChecksumMismatch { expected, computed }) => assert_ne!(expected, computed),
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_rejected() {
        let text = r#"{
            "nodes": [{"id": "a"}, {"id": "b"}],
            "edges": [{"source": "a", "target": "b"}, {"source": "b", "target": "a"}]
        }"#;
        match load_text(text) {
            Err(DocumentError::Graph(error)) => assert!(error.is_cycle()),
            other => panic!("Expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_and_duplicate_ids() {
        let unknown = r#"{"nodes": [{"id": "a"}], "edges": [{"source": "a", "target": "z"}]}"#;
        assert!(matches!(load_text(unknown), Err(DocumentError::UnknownNode(id)) if id == "z"));

        let duplicate = r#"{"nodes": [{"id": "a"}, {"id": "a"}]}"#;
        assert!(matches!(load_text(duplicate), Err(DocumentError::DuplicateNode(id)) if id == "a"));
    }

    #[test]
    fn test_export_with_labeler() {
        let mut store = NodeStore::new();
        let a = store.insert("A");
        let b = store.insert("A");
        let mut graph = Graph::new();
        graph.add_edge(&mut store, a, b, Attributes::new()).unwrap();

        let labeler = |_: NodeId, node: &crate::types::Node<&str>| node.reference().to_lowercase();
        let document = GraphDocument::from_graph_with(&graph, &store, &labeler, &PlainEdgeStyler).unwrap();

        let ids: Vec<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a#2"]);
        assert_eq!(document.nodes[0].reference(), "A");
        assert_eq!(document.edges, vec![EdgeRecord::new("a", "a#2")]);
    }

    #[test]
    fn test_suffix_skips_existing_labels() {
        let mut store = NodeStore::new();
        let a1 = store.insert("A");
        let a2 = store.insert("A");
        let literal = store.insert("A#2");
        let mut graph = Graph::new();
        graph.add_edge(&mut store, a1, a2, Attributes::new()).unwrap();
        graph.add_edge(&mut store, a2, literal, Attributes::new()).unwrap();

        let document = GraphDocument::from_graph(&graph, &store).unwrap();
        let ids: Vec<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "A#2", "A#2#2"]);

        let reloaded = load_text(&document.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.graph.edge_count(&reloaded.store), 2);
        assert_eq!(reloaded.graph.checksum(&reloaded.store), graph.checksum(&store));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(load_text("{not json"), Err(DocumentError::Json(_))));
    }

    #[test]
    fn test_load_from_path() {
        let path = std::env::temp_dir().join(format!("dag-kernel-document-{}.json", std::process::id()));
        let loaded = load_text(PIPELINE).unwrap();
        save(&loaded.graph, &loaded.store, &path, true).unwrap();

        let reloaded = load(&Source::from(path.as_path())).unwrap();
        assert_eq!(reloaded.graph.len(), 4);
        assert!(reloaded.checksum.is_some());
        std::fs::remove_file(&path).unwrap();
    }
}

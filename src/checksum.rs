//! Deterministic graph checksums.
//!
//! A graph checksum is a BLAKE2b-512 digest, hex encoded, over a canonical
//! serialization of the members and their internal edges.
//!
//! ## Determinism Guarantees
//!
//! - Insertion order never matters: nodes are sorted by the string form of
//!   their reference, ties broken by the serialized node itself
//! - Tags and attribute keys are fed in sorted order; each rendered edge
//!   (dependent plus its attributes) is sorted as a whole, so dependents
//!   sharing a reference do not fall back to handle order
//! - Edges to nodes outside the graph are ignored
//! - Durations are rendered with a trailing `.0` for whole numbers, so `2`
//!   and `2.0` hash identically
//!
//! ## Canonical Form
//!
//! For each node, in order:
//!
//! ```text
//! {reference}:duration:{duration}:status:{status}
//!   (:tag:{tag})*
//!   (:edge:{dependent} (:attr:{key}:{value})*)*
//! ```
//!
//! String attribute values are written verbatim, other values as compact
//! JSON.
//!
//! ## Embedding
//!
//! [`wrap_with_checksum`] prepends a `blake2b: <hex>` marker to rendered
//! output, using the comment syntax of the target format, and
//! [`extract_checksum`] reads it back.

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::path::Path;

use blake2::{Blake2b512, Digest};
use regex_lite::Regex;

use crate::graph::{Graph, GraphRef};
use crate::store::NodeStore;
use crate::types::render_value;

/// Algorithm tag used in embedded checksum markers.
pub const CHECKSUM_ALGORITHM: &str = "blake2b";

/// Result of checking a graph against a stored checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumValidation {
    /// Checksum matches the graph.
    Valid,
    /// Checksum does not match the graph.
    Mismatch {
        /// The checksum that was stored.
        expected: String,
        /// The checksum computed from the graph.
        computed: String,
    },
    /// No checksum was stored.
    Missing,
}

impl ChecksumValidation {
    /// Whether the checksum matched.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Render a duration the way it is hashed.
pub fn format_duration(duration: f64) -> String {
    if duration.is_finite() && duration.fract() == 0.0 && duration.abs() < 1e16 {
        format!("{:.1}", duration)
    } else {
        format!("{}", duration)
    }
}

/// Compute the checksum of `graph` without consulting its cache.
pub fn compute_checksum<T: fmt::Display>(graph: &Graph<T>, store: &NodeStore<T>) -> String {
    let mut chunks: Vec<(String, String)> = graph
        .live_members(store)
        .map(|(id, node)| {
            let reference = node.reference().to_string();

            let mut chunk = reference.clone();
            chunk.push_str(":duration:");
            chunk.push_str(&format_duration(node.duration()));
            chunk.push_str(":status:");
            chunk.push_str(node.status());
            for tag in node.iter_tags() {
                chunk.push_str(":tag:");
                chunk.push_str(tag);
            }

            let mut edges: Vec<String> = graph
                .internal_dependents(store, id)
                .map(|(dependent, attributes)| {
                    let mut edge = format!(":edge:{}", store.label(dependent));
                    for (key, value) in attributes.iter() {
                        edge.push_str(":attr:");
                        edge.push_str(key);
                        edge.push(':');
                        edge.push_str(&render_value(value));
                    }
                    edge
                })
                .collect();
            edges.sort();
            chunk.extend(edges);

            (reference, chunk)
        })
        .collect();

    chunks.sort();

    let mut hasher = Blake2b512::new();
    for (_, chunk) in &chunks {
        hasher.update(chunk.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Compare two hex digests without short-circuiting.
fn digests_match(computed: &str, expected: &str) -> bool {
    if computed.len() != expected.len() {
        return false;
    }
    computed
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a.to_ascii_lowercase() ^ b.to_ascii_lowercase()))
        == 0
}

impl<T: fmt::Display> Graph<T> {
    /// BLAKE2b checksum of the graph, hex encoded.
    ///
    /// Cached until a member changes.
    pub fn checksum(&self, store: &NodeStore<T>) -> String {
        let cached = self.cached::<String, Infallible>(
            store,
            |cache| cache.checksum.clone(),
            || Ok(compute_checksum(self, store)),
            |cache, checksum| cache.checksum = Some(checksum),
        );
        match cached {
            Ok(checksum) => checksum,
            Err(never) => match never {},
        }
    }

    /// Whether the graph's checksum equals `expected`.
    pub fn validate_checksum(&self, store: &NodeStore<T>, expected: &str) -> bool {
        digests_match(&self.checksum(store), expected.trim())
    }

    /// Three-way check against an optional stored checksum.
    pub fn verify_checksum(&self, store: &NodeStore<T>, expected: Option<&str>) -> ChecksumValidation {
        match expected {
            None => ChecksumValidation::Missing,
            Some(expected) => {
                let computed = self.checksum(store);
                if digests_match(&computed, expected.trim()) {
                    ChecksumValidation::Valid
                } else {
                    ChecksumValidation::Mismatch {
                        expected: expected.trim().to_string(),
                        computed,
                    }
                }
            }
        }
    }

    /// Check rendered `content` against the marker embedded in it.
    pub fn verify_embedded_checksum(&self, store: &NodeStore<T>, content: &str) -> ChecksumValidation {
        self.verify_checksum(store, extract_checksum(content).as_deref())
    }

    /// Structural and metadata equality: the checksums match.
    pub fn is_equal_to(&self, store: &NodeStore<T>, other: GraphRef<'_, T>) -> bool {
        self.checksum(store) == other.graph().checksum(other.store())
    }

    /// Write the bare checksum to `path`.
    pub fn write_checksum(&self, store: &NodeStore<T>, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Writing checksum");
        std::fs::write(path, self.checksum(store))
    }
}

/// Read a bare checksum file written by [`Graph::write_checksum`].
pub fn read_checksum(path: impl AsRef<Path>) -> io::Result<String> {
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}

/// Prepend a `blake2b: <hex>` marker to rendered content.
///
/// The marker uses the comment syntax matching `extension` (with or without
/// the leading dot). JSON content is wrapped as
/// `{"checksum": ..., "graph": ...}` instead; if it does not parse, a `#`
/// comment line is used.
pub fn wrap_with_checksum(content: &str, checksum: &str, extension: &str) -> String {
    let marker = format!("{}: {}", CHECKSUM_ALGORITHM, checksum);
    let extension = extension.trim_start_matches('.').to_lowercase();

    let comment = match extension.as_str() {
        "graphml" | "html" | "xml" => format!("<!-- {} -->", marker),
        "yaml" | "yml" | "toml" | "txt" | "ascii" | "csv" => format!("# {}", marker),
        "dot" | "gv" | "d2" => format!("// {}", marker),
        "mmd" | "mermaid" => format!("%% {}", marker),
        "puml" => format!("' {}", marker),
        "tex" => format!("% {}", marker),
        "json" => match serde_json::from_str::<serde_json::Value>(content) {
            Ok(graph) => {
                let wrapped = serde_json::json!({ "checksum": marker, "graph": graph });
                if let Ok(rendered) = serde_json::to_string_pretty(&wrapped) {
                    return rendered;
                }
                format!("# {}", marker)
            }
            Err(_) => format!("# {}", marker),
        },
        _ => format!("# {}", marker),
    };

    format!("{}\n{}", comment, content)
}

/// Find an embedded `blake2b: <hex>` marker anywhere in `content`.
///
/// The digest is returned lowercased.
pub fn extract_checksum(content: &str) -> Option<String> {
    let pattern = Regex::new(r"blake2b:\s*([0-9a-fA-F]+)").ok()?;
    pattern
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|digest| digest.as_str().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attributes, NodeId};

    fn abc(order: [&'static str; 3]) -> (NodeStore<&'static str>, Graph<&'static str>) {
        let mut store = NodeStore::new();
        let ids: Vec<NodeId> = order.iter().map(|name| store.insert(*name)).collect();
        let find = |name: &str| ids[order.iter().position(|n| *n == name).unwrap()];
        let (a, b, c) = (find("A"), find("B"), find("C"));

        let mut graph = Graph::new();
        graph
            .add_edge(&mut store, a, b, Attributes::new().with("weight", 1))
            .unwrap();
        graph.add_edge(&mut store, b, c, Attributes::new()).unwrap();
        store.add_tag(c, "leaf").unwrap();
        (store, graph)
    }

    #[test]
    fn test_checksum_is_hex_blake2b_512() {
        let (store, graph) = abc(["A", "B", "C"]);
        let digest = graph.checksum(&store);
        assert_eq!(digest.len(), 128);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_checksum_ignores_insertion_order() {
        let (s1, g1) = abc(["A", "B", "C"]);
        let (s2, g2) = abc(["C", "A", "B"]);
        assert_eq!(g1.checksum(&s1), g2.checksum(&s2));
        assert!(g1.bind(&s1) == g2.bind(&s2));
    }

    fn fan_out(first: i64, second: i64) -> String {
        let mut store = NodeStore::new();
        let a = store.insert("A");
        let b1 = store.insert("B");
        let b2 = store.insert("B");

        let mut graph = Graph::new();
        graph
            .add_edge(&mut store, a, b1, Attributes::new().with("w", first))
            .unwrap();
        graph
            .add_edge(&mut store, a, b2, Attributes::new().with("w", second))
            .unwrap();
        graph.checksum(&store)
    }

    #[test]
    fn test_checksum_ignores_order_of_same_reference_dependents() {
        assert_eq!(fan_out(1, 2), fan_out(2, 1));
        assert_ne!(fan_out(1, 2), fan_out(1, 1));
    }

    #[test]
    fn test_checksum_tracks_metadata() {
        let (mut store, graph) = abc(["A", "B", "C"]);
        let before = graph.checksum(&store);
        assert!(graph.has_fresh_cache(&store));

        let a = graph.get(&store, &"A").unwrap();
        store.set_status(a, "done").unwrap();
        assert!(!graph.has_fresh_cache(&store));

        let after = graph.checksum(&store);
        assert_ne!(before, after);

        store.set_status(a, "pending").unwrap();
        assert_eq!(graph.checksum(&store), before);
    }

    #[test]
    fn test_checksum_tracks_edge_attributes() {
        let (mut store, graph) = abc(["A", "B", "C"]);
        let before = graph.checksum(&store);
        let a = graph.get(&store, &"A").unwrap();
        let b = graph.get(&store, &"B").unwrap();
        store.set_edge_attribute(a, b, "weight", 2).unwrap();
        assert_ne!(graph.checksum(&store), before);
    }

    #[test]
    fn test_checksum_ignores_external_edges() {
        let (mut store, graph) = abc(["A", "B", "C"]);
        let before = graph.checksum(&store);
        let outside = store.insert("X");
        let c = graph.get(&store, &"C").unwrap();
        store.provides_to(c, outside, false).unwrap();
        assert_eq!(graph.checksum(&store), before);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0.0");
        assert_eq!(format_duration(2.0), "2.0");
        assert_eq!(format_duration(2.5), "2.5");
        assert_eq!(format_duration(0.1), "0.1");
    }

    #[test]
    fn test_verify_checksum() {
        let (store, graph) = abc(["A", "B", "C"]);
        let digest = graph.checksum(&store);

        assert!(graph.validate_checksum(&store, &digest));
        assert!(graph.validate_checksum(&store, &digest.to_uppercase()));
        assert_eq!(graph.verify_checksum(&store, Some(&digest)), ChecksumValidation::Valid);
        assert_eq!(graph.verify_checksum(&store, None), ChecksumValidation::Missing);
        match graph.verify_checksum(&store, Some("00")) {
            ChecksumValidation::Mismatch { expected, computed } => {
                assert_eq!(expected, "00");
                assert_eq!(computed, digest);
            }
            other => panic!("Expected Mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_wrap_comment_styles() {
        assert_eq!(wrap_with_checksum("x", "ab", ".dot"), "// blake2b: ab\nx");
        assert_eq!(wrap_with_checksum("x", "ab", "graphml"), "<!-- blake2b: ab -->\nx");
        assert_eq!(wrap_with_checksum("x", "ab", ".MMD"), "%% blake2b: ab\nx");
        assert_eq!(wrap_with_checksum("x", "ab", ".puml"), "' blake2b: ab\nx");
        assert_eq!(wrap_with_checksum("x", "ab", ".tex"), "% blake2b: ab\nx");
        assert_eq!(wrap_with_checksum("x", "ab", ".yaml"), "# blake2b: ab\nx");
        assert_eq!(wrap_with_checksum("x", "ab", ".unknown"), "# blake2b: ab\nx");
    }

    #[test]
    fn test_wrap_json() {
        let wrapped = wrap_with_checksum(r#"{"nodes": []}"#, "ab12", ".json");
        let value: serde_json::Value = serde_json::from_str(&wrapped).unwrap();
        assert_eq!(value["checksum"], "blake2b: ab12");
        assert_eq!(value["graph"]["nodes"], serde_json::json!([]));

        let fallback = wrap_with_checksum("not json", "ab12", ".json");
        assert_eq!(fallback, "# blake2b: ab12\nnot json");
    }

    #[test]
    fn test_extract_round_trip() {
        let (store, graph) = abc(["A", "B", "C"]);
        let digest = graph.checksum(&store);
        for extension in [".dot", ".json", ".graphml", ".tex"] {
            let wrapped = wrap_with_checksum("{}", &digest, extension);
            assert_eq!(extract_checksum(&wrapped), Some(digest.clone()));
        }
        assert_eq!(extract_checksum("no marker here"), None);

        let wrapped = wrap_with_checksum("digraph {}", &digest, ".dot");
        assert!(graph.verify_embedded_checksum(&store, &wrapped).is_valid());
        assert_eq!(
            graph.verify_embedded_checksum(&store, "digraph {}"),
            ChecksumValidation::Missing
        );
    }

    #[test]
    fn test_checksum_file() {
        let (store, graph) = abc(["A", "B", "C"]);
        let path = std::env::temp_dir().join(format!("dag-kernel-checksum-{}.txt", std::process::id()));
        graph.write_checksum(&store, &path).unwrap();
        assert_eq!(read_checksum(&path).unwrap(), graph.checksum(&store));
        std::fs::remove_file(&path).unwrap();
    }
}

//! Pluggable labeling for exporters.
//!
//! Exporters ask a [`NodeLabeler`] for the display label of each node and an
//! [`EdgeStyler`] for extra attributes on each edge. Closures implement
//! [`NodeLabeler`] directly, so one-off labels need no new type.

use std::fmt;

use crate::types::{Attributes, Node, NodeId};

/// Produces a display label for a node.
pub trait NodeLabeler<T> {
    /// Label for `node`.
    fn label(&self, id: NodeId, node: &Node<T>) -> String;
}

/// Produces display attributes for an edge.
pub trait EdgeStyler<T> {
    /// Attributes to render for the edge `source -> target`.
    ///
    /// `attributes` are the edge's own attributes.
    fn style(&self, source: &Node<T>, target: &Node<T>, attributes: &Attributes) -> Attributes;
}

/// Labels nodes with their reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceLabeler;

impl<T: fmt::Display> NodeLabeler<T> for ReferenceLabeler {
    fn label(&self, _id: NodeId, node: &Node<T>) -> String {
        node.reference().to_string()
    }
}

impl<T, F> NodeLabeler<T> for F
where
    F: Fn(NodeId, &Node<T>) -> String,
{
    fn label(&self, id: NodeId, node: &Node<T>) -> String {
        self(id, node)
    }
}

/// Passes edge attributes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainEdgeStyler;

impl<T> EdgeStyler<T> for PlainEdgeStyler {
    fn style(&self, _source: &Node<T>, _target: &Node<T>, attributes: &Attributes) -> Attributes {
        attributes.clone()
    }
}

/// Colors edges by the `color:<name>` tag of their target node, falling back
/// to the source node. Tags written by a diff projection drive it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagColorStyler;

impl TagColorStyler {
    fn color_of<T>(node: &Node<T>) -> Option<&str> {
        node.iter_tags().find_map(|tag| tag.strip_prefix("color:"))
    }
}

impl<T> EdgeStyler<T> for TagColorStyler {
    fn style(&self, source: &Node<T>, target: &Node<T>, attributes: &Attributes) -> Attributes {
        let mut styled = attributes.clone();
        if !styled.contains_key("color") {
            if let Some(color) = Self::color_of(target).or_else(|| Self::color_of(source)) {
                styled.insert("color", color);
            }
        }
        styled
    }
}

use crate::{Edge, VertexId};

use std::collections::HashMap;

/// A vertex with its outgoing edges and the hidden properties vertex programs
/// attach to it during a computation.
pub struct Vertex<S> {
    id: VertexId,
    outer_edges: Vec<Edge>,
    properties: HashMap<String, S>,
}

impl<S> Vertex<S> {
    pub fn new(id: VertexId) -> Self {
        Vertex {
            id,
            outer_edges: Vec::new(),
            properties: HashMap::new(),
        }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Adds an outgoing edge. Returns false if the edge does not start here
    /// or is already present.
    pub fn add_outer_edge(&mut self, edge: Edge) -> bool {
        if edge.source != self.id || self.outer_edges.contains(&edge) {
            return false;
        }
        self.outer_edges.push(edge);
        true
    }

    pub fn get_outer_edges(&self) -> &[Edge] {
        &self.outer_edges
    }

    /// Outgoing edges whose label is in `labels`, or all of them when
    /// `labels` is empty.
    pub fn outer_edges_labelled<'a>(
        &'a self,
        labels: &'a [String],
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.outer_edges
            .iter()
            .filter(move |edge| labels.is_empty() || labels.contains(&edge.label))
    }

    pub fn property(&self, key: &str) -> Option<&S> {
        self.properties.get(key)
    }

    pub fn property_mut(&mut self, key: &str) -> Option<&mut S> {
        self.properties.get_mut(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: S) {
        self.properties.insert(key.into(), value);
    }

    pub fn remove_property(&mut self, key: &str) -> Option<S> {
        self.properties.remove(key)
    }

    pub fn property_keys(&self) -> impl Iterator<Item = &String> {
        self.properties.keys()
    }
}

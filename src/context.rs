use crate::mapreduce::AggVal;

use std::collections::HashMap;
use std::sync::Arc;

/// What the master knows about a computation: how far it got, the size of
/// the graph and the published map-reduce results.
#[derive(Default)]
pub struct Context {
    pub(crate) superstep: u64,
    pub(crate) num_edges: usize,
    pub(crate) num_vertices: usize,
    pub(crate) aggregated_values: HashMap<String, AggVal>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Supersteps completed so far.
    pub fn superstep(&self) -> u64 {
        self.superstep
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn get_aggregated_value<T: 'static + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.aggregated_values.get(name) {
            Some(value) => value.clone().downcast::<T>().ok(),
            None => None,
        }
    }
}

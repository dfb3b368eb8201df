use crate::program::{hide, TRAVERSER_TRACKER};
use crate::traversal::VertexProperty;
use crate::traverser::{Coefficient, Traverser};
use crate::vertex::Vertex;
use crate::{Element, TraverserTracker};

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

pub type AggVal = Arc<dyn Any + Send + Sync>;

/// A job run once over every vertex after the computation halts. `map`
/// reports a partial value per vertex, `reduce` folds two partials into one.
/// The folded value is published under `memory_key`.
pub trait MapReduce<S>: Send + Sync {
    fn memory_key(&self) -> &str;

    fn map(&self, vertex: &Vertex<S>) -> Option<AggVal>;

    fn reduce(&self, a: AggVal, b: AggVal) -> AggVal;
}

/// Takes the concrete value out of a partial, cloning only if it is shared.
fn take<T: Clone + Send + Sync + 'static>(value: AggVal) -> Option<T> {
    value
        .downcast::<T>()
        .ok()
        .map(|value| Arc::try_unwrap(value).unwrap_or_else(|shared| (*shared).clone()))
}

fn sum_into<C: Coefficient>(into: &mut HashMap<Element, C>, from: HashMap<Element, C>) {
    for (object, coefficient) in from {
        into.entry(object)
            .and_modify(|c| *c = *c + coefficient)
            .or_insert(coefficient);
    }
}

pub const TRAVERSAL_RESULT: &str = "traversal.result";

/// Traversers that reached the end of the pipeline, across the whole graph.
#[derive(Clone, Debug)]
pub enum TraversalResult<C> {
    Counts(HashMap<Element, C>),
    Paths(Vec<Traverser<C, Element>>),
}

impl<C: Coefficient> TraversalResult<C> {
    pub fn len(&self) -> usize {
        match self {
            TraversalResult::Counts(counts) => counts.len(),
            TraversalResult::Paths(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> Option<&HashMap<Element, C>> {
        match self {
            TraversalResult::Counts(counts) => Some(counts),
            TraversalResult::Paths(_) => None,
        }
    }

    pub fn paths(&self) -> Option<&[Traverser<C, Element>]> {
        match self {
            TraversalResult::Paths(paths) => Some(paths),
            TraversalResult::Counts(_) => None,
        }
    }

    fn merge(self, other: TraversalResult<C>) -> TraversalResult<C> {
        match (self, other) {
            (TraversalResult::Counts(mut a), TraversalResult::Counts(b)) => {
                sum_into(&mut a, b);
                TraversalResult::Counts(a)
            }
            (TraversalResult::Paths(mut a), TraversalResult::Paths(b)) => {
                a.extend(b);
                TraversalResult::Paths(a)
            }
            // Every vertex uses the same tracker variant, so mixed partials
            // never meet.
            (a, _) => a,
        }
    }
}

/// Collects the traversers each vertex retired.
pub struct TraversalResultJob<C> {
    _coefficient: PhantomData<fn() -> C>,
}

impl<C> TraversalResultJob<C> {
    pub fn new() -> Self {
        TraversalResultJob {
            _coefficient: PhantomData,
        }
    }
}

impl<C> Default for TraversalResultJob<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Coefficient> MapReduce<VertexProperty<C>> for TraversalResultJob<C> {
    fn memory_key(&self) -> &str {
        TRAVERSAL_RESULT
    }

    fn map(&self, vertex: &Vertex<VertexProperty<C>>) -> Option<AggVal> {
        let result = match vertex.property(TRAVERSER_TRACKER)? {
            VertexProperty::Tracker(TraverserTracker::Count(tracker)) => {
                TraversalResult::Counts(tracker.done().clone())
            }
            VertexProperty::Tracker(TraverserTracker::Path(tracker)) => {
                TraversalResult::Paths(tracker.done().to_vec())
            }
            VertexProperty::SideEffect(_) => return None,
        };
        Some(Arc::new(result))
    }

    fn reduce(&self, a: AggVal, b: AggVal) -> AggVal {
        match (take::<TraversalResult<C>>(a), take::<TraversalResult<C>>(b)) {
            (Some(a), Some(b)) => Arc::new(a.merge(b)),
            (Some(a), None) | (None, Some(a)) => Arc::new(a),
            (None, None) => Arc::new(TraversalResult::<C>::Counts(HashMap::new())),
        }
    }
}

/// Sums the per-vertex counts of a `groupCount` side effect.
pub struct GroupCountJob<C> {
    key: String,
    hidden: String,
    _coefficient: PhantomData<fn() -> C>,
}

impl<C> GroupCountJob<C> {
    pub fn new(key: &str) -> Self {
        GroupCountJob {
            key: key.to_string(),
            hidden: hide(key),
            _coefficient: PhantomData,
        }
    }
}

impl<C: Coefficient> MapReduce<VertexProperty<C>> for GroupCountJob<C> {
    fn memory_key(&self) -> &str {
        &self.key
    }

    fn map(&self, vertex: &Vertex<VertexProperty<C>>) -> Option<AggVal> {
        match vertex.property(&self.hidden)? {
            VertexProperty::SideEffect(counts) => Some(Arc::new(counts.clone())),
            VertexProperty::Tracker(_) => None,
        }
    }

    fn reduce(&self, a: AggVal, b: AggVal) -> AggVal {
        let mut counts = take::<HashMap<Element, C>>(a).unwrap_or_default();
        sum_into(&mut counts, take::<HashMap<Element, C>>(b).unwrap_or_default());
        Arc::new(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Future;

    fn vertex_with_results(id: i64, done: &[(i64, u64)]) -> Vertex<VertexProperty<u64>> {
        let mut tracker = TraverserTracker::new(false);
        for (object, coefficient) in done {
            tracker.retire(
                Traverser::new(*coefficient, Element::Vertex(*object)).with_future(Future::Done),
            );
        }
        let mut vertex = Vertex::new(id);
        vertex.set_property(TRAVERSER_TRACKER, VertexProperty::Tracker(tracker));
        vertex
    }

    #[test]
    fn result_job_sums_counts_across_vertices() {
        let job = TraversalResultJob::<u64>::new();
        let a = job.map(&vertex_with_results(1, &[(1, 2), (2, 1)])).unwrap();
        let b = job.map(&vertex_with_results(2, &[(1, 3)])).unwrap();

        let reduced = job.reduce(a, b);
        let result = reduced.downcast::<TraversalResult<u64>>().unwrap();
        let counts = result.counts().unwrap();

        assert_eq!(counts.get(&Element::Vertex(1)), Some(&5));
        assert_eq!(counts.get(&Element::Vertex(2)), Some(&1));
    }

    #[test]
    fn group_count_job_ignores_vertices_without_the_side_effect() {
        let job = GroupCountJob::<u64>::new("g");
        assert!(job.map(&Vertex::new(1)).is_none());

        let mut vertex = Vertex::new(2);
        let mut counts = HashMap::new();
        counts.insert(Element::Vertex(2), 4_u64);
        vertex.set_property("~g", VertexProperty::SideEffect(counts));

        let mapped = job.map(&vertex).unwrap();
        let reduced = job.reduce(mapped.clone(), mapped);
        let counts = reduced.downcast::<HashMap<Element, u64>>().unwrap();
        assert_eq!(counts.get(&Element::Vertex(2)), Some(&8));
    }
}

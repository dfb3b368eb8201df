use crate::traverser::{Coefficient, Future, Traverser};

use std::collections::HashMap;
use std::hash::Hash;

/// Collapses traversers with equal objects into a single coefficient.
#[derive(Clone, Debug)]
pub struct CountTracker<C, A>
where
    A: Eq + Hash,
{
    next: HashMap<Future, HashMap<A, C>>,
    done: HashMap<A, C>,
}

impl<C, A> Default for CountTracker<C, A>
where
    A: Eq + Hash,
{
    fn default() -> Self {
        CountTracker {
            next: HashMap::new(),
            done: HashMap::new(),
        }
    }
}

fn add<C: Coefficient, A: Eq + Hash>(counts: &mut HashMap<A, C>, object: A, coefficient: C) {
    counts
        .entry(object)
        .and_modify(|c| *c = *c + coefficient)
        .or_insert(coefficient);
}

fn expand<C, A>(buckets: &HashMap<Future, HashMap<A, C>>) -> Vec<Traverser<C, A>>
where
    C: Coefficient,
    A: Eq + Hash + Clone,
{
    buckets
        .iter()
        .flat_map(|(future, counts)| {
            counts
                .iter()
                .map(|(object, c)| Traverser::new(*c, object.clone()).with_future(*future))
        })
        .collect()
}

impl<C, A> CountTracker<C, A>
where
    C: Coefficient,
    A: Eq + Hash + Clone,
{
    /// Traversers are grouped by the step they resume at, so only traversers
    /// headed for the same step are merged.
    pub fn merge(&mut self, traverser: Traverser<C, A>) {
        let future = traverser.future();
        let (coefficient, object) = traverser.into_parts();
        add(self.next.entry(future).or_default(), object, coefficient);
    }

    pub fn retire(&mut self, traverser: Traverser<C, A>) {
        let (coefficient, object) = traverser.into_parts();
        add(&mut self.done, object, coefficient);
    }

    pub fn incoming(&self) -> Vec<Traverser<C, A>> {
        expand(&self.next)
    }

    pub fn done(&self) -> &HashMap<A, C> {
        &self.done
    }

    /// Drops the traversers merged for this superstep once they are processed.
    pub fn complete_iteration(&mut self) {
        self.next.clear();
    }
}

/// Keeps every traverser that arrives, one per path.
#[derive(Clone, Debug)]
pub struct PathTracker<C, A> {
    next: Vec<Traverser<C, A>>,
    done: Vec<Traverser<C, A>>,
}

impl<C, A> Default for PathTracker<C, A> {
    fn default() -> Self {
        PathTracker {
            next: Vec::new(),
            done: Vec::new(),
        }
    }
}

impl<C, A> PathTracker<C, A>
where
    C: Coefficient,
    A: Clone,
{
    pub fn merge(&mut self, traverser: Traverser<C, A>) {
        self.next.push(traverser);
    }

    pub fn retire(&mut self, traverser: Traverser<C, A>) {
        self.done.push(traverser);
    }

    pub fn incoming(&self) -> Vec<Traverser<C, A>> {
        self.next.clone()
    }

    pub fn done(&self) -> &[Traverser<C, A>] {
        &self.done
    }

    /// Drops the traversers merged for this superstep once they are processed.
    pub fn complete_iteration(&mut self) {
        self.next.clear();
    }
}

/// Per-vertex accumulator. The variant is chosen once per computation.
#[derive(Clone, Debug)]
pub enum TraverserTracker<C, A>
where
    A: Eq + Hash,
{
    Count(CountTracker<C, A>),
    Path(PathTracker<C, A>),
}

impl<C, A> TraverserTracker<C, A>
where
    C: Coefficient,
    A: Eq + Hash + Clone,
{
    pub fn new(track_paths: bool) -> Self {
        if track_paths {
            TraverserTracker::Path(PathTracker::default())
        } else {
            TraverserTracker::Count(CountTracker::default())
        }
    }

    pub fn merge(&mut self, traverser: Traverser<C, A>) {
        match self {
            TraverserTracker::Count(tracker) => tracker.merge(traverser),
            TraverserTracker::Path(tracker) => tracker.merge(traverser),
        }
    }

    pub fn retire(&mut self, traverser: Traverser<C, A>) {
        match self {
            TraverserTracker::Count(tracker) => tracker.retire(traverser),
            TraverserTracker::Path(tracker) => tracker.retire(traverser),
        }
    }

    /// Traversers merged since the last completed iteration.
    pub fn incoming(&self) -> Vec<Traverser<C, A>> {
        match self {
            TraverserTracker::Count(tracker) => tracker.incoming(),
            TraverserTracker::Path(tracker) => tracker.incoming(),
        }
    }

    pub fn complete_iteration(&mut self) {
        match self {
            TraverserTracker::Count(tracker) => tracker.complete_iteration(),
            TraverserTracker::Path(tracker) => tracker.complete_iteration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Element;

    fn at(step: usize, coefficient: u64, id: i64) -> Traverser<u64, Element> {
        Traverser::new(coefficient, Element::Vertex(id)).with_future(Future::Step(step))
    }

    #[test]
    fn count_tracker_sums_equal_objects() {
        let mut tracker = CountTracker::default();
        tracker.merge(at(1, 2, 5));
        tracker.merge(at(1, 3, 5));
        tracker.merge(at(1, 4, 5));
        tracker.merge(at(1, 1, 6));

        let mut incoming = tracker.incoming();
        incoming.sort_by(|a, b| a.object().cmp(b.object()));

        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming[0].object(), &Element::Vertex(5));
        assert_eq!(incoming[0].coefficient(), 9);
        assert_eq!(incoming[1].coefficient(), 1);
    }

    #[test]
    fn count_tracker_keeps_different_steps_apart() {
        let mut tracker = CountTracker::default();
        tracker.merge(at(1, 1, 5));
        tracker.merge(at(2, 1, 5));
        assert_eq!(tracker.incoming().len(), 2);
    }

    #[test]
    fn path_tracker_keeps_every_path() {
        let origin_a = Traverser::with_path(1_u64, Element::Vertex(1));
        let origin_b = Traverser::with_path(1_u64, Element::Vertex(2));

        let mut tracker = PathTracker::default();
        tracker.merge(origin_a.split(1, Element::Vertex(3)));
        tracker.merge(origin_b.split(1, Element::Vertex(3)));
        tracker.merge(origin_b.split(1, Element::Vertex(3)));

        let incoming = tracker.incoming();
        assert_eq!(incoming.len(), 3);
        assert!(incoming.iter().all(|t| t.object() == &Element::Vertex(3)));
    }

    #[test]
    fn complete_iteration_clears_the_processed_set() {
        for track_paths in [false, true] {
            let mut tracker = TraverserTracker::new(track_paths);
            tracker.merge(at(0, 1, 1));
            tracker.retire(at(1, 1, 2));
            assert_eq!(tracker.incoming().len(), 1);

            tracker.complete_iteration();
            assert!(tracker.incoming().is_empty());

            tracker.merge(at(0, 1, 3));
            assert_eq!(tracker.incoming().len(), 1);
            assert_eq!(tracker.incoming()[0].object(), &Element::Vertex(3));
        }
    }

    #[test]
    fn retired_traversers_merge_by_object_in_count_mode() {
        let mut tracker = TraverserTracker::new(false);
        tracker.retire(at(0, 2, 4));
        tracker.retire(at(3, 5, 4));

        match &tracker {
            TraverserTracker::Count(count) => {
                assert_eq!(count.done().get(&Element::Vertex(4)), Some(&7))
            }
            TraverserTracker::Path(_) => unreachable!(),
        }
    }
}

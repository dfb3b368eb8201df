use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct PathEntry<A> {
    pub labels: BTreeSet<String>,
    pub object: A,
}

/// Append-only history of the objects a traverser visited.
///
/// Entries are reference counted, so a path built from a parent shares every
/// recorded entry with it. Labelling the head of a shared path copies only
/// that head entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Path<A> {
    entries: Vec<Arc<PathEntry<A>>>,
}

impl<A> Default for Path<A> {
    fn default() -> Self {
        Path {
            entries: Vec::new(),
        }
    }
}

impl<A: Clone> Path<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(object: A) -> Self {
        let mut path = Path::new();
        path.push(BTreeSet::new(), object);
        path
    }

    /// Builds a child path: the parent's entries by reference, plus one more.
    pub fn extend(&self, labels: BTreeSet<String>, object: A) -> Self {
        let mut path = Path {
            entries: self.entries.clone(),
        };
        path.push(labels, object);
        path
    }

    fn push(&mut self, labels: BTreeSet<String>, object: A) {
        self.entries.push(Arc::new(PathEntry { labels, object }));
    }

    pub fn add_labels<I>(&mut self, labels: I)
    where
        I: IntoIterator<Item = String>,
    {
        if let Some(head) = self.entries.last_mut() {
            let entry = Arc::make_mut(head);
            entry.labels.extend(labels);
        }
    }

    #[cfg(test)]
    pub(crate) fn shares_entry_with(&self, other: &Path<A>, index: usize) -> bool {
        match (self.entries.get(index), other.entries.get(index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<A> Path<A> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head(&self) -> Option<&A> {
        self.entries.last().map(|entry| &entry.object)
    }

    pub fn objects(&self) -> impl Iterator<Item = &A> {
        self.entries.iter().map(|entry| &entry.object)
    }

    pub fn labels(&self, index: usize) -> Option<&BTreeSet<String>> {
        self.entries.get(index).map(|entry| &entry.labels)
    }

    /// The most recent object recorded under `label`.
    pub fn get(&self, label: &str) -> Option<&A> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.labels.contains(label))
            .map(|entry| &entry.object)
    }
}

use crate::MemoryValue;
use crate::Path;

use std::collections::BTreeSet;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::ops::Add;

/// Multiplicity attached to a traverser. Identical traversers collapse into
/// one whose coefficient is the sum of theirs.
pub trait Coefficient:
    Copy + Debug + PartialEq + Add<Output = Self> + Send + Sync + 'static
{
    fn one() -> Self;

    fn to_memory(self) -> MemoryValue;
}

impl Coefficient for u32 {
    fn one() -> Self {
        1
    }

    fn to_memory(self) -> MemoryValue {
        MemoryValue::Long(self as i64)
    }
}

impl Coefficient for u64 {
    fn one() -> Self {
        1
    }

    /// Saturates at `i64::MAX`.
    fn to_memory(self) -> MemoryValue {
        MemoryValue::Long(i64::try_from(self).unwrap_or(i64::MAX))
    }
}

impl Coefficient for i64 {
    fn one() -> Self {
        1
    }

    fn to_memory(self) -> MemoryValue {
        MemoryValue::Long(self)
    }
}

impl Coefficient for f64 {
    fn one() -> Self {
        1.0
    }

    fn to_memory(self) -> MemoryValue {
        MemoryValue::Double(self)
    }
}

/// Pipeline position a traverser resumes at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Future {
    Step(usize),
    Done,
}

#[derive(Clone)]
pub struct Traverser<C, A> {
    coefficient: C,
    object: A,
    path: Option<Path<A>>,
    future: Future,
}

impl<C, A> Traverser<C, A>
where
    C: Coefficient,
    A: Clone,
{
    /// A traverser that does not record its path.
    pub fn new(coefficient: C, object: A) -> Self {
        Traverser {
            coefficient,
            object,
            path: None,
            future: Future::Done,
        }
    }

    /// A traverser whose path starts with `object`.
    pub fn with_path(coefficient: C, object: A) -> Self {
        let path = Path::singleton(object.clone());
        Traverser {
            coefficient,
            object,
            path: Some(path),
            future: Future::Done,
        }
    }

    pub fn coefficient(&self) -> C {
        self.coefficient
    }

    pub fn object(&self) -> &A {
        &self.object
    }

    pub fn path(&self) -> Option<&Path<A>> {
        self.path.as_ref()
    }

    pub fn future(&self) -> Future {
        self.future
    }

    pub fn set_future(&mut self, future: Future) {
        self.future = future;
    }

    pub fn with_future(mut self, future: Future) -> Self {
        self.future = future;
        self
    }

    /// Labels the head of the path. Repeating a label is a no-op, as is
    /// labelling a traverser that does not track its path.
    pub fn add_label(&mut self, label: &str) {
        if let Some(path) = self.path.as_mut() {
            path.add_labels(std::iter::once(label.to_string()));
        }
    }

    /// Derives a child at `object`, leaving `self` untouched.
    pub fn split(&self, coefficient: C, object: A) -> Self {
        let path = self
            .path
            .as_ref()
            .map(|path| path.extend(BTreeSet::new(), object.clone()));

        Traverser {
            coefficient,
            object,
            path,
            future: self.future,
        }
    }

    pub(crate) fn into_parts(self) -> (C, A) {
        (self.coefficient, self.object)
    }
}

impl<C, A: PartialEq> PartialEq for Traverser<C, A> {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl<C, A: Eq> Eq for Traverser<C, A> {}

impl<C, A: Hash> Hash for Traverser<C, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object.hash(state);
    }
}

impl<C: Debug, A: Debug> Debug for Traverser<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traverser")
            .field("coefficient", &self.coefficient)
            .field("object", &self.object)
            .field("future", &self.future)
            .field("path_len", &self.path.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl<C, A: fmt::Display> fmt::Display for Traverser<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object)
    }
}

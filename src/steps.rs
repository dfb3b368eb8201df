//! Compiled steps the traversal program can run.

use crate::mapreduce::{GroupCountJob, MapReduce};
use crate::memory::{MemoryKey, MemoryValue, Reducer};
use crate::program::hide;
use crate::traversal::{Advance, Step, StepContext, Traversal, VertexProperty};
use crate::traverser::{Coefficient, Traverser};
use crate::{Element, Result, TraversalError, Value};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

fn labels_of(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

fn mismatch(step: &dyn fmt::Display, expected: &'static str, found: &Element) -> TraversalError {
    TraversalError::TypeMismatch {
        step: step.to_string(),
        expected,
        found: format!("{} {}", found.kind(), found),
    }
}

/// Moves vertex traversers to their out-neighbours.
pub struct OutStep {
    labels: Vec<String>,
}

impl fmt::Display for OutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "out({})", self.labels.join(","))
    }
}

impl<C: Coefficient> Step<C> for OutStep {
    fn process(
        &self,
        traverser: Traverser<C, Element>,
        _: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        if !matches!(traverser.object(), Element::Vertex(_)) {
            return Err(mismatch(self, "vertex", traverser.object()));
        }

        Ok(Advance::Adjacent {
            traverser,
            labels: self.labels.clone(),
        })
    }
}

/// Vertex to its outgoing edges.
pub struct OutEStep {
    labels: Vec<String>,
}

impl fmt::Display for OutEStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "outE({})", self.labels.join(","))
    }
}

impl<C: Coefficient> Step<C> for OutEStep {
    fn process(
        &self,
        traverser: Traverser<C, Element>,
        context: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        match traverser.object() {
            Element::Vertex(_) => Ok(Advance::Emit(
                context
                    .vertex
                    .outer_edges_labelled(&self.labels)
                    .map(|edge| traverser.split(traverser.coefficient(), Element::Edge(edge.clone())))
                    .collect(),
            )),
            other => Err(mismatch(self, "vertex", other)),
        }
    }
}

/// Edge to its target vertex.
pub struct InVStep;

impl fmt::Display for InVStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("inV()")
    }
}

impl<C: Coefficient> Step<C> for InVStep {
    fn process(
        &self,
        traverser: Traverser<C, Element>,
        _: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        match traverser.object() {
            Element::Edge(edge) => {
                let target = Element::Vertex(edge.target);
                Ok(Advance::Emit(vec![
                    traverser.split(traverser.coefficient(), target)
                ]))
            }
            other => Err(mismatch(self, "edge", other)),
        }
    }
}

pub type Predicate = Arc<dyn Fn(&Element) -> bool + Send + Sync>;

pub struct FilterStep {
    name: String,
    predicate: Predicate,
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter({})", self.name)
    }
}

impl<C: Coefficient> Step<C> for FilterStep {
    fn process(
        &self,
        traverser: Traverser<C, Element>,
        _: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        if (self.predicate)(traverser.object()) {
            Ok(Advance::Emit(vec![traverser]))
        } else {
            Ok(Advance::Emit(Vec::new()))
        }
    }
}

pub struct IdStep;

impl fmt::Display for IdStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("id()")
    }
}

impl<C: Coefficient> Step<C> for IdStep {
    fn process(
        &self,
        traverser: Traverser<C, Element>,
        _: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        match traverser.object() {
            Element::Vertex(id) => {
                let id = Element::Value(Value::Int(*id));
                Ok(Advance::Emit(vec![traverser.split(traverser.coefficient(), id)]))
            }
            other => Err(mismatch(self, "vertex", other)),
        }
    }
}

pub struct LabelStep;

impl fmt::Display for LabelStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("label()")
    }
}

impl<C: Coefficient> Step<C> for LabelStep {
    fn process(
        &self,
        traverser: Traverser<C, Element>,
        _: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        match traverser.object() {
            Element::Edge(edge) => {
                let label = Element::Value(Value::Str(edge.label.clone()));
                Ok(Advance::Emit(vec![traverser.split(traverser.coefficient(), label)]))
            }
            other => Err(mismatch(self, "edge", other)),
        }
    }
}

/// Replaces the object with the path that led to it.
pub struct PathStep;

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("path()")
    }
}

impl<C: Coefficient> Step<C> for PathStep {
    fn requires_paths(&self) -> bool {
        true
    }

    fn process(
        &self,
        traverser: Traverser<C, Element>,
        _: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        let objects = match traverser.path() {
            Some(path) => path.objects().cloned().collect(),
            None => return Err(mismatch(self, "path-tracking traverser", traverser.object())),
        };
        let path = Element::Value(Value::Path(objects));
        Ok(Advance::Emit(vec![traverser.split(traverser.coefficient(), path)]))
    }
}

/// Counts objects per vertex under a hidden side-effect key.
pub struct GroupCountStep {
    key: String,
}

impl fmt::Display for GroupCountStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "groupCount({})", self.key)
    }
}

impl<C: Coefficient> Step<C> for GroupCountStep {
    fn side_effect_key(&self) -> Option<&str> {
        Some(&self.key)
    }

    fn map_reduce(&self) -> Option<Arc<dyn MapReduce<VertexProperty<C>>>> {
        Some(Arc::new(GroupCountJob::new(&self.key)))
    }

    fn process(
        &self,
        traverser: Traverser<C, Element>,
        context: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        let key = hide(&self.key);
        if context.vertex.property(&key).is_none() {
            context
                .vertex
                .set_property(key.clone(), VertexProperty::SideEffect(HashMap::new()));
        }

        if let Some(VertexProperty::SideEffect(counts)) = context.vertex.property_mut(&key) {
            counts
                .entry(traverser.object().clone())
                .and_modify(|c| *c = *c + traverser.coefficient())
                .or_insert(traverser.coefficient());
        }

        Ok(Advance::Emit(vec![traverser]))
    }
}

/// Sums traverser coefficients into a memory key.
pub struct CountStep {
    key: String,
}

impl fmt::Display for CountStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count({})", self.key)
    }
}

impl<C: Coefficient> Step<C> for CountStep {
    fn memory_key(&self) -> Option<MemoryKey> {
        Some(MemoryKey::new(&self.key, Reducer::Sum, MemoryValue::Long(0)))
    }

    fn process(
        &self,
        traverser: Traverser<C, Element>,
        context: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        context
            .memory
            .reduce(&self.key, traverser.coefficient().to_memory())?;
        Ok(Advance::Emit(vec![traverser]))
    }
}

/// Ends a traversal whose result is a side effect rather than the
/// traversers themselves.
pub struct CapStep {
    key: String,
}

impl fmt::Display for CapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cap({})", self.key)
    }
}

impl<C: Coefficient> Step<C> for CapStep {
    fn capped_key(&self) -> Option<&str> {
        Some(&self.key)
    }

    fn process(
        &self,
        _: Traverser<C, Element>,
        _: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>> {
        Ok(Advance::Emit(Vec::new()))
    }
}

impl<C: Coefficient> Traversal<C> {
    pub fn out(self, labels: &[&str]) -> Self {
        self.add_step(OutStep {
            labels: labels_of(labels),
        })
    }

    pub fn out_e(self, labels: &[&str]) -> Self {
        self.add_step(OutEStep {
            labels: labels_of(labels),
        })
    }

    pub fn in_v(self) -> Self {
        self.add_step(InVStep)
    }

    pub fn filter<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Element) -> bool + Send + Sync + 'static,
    {
        self.add_step(FilterStep {
            name: name.into(),
            predicate: Arc::new(predicate),
        })
    }

    pub fn id(self) -> Self {
        self.add_step(IdStep)
    }

    pub fn label(self) -> Self {
        self.add_step(LabelStep)
    }

    pub fn path(self) -> Self {
        self.add_step(PathStep)
    }

    pub fn group_count(self, key: impl Into<String>) -> Self {
        self.add_step(GroupCountStep { key: key.into() })
    }

    pub fn count(self, key: impl Into<String>) -> Self {
        self.add_step(CountStep { key: key.into() })
    }

    pub fn cap(self, key: impl Into<String>) -> Self {
        self.add_step(CapStep { key: key.into() })
    }
}

use crate::mapreduce::MapReduce;
use crate::memory::{Memory, MemoryKey};
use crate::traverser::{Coefficient, Future, Traverser};
use crate::vertex::Vertex;
use crate::{Element, Result, TraversalError, TraverserTracker};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// What the first step of a traversal emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartType {
    Vertices,
    Edges,
}

/// Hidden per-vertex state owned by the traversal program.
#[derive(Clone, Debug)]
pub enum VertexProperty<C> {
    Tracker(TraverserTracker<C, Element>),
    SideEffect(HashMap<Element, C>),
}

/// Result of running one step on one traverser.
pub enum Advance<C> {
    /// Zero or more traversers positioned after the step. Each one continues
    /// on the vertex that hosts its object.
    Emit(Vec<Traverser<C, Element>>),
    /// The traverser continues on every vertex reachable over an outgoing
    /// edge of the current vertex (restricted to `labels` unless empty).
    Adjacent {
        traverser: Traverser<C, Element>,
        labels: Vec<String>,
    },
}

pub struct StepContext<'a, C> {
    pub vertex: &'a mut Vertex<VertexProperty<C>>,
    pub memory: &'a mut dyn Memory,
}

/// A compiled traversal step. Its `Display` form, e.g. `out(knows)`, names
/// it in errors and logs.
pub trait Step<C: Coefficient>: fmt::Display + Send + Sync {
    fn requires_paths(&self) -> bool {
        false
    }

    /// Per-vertex accumulator written by this step.
    fn side_effect_key(&self) -> Option<&str> {
        None
    }

    /// Reducible memory key written by this step.
    fn memory_key(&self) -> Option<MemoryKey> {
        None
    }

    /// Job summarizing this step's side effect once the computation halts.
    fn map_reduce(&self) -> Option<Arc<dyn MapReduce<VertexProperty<C>>>> {
        None
    }

    /// Side effect this step surfaces as the traversal's result.
    fn capped_key(&self) -> Option<&str> {
        None
    }

    fn process(
        &self,
        traverser: Traverser<C, Element>,
        context: &mut StepContext<'_, C>,
    ) -> Result<Advance<C>>;
}

pub struct Stage<C: Coefficient> {
    step: Box<dyn Step<C>>,
    label: Option<String>,
}

impl<C: Coefficient> Stage<C> {
    pub fn step(&self) -> &dyn Step<C> {
        self.step.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// A compiled step pipeline: a start step plus the stages after it.
pub struct Traversal<C: Coefficient> {
    start: StartType,
    start_label: Option<String>,
    stages: Vec<Stage<C>>,
}

impl<C: Coefficient> Traversal<C> {
    /// All vertices.
    pub fn v() -> Self {
        Traversal {
            start: StartType::Vertices,
            start_label: None,
            stages: Vec::new(),
        }
    }

    /// All edges.
    pub fn e() -> Self {
        Traversal {
            start: StartType::Edges,
            ..Traversal::v()
        }
    }

    pub fn add_step(mut self, step: impl Step<C> + 'static) -> Self {
        self.stages.push(Stage {
            step: Box::new(step),
            label: None,
        });
        self
    }

    /// Labels the most recently added step.
    pub fn as_(mut self, label: impl Into<String>) -> Self {
        let label = Some(label.into());
        match self.stages.last_mut() {
            Some(stage) => stage.label = label,
            None => self.start_label = label,
        }
        self
    }

    pub fn start(&self) -> StartType {
        self.start
    }

    pub fn start_label(&self) -> Option<&str> {
        self.start_label.as_deref()
    }

    pub fn stages(&self) -> &[Stage<C>] {
        &self.stages
    }

    pub fn stage(&self, index: usize) -> Option<&Stage<C>> {
        self.stages.get(index)
    }

    pub fn first_future(&self) -> Future {
        if self.stages.is_empty() {
            Future::Done
        } else {
            Future::Step(0)
        }
    }

    pub fn next_future(&self, index: usize) -> Future {
        if index + 1 < self.stages.len() {
            Future::Step(index + 1)
        } else {
            Future::Done
        }
    }

    /// Label of the step that sent a traverser on its way to `future`.
    pub fn label_before(&self, future: Future) -> Option<&str> {
        let index = match future {
            Future::Step(0) => return self.start_label(),
            Future::Step(i) => i - 1,
            Future::Done => self.stages.len().checked_sub(1)?,
        };
        self.stages.get(index).and_then(|stage| stage.label())
    }

    pub fn track_paths(&self) -> bool {
        self.stages.iter().any(|stage| stage.step.requires_paths())
    }

    pub fn ends_with_cap(&self) -> bool {
        self.stages
            .last()
            .map_or(false, |stage| stage.step.capped_key().is_some())
    }

    /// Rejects pipelines the engine cannot run: a cap step anywhere but the
    /// end, a cap of a key no earlier step writes, or a key written by two
    /// steps.
    pub fn validate(&self) -> Result<()> {
        let mut written = HashSet::new();

        for (index, stage) in self.stages.iter().enumerate() {
            let step = stage.step.as_ref();

            if let Some(key) = step.capped_key() {
                if index + 1 != self.stages.len() {
                    return Err(TraversalError::InvalidTraversal(format!(
                        "{} must be the last step",
                        step
                    )));
                }
                if !written.contains(key) {
                    return Err(TraversalError::InvalidTraversal(format!(
                        "{} refers to an undeclared side effect",
                        step
                    )));
                }
            }

            let keys = step
                .side_effect_key()
                .map(str::to_string)
                .into_iter()
                .chain(step.memory_key().map(|key| key.name));
            for key in keys {
                if !written.insert(key.clone()) {
                    return Err(TraversalError::DuplicateKey(key));
                }
            }
        }

        Ok(())
    }
}

impl<C: Coefficient> fmt::Display for Traversal<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = match self.start {
            StartType::Vertices => "V()",
            StartType::Edges => "E()",
        };
        write!(f, "[{}", start)?;
        for stage in &self.stages {
            write!(f, ", {}", stage.step)?;
            if let Some(label) = &stage.label {
                write!(f, "@{}", label)?;
            }
        }
        write!(f, "]")
    }
}

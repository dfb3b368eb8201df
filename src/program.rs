use crate::mapreduce::{MapReduce, TraversalResultJob};
use crate::memory::{Memory, MemoryKey, MemoryValue, Reducer};
use crate::message::{MessageType, Messenger};
use crate::traversal::{Advance, StartType, StepContext, Traversal, VertexProperty};
use crate::traverser::{Coefficient, Future, Traverser};
use crate::vertex::Vertex;
use crate::{Element, Result, TraversalError, TraverserTracker, VertexId};

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

pub const VOTE_TO_HALT: &str = "traversal.voteToHalt";
pub const TRAVERSER_TRACKER: &str = "~traverserTracker";

/// Name of the hidden vertex property backing a side-effect key.
pub fn hide(key: &str) -> String {
    format!("~{}", key)
}

/// Capabilities a program needs from the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Features {
    /// Messages may be addressed to any vertex id, not just neighbours.
    pub requires_global_message_types: bool,
    /// Vertices gain new properties while the computation runs.
    pub requires_vertex_property_addition: bool,
}

/// The program a host runs on every vertex, superstep after superstep.
///
/// The host calls `setup` once, then `execute` for every vertex in every
/// superstep, then `terminate` after each barrier until it returns true.
///
/// Each worker asks for its own `Local` once and hands it to every
/// `execute` call it makes from then on.
pub trait VertexProgram: Send + Sync + 'static {
    type State: Send + 'static;
    type Message: Clone + Send + 'static;
    type Local: Send + 'static;

    fn setup(&self, memory: &mut dyn Memory) -> Result<()>;

    /// Builds one worker's private context.
    fn worker_local(&self) -> Self::Local;

    fn execute(
        &self,
        vertex: &mut Vertex<Self::State>,
        messenger: &mut dyn Messenger<Self::Message>,
        memory: &mut dyn Memory,
        local: &mut Self::Local,
    ) -> Result<()>;

    fn terminate(&self, memory: &mut dyn Memory) -> Result<bool>;

    /// Vertex properties the host must keep between supersteps.
    fn element_compute_keys(&self) -> Vec<String>;

    /// Memory keys the host must keep, with their reducers.
    fn memory_compute_keys(&self) -> Vec<MemoryKey>;

    /// Jobs to run once the computation halts.
    fn map_reducers(&self) -> Vec<Arc<dyn MapReduce<Self::State>>>;

    fn features(&self) -> Features {
        Features::default()
    }
}

pub type TraversalSupplier<C> = Arc<dyn Fn() -> Traversal<C> + Send + Sync>;

/// Runs a compiled traversal as a vertex program.
///
/// Traversers are seeded in superstep 0 and travel as messages. Each vertex
/// keeps a [`TraverserTracker`] under [`TRAVERSER_TRACKER`]; traversers that
/// finish the pipeline are retired into it and collected afterwards by a
/// [`TraversalResultJob`].
pub struct TraversalVertexProgram<C: Coefficient> {
    supplier: TraversalSupplier<C>,
    track_paths: bool,
    description: String,
    element_compute_keys: Vec<String>,
    memory_compute_keys: Vec<MemoryKey>,
    map_reducers: Vec<Arc<dyn MapReduce<VertexProperty<C>>>>,
}

impl<C: Coefficient> TraversalVertexProgram<C> {
    /// Compiles the traversal once to validate it and derive what the host
    /// must provide. Each worker compiles its own copy on first use.
    pub fn new<F>(supplier: F) -> Result<Self>
    where
        F: Fn() -> Traversal<C> + Send + Sync + 'static,
    {
        let traversal = supplier();
        traversal.validate()?;

        let mut element_compute_keys = vec![TRAVERSER_TRACKER.to_string()];
        let mut memory_compute_keys = vec![MemoryKey::new(
            VOTE_TO_HALT,
            Reducer::And,
            MemoryValue::Bool(true),
        )];
        let mut map_reducers: Vec<Arc<dyn MapReduce<VertexProperty<C>>>> = Vec::new();

        for stage in traversal.stages() {
            let step = stage.step();
            if let Some(job) = step.map_reduce() {
                map_reducers.push(job);
            }
            if let Some(key) = step.side_effect_key() {
                element_compute_keys.push(hide(key));
            }
            if let Some(key) = step.memory_key() {
                memory_compute_keys.push(key);
            }
        }

        if !traversal.ends_with_cap() {
            map_reducers.push(Arc::new(TraversalResultJob::new()));
        }

        let mut job_keys = HashSet::new();
        let memory_names = memory_compute_keys.iter().map(|key| key.name.as_str());
        let job_names = map_reducers.iter().map(|job| job.memory_key());
        for name in memory_names.chain(job_names) {
            if !job_keys.insert(name.to_string()) {
                return Err(TraversalError::DuplicateKey(name.to_string()));
            }
        }

        let track_paths = traversal.track_paths();
        let description = traversal.to_string();
        debug!(
            traversal = %description,
            track_paths,
            jobs = map_reducers.len(),
            "compiled traversal vertex program"
        );

        Ok(TraversalVertexProgram {
            supplier: Arc::new(supplier),
            track_paths,
            description,
            element_compute_keys,
            memory_compute_keys,
            map_reducers,
        })
    }

    pub fn track_paths(&self) -> bool {
        self.track_paths
    }

    fn seed(&self, object: Element, traversal: &Traversal<C>) -> Traverser<C, Element> {
        let mut traverser = if self.track_paths {
            Traverser::with_path(C::one(), object)
        } else {
            Traverser::new(C::one(), object)
        };
        if let Some(label) = traversal.start_label() {
            traverser.add_label(label);
        }
        traverser.with_future(traversal.first_future())
    }

    fn execute_first_iteration(
        &self,
        traversal: &Traversal<C>,
        vertex: &mut Vertex<VertexProperty<C>>,
        messenger: &mut dyn Messenger<Traverser<C, Element>>,
        memory: &mut dyn Memory,
    ) -> Result<()> {
        // Side effects kept from an earlier run start over.
        for key in &self.element_compute_keys {
            vertex.remove_property(key);
        }

        let mut vote_to_halt = true;

        let starts: Vec<Element> = match traversal.start() {
            StartType::Vertices => vec![Element::Vertex(vertex.id())],
            StartType::Edges => vertex
                .get_outer_edges()
                .iter()
                .cloned()
                .map(Element::Edge)
                .collect(),
        };

        for object in starts {
            let traverser = self.seed(object, traversal);
            messenger.send_message(MessageType::Global(vertex.id()), traverser);
            vote_to_halt = false;
        }

        vertex.set_property(
            TRAVERSER_TRACKER,
            VertexProperty::Tracker(TraverserTracker::new(self.track_paths)),
        );

        memory.and(VOTE_TO_HALT, vote_to_halt)
    }

    fn execute_other_iterations(
        &self,
        traversal: &Traversal<C>,
        vertex: &mut Vertex<VertexProperty<C>>,
        messenger: &mut dyn Messenger<Traverser<C, Element>>,
        memory: &mut dyn Memory,
    ) -> Result<()> {
        let mut tracker = match vertex.remove_property(TRAVERSER_TRACKER) {
            Some(VertexProperty::Tracker(tracker)) => tracker,
            _ => return Err(TraversalError::MissingTracker(vertex.id())),
        };

        for message in messenger.receive_messages() {
            let traverser = if message.mode.is_adjacent() {
                arrive(traversal, message.value, vertex.id())
            } else {
                message.value
            };
            tracker.merge(traverser);
        }

        let mut vote_to_halt = true;
        for traverser in tracker.incoming() {
            if advance(traversal, traverser, &mut tracker, vertex, messenger, memory)? {
                vote_to_halt = false;
            }
        }

        tracker.complete_iteration();
        vertex.set_property(TRAVERSER_TRACKER, VertexProperty::Tracker(tracker));

        memory.and(VOTE_TO_HALT, vote_to_halt)
    }
}

/// Materializes a traverser delivered over an edge on the vertex it reached.
fn arrive<C: Coefficient>(
    traversal: &Traversal<C>,
    traverser: Traverser<C, Element>,
    here: VertexId,
) -> Traverser<C, Element> {
    let mut arrived = traverser.split(traverser.coefficient(), Element::Vertex(here));
    if let Some(label) = traversal.label_before(arrived.future()) {
        arrived.add_label(label);
    }
    arrived
}

/// Runs one traverser through as many steps as it can take on this vertex.
/// Returns whether anything was sent.
fn advance<C: Coefficient>(
    traversal: &Traversal<C>,
    traverser: Traverser<C, Element>,
    tracker: &mut TraverserTracker<C, Element>,
    vertex: &mut Vertex<VertexProperty<C>>,
    messenger: &mut dyn Messenger<Traverser<C, Element>>,
    memory: &mut dyn Memory,
) -> Result<bool> {
    let mut sent = false;
    let mut local = vec![traverser];

    while let Some(traverser) = local.pop() {
        let index = match traverser.future() {
            Future::Step(index) => index,
            Future::Done => {
                tracker.retire(traverser);
                continue;
            }
        };

        let stage = traversal.stage(index).ok_or_else(|| {
            TraversalError::InvalidTraversal(format!("no step at position {}", index))
        })?;
        let next = traversal.next_future(index);

        let mut context = StepContext {
            vertex: &mut *vertex,
            memory: &mut *memory,
        };

        match stage.step().process(traverser, &mut context)? {
            Advance::Emit(outputs) => {
                for mut output in outputs {
                    output.set_future(next);
                    if let Some(label) = stage.label() {
                        output.add_label(label);
                    }

                    match output.object().host() {
                        Some(host) if host != vertex.id() => {
                            messenger.send_message(MessageType::Global(host), output);
                            sent = true;
                        }
                        _ => local.push(output),
                    }
                }
            }
            Advance::Adjacent {
                mut traverser,
                labels,
            } => {
                // A hop with nowhere to go ends the traverser here.
                if vertex.outer_edges_labelled(&labels).next().is_some() {
                    traverser.set_future(next);
                    messenger.send_message(MessageType::Adjacent { labels }, traverser);
                    sent = true;
                }
            }
        }
    }

    Ok(sent)
}

impl<C: Coefficient> VertexProgram for TraversalVertexProgram<C> {
    type State = VertexProperty<C>;
    type Message = Traverser<C, Element>;
    type Local = Traversal<C>;

    fn setup(&self, memory: &mut dyn Memory) -> Result<()> {
        memory.set(VOTE_TO_HALT, MemoryValue::Bool(true))
    }

    fn worker_local(&self) -> Traversal<C> {
        (self.supplier)()
    }

    fn execute(
        &self,
        vertex: &mut Vertex<Self::State>,
        messenger: &mut dyn Messenger<Self::Message>,
        memory: &mut dyn Memory,
        traversal: &mut Traversal<C>,
    ) -> Result<()> {
        if memory.is_initial_iteration() {
            self.execute_first_iteration(traversal, vertex, messenger, memory)
        } else {
            self.execute_other_iterations(traversal, vertex, messenger, memory)
        }
    }

    fn terminate(&self, memory: &mut dyn Memory) -> Result<bool> {
        let vote_to_halt = memory
            .get(VOTE_TO_HALT)
            .and_then(|value| value.as_bool())
            .ok_or_else(|| TraversalError::UnknownMemoryKey(VOTE_TO_HALT.to_string()))?;

        if vote_to_halt {
            Ok(true)
        } else {
            memory.set(VOTE_TO_HALT, MemoryValue::Bool(true))?;
            Ok(false)
        }
    }

    fn element_compute_keys(&self) -> Vec<String> {
        self.element_compute_keys.clone()
    }

    fn memory_compute_keys(&self) -> Vec<MemoryKey> {
        self.memory_compute_keys.clone()
    }

    fn map_reducers(&self) -> Vec<Arc<dyn MapReduce<Self::State>>> {
        self.map_reducers.clone()
    }

    fn features(&self) -> Features {
        Features {
            requires_global_message_types: true,
            requires_vertex_property_addition: true,
        }
    }
}

impl<C: Coefficient> fmt::Display for TraversalVertexProgram<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraversalVertexProgram{}", self.description)
    }
}

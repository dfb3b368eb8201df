use crate::channel::Channel;
use crate::mapreduce::{AggVal, MapReduce};
use crate::memory::WorkerMemory;
use crate::message::{Message, MessageType, VertexMessenger};
use crate::program::VertexProgram;
use crate::vertex::Vertex;
use crate::{Result, TraversalError, VertexId};

use std::collections::HashMap;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::warn;

/// Owns a partition of the graph and runs the program on it, one superstep
/// per call to [`Worker::run`].
pub(crate) struct Worker<P: VertexProgram> {
    pub id: usize,
    pub time_cost: u128,
    pub n_msg_sent: usize,
    pub n_msg_recv: usize,

    vertices: HashMap<VertexId, Vertex<P::State>>,
    inboxes: HashMap<VertexId, Vec<Message<P::Message>>>,
    channel: Channel<P::Message>,
    local: Option<P::Local>,
}

impl<P: VertexProgram> Worker<P> {
    pub fn new(id: usize, channel: Channel<P::Message>) -> Self {
        Worker {
            id,
            channel,
            time_cost: 0,
            n_msg_sent: 0,
            n_msg_recv: 0,
            vertices: HashMap::new(),
            inboxes: HashMap::new(),
            local: None,
        }
    }

    pub fn local_n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn local_n_edges(&self) -> usize {
        self.vertices
            .values()
            .map(|vertex| vertex.get_outer_edges().len())
            .sum()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex<P::State>> {
        self.vertices.get(&id)
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex<P::State> {
        self.vertices.entry(id).or_insert_with(|| Vertex::new(id))
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<P::State>> {
        self.vertices.values()
    }

    /// Runs one superstep: computes every local vertex, routes what they
    /// sent, then collects this worker's messages for the next superstep.
    ///
    /// The halt command is sent even when computing fails, so the other
    /// workers never wait on a broken peer.
    pub fn run(
        &mut self,
        program: &P,
        mut memory: WorkerMemory,
        superstep: u64,
    ) -> Result<WorkerMemory> {
        let now = Instant::now();
        self.n_msg_sent = 0;
        self.n_msg_recv = 0;

        let computed = self.compute(program, &mut memory, superstep);

        self.channel.send_done();
        for message in &self.channel {
            if self.vertices.contains_key(&message.receiver) {
                self.inboxes
                    .entry(message.receiver)
                    .or_default()
                    .push(message);
                self.n_msg_recv += 1;
            } else {
                warn!(
                    worker = self.id,
                    receiver = message.receiver,
                    "dropping message for unknown vertex"
                );
            }
        }

        self.time_cost = now.elapsed().as_millis();
        computed.map(|_| memory)
    }

    fn compute(&mut self, program: &P, memory: &mut WorkerMemory, superstep: u64) -> Result<()> {
        let mut inboxes = mem::take(&mut self.inboxes);
        let local = self.local.get_or_insert_with(|| program.worker_local());

        for vertex in self.vertices.values_mut() {
            let id = vertex.id();
            let inbox = inboxes.remove(&id).unwrap_or_default();
            let mut messenger = VertexMessenger::new(id, inbox);

            let executed = panic::catch_unwind(AssertUnwindSafe(|| {
                program.execute(vertex, &mut messenger, memory, local)
            }));
            match executed {
                Ok(result) => result?,
                Err(_) => {
                    return Err(TraversalError::WorkerPanicked {
                        worker: self.id,
                        superstep,
                    })
                }
            }

            for (mode, value) in messenger.into_sent() {
                let targets: Vec<VertexId> = match &mode {
                    MessageType::Global(target) => vec![*target],
                    MessageType::Adjacent { labels } => vertex
                        .outer_edges_labelled(labels)
                        .map(|edge| edge.target)
                        .collect(),
                };

                for target in targets {
                    let message = Message::new(value.clone(), mode.clone(), id, target);
                    self.channel.send(message);
                    self.n_msg_sent += 1;
                }
            }
        }

        Ok(())
    }

    /// This worker's partial for a map-reduce job, or `None` if no local
    /// vertex reported anything.
    pub fn map(&self, job: &dyn MapReduce<P::State>) -> Option<AggVal> {
        self.vertices
            .values()
            .filter_map(|vertex| job.map(vertex))
            .reduce(|a, b| job.reduce(a, b))
    }

    /// Discards mail left over from an aborted computation.
    pub fn clear_inboxes(&mut self) {
        self.inboxes.clear();
    }

    /// Drops the given properties from every local vertex.
    pub fn clear_properties(&mut self, keys: &[String]) {
        for vertex in self.vertices.values_mut() {
            for key in keys {
                vertex.remove_property(key);
            }
        }
    }
}

use crate::channel::{owner, Channel};
use crate::config::ComputerConfig;
use crate::context::Context;
use crate::mapreduce::{TraversalResult, TRAVERSAL_RESULT};
use crate::memory::{GlobalMemory, Memory, WorkerMemory};
use crate::program::{TraversalVertexProgram, VertexProgram};
use crate::traverser::Coefficient;
use crate::vertex::Vertex;
use crate::worker::Worker;
use crate::{Edge, Result, TraversalError, VertexId};

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::spawn;
use std::time::Instant;

use tracing::{debug, info, warn};

/// Stops a running computation at the next superstep boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Parses `source target [label]`, separated by whitespace. Edges without a
/// label are labelled `edge`.
pub fn parse_edge(line: &str) -> Option<Edge> {
    let mut parts = line.split_whitespace();
    let source = parts.next()?.parse().ok()?;
    let target = parts.next()?.parse().ok()?;
    let label = parts.next().unwrap_or("edge");

    match parts.next() {
        Some(_) => None,
        None => Some(Edge::new(source, target, label)),
    }
}

/// Owns the graph, partitioned over the workers, and drives a vertex program
/// over it superstep by superstep.
pub struct Master<P: VertexProgram> {
    program: Arc<P>,
    config: ComputerConfig,
    workers: Vec<Worker<P>>,
    memory: GlobalMemory,
    cancel: CancelHandle,
    context: Context,
}

impl<P: VertexProgram> Master<P> {
    pub fn new(program: P, config: ComputerConfig) -> Self {
        let config = ComputerConfig {
            workers: config.workers.max(1),
            ..config
        };
        let workers = Channel::create(config.workers)
            .into_iter()
            .enumerate()
            .map(|(id, channel)| Worker::new(id, channel))
            .collect();

        Master {
            program: Arc::new(program),
            config,
            workers,
            memory: GlobalMemory::default(),
            cancel: CancelHandle::new(),
            context: Context::new(),
        }
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn config(&self) -> &ComputerConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn set_cancel_handle(&mut self, handle: CancelHandle) -> &mut Self {
        self.cancel = handle;
        self
    }

    fn worker_mut(&mut self, id: VertexId) -> &mut Worker<P> {
        let index = owner(id, self.workers.len());
        &mut self.workers[index]
    }

    pub fn add_vertex(&mut self, id: VertexId) -> &mut Self {
        self.worker_mut(id).vertex_mut(id);
        self
    }

    /// Adds an edge, creating both of its vertices if needed. Returns false
    /// if the edge was already present.
    pub fn add_edge(&mut self, source: VertexId, target: VertexId, label: &str) -> bool {
        self.add_vertex(target);
        let added = self
            .worker_mut(source)
            .vertex_mut(source)
            .add_outer_edge(Edge::new(source, target, label));

        if !added {
            warn!(source, target, label, "duplicate edge");
        }
        added
    }

    /// Loads an edge list, one edge per line. Blank lines and lines starting
    /// with `#` are skipped; lines the parser rejects are logged and skipped.
    /// Returns the number of edges added.
    pub fn load_edges<F>(&mut self, path: &Path, parser: F) -> Result<usize>
    where
        F: Fn(&str) -> Option<Edge>,
    {
        let io_error = |source: io::Error| TraversalError::Io {
            path: path.to_string_lossy().into_owned(),
            source,
        };

        let reader = io::BufReader::new(File::open(path).map_err(io_error)?);
        let mut added = 0;

        for (number, line) in reader.lines().enumerate() {
            let line = line.map_err(io_error)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parser(line) {
                Some(edge) => {
                    if self.add_edge(edge.source, edge.target, &edge.label) {
                        added += 1;
                    }
                }
                None => warn!(line = number + 1, content = line, "unparsable edge"),
            }
        }

        info!(path = %path.display(), edges = added, "loaded edges");
        Ok(added)
    }

    pub fn num_vertices(&self) -> usize {
        self.workers.iter().map(|worker| worker.local_n_vertices()).sum()
    }

    pub fn num_edges(&self) -> usize {
        self.workers.iter().map(|worker| worker.local_n_edges()).sum()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex<P::State>> {
        self.workers
            .get(owner(id, self.workers.len()))
            .and_then(|worker| worker.vertex(id))
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<P::State>> {
        self.workers.iter().flat_map(|worker| worker.vertices())
    }

    /// Memory as it stood when the last computation halted.
    pub fn memory(&self) -> &GlobalMemory {
        &self.memory
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    fn print_stats(&self, superstep: u64) {
        info!(
            superstep,
            num_vertices = self.context.num_vertices(),
            num_edges = self.context.num_edges(),
            "superstep done"
        );

        for worker in &self.workers {
            debug!(
                worker = worker.id,
                n_vertices = worker.local_n_vertices(),
                n_edges = worker.local_n_edges(),
                msg_sent = worker.n_msg_sent,
                msg_recv = worker.n_msg_recv,
                time_cost_ms = worker.time_cost as u64,
                "worker stats"
            );
        }
    }

    /// Runs every worker through one superstep and hands back their memory
    /// partials. The first worker error aborts the run.
    fn superstep(&mut self, memory: &GlobalMemory, superstep: u64) -> Result<Vec<WorkerMemory>> {
        let mut handles = Vec::with_capacity(self.workers.len());
        for mut worker in self.workers.drain(..) {
            let program = Arc::clone(&self.program);
            let view = memory.worker_view();
            handles.push(spawn(move || {
                let result = worker.run(&program, view, superstep);
                (worker, result)
            }));
        }

        let mut partials = Vec::with_capacity(handles.len());
        let mut failure = None;
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok((worker, result)) => {
                    self.workers.push(worker);
                    match result {
                        Ok(partial) => partials.push(partial),
                        Err(err) if failure.is_none() => failure = Some(err),
                        Err(_) => (),
                    }
                }
                Err(_) => {
                    failure = failure.or(Some(TraversalError::WorkerPanicked {
                        worker: index,
                        superstep,
                    }));
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(partials),
        }
    }

    fn map_reduce(&mut self) {
        self.context.aggregated_values.clear();

        for job in self.program.map_reducers() {
            let value = self
                .workers
                .iter()
                .filter_map(|worker| worker.map(job.as_ref()))
                .reduce(|a, b| job.reduce(a, b));

            if let Some(value) = value {
                self.context
                    .aggregated_values
                    .insert(job.memory_key().to_string(), value);
            }
        }
    }

    /// Runs the program until it votes to halt, then runs its map-reduce jobs
    /// and publishes their results in the context.
    pub fn run(&mut self) -> Result<()> {
        let now = Instant::now();

        let mut memory = GlobalMemory::new(self.program.memory_compute_keys())?;
        self.program.setup(&mut memory)?;
        for worker in &mut self.workers {
            worker.clear_inboxes();
        }

        self.context = Context::new();
        self.context.num_vertices = self.num_vertices();
        self.context.num_edges = self.num_edges();

        loop {
            let superstep = memory.iteration();
            if self.cancel.is_cancelled() {
                return Err(TraversalError::Cancelled { superstep });
            }
            if let Some(max) = self.config.max_supersteps {
                if superstep >= max {
                    return Err(TraversalError::NonConvergence { supersteps: max });
                }
            }

            for partial in self.superstep(&memory, superstep)? {
                memory.absorb(partial)?;
            }
            self.context.superstep = superstep + 1;
            self.print_stats(superstep);

            let halt = self.program.terminate(&mut memory)?;
            memory.increment_iteration();
            if halt {
                break;
            }
        }

        self.memory = memory;
        self.map_reduce();

        if !self.config.retain_compute_keys {
            let keys = self.program.element_compute_keys();
            for worker in &mut self.workers {
                worker.clear_properties(&keys);
            }
        }

        info!(
            supersteps = self.context.superstep(),
            time_cost_ms = now.elapsed().as_millis() as u64,
            "computation halted"
        );
        Ok(())
    }
}

impl<C: Coefficient> Master<TraversalVertexProgram<C>> {
    /// Traversers that finished the pipeline, unless it ended with `cap`.
    pub fn traversal_result(&self) -> Option<Arc<TraversalResult<C>>> {
        self.context
            .get_aggregated_value::<TraversalResult<C>>(TRAVERSAL_RESULT)
    }
}

use pregel_traversal::*;

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const EDGES: [(VertexId, VertexId); 5] = [(1, 2), (1, 3), (2, 3), (3, 1), (2, 4)];

fn master<P: VertexProgram>(program: P, workers: usize) -> Master<P> {
    let mut master = Master::new(program, ComputerConfig::default().with_workers(workers));
    for (source, target) in EDGES {
        master.add_edge(source, target, "knows");
    }
    master
}

fn program<F>(supplier: F) -> TraversalVertexProgram<u64>
where
    F: Fn() -> Traversal<u64> + Send + Sync + 'static,
{
    TraversalVertexProgram::new(supplier).unwrap()
}

fn counts(master: &Master<TraversalVertexProgram<u64>>) -> HashMap<Element, u64> {
    master
        .traversal_result()
        .and_then(|result| result.counts().cloned())
        .unwrap()
}

fn vertices(pairs: &[(VertexId, u64)]) -> HashMap<Element, u64> {
    pairs
        .iter()
        .map(|(id, count)| (Element::Vertex(*id), *count))
        .collect()
}

#[test]
fn two_hop_counts_equal_walk_counts() {
    let mut master = master(program(|| Traversal::v().out(&[]).out(&[])), 2);
    master.run().unwrap();

    assert_eq!(counts(&master), vertices(&[(1, 2), (2, 1), (3, 2), (4, 1)]));
    assert_eq!(master.context().superstep(), 4);
    assert_eq!(master.memory().get(VOTE_TO_HALT), Some(MemoryValue::Bool(true)));
}

#[test]
fn results_do_not_depend_on_partitioning() {
    let mut results = Vec::new();
    for workers in [1, 2, 3, 5] {
        let mut master = master(program(|| Traversal::v().out(&[]).out(&[])), workers);
        master.run().unwrap();
        results.push(counts(&master));
    }
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn path_mode_returns_one_result_per_walk() {
    let mut master = master(program(|| Traversal::v().out(&[]).out(&[]).path()), 3);
    master.run().unwrap();

    let result = master.traversal_result().unwrap();
    let paths: HashSet<Vec<Element>> = result
        .paths()
        .unwrap()
        .iter()
        .map(|traverser| match traverser.object() {
            Element::Value(Value::Path(objects)) => objects.clone(),
            other => panic!("expected a path, found {}", other),
        })
        .collect();

    let expected: HashSet<Vec<Element>> = [
        [1, 2, 3],
        [1, 2, 4],
        [1, 3, 1],
        [2, 3, 1],
        [3, 1, 2],
        [3, 1, 3],
    ]
    .iter()
    .map(|walk| walk.iter().map(|id| Element::Vertex(*id)).collect())
    .collect();

    assert_eq!(result.len(), 6);
    assert_eq!(paths, expected);
}

#[test]
fn step_labels_are_recorded_on_paths() {
    let mut master = master(
        program(|| Traversal::v().as_("a").out(&[]).as_("b").path()),
        2,
    );
    master.run().unwrap();

    let result = master.traversal_result().unwrap();
    let paths = result.paths().unwrap();
    assert_eq!(paths.len(), EDGES.len());

    for traverser in paths {
        let path = traverser.path().unwrap();
        match (path.get("a"), path.get("b")) {
            (Some(Element::Vertex(a)), Some(Element::Vertex(b))) => {
                assert!(EDGES.contains(&(*a, *b)))
            }
            other => panic!("unexpected labels {:?}", other),
        }
    }
}

#[test]
fn edge_start_fans_out_per_edge() {
    let mut master = Master::new(
        program(|| Traversal::e().label()),
        ComputerConfig::default().with_workers(2),
    );
    master.add_edge(1, 2, "knows");
    master.add_edge(1, 3, "knows");
    master.add_edge(2, 3, "likes");
    master.add_edge(3, 1, "knows");
    master.add_edge(4, 1, "likes");
    master.add_vertex(5);
    master.run().unwrap();

    let expected: HashMap<Element, u64> = [("knows", 3), ("likes", 2)]
        .iter()
        .map(|(label, count)| (Element::Value(Value::Str(label.to_string())), *count))
        .collect();
    assert_eq!(counts(&master), expected);
}

#[test]
fn edges_lead_back_to_vertices() {
    let mut master = master(program(|| Traversal::e().in_v().id()), 2);
    master.run().unwrap();

    let expected: HashMap<Element, u64> = [(1, 1), (2, 1), (3, 2), (4, 1)]
        .iter()
        .map(|(id, count)| (Element::Value(Value::Int(*id)), *count))
        .collect();
    assert_eq!(counts(&master), expected);
}

#[test]
fn empty_pipeline_returns_every_vertex_once() {
    let mut master = master(program(Traversal::v), 2);
    master.run().unwrap();

    assert_eq!(counts(&master), vertices(&[(1, 1), (2, 1), (3, 1), (4, 1)]));
    assert_eq!(master.context().superstep(), 2);
}

#[test]
fn filter_drops_traversers() {
    let mut master = master(
        program(|| {
            Traversal::v()
                .filter("odd", |e| matches!(e, Element::Vertex(id) if id % 2 == 1))
                .out(&[])
        }),
        2,
    );
    master.run().unwrap();

    assert_eq!(counts(&master), vertices(&[(1, 1), (2, 1), (3, 1)]));
}

#[test]
fn label_filters_restrict_hops() {
    let mut master = Master::new(
        program(|| Traversal::v().out(&["likes"])),
        ComputerConfig::default().with_workers(2),
    );
    master.add_edge(1, 2, "knows");
    master.add_edge(1, 3, "likes");
    master.add_edge(2, 3, "likes");
    master.run().unwrap();

    assert_eq!(counts(&master), vertices(&[(3, 2)]));
}

#[test]
fn group_count_is_capped() {
    let mut master = master(
        program(|| Traversal::v().out(&[]).group_count("g").cap("g")),
        3,
    );
    master.run().unwrap();

    let in_degrees = master
        .context()
        .get_aggregated_value::<HashMap<Element, u64>>("g")
        .unwrap();
    assert_eq!(*in_degrees, vertices(&[(1, 1), (2, 1), (3, 2), (4, 1)]));
    assert!(master.traversal_result().is_none());
}

#[test]
fn count_sums_into_memory() {
    let mut master = master(program(|| Traversal::v().out(&[]).count("n")), 2);
    master.run().unwrap();

    assert_eq!(master.memory().get("n"), Some(MemoryValue::Long(EDGES.len() as i64)));
    assert_eq!(counts(&master), vertices(&[(1, 1), (2, 1), (3, 2), (4, 1)]));
}

#[test]
fn compute_keys_are_torn_down_unless_retained() {
    let mut master = master(program(|| Traversal::v().out(&[]).group_count("g")), 2);
    master.run().unwrap();
    assert!(master.vertices().all(|v| v.property_keys().next().is_none()));

    let mut retained = Master::new(
        program(|| Traversal::v().out(&[]).group_count("g")),
        ComputerConfig::default()
            .with_workers(2)
            .with_retain_compute_keys(true),
    );
    for (source, target) in EDGES {
        retained.add_edge(source, target, "knows");
    }
    retained.run().unwrap();

    let vertex = retained.vertex(3).unwrap();
    assert!(vertex.property(TRAVERSER_TRACKER).is_some());
    assert!(matches!(
        vertex.property(&hide("g")),
        Some(VertexProperty::SideEffect(counts)) if counts.get(&Element::Vertex(3)) == Some(&2)
    ));
}

#[test]
fn retained_side_effects_start_over_on_the_next_run() {
    let mut master = Master::new(
        program(|| Traversal::v().out(&[]).group_count("g").cap("g")),
        ComputerConfig::default()
            .with_workers(2)
            .with_retain_compute_keys(true),
    );
    master.add_edge(1, 2, "knows");

    for _ in 0..2 {
        master.run().unwrap();
        let groups = master
            .context()
            .get_aggregated_value::<HashMap<Element, u64>>("g")
            .unwrap();
        assert_eq!(*groups, vertices(&[(2, 1)]));
    }
}

#[test]
fn each_worker_compiles_the_traversal_once() {
    let compiled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&compiled);
    let mut master = Master::new(
        program(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Traversal::v().out(&[]).out(&[]).out(&[]).out(&[])
        }),
        ComputerConfig::default().with_workers(2),
    );
    for (source, target) in [(1, 2), (2, 3), (3, 1)] {
        master.add_edge(source, target, "knows");
    }

    master.run().unwrap();
    assert_eq!(counts(&master), vertices(&[(1, 1), (2, 1), (3, 1)]));
    assert_eq!(master.context().superstep(), 6);
    // Once to validate, once per worker.
    assert_eq!(compiled.load(Ordering::SeqCst), 3);

    master.run().unwrap();
    assert_eq!(compiled.load(Ordering::SeqCst), 3);
}

#[test]
fn superstep_ceiling_stops_the_run() {
    let mut master = Master::new(
        program(|| Traversal::v().out(&[]).out(&[])),
        ComputerConfig::default()
            .with_workers(2)
            .with_max_supersteps(Some(2)),
    );
    for (source, target) in EDGES {
        master.add_edge(source, target, "knows");
    }

    assert!(matches!(
        master.run(),
        Err(TraversalError::NonConvergence { supersteps: 2 })
    ));
}

#[test]
fn step_errors_abort_the_run() {
    let mut master = master(program(|| Traversal::e().out(&[])), 2);
    assert!(matches!(
        master.run(),
        Err(TraversalError::TypeMismatch { .. })
    ));
}

#[test]
fn cancelled_before_start() {
    let mut master = master(program(|| Traversal::v().out(&[])), 2);
    master.cancel_handle().cancel();
    assert!(matches!(
        master.run(),
        Err(TraversalError::Cancelled { superstep: 0 })
    ));
}

/// Sends one message around a ring every superstep and never halts on its
/// own. Cancels itself during `cancel_at`.
struct Ring {
    cancel: CancelHandle,
    cancel_at: u64,
    panic_at: Option<u64>,
}

impl VertexProgram for Ring {
    type State = u64;
    type Message = u64;
    type Local = ();

    fn setup(&self, _: &mut dyn Memory) -> Result<()> {
        Ok(())
    }

    fn worker_local(&self) {}

    fn execute(
        &self,
        vertex: &mut Vertex<u64>,
        messenger: &mut dyn Messenger<u64>,
        memory: &mut dyn Memory,
        _: &mut (),
    ) -> Result<()> {
        if self.panic_at == Some(memory.iteration()) {
            panic!("ring broke at vertex {}", vertex.id());
        }

        let received: u64 = messenger.receive_messages().iter().map(|m| m.value).sum();
        let seen = vertex.property("seen").copied().unwrap_or(0);
        vertex.set_property("seen", seen + received);

        messenger.send_message(MessageType::adjacent(), 1);
        if memory.iteration() == self.cancel_at {
            self.cancel.cancel();
        }
        Ok(())
    }

    fn terminate(&self, _: &mut dyn Memory) -> Result<bool> {
        Ok(false)
    }

    fn element_compute_keys(&self) -> Vec<String> {
        vec!["seen".to_string()]
    }

    fn memory_compute_keys(&self) -> Vec<MemoryKey> {
        Vec::new()
    }

    fn map_reducers(&self) -> Vec<Arc<dyn MapReduce<u64>>> {
        Vec::new()
    }
}

fn ring(cancel_at: u64, panic_at: Option<u64>) -> Master<Ring> {
    let cancel = CancelHandle::new();
    let program = Ring {
        cancel: cancel.clone(),
        cancel_at,
        panic_at,
    };

    let mut master = Master::new(program, ComputerConfig::default().with_workers(2));
    master.set_cancel_handle(cancel);
    for (source, target) in [(0, 1), (1, 2), (2, 0)] {
        master.add_edge(source, target, "next");
    }
    master
}

#[test]
fn cancellation_takes_effect_at_the_next_boundary() {
    let mut master = ring(2, None);

    assert!(matches!(
        master.run(),
        Err(TraversalError::Cancelled { superstep: 3 })
    ));

    // Mail sent in superstep N is read in N + 1 only, so three supersteps
    // deliver two messages per vertex.
    for id in 0..3 {
        assert_eq!(master.vertex(id).and_then(|v| v.property("seen")), Some(&2));
    }
}

#[test]
fn panicking_vertices_fail_the_run() {
    let mut master = ring(100, Some(1));

    assert!(matches!(
        master.run(),
        Err(TraversalError::WorkerPanicked { superstep: 1, .. })
    ));
}

#[test]
fn loads_edge_lists() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# source target label").unwrap();
    writeln!(file, "1\t2\tknows").unwrap();
    writeln!(file, "2 3").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "not an edge").unwrap();
    writeln!(file, "1 2 knows").unwrap();
    file.flush().unwrap();

    let mut master = Master::new(
        program(|| Traversal::v().out(&[]).out(&[])),
        ComputerConfig::default().with_workers(2),
    );
    assert_eq!(master.load_edges(file.path(), parse_edge).unwrap(), 2);
    assert_eq!(master.num_vertices(), 3);
    assert_eq!(master.num_edges(), 2);

    master.run().unwrap();
    assert_eq!(counts(&master), vertices(&[(3, 1)]));
    assert_eq!(master.context().num_vertices(), 3);
}

#[test]
fn missing_edge_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut master = Master::new(program(Traversal::v), ComputerConfig::default());

    assert!(matches!(
        master.load_edges(&dir.path().join("missing.txt"), parse_edge),
        Err(TraversalError::Io { .. })
    ));
}

#[test]
fn config_deserializes_with_defaults() {
    let config: ComputerConfig = serde_json::from_str(r#"{ "workers": 3 }"#).unwrap();
    assert_eq!(config.workers, 3);
    assert_eq!(config.max_supersteps, Some(1000));
    assert!(!config.retain_compute_keys);

    let config: ComputerConfig =
        serde_json::from_str(r#"{ "max_supersteps": null, "retain_compute_keys": true }"#)
            .unwrap();
    assert_eq!(config.max_supersteps, None);
    assert!(config.retain_compute_keys);
}

#[test]
fn random_graphs_run_to_completion() {
    let edges = random_edges(30, 0.1, &["knows", "likes"], 11);
    let mut master = Master::new(
        program(|| Traversal::v().out(&["knows"]).count("hops")),
        ComputerConfig::default().with_workers(4),
    );
    for edge in &edges {
        master.add_edge(edge.source, edge.target, &edge.label);
    }
    master.run().unwrap();

    let knows = edges.iter().filter(|edge| edge.label == "knows").count();
    assert_eq!(
        master.memory().get("hops"),
        Some(MemoryValue::Long(knows as i64))
    );
}

use pregel_traversal::{
    random_edges, ComputerConfig, Master, Traversal, TraversalVertexProgram,
};

use std::fs::File;
use std::io::{self, Write};

fn main() {
    tracing_subscriber::fmt().init();

    let program = TraversalVertexProgram::<u64>::new(|| {
        Traversal::e()
            .as_("hop")
            .in_v()
            .out(&["follows"])
            .as_("end")
            .path()
    })
    .unwrap();

    let mut master = Master::new(program, ComputerConfig::default());
    for id in 0..50 {
        master.add_vertex(id);
    }
    for edge in random_edges(50, 0.08, &["follows", "blocks"], 2024) {
        master.add_edge(edge.source, edge.target, &edge.label);
    }

    master.run().unwrap();

    let result = master.traversal_result().unwrap();
    let paths = result.paths().unwrap_or_default();

    let mut writer = io::BufWriter::new(File::create("walk_paths.txt").unwrap());
    for traverser in paths {
        writeln!(writer, "{}\t{}", traverser.object(), traverser.coefficient()).unwrap();
    }
    writer.flush().unwrap();

    println!("{} walks written to walk_paths.txt", paths.len());
}

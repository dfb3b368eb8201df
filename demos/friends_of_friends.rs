use pregel_traversal::{ComputerConfig, Element, Master, Traversal, TraversalVertexProgram};

use std::collections::HashMap;

const PEOPLE: [&str; 6] = ["marko", "vadas", "josh", "peter", "lop", "ripple"];

fn name(element: &Element) -> String {
    match element {
        Element::Vertex(id) => PEOPLE
            .get(*id as usize)
            .map_or_else(|| id.to_string(), |name| name.to_string()),
        other => other.to_string(),
    }
}

fn main() {
    tracing_subscriber::fmt().init();

    let program = TraversalVertexProgram::<u64>::new(|| {
        Traversal::v()
            .out(&["knows"])
            .out(&["knows", "created"])
            .group_count("fof")
            .cap("fof")
    })
    .unwrap();

    let mut master = Master::new(program, ComputerConfig::default().with_workers(4));
    for (source, target, label) in [
        (0, 1, "knows"),
        (0, 2, "knows"),
        (0, 4, "created"),
        (2, 4, "created"),
        (2, 5, "created"),
        (2, 3, "knows"),
        (3, 4, "created"),
        (1, 2, "knows"),
    ] {
        master.add_edge(source, target, label);
    }

    master.run().unwrap();

    let counts = master
        .context()
        .get_aggregated_value::<HashMap<Element, u64>>("fof")
        .unwrap();

    let mut counts: Vec<_> = counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (element, count) in counts {
        println!("{}\t{}", name(element), count);
    }
}

use pregel_traversal::{
    parse_edge, random_edges, ComputerConfig, Element, Master, Memory, Traversal,
    TraversalVertexProgram,
};

use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Query {
    /// V().out().out(): vertices two hops away, with walk counts.
    FriendsOfFriends,
    /// V().out().out().path(): every two-hop walk.
    Paths,
    /// V().out().groupCount(g).cap(g): in-degree of every vertex.
    InDegree,
    /// V().outE().count(edges): number of edges.
    CountEdges,
}

#[derive(Parser)]
#[command(
    name = "pregel-traversal",
    about = "Run a graph traversal as a Pregel vertex program",
    version
)]
struct Cli {
    #[arg(long, value_enum, default_value = "friends-of-friends")]
    query: Query,

    /// Edge list to load (`source target [label]` per line). A random graph
    /// is generated when omitted.
    #[arg(long)]
    edges: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    vertices: usize,

    /// Chance of each directed edge, between 0 and 1.
    #[arg(long, default_value_t = 0.05, value_parser = probability)]
    probability: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Worker threads; defaults to one per CPU.
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long = "max-supersteps", default_value_t = 1000)]
    max_supersteps: u64,

    /// Results to print.
    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn probability(arg: &str) -> Result<f64, String> {
    let p: f64 = arg.parse().map_err(|err| format!("{}", err))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{} is not between 0 and 1", arg))
    }
}

fn traversal(query: Query) -> Traversal<u64> {
    match query {
        Query::FriendsOfFriends => Traversal::v().out(&[]).out(&[]),
        Query::Paths => Traversal::v().out(&[]).out(&[]).path(),
        Query::InDegree => Traversal::v().out(&[]).group_count("g").cap("g"),
        Query::CountEdges => Traversal::v().out_e(&[]).count("edges"),
    }
}

fn print_top(counts: &HashMap<Element, u64>, top: usize) {
    let mut counts: Vec<_> = counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (element, count) in counts.into_iter().take(top) {
        println!("{}\t{}", element, count);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let query = cli.query;

    let program = TraversalVertexProgram::new(move || traversal(query))?;
    info!(program = %program, "starting");

    let mut config = ComputerConfig::default().with_max_supersteps(Some(cli.max_supersteps));
    if let Some(workers) = cli.workers {
        config = config.with_workers(workers);
    }
    let mut master = Master::new(program, config);

    match &cli.edges {
        Some(path) => {
            master.load_edges(path, parse_edge)?;
        }
        None => {
            for id in 0..cli.vertices as i64 {
                master.add_vertex(id);
            }
            for edge in random_edges(cli.vertices, cli.probability, &["knows", "likes"], cli.seed) {
                master.add_edge(edge.source, edge.target, &edge.label);
            }
        }
    }

    master.run()?;

    match query {
        Query::FriendsOfFriends | Query::Paths => {
            let result = master.traversal_result().ok_or("no traversal result")?;
            if let Some(counts) = result.counts() {
                print_top(counts, cli.top);
            }
            if let Some(paths) = result.paths() {
                println!("{} walks", paths.len());
                for traverser in paths.iter().take(cli.top) {
                    println!("{}", traverser.object());
                }
            }
        }
        Query::InDegree => {
            let counts = master
                .context()
                .get_aggregated_value::<HashMap<Element, u64>>("g")
                .ok_or("no in-degrees")?;
            print_top(&counts, cli.top);
        }
        Query::CountEdges => {
            let count = master.memory().get("edges").ok_or("no edge count")?;
            println!("{} edges", count);
        }
    }

    Ok(())
}

use crate::{Edge, VertexId};

use rand::prelude::*;
use rand::rngs::StdRng;

/// A directed Erdős–Rényi graph over vertices `0..n`: every ordered pair of
/// distinct vertices is joined with probability `p`, under a label picked
/// uniformly from `labels`. The same seed always yields the same edges.
///
/// `p` is clamped to `[0, 1]`; a NaN `p` yields no edges.
pub fn random_edges(n: usize, p: f64, labels: &[&str], seed: u64) -> Vec<Edge> {
    let mut rng = StdRng::seed_from_u64(seed);
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    let mut edges = Vec::new();

    for source in 0..n as VertexId {
        for target in 0..n as VertexId {
            if source == target || !rng.gen_bool(p) {
                continue;
            }
            let label = labels.choose(&mut rng).copied().unwrap_or("edge");
            edges.push(Edge::new(source, target, label));
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_graphs_are_reproducible() {
        let a = random_edges(20, 0.2, &["knows", "likes"], 7);
        let b = random_edges(20, 0.2, &["knows", "likes"], 7);
        assert_eq!(a, b);
        assert!(a.iter().all(|edge| edge.source != edge.target));
        assert!(a.iter().all(|edge| edge.label == "knows" || edge.label == "likes"));
    }

    #[test]
    fn probability_bounds() {
        assert!(random_edges(10, 0.0, &["knows"], 1).is_empty());
        assert_eq!(random_edges(10, 1.0, &[], 1).len(), 90);
        assert_eq!(random_edges(10, f64::INFINITY, &[], 1).len(), 90);
        assert!(random_edges(10, f64::NEG_INFINITY, &[], 1).is_empty());
    }

    #[test]
    fn nan_probability_yields_no_edges() {
        assert!(random_edges(10, f64::NAN, &["knows"], 1).is_empty());
    }
}

//! Topology provider: random connected graphs over the agent population.
//!
//! Samples Erdős–Rényi G(n, p) graphs and retries until the result is
//! connected, up to a bounded retry budget. The returned graph is simple,
//! undirected and immutable for the simulation's lifetime; the engine only
//! reads its node and edge sets once at setup to wire symmetric neighbor
//! lists.

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Result, SimError};

/// Attempts before connected-graph generation is surfaced as a setup
/// failure instead of retrying forever.
pub const MAX_ATTEMPTS: u32 = 1_000;

/// Generate a connected Erdős–Rényi graph over `n` nodes.
///
/// Each of the `n * (n - 1) / 2` candidate edges is included independently
/// with probability `edge_probability`. Generation terminates almost surely
/// for `n >= 1` and `edge_probability > 0`, but a bounded retry budget
/// turns pathological configurations (tiny p, large n) into a
/// [`SimError::Topology`] rather than a hang.
pub fn generate_connected_graph(
    n: usize,
    edge_probability: f64,
    rng: &mut impl Rng,
) -> Result<UnGraph<usize, ()>> {
    for attempt in 1..=MAX_ATTEMPTS {
        let graph = sample_graph(n, edge_probability, rng);
        if is_connected(&graph) {
            debug!(
                nodes = n,
                edges = graph.edge_count(),
                attempt,
                "generated connected topology"
            );
            return Ok(graph);
        }
        if attempt % 100 == 0 {
            warn!(attempt, "topology still disconnected, retrying");
        }
    }
    Err(SimError::Topology(format!(
        "no connected graph over {n} nodes with edge probability {edge_probability} \
         within {MAX_ATTEMPTS} attempts"
    )))
}

/// One G(n, p) sample, simple and undirected.
fn sample_graph(n: usize, edge_probability: f64, rng: &mut impl Rng) -> UnGraph<usize, ()> {
    let mut graph = UnGraph::new_undirected();
    let nodes: Vec<NodeIndex> = (0..n).map(|i| graph.add_node(i)).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            if rng.gen::<f64>() < edge_probability {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }
    graph
}

/// Whether the graph has no isolated partitions.
pub fn is_connected(graph: &UnGraph<usize, ()>) -> bool {
    connected_components(graph) <= 1
}

/// The unique unordered node-index pairs of the graph's edges.
pub fn edge_pairs(graph: &UnGraph<usize, ()>) -> Vec<(usize, usize)> {
    graph
        .edge_indices()
        .filter_map(|e| graph.edge_endpoints(e))
        .map(|(a, b)| (a.index(), b.index()))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_generated_graph_is_connected() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for n in [1, 2, 5, 10, 25] {
            let graph = generate_connected_graph(n, 0.25, &mut rng).unwrap();
            assert_eq!(graph.node_count(), n);
            assert!(is_connected(&graph));
        }
    }

    #[test]
    fn test_full_probability_yields_complete_graph() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let graph = generate_connected_graph(6, 1.0, &mut rng).unwrap();
        assert_eq!(graph.edge_count(), 6 * 5 / 2);
    }

    #[test]
    fn test_single_node_is_trivially_connected() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let graph = generate_connected_graph(1, 0.01, &mut rng).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_graph_is_simple() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let graph = generate_connected_graph(12, 0.5, &mut rng).unwrap();
        let mut pairs = edge_pairs(&graph);
        let before = pairs.len();
        pairs.sort_unstable();
        pairs.dedup();
        assert_eq!(pairs.len(), before);
        assert!(pairs.iter().all(|&(a, b)| a != b));
    }

    #[test]
    fn test_same_seed_same_graph() {
        let mut a = ChaCha8Rng::seed_from_u64(17);
        let mut b = ChaCha8Rng::seed_from_u64(17);
        let ga = generate_connected_graph(10, 0.3, &mut a).unwrap();
        let gb = generate_connected_graph(10, 0.3, &mut b).unwrap();
        assert_eq!(edge_pairs(&ga), edge_pairs(&gb));
    }
}

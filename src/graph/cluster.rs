use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::builder::TransferGraph;

/// Account → cluster id. Ids are dense from 0 but carry no meaning across runs.
pub type ClusterMap = HashMap<String, usize>;

/// Upper bound on local-move sweeps per level; each sweep strictly improves modularity.
const MAX_SWEEPS: usize = 256;

/// Undirected, weighted projection of a transfer graph.
///
/// A→B and B→A collapse into one edge whose weight is the sum of both values.
/// Self-transfers stay as self-loops.
#[derive(Debug, Clone)]
pub struct UndirectedGraph {
    accounts: Vec<String>,
    adjacency: Vec<BTreeMap<usize, f64>>,
}

impl UndirectedGraph {
    pub fn from_directed(graph: &TransferGraph) -> Self {
        let mut adjacency = vec![BTreeMap::new(); graph.node_count()];
        for (from, to, stats) in graph.indexed_edges() {
            *adjacency[from].entry(to).or_insert(0.0) += stats.value;
            if from != to {
                *adjacency[to].entry(from).or_insert(0.0) += stats.value;
            }
        }

        Self {
            accounts: graph.accounts().to_vec(),
            adjacency,
        }
    }

    pub fn node_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency
            .iter()
            .enumerate()
            .map(|(i, nbrs)| nbrs.keys().filter(|&&j| j >= i).count())
            .sum()
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Weight between two accounts, 0.0 if they are not connected.
    #[cfg(test)]
    pub fn weight(&self, a: &str, b: &str) -> f64 {
        let find = |account: &str| self.accounts.iter().position(|x| x == account);
        match (find(a), find(b)) {
            (Some(i), Some(j)) => self.adjacency[i].get(&j).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Sum of all edge weights, self-loops counted once.
    pub fn total_weight(&self) -> f64 {
        degrees(&self.adjacency).iter().sum::<f64>() / 2.0
    }
}

/// Assigns every node of an undirected graph to a community.
pub trait GraphPartitioner {
    fn assign(&mut self, graph: &UndirectedGraph) -> ClusterMap;
}

/// Greedy modularity maximisation (Louvain): local moves followed by community
/// aggregation, repeated until a level makes no move.
///
/// Node visiting order is shuffled, so without a seed two runs over the same
/// graph can settle in different, equally valid local optima.
pub struct LouvainPartitioner {
    rng: StdRng,
}

impl LouvainPartitioner {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// One level of local moves. Returns dense community ids per node and
    /// whether any node changed community.
    fn one_level(&mut self, adjacency: &[BTreeMap<usize, f64>]) -> (Vec<usize>, bool) {
        let n = adjacency.len();
        let degrees = degrees(adjacency);
        let m2: f64 = degrees.iter().sum();
        let min_gain = m2 * 1e-12;

        let mut community: Vec<usize> = (0..n).collect();
        let mut totals = degrees.clone();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);

        let mut moved_any = false;
        for _ in 0..MAX_SWEEPS {
            let mut moved = false;

            for &node in &order {
                let current = community[node];
                let k = degrees[node];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&nbr, &w) in &adjacency[node] {
                    if nbr != node {
                        *links.entry(community[nbr]).or_insert(0.0) += w;
                    }
                }

                totals[current] -= k;
                let mut best = current;
                let mut best_gain =
                    links.get(&current).copied().unwrap_or(0.0) - totals[current] * k / m2;
                for (&candidate, &w) in &links {
                    let gain = w - totals[candidate] * k / m2;
                    if gain > best_gain + min_gain {
                        best = candidate;
                        best_gain = gain;
                    }
                }
                totals[best] += k;
                community[node] = best;

                if best != current {
                    moved = true;
                    moved_any = true;
                }
            }

            if !moved {
                break;
            }
        }

        (renumber(&community), moved_any)
    }
}

impl GraphPartitioner for LouvainPartitioner {
    fn assign(&mut self, graph: &UndirectedGraph) -> ClusterMap {
        let n = graph.node_count();
        if n == 0 {
            tracing::warn!("Filtered graph is empty, no communities to detect");
            return ClusterMap::new();
        }

        // Every original node's current super-node.
        let mut membership: Vec<usize> = (0..n).collect();

        if graph.total_weight() > 0.0 {
            let mut adjacency = graph.adjacency.clone();
            loop {
                let (communities, moved) = self.one_level(&adjacency);
                if !moved {
                    break;
                }
                for m in membership.iter_mut() {
                    *m = communities[*m];
                }
                adjacency = aggregate(&adjacency, &communities);
            }
        }

        let partition: ClusterMap = graph
            .accounts
            .iter()
            .cloned()
            .zip(membership.iter().copied())
            .collect();

        tracing::info!(
            nodes = n,
            clusters = membership.iter().max().map_or(0, |m| m + 1),
            modularity = modularity(graph, &partition),
            "Detected communities"
        );

        partition
    }
}

/// Newman modularity of `partition` over `graph`. Accounts missing from the
/// partition count as singleton communities.
pub fn modularity(graph: &UndirectedGraph, partition: &ClusterMap) -> f64 {
    let degrees = degrees(&graph.adjacency);
    let m2: f64 = degrees.iter().sum();
    if m2 <= 0.0 {
        return 0.0;
    }

    let community_of = |i: usize| -> (bool, usize) {
        match partition.get(&graph.accounts[i]) {
            Some(&c) => (true, c),
            None => (false, i),
        }
    };

    let mut internal: HashMap<(bool, usize), f64> = HashMap::new();
    let mut degree_sum: HashMap<(bool, usize), f64> = HashMap::new();
    for (i, nbrs) in graph.adjacency.iter().enumerate() {
        let ci = community_of(i);
        *degree_sum.entry(ci).or_insert(0.0) += degrees[i];
        for (&j, &w) in nbrs.range(i..) {
            if community_of(j) == ci {
                *internal.entry(ci).or_insert(0.0) += w;
            }
        }
    }

    degree_sum
        .iter()
        .map(|(c, &d)| {
            let l = internal.get(c).copied().unwrap_or(0.0);
            2.0 * l / m2 - (d / m2).powi(2)
        })
        .sum()
}

/// Weighted degree per node; a self-loop contributes twice its weight.
fn degrees(adjacency: &[BTreeMap<usize, f64>]) -> Vec<f64> {
    adjacency
        .iter()
        .enumerate()
        .map(|(i, nbrs)| {
            nbrs.iter()
                .map(|(&j, &w)| if j == i { 2.0 * w } else { w })
                .sum()
        })
        .collect()
}

/// Map arbitrary community labels to 0..k in order of first appearance.
fn renumber(community: &[usize]) -> Vec<usize> {
    let mut ids: HashMap<usize, usize> = HashMap::new();
    community
        .iter()
        .map(|&c| {
            let next = ids.len();
            *ids.entry(c).or_insert(next)
        })
        .collect()
}

/// Collapse each community into a single node, summing the weights between them.
fn aggregate(
    adjacency: &[BTreeMap<usize, f64>],
    communities: &[usize],
) -> Vec<BTreeMap<usize, f64>> {
    let count = communities.iter().max().map_or(0, |c| c + 1);
    let mut next = vec![BTreeMap::new(); count];

    for (i, nbrs) in adjacency.iter().enumerate() {
        for (&j, &w) in nbrs.range(i..) {
            let (ci, cj) = (communities[i], communities[j]);
            *next[ci].entry(cj).or_insert(0.0) += w;
            if ci != cj {
                *next[cj].entry(ci).or_insert(0.0) += w;
            }
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build_graph;
    use crate::ledger::TransferRecord;

    fn tx(from: &str, to: &str, value: f64) -> TransferRecord {
        TransferRecord::new(from, Some(to), value)
    }

    fn two_triangles() -> UndirectedGraph {
        let graph = build_graph(&[
            tx("a", "b", 5.0),
            tx("b", "c", 5.0),
            tx("c", "a", 5.0),
            tx("d", "e", 5.0),
            tx("e", "f", 5.0),
            tx("f", "d", 5.0),
            tx("c", "d", 0.1),
        ])
        .unwrap();
        UndirectedGraph::from_directed(&graph)
    }

    #[test]
    fn test_projection_sums_both_directions() {
        let graph = build_graph(&[tx("a", "b", 1.0), tx("b", "a", 2.5), tx("a", "a", 0.5)]).unwrap();
        let undirected = UndirectedGraph::from_directed(&graph);

        assert_eq!(undirected.weight("a", "b"), 3.5);
        assert_eq!(undirected.weight("b", "a"), 3.5);
        assert_eq!(undirected.weight("a", "a"), 0.5);
        assert_eq!(undirected.edge_count(), 2);
        assert_eq!(undirected.total_weight(), 4.0);
    }

    #[test]
    fn test_separates_weakly_bridged_triangles() {
        let graph = two_triangles();
        let partition = LouvainPartitioner::new(Some(7)).assign(&graph);

        assert_eq!(partition.len(), 6);
        assert_eq!(partition["a"], partition["b"]);
        assert_eq!(partition["b"], partition["c"]);
        assert_eq!(partition["d"], partition["e"]);
        assert_eq!(partition["e"], partition["f"]);
        assert_ne!(partition["a"], partition["d"]);
        assert!(modularity(&graph, &partition) > 0.45);
    }

    #[test]
    fn test_cluster_ids_are_dense() {
        let partition = LouvainPartitioner::new(Some(1)).assign(&two_triangles());
        let mut ids: Vec<usize> = partition.values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let graph = two_triangles();
        let first = LouvainPartitioner::new(Some(42)).assign(&graph);
        let second = LouvainPartitioner::new(Some(42)).assign(&graph);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_graph_yields_empty_map() {
        let graph = UndirectedGraph::from_directed(&TransferGraph::new());
        assert!(LouvainPartitioner::new(None).assign(&graph).is_empty());
    }

    #[test]
    fn test_zero_weight_graph_keeps_singletons() {
        let graph = build_graph(&[tx("a", "b", 0.0), tx("b", "c", 0.0)]).unwrap();
        let undirected = UndirectedGraph::from_directed(&graph);
        let partition = LouvainPartitioner::new(Some(3)).assign(&undirected);

        assert_eq!(partition.len(), 3);
        assert_ne!(partition["a"], partition["b"]);
        assert_ne!(partition["b"], partition["c"]);
        assert_eq!(modularity(&undirected, &partition), 0.0);
    }

    #[test]
    fn test_single_cluster_has_zero_modularity() {
        let graph = two_triangles();
        let everyone: ClusterMap = graph.accounts().iter().map(|a| (a.clone(), 0)).collect();
        assert!(modularity(&graph, &everyone).abs() < 1e-12);
    }
}

use super::builder::TransferGraph;

/// Induced subgraph of the edges whose aggregated value is at least `min_value`.
///
/// Edges below the threshold are dropped outright, and so is every account left
/// without a surviving edge, even if it had edges in `graph`.
pub fn filter_edges(graph: &TransferGraph, min_value: f64) -> TransferGraph {
    let mut filtered = TransferGraph::new();

    for edge in graph.edges() {
        if edge.stats.value >= min_value {
            filtered.merge_edge(edge.from, edge.to, *edge.stats);
        }
    }

    tracing::info!(
        min_value,
        nodes = filtered.node_count(),
        edges = filtered.edge_count(),
        dropped_edges = graph.edge_count() - filtered.edge_count(),
        "Filtered transfer graph"
    );

    if filtered.edge_count() == 0 && graph.edge_count() > 0 {
        tracing::warn!(min_value, "No edge reaches the value threshold");
    }

    filtered
}

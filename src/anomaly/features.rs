use crate::graph::TransferGraph;

use super::types::{FeatureTable, FeatureVector};

/// Compute the feature vector of every account in `graph`.
///
/// Every node appears exactly once, including accounts that only send or only
/// receive (their missing side is zero) and the contract-creation sentinel.
pub fn extract_features(graph: &TransferGraph) -> FeatureTable {
    let mut rows = vec![FeatureVector::default(); graph.node_count()];

    for (from, to, stats) in graph.indexed_edges() {
        let sender = &mut rows[from];
        sender.out_degree += stats.count;
        sender.total_value_out += stats.value;

        let receiver = &mut rows[to];
        receiver.in_degree += stats.count;
        receiver.total_value_in += stats.value;
    }

    tracing::debug!(accounts = rows.len(), "Extracted account features");
    FeatureTable::new(graph.accounts().to_vec(), rows)
}

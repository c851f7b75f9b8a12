use std::collections::{BTreeMap, HashMap};

use crate::error::AnalyticsError;
use crate::ledger::TransferRecord;

/// Aggregated totals for a single (from, to) account pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStats {
    pub value: f64,
    pub count: u64,
}

/// A borrowed view of one aggregated edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRef<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub stats: &'a EdgeStats,
}

/// Directed transfer graph with parallel transfers collapsed into one edge per
/// (from, to) pair.
///
/// Accounts are interned to dense indices in first-seen order. Callers must not
/// rely on that order; only per-edge totals are stable across input orderings.
#[derive(Debug, Clone, Default)]
pub struct TransferGraph {
    index: HashMap<String, usize>,
    accounts: Vec<String>,
    edges: BTreeMap<(usize, usize), EdgeStats>,
}

impl TransferGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn contains_account(&self, account: &str) -> bool {
        self.index.contains_key(account)
    }

    /// Accounts in index order.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn account_index(&self, account: &str) -> Option<usize> {
        self.index.get(account).copied()
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeStats> {
        let from_idx = self.account_index(from)?;
        let to_idx = self.account_index(to)?;
        self.edges.get(&(from_idx, to_idx))
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> + '_ {
        self.edges.iter().map(|(&(from, to), stats)| EdgeRef {
            from: &self.accounts[from],
            to: &self.accounts[to],
            stats,
        })
    }

    /// Edges keyed by account index, for index-based algorithms.
    pub(crate) fn indexed_edges(&self) -> impl Iterator<Item = (usize, usize, &EdgeStats)> + '_ {
        self.edges
            .iter()
            .map(|(&(from, to), stats)| (from, to, stats))
    }

    fn intern(&mut self, account: &str) -> usize {
        if let Some(&idx) = self.index.get(account) {
            return idx;
        }
        let idx = self.accounts.len();
        self.index.insert(account.to_string(), idx);
        self.accounts.push(account.to_string());
        idx
    }

    /// Merge `stats` into the (from, to) edge, creating endpoints as needed.
    /// Returns the edge totals after the merge.
    pub(crate) fn merge_edge(&mut self, from: &str, to: &str, stats: EdgeStats) -> EdgeStats {
        let from_idx = self.intern(from);
        let to_idx = self.intern(to);
        *self
            .edges
            .entry((from_idx, to_idx))
            .and_modify(|edge| {
                edge.value += stats.value;
                edge.count += stats.count;
            })
            .or_insert(stats)
    }
}

/// Aggregate transfer records into a [`TransferGraph`].
///
/// A record without a sender, or with a negative or non-finite value, rejects
/// the whole batch.
pub fn build_graph(records: &[TransferRecord]) -> Result<TransferGraph, AnalyticsError> {
    let mut graph = TransferGraph::new();

    for (index, record) in records.iter().enumerate() {
        let from = record.sender().ok_or_else(|| AnalyticsError::Validation {
            index,
            reason: describe(record, "missing sender"),
        })?;

        if !record.value.is_finite() {
            return Err(AnalyticsError::Validation {
                index,
                reason: describe(record, "value is not numeric"),
            });
        }
        if record.value < 0.0 {
            return Err(AnalyticsError::Validation {
                index,
                reason: describe(record, &format!("negative value {}", record.value)),
            });
        }

        let merged = graph.merge_edge(
            from,
            record.destination(),
            EdgeStats {
                value: record.value,
                count: 1,
            },
        );
        if !merged.value.is_finite() {
            return Err(AnalyticsError::Validation {
                index,
                reason: describe(record, "aggregated edge value overflows"),
            });
        }
    }

    tracing::info!(
        records = records.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Transfer graph built"
    );

    Ok(graph)
}

fn describe(record: &TransferRecord, problem: &str) -> String {
    match &record.hash {
        Some(hash) => format!("{} (tx {})", problem, hash),
        None => problem.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::CONTRACT_CREATION;

    fn tx(from: &str, to: &str, value: f64) -> TransferRecord {
        TransferRecord::new(from, Some(to), value)
    }

    #[test]
    fn test_worked_example_edges() {
        let records = vec![tx("A", "B", 1.0), tx("A", "B", 2.0), tx("B", "C", 0.1)];
        let graph = build_graph(&records).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(
            graph.edge("A", "B"),
            Some(&EdgeStats {
                value: 3.0,
                count: 2
            })
        );
        assert_eq!(
            graph.edge("B", "C"),
            Some(&EdgeStats {
                value: 0.1,
                count: 1
            })
        );
        assert!(graph.edge("B", "A").is_none());
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let records = vec![
            tx("A", "B", 0.5),
            tx("B", "A", 1.25),
            tx("A", "B", 2.0),
            tx("C", "A", 4.0),
            tx("A", "B", 0.25),
            tx("C", "A", 8.0),
        ];

        let forward = build_graph(&records).unwrap();
        let mut reversed_records = records.clone();
        reversed_records.reverse();
        let reversed = build_graph(&reversed_records).unwrap();
        let mut rotated_records = records.clone();
        rotated_records.rotate_left(2);
        let rotated = build_graph(&rotated_records).unwrap();

        for other in [&reversed, &rotated] {
            assert_eq!(other.edge_count(), forward.edge_count());
            for edge in forward.edges() {
                assert_eq!(other.edge(edge.from, edge.to), Some(edge.stats));
            }
        }
        assert_eq!(
            forward.edge("A", "B"),
            Some(&EdgeStats {
                value: 2.75,
                count: 3
            })
        );
    }

    #[test]
    fn test_missing_destination_uses_sentinel() {
        let records = vec![
            TransferRecord::new("A", None, 1.0),
            TransferRecord::new("B", Some(""), 2.0),
        ];
        let graph = build_graph(&records).unwrap();

        assert!(graph.contains_account(CONTRACT_CREATION));
        assert_eq!(graph.edge("A", CONTRACT_CREATION).unwrap().count, 1);
        assert_eq!(graph.edge("B", CONTRACT_CREATION).unwrap().value, 2.0);
    }

    #[test]
    fn test_rejects_missing_sender() {
        let mut bad = tx("A", "B", 1.0);
        bad.from = None;
        let err = build_graph(&[tx("A", "B", 1.0), bad]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation { index: 1, .. }));
    }

    #[test]
    fn test_rejects_negative_and_nan_values() {
        let err = build_graph(&[tx("A", "B", -0.5)]).unwrap_err();
        assert!(err.is_validation());

        let mut nan = tx("A", "B", f64::NAN);
        nan.hash = Some("0xdead".to_string());
        let err = build_graph(&[nan]).unwrap_err();
        assert!(err.to_string().contains("0xdead"));

        assert!(build_graph(&[tx("A", "B", f64::INFINITY)]).is_err());
    }

    #[test]
    fn test_rejects_overflowing_edge_total() {
        let records = [
            tx("A", "B", 1.0),
            tx("A", "B", f64::MAX),
            tx("A", "B", f64::MAX),
        ];
        let err = build_graph(&records).unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation { index: 2, .. }));

        // Large values on separate edges are fine.
        let graph = build_graph(&[tx("A", "B", f64::MAX), tx("B", "A", f64::MAX)]).unwrap();
        assert_eq!(graph.edge("B", "A").unwrap().value, f64::MAX);
    }

    #[test]
    fn test_zero_value_transfers_are_kept() {
        let graph = build_graph(&[tx("A", "B", 0.0), tx("A", "B", 0.0)]).unwrap();
        assert_eq!(
            graph.edge("A", "B"),
            Some(&EdgeStats {
                value: 0.0,
                count: 2
            })
        );
    }

    #[test]
    fn test_empty_input() {
        let graph = build_graph(&[]).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }
}

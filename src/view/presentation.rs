use std::collections::HashMap;

use serde::Serialize;

use crate::anomaly::AnomalyTable;
use crate::graph::{ClusterMap, TransferGraph};

use super::palette::{cluster_colors, ANOMALY_COLOR, UNCLUSTERED_COLOR};
use super::scale::{SizeBounds, SizeMap};

const LABEL_CHARS: usize = 6;

/// A node ready for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    /// Hover annotation with the full id and balance.
    pub title: String,
    pub balance: f64,
    pub size: f64,
    pub color: String,
    /// Set for anomalous accounts; renderers draw these with a border and glow.
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
    pub from: String,
    pub to: String,
    pub value: f64,
    pub count: u64,
    pub title: String,
}

/// Presentation-ready description of the filtered graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

impl GraphView {
    pub fn node(&self, id: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Everything the view needs besides the filtered graph itself.
pub struct ViewInputs<'a> {
    pub anomalies: &'a AnomalyTable,
    pub clusters: &'a ClusterMap,
    /// Lowercased account id → balance.
    pub balances: &'a HashMap<String, f64>,
    pub sizes: &'a SizeMap,
    pub bounds: SizeBounds,
}

/// Combine the filtered graph with anomaly flags, clusters and sizes.
///
/// Anomaly flags come from the full-graph table, so a flagged account keeps its
/// colour even when its community was computed on the filtered graph only.
pub fn assemble_view(filtered: &TransferGraph, inputs: &ViewInputs<'_>) -> GraphView {
    let colors = cluster_colors(inputs.clusters);

    let nodes = filtered
        .accounts()
        .iter()
        .map(|account| {
            let key = account.to_lowercase();
            let balance = inputs.balances.get(&key).copied().unwrap_or(0.0);
            let size = inputs
                .sizes
                .get(&key)
                .copied()
                .unwrap_or(inputs.bounds.min_size);
            let highlighted = inputs.anomalies.is_anomalous(account);

            let color = if highlighted {
                ANOMALY_COLOR.to_string()
            } else {
                inputs
                    .clusters
                    .get(account)
                    .and_then(|cluster| colors.get(cluster))
                    .cloned()
                    .unwrap_or_else(|| UNCLUSTERED_COLOR.to_string())
            };

            NodeView {
                id: account.clone(),
                label: account.chars().take(LABEL_CHARS).collect(),
                title: format!("{}\nBalance: {:.4} ETH", account, balance),
                balance,
                size,
                color,
                highlighted,
            }
        })
        .collect();

    let edges = filtered
        .edges()
        .map(|edge| EdgeView {
            from: edge.from.to_string(),
            to: edge.to.to_string(),
            value: edge.stats.value,
            count: edge.stats.count,
            title: format!(
                "Value: {:.2} ETH\nCount: {}",
                edge.stats.value, edge.stats.count
            ),
        })
        .collect();

    GraphView { nodes, edges }
}

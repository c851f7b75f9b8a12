use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::anomaly::{detect_anomalies, AnomalyTable};
use crate::config::AnalysisConfig;
use crate::error::AnalyticsError;
use crate::graph::{
    build_graph, filter_edges, modularity, ClusterMap, GraphPartitioner, LouvainPartitioner,
    TransferGraph, UndirectedGraph,
};
use crate::ledger::TransferRecord;
use crate::provider::BalanceSource;
use crate::view::{assemble_view, scale_sizes, GraphView, SizeMap, ViewInputs};

/// Headline numbers for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub nodes: usize,
    pub edges: usize,
    pub retained_nodes: usize,
    pub retained_edges: usize,
    pub anomalies_flagged: usize,
    /// Flagged accounts that the value filter removed from the view.
    pub anomalies_hidden: usize,
    pub clusters: usize,
    pub modularity: f64,
    pub contamination: f64,
    pub min_edge_value: f64,
    pub generated_at: DateTime<Utc>,
}

/// Every artifact produced by one run. Nothing here is shared with other runs.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub graph: TransferGraph,
    pub filtered: TransferGraph,
    /// Scored over the full graph, independent of the value filter.
    pub anomalies: AnomalyTable,
    pub clusters: ClusterMap,
    pub balances: HashMap<String, f64>,
    pub sizes: SizeMap,
    pub view: GraphView,
    pub summary: RunSummary,
}

/// Runs the analytics stages in order over a complete batch of transfers:
/// 1. Graph aggregation
/// 2. Feature extraction and anomaly classification (full graph)
/// 3. Value filtering
/// 4. Community detection (filtered graph)
/// 5. Balance lookup and size scaling (filtered accounts)
/// 6. View assembly
pub struct GraphAnalysis {
    config: AnalysisConfig,
}

impl GraphAnalysis {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(
        &self,
        records: &[TransferRecord],
        balance_source: &dyn BalanceSource,
    ) -> Result<AnalysisRun, AnalyticsError> {
        let config = &self.config;

        // Step 1: Aggregate transfers
        let graph = build_graph(records)?;

        // Step 2: Score every account of the unfiltered graph
        let anomalies = detect_anomalies(&graph, config.contamination, config.seed)?;

        // Step 3: Keep only edges worth drawing
        let filtered = filter_edges(&graph, config.min_edge_value);

        // Step 4: Group the filtered accounts
        let undirected = UndirectedGraph::from_directed(&filtered);
        let clusters = LouvainPartitioner::new(config.seed).assign(&undirected);
        let modularity = modularity(&undirected, &clusters);

        // Step 5: Size nodes by balance
        let balances = balance_source.balances(filtered.accounts());
        let sizes = scale_sizes(&balances, config.size_bounds);

        // Step 6: Assemble the presentation view
        let view = assemble_view(
            &filtered,
            &ViewInputs {
                anomalies: &anomalies,
                clusters: &clusters,
                balances: &balances,
                sizes: &sizes,
                bounds: config.size_bounds,
            },
        );

        let anomalies_hidden = anomalies
            .flagged()
            .filter(|row| !filtered.contains_account(&row.node))
            .count();
        if anomalies_hidden > 0 {
            tracing::warn!(
                hidden = anomalies_hidden,
                min_edge_value = config.min_edge_value,
                "Flagged accounts fall outside the filtered view"
            );
        }

        let summary = RunSummary {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            retained_nodes: filtered.node_count(),
            retained_edges: filtered.edge_count(),
            anomalies_flagged: anomalies.flagged_count(),
            anomalies_hidden,
            clusters: clusters.values().max().map_or(0, |max| max + 1),
            modularity,
            contamination: config.contamination,
            min_edge_value: config.min_edge_value,
            generated_at: Utc::now(),
        };

        tracing::info!(
            nodes = summary.nodes,
            retained_nodes = summary.retained_nodes,
            anomalies = summary.anomalies_flagged,
            clusters = summary.clusters,
            "Analysis run complete"
        );

        Ok(AnalysisRun {
            graph,
            filtered,
            anomalies,
            clusters,
            balances,
            sizes,
            view,
            summary,
        })
    }
}

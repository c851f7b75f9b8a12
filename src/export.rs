//! File artifacts handed to downstream consumers.

use std::path::Path;

use serde::Serialize;

use crate::anomaly::AnomalyTable;
use crate::pipeline::RunSummary;
use crate::view::GraphView;

/// The exported graph document: headline numbers plus the renderable view.
#[derive(Debug, Serialize)]
pub struct GraphDocument<'a> {
    pub summary: &'a RunSummary,
    pub graph: &'a GraphView,
}

fn ensure_parent(path: &Path) -> eyre::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| eyre::eyre!("Failed to create directory '{}': {}", parent.display(), e))?;
    }
    Ok(())
}

/// Write one CSV row per account, anomalous or not.
pub fn write_anomalies_csv(path: impl AsRef<Path>, table: &AnomalyTable) -> eyre::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| eyre::eyre!("Failed to create anomalies CSV '{}': {}", path.display(), e))?;
    for row in table.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!(
        rows = table.len(),
        flagged = table.flagged_count(),
        path = %path.display(),
        "Wrote anomaly table"
    );
    Ok(())
}

pub fn write_graph_json(
    path: impl AsRef<Path>,
    graph: &GraphView,
    summary: &RunSummary,
) -> eyre::Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let document = GraphDocument { summary, graph };
    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, json)
        .map_err(|e| eyre::eyre!("Failed to write graph JSON '{}': {}", path.display(), e))?;

    tracing::info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        path = %path.display(),
        "Wrote graph view"
    );
    Ok(())
}

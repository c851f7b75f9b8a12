use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyRow;
use crate::pipeline::RunSummary;
use crate::view::GraphView;

// ============================================================
// Request bodies
// ============================================================

/// Per-run overrides of the configured analysis parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunParams {
    pub min_edge_value: Option<f64>,
    pub contamination: Option<f64>,
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub summary: RunSummary,
    pub graph: GraphView,
    pub anomalies: Vec<AnomalyRow>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

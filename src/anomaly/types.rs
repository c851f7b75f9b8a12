use std::collections::HashMap;

use serde::Serialize;

/// Number of behavioural features per account.
pub const FEATURE_COUNT: usize = 4;

/// One row of the model input matrix.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Per-account degree and value aggregates.
///
/// Degrees sum the transfer `count` of each edge, not the number of distinct
/// counterparties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    pub in_degree: u64,
    pub out_degree: u64,
    pub total_value_in: f64,
    pub total_value_out: f64,
}

impl FeatureVector {
    /// Columns in the fixed order `in_degree, out_degree, total_value_in, total_value_out`.
    pub fn as_row(&self) -> FeatureRow {
        [
            self.in_degree as f64,
            self.out_degree as f64,
            self.total_value_in,
            self.total_value_out,
        ]
    }
}

/// Feature vectors for every account of a graph, in the graph's node order.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    accounts: Vec<String>,
    rows: Vec<FeatureVector>,
}

impl FeatureTable {
    pub fn new(accounts: Vec<String>, rows: Vec<FeatureVector>) -> Self {
        debug_assert_eq!(accounts.len(), rows.len());
        Self { accounts, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureVector)> + '_ {
        self.accounts
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter())
    }

    #[cfg(test)]
    pub fn get(&self, account: &str) -> Option<&FeatureVector> {
        self.accounts
            .iter()
            .position(|a| a == account)
            .map(|i| &self.rows[i])
    }

    pub fn matrix(&self) -> Vec<FeatureRow> {
        self.rows.iter().map(FeatureVector::as_row).collect()
    }
}

/// Model verdict for a single account.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyResult {
    /// Decision value: negative below the contamination boundary, more negative
    /// means more isolated.
    pub anomaly_score: f64,
    pub anomaly: bool,
}

/// One line of the standalone anomaly artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    pub node: String,
    pub in_degree: u64,
    pub out_degree: u64,
    pub total_value_in: f64,
    pub total_value_out: f64,
    pub anomaly_score: f64,
    pub anomaly: bool,
}

impl AnomalyRow {
    pub fn new(node: &str, features: &FeatureVector, result: AnomalyResult) -> Self {
        Self {
            node: node.to_string(),
            in_degree: features.in_degree,
            out_degree: features.out_degree,
            total_value_in: features.total_value_in,
            total_value_out: features.total_value_out,
            anomaly_score: result.anomaly_score,
            anomaly: result.anomaly,
        }
    }
}

/// Anomaly verdicts for every account of the unfiltered graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnomalyTable {
    rows: Vec<AnomalyRow>,
    #[serde(skip)]
    by_node: HashMap<String, usize>,
}

impl AnomalyTable {
    pub fn new(rows: Vec<AnomalyRow>) -> Self {
        let by_node = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.node.clone(), i))
            .collect();
        Self { rows, by_node }
    }

    pub fn rows(&self) -> &[AnomalyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, node: &str) -> Option<&AnomalyRow> {
        self.by_node.get(node).map(|&i| &self.rows[i])
    }

    pub fn is_anomalous(&self, node: &str) -> bool {
        self.get(node).is_some_and(|row| row.anomaly)
    }

    pub fn flagged(&self) -> impl Iterator<Item = &AnomalyRow> + '_ {
        self.rows.iter().filter(|row| row.anomaly)
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged().count()
    }
}

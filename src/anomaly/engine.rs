use crate::error::AnalyticsError;
use crate::graph::TransferGraph;

use super::features::extract_features;
use super::model::{IsolationForest, OutlierModel};
use super::types::{AnomalyResult, AnomalyRow, AnomalyTable, FeatureTable};

/// Flags the `contamination` fraction of accounts that an outlier model finds
/// easiest to isolate.
pub struct AnomalyDetector<M = IsolationForest> {
    model: M,
    contamination: f64,
}

impl AnomalyDetector<IsolationForest> {
    pub fn isolation_forest(contamination: f64, seed: Option<u64>) -> Result<Self, AnalyticsError> {
        Self::new(IsolationForest::new(seed), contamination)
    }
}

impl<M: OutlierModel> AnomalyDetector<M> {
    pub fn new(model: M, contamination: f64) -> Result<Self, AnalyticsError> {
        if !(contamination > 0.0 && contamination < 1.0) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "contamination must be in (0, 1), got {}",
                contamination
            )));
        }
        Ok(Self {
            model,
            contamination,
        })
    }

    /// Fit the model on the whole table and label every account.
    ///
    /// The decision boundary sits at the `contamination` percentile of the model
    /// scores, so roughly `contamination * N` accounts end up flagged. Accounts with
    /// identical scores share one decision; a tie spanning the boundary is left
    /// unflagged as a whole and the count can fall well short.
    pub fn classify(&mut self, features: &FeatureTable) -> Result<AnomalyTable, AnalyticsError> {
        let scores = self.model.fit_predict(&features.matrix())?;
        if scores.len() != features.len() {
            return Err(AnalyticsError::Classification(format!(
                "{} returned {} scores for {} accounts",
                self.model.name(),
                scores.len(),
                features.len()
            )));
        }

        let mut sorted = scores.clone();
        sorted.sort_by(f64::total_cmp);
        let offset = percentile(&sorted, self.contamination);

        let rows: Vec<AnomalyRow> = features
            .iter()
            .zip(scores)
            .map(|((account, vector), score)| {
                let anomaly_score = score - offset;
                AnomalyRow::new(
                    account,
                    vector,
                    AnomalyResult {
                        anomaly_score,
                        anomaly: anomaly_score < 0.0,
                    },
                )
            })
            .collect();

        let table = AnomalyTable::new(rows);
        tracing::info!(
            model = self.model.name(),
            accounts = table.len(),
            flagged = table.flagged_count(),
            contamination = self.contamination,
            "Anomaly classification complete"
        );

        Ok(table)
    }
}

/// Score the whole graph with a default isolation forest.
pub fn detect_anomalies(
    graph: &TransferGraph,
    contamination: f64,
    seed: Option<u64>,
) -> Result<AnomalyTable, AnalyticsError> {
    let features = extract_features(graph);
    AnomalyDetector::isolation_forest(contamination, seed)?.classify(&features)
}

/// Linearly interpolated quantile `q` (0..=1) of an ascending slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

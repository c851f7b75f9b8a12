use thiserror::Error;

/// Errors raised by the analytics core.
///
/// Application edges (config, file sources, export, HTTP) wrap these in
/// `eyre::Report`; the core itself never panics on bad input.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A transfer record could not be aggregated. The whole run is rejected.
    #[error("invalid transfer record #{index}: {reason}")]
    Validation { index: usize, reason: String },

    /// The outlier model could not be fitted on the feature matrix.
    #[error("anomaly classification failed: {0}")]
    Classification(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl AnalyticsError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

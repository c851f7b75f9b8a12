pub mod engine;
pub mod features;
pub mod model;
pub mod types;

pub use engine::{detect_anomalies, AnomalyDetector};
pub use features::extract_features;
pub use model::{IsolationForest, OutlierModel};
pub use types::{
    AnomalyResult, AnomalyRow, AnomalyTable, FeatureRow, FeatureTable, FeatureVector,
    FEATURE_COUNT,
};

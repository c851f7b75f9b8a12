use serde::Deserialize;

use crate::error::AnalyticsError;
use crate::view::SizeBounds;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

// ============================================================
// Analysis Config
// ============================================================

/// The only settings that influence analysis results.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Expected fraction of anomalous accounts.
    #[serde(default = "default_contamination")]
    pub contamination: f64,
    /// Edges below this aggregated value are left out of the rendered graph.
    #[serde(default = "default_min_edge_value")]
    pub min_edge_value: f64,
    #[serde(default)]
    pub size_bounds: SizeBounds,
    /// Pins the outlier model and community detection; unset means entropy.
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            contamination: default_contamination(),
            min_edge_value: default_min_edge_value(),
            size_bounds: SizeBounds::default(),
            seed: None,
        }
    }
}

fn default_contamination() -> f64 {
    0.01
}

fn default_min_edge_value() -> f64 {
    0.25
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "contamination must be strictly between 0 and 1, got {}",
                self.contamination
            )));
        }
        if !self.min_edge_value.is_finite() || self.min_edge_value < 0.0 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "min_edge_value must be a non-negative number, got {}",
                self.min_edge_value
            )));
        }
        self.size_bounds.validate()
    }
}

// ============================================================
// Data & Output Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_transfers_path")]
    pub transfers_path: String,
    /// `account,balance` CSV. Without it every balance is zero.
    pub balances_path: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            transfers_path: default_transfers_path(),
            balances_path: None,
        }
    }
}

fn default_transfers_path() -> String {
    "data/txs.json".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_anomalies_csv")]
    pub anomalies_csv: String,
    #[serde(default = "default_graph_json")]
    pub graph_json: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            anomalies_csv: default_anomalies_csv(),
            graph_json: default_graph_json(),
        }
    }
}

fn default_anomalies_csv() -> String {
    "data/anomalies.csv".to_string()
}

fn default_graph_json() -> String {
    "data/graph.json".to_string()
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
    #[serde(default = "default_api_host")]
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        self.analysis
            .validate()
            .map_err(|e| eyre::eyre!("Invalid [analysis] section: {}", e))?;
        if self.data.transfers_path.trim().is_empty() {
            return Err(eyre::eyre!("data.transfers_path must not be empty"));
        }
        Ok(())
    }
}

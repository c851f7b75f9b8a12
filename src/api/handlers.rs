use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::error::AnalyticsError;
use crate::pipeline::GraphAnalysis;

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

fn analytics_error(err: AnalyticsError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        AnalyticsError::Validation { .. } | AnalyticsError::InvalidParameter(_) => {
            StatusCode::BAD_REQUEST
        }
        AnalyticsError::Classification(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    api_error(status, err.to_string())
}

/// An empty body means "use the configured parameters".
fn parse_params(body: &[u8]) -> Result<RunParams, (StatusCode, Json<ErrorResponse>)> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RunParams::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid run parameters: {}", e)))
}

enum RunFailure {
    Source(eyre::Report),
    Analytics(AnalyticsError),
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ============================================================
// Runs
// ============================================================

pub async fn create_run(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<RunResponse> {
    let params = parse_params(&body)?;

    let mut config = state.analysis.clone();
    if let Some(min_edge_value) = params.min_edge_value {
        config.min_edge_value = min_edge_value;
    }
    if let Some(contamination) = params.contamination {
        config.contamination = contamination;
    }
    let analysis = GraphAnalysis::new(config).map_err(analytics_error)?;

    let transfers = Arc::clone(&state.transfers);
    let balances = Arc::clone(&state.balances);
    let outcome = tokio::task::spawn_blocking(move || {
        let records = transfers.fetch_transfers().map_err(RunFailure::Source)?;
        analysis
            .run(&records, balances.as_ref())
            .map_err(RunFailure::Analytics)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let run = match outcome {
        Ok(run) => run,
        Err(RunFailure::Source(e)) => {
            tracing::error!(error = %e, "Failed to load transfers for run");
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
        Err(RunFailure::Analytics(e)) => {
            tracing::warn!(error = %e, "Analysis run rejected");
            return Err(analytics_error(e));
        }
    };

    Ok(Json(RunResponse {
        summary: run.summary,
        graph: run.view,
        anomalies: run.anomalies.rows().to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::ledger::TransferRecord;
    use crate::provider::{StaticBalances, TransferSource};

    struct FixedTransfers(Vec<TransferRecord>);

    impl TransferSource for FixedTransfers {
        fn fetch_transfers(&self) -> eyre::Result<Vec<TransferRecord>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenTransfers;

    impl TransferSource for BrokenTransfers {
        fn fetch_transfers(&self) -> eyre::Result<Vec<TransferRecord>> {
            Err(eyre::eyre!("provider unreachable"))
        }
    }

    fn fan_in(n: usize) -> Vec<TransferRecord> {
        (0..n)
            .map(|i| TransferRecord::new(&format!("0x{:04x}", i), Some("0xsink"), 1.0 + i as f64))
            .collect()
    }

    fn state(transfers: impl TransferSource + 'static) -> Arc<AppState> {
        Arc::new(AppState {
            analysis: AnalysisConfig {
                contamination: 0.1,
                seed: Some(3),
                ..AnalysisConfig::default()
            },
            transfers: Arc::new(transfers),
            balances: Arc::new(StaticBalances::default()),
        })
    }

    #[tokio::test]
    async fn test_health() {
        let Json(response) = health().await;
        assert_eq!(response.status, "ok");
    }

    #[tokio::test]
    async fn test_create_run_with_defaults() {
        let Json(response) = create_run(State(state(FixedTransfers(fan_in(40)))), Bytes::new())
            .await
            .unwrap();

        assert_eq!(response.summary.nodes, 41);
        assert_eq!(response.anomalies.len(), 41);
        assert_eq!(response.summary.contamination, 0.1);
        assert_eq!(response.graph.nodes.len(), 41);
    }

    #[tokio::test]
    async fn test_create_run_overrides_threshold() {
        let body = Bytes::from_static(br#"{"min_edge_value": 30.5}"#);
        let Json(response) = create_run(State(state(FixedTransfers(fan_in(40)))), body)
            .await
            .unwrap();

        // Values 31.0..=40.0 survive.
        assert_eq!(response.summary.retained_edges, 10);
        assert_eq!(response.summary.min_edge_value, 30.5);
        assert_eq!(response.anomalies.len(), 41);
    }

    #[tokio::test]
    async fn test_create_run_rejects_bad_parameters() {
        let body = Bytes::from_static(br#"{"contamination": 1.5}"#);
        let (status, _) = create_run(State(state(FixedTransfers(fan_in(10)))), body)
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = Bytes::from_static(b"{not json");
        let (status, _) = create_run(State(state(FixedTransfers(fan_in(10)))), body)
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_run_validation_failure() {
        let mut records = fan_in(10);
        records.push(TransferRecord::new("0xneg", Some("0xsink"), -2.0));

        let (status, Json(error)) = create_run(State(state(FixedTransfers(records))), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.error.contains("#10"));
    }

    #[tokio::test]
    async fn test_create_run_classification_failure() {
        let records = vec![TransferRecord::new("0xloop", Some("0xloop"), 1.0)];
        let (status, _) = create_run(State(state(FixedTransfers(records))), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_create_run_source_failure() {
        let (status, Json(error)) = create_run(State(state(BrokenTransfers)), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.error.contains("provider unreachable"));
    }
}

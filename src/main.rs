use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use chainwatch_graph::api::AppState;
use chainwatch_graph::config::Config;
use chainwatch_graph::export::{write_anomalies_csv, write_graph_json};
use chainwatch_graph::pipeline::GraphAnalysis;
use chainwatch_graph::provider::{
    BalanceSource, CsvBalanceFile, JsonTransferFile, StaticBalances, TransferSource,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug for balance lookup detail)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("ChainWatch Graph starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        contamination = config.analysis.contamination,
        min_edge_value = config.analysis.min_edge_value,
        "Configuration loaded from {}",
        config_path
    );

    // Wire up the data provider
    let transfers: Arc<dyn TransferSource> =
        Arc::new(JsonTransferFile::new(&config.data.transfers_path));
    let balances: Arc<dyn BalanceSource> = match config.data.balances_path {
        Some(ref path) => Arc::new(CsvBalanceFile::load(path)?),
        None => {
            tracing::warn!("No balances_path configured, every node gets the minimum size");
            Arc::new(StaticBalances::default())
        }
    };

    // Run the batch analysis once and write the artifacts
    let analysis = GraphAnalysis::new(config.analysis.clone())?;
    let records = {
        let transfers = Arc::clone(&transfers);
        tokio::task::spawn_blocking(move || transfers.fetch_transfers()).await??
    };
    let run = {
        let balances = Arc::clone(&balances);
        tokio::task::spawn_blocking(move || analysis.run(&records, balances.as_ref())).await??
    };

    write_anomalies_csv(&config.output.anomalies_csv, &run.anomalies)?;
    write_graph_json(&config.output.graph_json, &run.view, &run.summary)?;

    tracing::info!(
        nodes = run.summary.nodes,
        edges = run.summary.edges,
        retained_nodes = run.summary.retained_nodes,
        retained_edges = run.summary.retained_edges,
        anomalies = run.summary.anomalies_flagged,
        hidden = run.summary.anomalies_hidden,
        clusters = run.summary.clusters,
        modularity = run.summary.modularity,
        "Batch analysis finished"
    );

    if !config.api.enabled {
        tracing::info!("API disabled, exiting");
        return Ok(());
    }

    // Create shutdown signal
    let shutdown = CancellationToken::new();

    let state = AppState {
        analysis: config.analysis.clone(),
        transfers,
        balances,
    };
    let host = config.api.host.clone();
    let port = config.api.port;
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = chainwatch_graph::api::serve(state, &host, port, server_shutdown).await {
            tracing::error!(error = %e, "API server failed");
        }
    });

    tracing::info!("Serving analysis runs. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping API server...");
    shutdown.cancel();
    let _ = server.await;

    tracing::info!("ChainWatch Graph stopped gracefully");
    Ok(())
}

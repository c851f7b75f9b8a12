use std::io::Write;

use chainwatch_graph::config::AnalysisConfig;
use chainwatch_graph::export::{write_anomalies_csv, write_graph_json};
use chainwatch_graph::graph::EdgeStats;
use chainwatch_graph::ledger::TransferRecord;
use chainwatch_graph::pipeline::GraphAnalysis;
use chainwatch_graph::provider::{CsvBalanceFile, JsonTransferFile, TransferSource};

fn worked_example() -> Vec<TransferRecord> {
    vec![
        TransferRecord::new("A", Some("B"), 1.0),
        TransferRecord::new("A", Some("B"), 2.0),
        TransferRecord::new("B", Some("C"), 0.1),
    ]
}

fn analysis() -> GraphAnalysis {
    GraphAnalysis::new(AnalysisConfig {
        contamination: 0.34,
        min_edge_value: 0.5,
        seed: Some(11),
        ..AnalysisConfig::default()
    })
    .unwrap()
}

#[test]
fn test_worked_example_end_to_end() {
    let balances = CsvBalanceFile::from_reader("account,balance\na,10\nb,0\n".as_bytes()).unwrap();
    let run = analysis().run(&worked_example(), &balances).unwrap();

    // Full graph
    assert_eq!(run.graph.node_count(), 3);
    assert_eq!(
        run.graph.edge("A", "B"),
        Some(&EdgeStats {
            value: 3.0,
            count: 2
        })
    );
    assert_eq!(
        run.graph.edge("B", "C"),
        Some(&EdgeStats {
            value: 0.1,
            count: 1
        })
    );

    // Anomaly table covers every account, including the one filtered out
    let b = run.anomalies.get("B").unwrap();
    assert_eq!(b.in_degree, 2);
    assert_eq!(b.out_degree, 1);
    assert_eq!(b.total_value_in, 3.0);
    assert_eq!(b.total_value_out, 0.1);
    assert!(run.anomalies.get("C").is_some());
    assert!(run.anomalies.flagged_count() <= 1);

    // Filtered graph and view
    assert_eq!(run.filtered.node_count(), 2);
    assert_eq!(run.filtered.edge_count(), 1);
    assert!(!run.filtered.contains_account("C"));
    assert!(run.view.node("C").is_none());
    assert_eq!(run.view.edges.len(), 1);
    assert_eq!(run.view.edges[0].title, "Value: 3.00 ETH\nCount: 2");

    // A and B share the only edge, so they share a community
    assert_eq!(run.clusters.len(), 2);
    assert_eq!(run.clusters["A"], run.clusters["B"]);
    assert_eq!(run.summary.clusters, 1);

    // Sizes span the configured bounds
    assert_eq!(run.view.node("A").unwrap().size, 500.0);
    assert_eq!(run.view.node("B").unwrap().size, 50.0);
    assert_eq!(run.view.node("A").unwrap().title, "A\nBalance: 10.0000 ETH");
}

#[test]
fn test_file_sources_and_exports() {
    let mut txs = tempfile::NamedTempFile::new().unwrap();
    write!(
        txs,
        r#"[{{"from": "A", "to": "B", "value": 1.0}},
            {{"from": "A", "to": "B", "value": "2.0"}},
            {{"from": "B", "to": "C", "value": 0.1}},
            {{"from": "C", "to": "", "value": "0x0"}}]"#
    )
    .unwrap();

    let records = JsonTransferFile::new(txs.path()).fetch_transfers().unwrap();
    let run = analysis()
        .run(&records, &CsvBalanceFile::default())
        .unwrap();
    assert_eq!(run.graph.node_count(), 4);
    assert!(run.graph.contains_account("contract_creation"));

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("artifacts/anomalies.csv");
    let json_path = dir.path().join("artifacts/graph.json");
    write_anomalies_csv(&csv_path, &run.anomalies).unwrap();
    write_graph_json(&json_path, &run.view, &run.summary).unwrap();

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 5);

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(document["summary"]["nodes"], 4);
    assert_eq!(document["graph"]["nodes"].as_array().unwrap().len(), 2);
}

#[test]
fn test_negative_value_rejects_the_batch() {
    let mut records = worked_example();
    records.push(TransferRecord::new("C", Some("A"), -0.5));

    let err = analysis()
        .run(&records, &CsvBalanceFile::default())
        .unwrap_err();
    assert!(err.is_validation());
}

pub mod anomaly;
pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod ledger;
pub mod pipeline;
pub mod provider;
pub mod view;

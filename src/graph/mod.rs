pub mod builder;
pub mod cluster;
pub mod filter;

pub use builder::{build_graph, EdgeRef, EdgeStats, TransferGraph};
pub use cluster::{modularity, ClusterMap, GraphPartitioner, LouvainPartitioner, UndirectedGraph};
pub use filter::filter_edges;

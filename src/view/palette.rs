use std::collections::{BTreeSet, HashMap};

use crate::graph::ClusterMap;

/// Fill colour for accounts flagged by the anomaly detector.
pub const ANOMALY_COLOR: &str = "#ff5c57";

/// Fill colour for accounts with no cluster assignment.
pub const UNCLUSTERED_COLOR: &str = "#cccccc";

/// Categorical 20-colour palette (matplotlib "tab20"). Contains no
/// [`ANOMALY_COLOR`], so cluster colours never read as flags.
const TAB20: [[u8; 3]; 20] = [
    [0x1f, 0x77, 0xb4],
    [0xae, 0xc7, 0xe8],
    [0xff, 0x7f, 0x0e],
    [0xff, 0xbb, 0x78],
    [0x2c, 0xa0, 0x2c],
    [0x98, 0xdf, 0x8a],
    [0xd6, 0x27, 0x28],
    [0xff, 0x98, 0x96],
    [0x94, 0x67, 0xbd],
    [0xc5, 0xb0, 0xd5],
    [0x8c, 0x56, 0x4b],
    [0xc4, 0x9c, 0x94],
    [0xe3, 0x77, 0xc2],
    [0xf7, 0xb6, 0xd2],
    [0x7f, 0x7f, 0x7f],
    [0xc7, 0xc7, 0xc7],
    [0xbc, 0xbd, 0x22],
    [0xdb, 0xdb, 0x8d],
    [0x17, 0xbe, 0xcf],
    [0x9e, 0xda, 0xe5],
];

pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{}", hex::encode(rgb))
}

/// Assign a palette colour to every cluster id, in ascending id order.
///
/// The palette wraps once clusters outnumber it.
pub fn cluster_colors(clusters: &ClusterMap) -> HashMap<usize, String> {
    let ids: BTreeSet<usize> = clusters.values().copied().collect();

    ids.into_iter()
        .enumerate()
        .map(|(i, id)| (id, rgb_to_hex(TAB20[i % TAB20.len()])))
        .collect()
}

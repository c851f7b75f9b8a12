//! Seams to the external data provider.
//!
//! The analytics core only ever sees a complete batch of transfers and a
//! balance map; fetching, batching and retries live behind these traits.

pub mod file;

use std::collections::HashMap;

use crate::ledger::TransferRecord;

pub use file::{CsvBalanceFile, JsonTransferFile};

/// Supplies the full set of transfer records for one analysis run.
pub trait TransferSource: Send + Sync {
    fn fetch_transfers(&self) -> eyre::Result<Vec<TransferRecord>>;
}

/// Supplies current balances for a set of accounts.
///
/// Lookups never fail per account: unresolved accounts come back as zero.
/// Keys in the returned map are lowercased.
pub trait BalanceSource: Send + Sync {
    fn balances(&self, accounts: &[String]) -> HashMap<String, f64>;
}

/// In-memory balances, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticBalances {
    by_account: HashMap<String, f64>,
}

impl StaticBalances {
    pub fn new(balances: HashMap<String, f64>) -> Self {
        let by_account = balances
            .into_iter()
            .map(|(account, balance)| (account.to_lowercase(), balance))
            .collect();
        Self { by_account }
    }

    pub fn len(&self) -> usize {
        self.by_account.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_account.is_empty()
    }
}

impl BalanceSource for StaticBalances {
    fn balances(&self, accounts: &[String]) -> HashMap<String, f64> {
        lookup_or_zero(&self.by_account, accounts)
    }
}

/// Resolve each account against `known`, defaulting misses to zero.
pub(crate) fn lookup_or_zero(known: &HashMap<String, f64>, accounts: &[String]) -> HashMap<String, f64> {
    let mut misses = 0usize;
    let resolved = accounts
        .iter()
        .map(|account| {
            let key = account.to_lowercase();
            let balance = known.get(&key).copied().unwrap_or_else(|| {
                misses += 1;
                0.0
            });
            (key, balance)
        })
        .collect();

    if misses > 0 {
        tracing::debug!(misses, requested = accounts.len(), "Balance lookups defaulted to zero");
    }
    resolved
}

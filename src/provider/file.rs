use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use crate::ledger::TransferRecord;

use super::{lookup_or_zero, BalanceSource, TransferSource};

/// Transfer records stored as a JSON array (the provider's `txs.json` dump).
#[derive(Debug, Clone)]
pub struct JsonTransferFile {
    path: PathBuf,
}

impl JsonTransferFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TransferSource for JsonTransferFile {
    fn fetch_transfers(&self) -> eyre::Result<Vec<TransferRecord>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            eyre::eyre!("Failed to read transfers file '{}': {}", self.path.display(), e)
        })?;
        let records: Vec<TransferRecord> = serde_json::from_str(&content).map_err(|e| {
            eyre::eyre!("Failed to parse transfers file '{}': {}", self.path.display(), e)
        })?;

        tracing::info!(
            records = records.len(),
            path = %self.path.display(),
            "Loaded transfer records"
        );
        Ok(records)
    }
}

/// Balances stored as `account,balance` CSV rows.
///
/// Rows with an empty account or an unparseable balance are skipped, which
/// leaves those accounts at the zero fallback.
#[derive(Debug, Clone, Default)]
pub struct CsvBalanceFile {
    by_account: HashMap<String, f64>,
}

impl CsvBalanceFile {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| eyre::eyre!("Failed to open balances CSV '{}': {}", path, e))?;
        let source = Self::from_reader(file)?;
        tracing::info!(accounts = source.by_account.len(), path, "Loaded balances");
        Ok(source)
    }

    pub fn from_reader<R: Read>(reader: R) -> eyre::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut by_account = HashMap::new();
        for result in reader.records() {
            let record = result?;
            let account = record.get(0).unwrap_or("");
            let raw_balance = record.get(1).unwrap_or("");

            if account.is_empty() {
                continue;
            }
            match raw_balance.parse::<f64>() {
                Ok(balance) => {
                    by_account.insert(account.to_lowercase(), balance);
                }
                Err(_) => {
                    tracing::warn!(account, raw_balance, "Unparseable balance, skipping row");
                }
            }
        }

        Ok(Self { by_account })
    }

    pub fn len(&self) -> usize {
        self.by_account.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_account.is_empty()
    }
}

impl BalanceSource for CsvBalanceFile {
    fn balances(&self, accounts: &[String]) -> HashMap<String, f64> {
        lookup_or_zero(&self.by_account, accounts)
    }
}

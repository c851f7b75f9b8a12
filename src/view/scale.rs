use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Lowercased account id → node size.
pub type SizeMap = HashMap<String, f64>;

/// Target range for node sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min_size: f64,
    pub max_size: f64,
}

impl Default for SizeBounds {
    fn default() -> Self {
        Self {
            min_size: 50.0,
            max_size: 500.0,
        }
    }
}

impl SizeBounds {
    pub fn new(min_size: f64, max_size: f64) -> Result<Self, AnalyticsError> {
        let bounds = Self { min_size, max_size };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.min_size.is_finite() || !self.max_size.is_finite() {
            return Err(AnalyticsError::InvalidParameter(
                "size bounds must be finite".to_string(),
            ));
        }
        if self.min_size >= self.max_size {
            return Err(AnalyticsError::InvalidParameter(format!(
                "min_size ({}) must be below max_size ({})",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_size + self.max_size) / 2.0
    }
}

/// Map balances to sizes: `ln(1 + balance)`, then a linear rescale into `bounds`.
///
/// When every balance compresses to the same value (all zero, all equal, or a
/// single account) every account gets the midpoint of the range.
pub fn scale_sizes(balances: &HashMap<String, f64>, bounds: SizeBounds) -> SizeMap {
    let mut compressed: HashMap<String, f64> = HashMap::with_capacity(balances.len());
    for (account, &balance) in balances {
        let balance = if balance.is_finite() && balance >= 0.0 {
            balance
        } else {
            tracing::warn!(%account, balance, "Unusable balance, treating as zero");
            0.0
        };
        let value = balance.ln_1p();
        compressed
            .entry(account.to_lowercase())
            .and_modify(|existing| *existing = existing.max(value))
            .or_insert(value);
    }

    let lo = compressed.values().copied().fold(f64::INFINITY, f64::min);
    let hi = compressed.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    let range = bounds.max_size - bounds.min_size;

    compressed
        .into_iter()
        .map(|(account, value)| {
            let size = if span > 0.0 {
                let scaled = (value - lo) / span * range + bounds.min_size;
                scaled.clamp(bounds.min_size, bounds.max_size)
            } else {
                bounds.midpoint()
            };
            (account, size)
        })
        .collect()
}

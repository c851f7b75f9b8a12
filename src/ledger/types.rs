use serde::{Deserialize, Deserializer, Serialize};

/// Reserved account id that receives transfers with no destination
/// (contract deployments).
pub const CONTRACT_CREATION: &str = "contract_creation";

const WEI_PER_ETH: f64 = 1e18;

/// A single value transfer between two accounts, as handed over by the data provider.
///
/// `value` is already in display units (ETH). Unparseable values are kept as NaN so
/// the graph builder can reject them with the offending record index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "unparsed_value", deserialize_with = "deserialize_value")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl TransferRecord {
    pub fn new(from: impl Into<String>, to: Option<&str>, value: f64) -> Self {
        Self {
            from: Some(from.into()),
            to: to.map(str::to_string),
            value,
            hash: None,
        }
    }

    /// Destination account, with the contract-creation sentinel substituted for
    /// a missing or empty `to`.
    pub fn destination(&self) -> &str {
        match self.to.as_deref() {
            Some(to) if !to.is_empty() => to,
            _ => CONTRACT_CREATION,
        }
    }

    /// Sender account, or `None` when the field is absent or empty.
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().filter(|from| !from.is_empty())
    }
}

fn unparsed_value() -> f64 {
    f64::NAN
}

/// Accepts a JSON number, a decimal string, or a `0x`-prefixed wei amount.
fn deserialize_value<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        serde_json::Value::String(s) => parse_value_str(&s),
        _ => f64::NAN,
    })
}

/// Parse a textual transfer value. Hex strings are wei and are converted to ETH.
pub fn parse_value_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if let Some(hex_digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex_digits.is_empty() {
            return 0.0;
        }
        return u128::from_str_radix(hex_digits, 16)
            .map(|wei| wei as f64 / WEI_PER_ETH)
            .unwrap_or(f64::NAN);
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

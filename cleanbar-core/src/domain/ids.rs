use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 content hash of a serialized value, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 12 hex characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize a ticker to `BASE-QUOTE` form, defaulting the quote to USD.
///
/// `"btc"` becomes `"BTC-USD"`, `" eth-eur "` becomes `"ETH-EUR"`.
pub fn normalize_symbol(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() || upper.contains('-') {
        upper
    } else {
        format!("{upper}-USD")
    }
}

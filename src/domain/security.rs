use serde::{Deserialize, Serialize};
use std::fmt;

/// A market venue code, e.g. "NSDQ", "NYSE".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketCode(pub String);

impl fmt::Display for MarketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO-ish country code paired with a security's primary listing market.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CountryCode(pub String);

/// A settlement currency identifier, e.g. "USD".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurrencyId(pub String);

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An order-execution destination, e.g. a specific exchange or dark pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Destination(pub String);

/// A traded instrument identified by symbol, primary market and listing country.
///
/// Equality and ordering derive from all three fields, matching the source
/// system's `Security` key used throughout the registry and accounting layers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Security {
    pub symbol: String,
    pub market: MarketCode,
    pub country: CountryCode,
}

impl Security {
    pub fn new(symbol: impl Into<String>, market: impl Into<String>, country: impl Into<String>) -> Self {
        Security {
            symbol: symbol.into(),
            market: MarketCode(market.into()),
            country: CountryCode(country.into()),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.market)
    }
}

/// Static reference data about a security, registered out-of-band of the
/// real-time market-data stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityInfo {
    pub security: Security,
    pub name: String,
    pub sector: String,
    pub board_lot: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalWidth(pub u32);

//! Typed configuration shape, deserialized via `serde`/`toml`. Loading from
//! disk and environment overlay are a collaborator's job; this module only
//! defines the shape and a `from_toml_str` constructor for tests and the
//! backtester harness.

use crate::domain::{CountryCode, MarketCode, Money};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSourceDefinition {
    pub primary_market: MarketCode,
    pub disseminating_market: MarketCode,
    pub country: CountryCode,
    pub mpid: String,
    pub is_primary_mpid: bool,
    pub long_form: bool,
    pub time_and_sale_feed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitlementDefaults {
    /// Account names granted every market-data type on every configured
    /// source, for bootstrapping a test or demo environment.
    pub unrestricted_accounts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDefaults {
    pub opposing_order_timeout_seconds: i64,
    pub opposing_order_offset: Money,
    pub restriction_window_start_seconds: i64,
    pub restriction_window_end_seconds: i64,
}

impl ComplianceDefaults {
    pub fn opposing_order_timeout(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.opposing_order_timeout_seconds)
    }

    pub fn restriction_window_start(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.restriction_window_start_seconds)
    }

    pub fn restriction_window_end(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.restriction_window_end_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktesterRunConfig {
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    pub replay_page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub feed_sources: Vec<FeedSourceDefinition>,
    #[serde(default)]
    pub entitlement_defaults: EntitlementDefaults,
    pub compliance_defaults: ComplianceDefaults,
    pub backtester: Option<BacktesterRunConfig>,
}

impl CoreConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError { message: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let text = r#"
            [[feed_sources]]
            primary_market = "NSDQ"
            disseminating_market = "NSDQ"
            country = "US"
            mpid = "NSDQ"
            is_primary_mpid = true
            long_form = false
            time_and_sale_feed = true

            [compliance_defaults]
            opposing_order_timeout_seconds = 5
            opposing_order_offset = { units = 0 }
            restriction_window_start_seconds = 0
            restriction_window_end_seconds = 0
        "#;
        let config = CoreConfig::from_toml_str(text).unwrap();
        assert_eq!(config.feed_sources.len(), 1);
        assert_eq!(config.feed_sources[0].mpid, "NSDQ");
        assert!(config.backtester.is_none());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(CoreConfig::from_toml_str("not valid toml {{{").is_err());
    }
}

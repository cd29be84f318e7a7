//! Per-session entitlement gating, applied to book-quote (and other
//! restricted) subscriptions as an additional predicate.

use crate::domain::{AccountId, MarketCode};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MarketDataType: u32 {
        const BBO             = 0b00001;
        const MARKET_QUOTE    = 0b00010;
        const BOOK_QUOTE      = 0b00100;
        const TIME_AND_SALE   = 0b01000;
        const ORDER_IMBALANCE = 0b10000;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntitlementKey {
    pub market: MarketCode,
    pub source: String,
}

/// Maps a directory entry (an account or a group an account belongs to) to
/// the data types it grants for each (market, source) pair.
#[derive(Debug, Default, Clone)]
pub struct EntitlementDatabase {
    grants: HashMap<AccountId, HashMap<EntitlementKey, MarketDataType>>,
}

impl EntitlementDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, entry: AccountId, market: MarketCode, source: impl Into<String>, types: MarketDataType) {
        self.grants
            .entry(entry)
            .or_default()
            .entry(EntitlementKey { market, source: source.into() })
            .and_modify(|existing| *existing |= types)
            .or_insert(types);
    }

    /// Unions the entitlements of an account and every group it belongs to
    /// into the session's effective entitlement set.
    pub fn resolve(&self, account: &AccountId, groups: &[AccountId]) -> EntitlementSet {
        let mut merged: HashMap<EntitlementKey, MarketDataType> = HashMap::new();
        for entry in std::iter::once(account).chain(groups.iter()) {
            if let Some(grants) = self.grants.get(entry) {
                for (key, types) in grants {
                    merged.entry(key.clone()).and_modify(|existing| *existing |= *types).or_insert(*types);
                }
            }
        }
        EntitlementSet { grants: merged }
    }
}

/// The effective, resolved entitlement set for one client session.
#[derive(Debug, Clone, Default)]
pub struct EntitlementSet {
    grants: HashMap<EntitlementKey, MarketDataType>,
}

impl EntitlementSet {
    pub fn is_entitled(&self, market: &MarketCode, source: &str, data_type: MarketDataType) -> bool {
        self.grants
            .get(&EntitlementKey { market: market.clone(), source: source.to_string() })
            .is_some_and(|granted| granted.contains(data_type))
    }
}

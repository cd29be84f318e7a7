//! Fixed-record feed message parsing, grounded in the source system's
//! `ChiaMarketDataFeedClient` primitives (`ParseChar`/`ParseNumeric`/
//! `ParseAlphanumeric`/`ParseSide`/`ParsePrice`).

use super::error::{FeedError, FeedResult};
use crate::domain::{CountryCode, MarketCode, Money, Security, Side, TimeAndSale};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Static configuration for one feed source: which market it disseminates
/// for, the participant id quotes are attributed to, and the record-width
/// convention in use.
#[derive(Debug, Clone)]
pub struct FeedSourceConfig {
    pub primary_market: MarketCode,
    pub disseminating_market: MarketCode,
    pub country: CountryCode,
    pub mpid: String,
    pub is_primary_mpid: bool,
    pub long_form: bool,
    /// Whether execution messages on this feed should be imputed into
    /// time-and-sale prints (true for the trade-tape feed, false for a
    /// pure quote feed).
    pub time_and_sale_feed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    AddOrder {
        security: Security,
        market: MarketCode,
        mpid: String,
        is_primary_mpid: bool,
        order_ref: String,
        side: Side,
        price: Money,
        size: i64,
        timestamp: DateTime<Utc>,
    },
    OffsetOrderSize {
        order_ref: String,
        delta: i64,
        timestamp: DateTime<Utc>,
    },
    DeleteOrder {
        order_ref: String,
        timestamp: DateTime<Utc>,
    },
    TimeAndSale {
        security: Security,
        print: TimeAndSale,
    },
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Cursor { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> FeedResult<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(FeedError::Truncated { expected: n, actual: self.buf.len() - self.pos });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn parse_char(&mut self) -> FeedResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn parse_numeric(&mut self, width: usize) -> FeedResult<i64> {
        let field = self.take(width)?;
        let mut value: i64 = 0;
        let mut started = false;
        for &b in field {
            if b == b' ' && !started {
                continue;
            }
            if !b.is_ascii_digit() {
                return Err(FeedError::InvalidNumeric { field: "numeric" });
            }
            started = true;
            value = value * 10 + (b - b'0') as i64;
        }
        Ok(value)
    }

    fn parse_alphanumeric(&mut self, width: usize) -> FeedResult<String> {
        let field = self.take(width)?;
        let end = field.iter().position(|&b| b == b' ').unwrap_or(field.len());
        Ok(String::from_utf8_lossy(&field[..end]).trim().to_string())
    }

    fn parse_side(&mut self) -> FeedResult<Side> {
        match self.parse_char()? {
            b'B' => Ok(Side::Bid),
            b'S' => Ok(Side::Ask),
            _ => Ok(Side::None),
        }
    }

    fn parse_price(&mut self, long_form: bool) -> FeedResult<Money> {
        let (width, decimals) = if long_form { (19, 7) } else { (10, 4) };
        let raw = self.parse_numeric(width)?;
        Ok(Money::from_scaled(raw as i128, decimals))
    }
}

/// Stateful decoder for one feed source: tracks order-ref to (security,
/// price) so execution messages can be imputed into time-and-sale prints.
pub struct FeedCodec {
    config: FeedSourceConfig,
    order_index: HashMap<String, (Security, Money)>,
}

impl FeedCodec {
    pub fn new(config: FeedSourceConfig) -> Self {
        FeedCodec { config, order_index: HashMap::new() }
    }

    fn shares_width(&self, long: bool) -> usize {
        if long { 10 } else { 6 }
    }

    pub fn decode(&mut self, msg_type: u8, timestamp: DateTime<Utc>, data: &[u8]) -> FeedResult<Vec<FeedEvent>> {
        match msg_type {
            b'A' => self.decode_add(false, timestamp, data),
            b'a' => self.decode_add(true, timestamp, data),
            b'E' => self.decode_execute(false, timestamp, data),
            b'e' => self.decode_execute(true, timestamp, data),
            b'X' | b'x' => self.decode_cancel(timestamp, data),
            b'P' | b'p' | b'M' | b'm' => self.decode_trade(matches!(msg_type, b'M' | b'm'), timestamp, data),
            other => Err(FeedError::UnknownMessageType(other)),
        }
    }

    fn decode_add(&mut self, long: bool, timestamp: DateTime<Utc>, data: &[u8]) -> FeedResult<Vec<FeedEvent>> {
        let mut c = Cursor::new(data);
        let order_ref = c.parse_alphanumeric(9)?;
        let side = c.parse_side()?;
        let shares = c.parse_numeric(self.shares_width(long))?;
        let symbol = c.parse_alphanumeric(6)?;
        let price = c.parse_price(long)?;
        let display = c.parse_char()?;
        if display != b'Y' {
            return Ok(vec![]);
        }
        let security = Security {
            symbol,
            market: self.config.primary_market.clone(),
            country: self.config.country.clone(),
        };
        if self.config.time_and_sale_feed {
            self.order_index.insert(order_ref.clone(), (security.clone(), price));
        }
        Ok(vec![FeedEvent::AddOrder {
            security,
            market: self.config.disseminating_market.clone(),
            mpid: self.config.mpid.clone(),
            is_primary_mpid: self.config.is_primary_mpid,
            order_ref,
            side,
            price,
            size: shares,
            timestamp,
        }])
    }

    fn decode_execute(&mut self, long: bool, timestamp: DateTime<Utc>, data: &[u8]) -> FeedResult<Vec<FeedEvent>> {
        let mut c = Cursor::new(data);
        let order_ref = c.parse_alphanumeric(9)?;
        let shares = c.parse_numeric(self.shares_width(long))?;
        let _trade_ref = c.parse_alphanumeric(9)?;
        let _contra_ref = c.parse_alphanumeric(9)?;
        let mut events = vec![FeedEvent::OffsetOrderSize { order_ref: order_ref.clone(), delta: -shares, timestamp }];
        if self.config.time_and_sale_feed {
            if let Some((security, price)) = self.order_index.get(&order_ref).cloned() {
                events.push(FeedEvent::TimeAndSale {
                    security,
                    print: TimeAndSale {
                        timestamp,
                        price,
                        size: shares,
                        condition: "@".to_string(),
                        market_center: self.config.disseminating_market.clone(),
                    },
                });
            }
        }
        Ok(events)
    }

    fn decode_cancel(&mut self, timestamp: DateTime<Utc>, data: &[u8]) -> FeedResult<Vec<FeedEvent>> {
        let mut c = Cursor::new(data);
        let order_ref = c.parse_alphanumeric(9)?;
        Ok(vec![FeedEvent::DeleteOrder { order_ref, timestamp }])
    }

    fn decode_trade(&mut self, long: bool, timestamp: DateTime<Utc>, data: &[u8]) -> FeedResult<Vec<FeedEvent>> {
        let mut c = Cursor::new(data);
        let _order_ref = c.parse_alphanumeric(9)?;
        let _side = c.parse_side()?;
        let shares = c.parse_numeric(self.shares_width(long))?;
        let symbol = c.parse_alphanumeric(6)?;
        let price = c.parse_price(long)?;
        let _trade_ref = c.parse_alphanumeric(9)?;
        let _contra_ref = c.parse_alphanumeric(9)?;
        let _trade_type = c.parse_char()?;
        let security = Security {
            symbol,
            market: self.config.primary_market.clone(),
            country: self.config.country.clone(),
        };
        Ok(vec![FeedEvent::TimeAndSale {
            security,
            print: TimeAndSale {
                timestamp,
                price,
                size: shares,
                condition: "@".to_string(),
                market_center: self.config.disseminating_market.clone(),
            },
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FeedSourceConfig {
        FeedSourceConfig {
            primary_market: MarketCode("NSDQ".into()),
            disseminating_market: MarketCode("NSDQ".into()),
            country: CountryCode("US".into()),
            mpid: "NSDQ".into(),
            is_primary_mpid: true,
            long_form: false,
            time_and_sale_feed: true,
        }
    }

    #[test]
    fn add_order_then_execute_emits_time_and_sale() {
        let mut codec = FeedCodec::new(config());
        let ts = Utc::now();
        let add = b"000000001B000100TEST  \x30\x30\x30\x30\x30\x30\x31\x35\x30\x30Y";
        let events = codec.decode(b'A', ts, add).expect("add parses");
        assert_eq!(events.len(), 1);
        match &events[0] {
            FeedEvent::AddOrder { side, size, price, .. } => {
                assert_eq!(*side, Side::Bid);
                assert_eq!(*size, 100);
                assert_eq!(*price, Money::from_scaled(1500, 4));
            }
            other => panic!("unexpected event {other:?}"),
        }

        let exec = b"000000001000100000000001000000002";
        let events = codec.decode(b'E', ts, exec).expect("execute parses");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], FeedEvent::OffsetOrderSize { delta: -100, .. }));
        match &events[1] {
            FeedEvent::TimeAndSale { print, .. } => {
                assert_eq!(print.size, 100);
                assert_eq!(print.condition, "@");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn add_order_without_display_flag_is_dropped() {
        let mut codec = FeedCodec::new(config());
        let add = b"000000002B000100TEST  0000001500N";
        let events = codec.decode(b'A', Utc::now(), add).expect("add parses");
        assert!(events.is_empty());
    }

    #[test]
    fn cancel_emits_delete_order() {
        let mut codec = FeedCodec::new(config());
        let cancel = b"000000001";
        let events = codec.decode(b'X', Utc::now(), cancel).expect("cancel parses");
        match &events[0] {
            FeedEvent::DeleteOrder { order_ref, .. } => assert_eq!(order_ref, "000000001"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_message_type_errors() {
        let mut codec = FeedCodec::new(config());
        let err = codec.decode(b'Z', Utc::now(), b"").unwrap_err();
        assert_eq!(err, FeedError::UnknownMessageType(b'Z'));
    }
}

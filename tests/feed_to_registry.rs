//! Exercises the feed client against a real security registry end to end,
//! rather than the recording mocks each module's own unit tests use.

use std::sync::Arc;
use venue_core::domain::{CountryCode, MarketCode, Money, Security, Side};
use venue_core::feed::{FeedClient, FeedEvent, FeedMessage, FeedSink, FeedSourceConfig};
use venue_core::registry::SecurityRegistry;

struct RegistrySink {
    registry: Arc<SecurityRegistry>,
    security: Security,
}

impl FeedSink for RegistrySink {
    fn dispatch(&self, event: FeedEvent) {
        match event {
            FeedEvent::AddOrder { side, price, size, timestamp, .. } => {
                self.registry.update_book_quote(
                    &self.security,
                    side,
                    price,
                    "NSDQ",
                    true,
                    MarketCode("NSDQ".into()),
                    size,
                    "feed-a",
                    timestamp,
                );
            }
            FeedEvent::OffsetOrderSize { delta, timestamp, .. } => {
                self.registry.update_book_quote(
                    &self.security,
                    Side::Bid,
                    Money::from_scaled(1500, 4),
                    "NSDQ",
                    true,
                    MarketCode("NSDQ".into()),
                    delta,
                    "feed-a",
                    timestamp,
                );
            }
            FeedEvent::TimeAndSale { print, .. } => {
                self.registry.publish_time_and_sale(&self.security, print);
            }
            FeedEvent::DeleteOrder { .. } => {}
        }
    }
}

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

#[tokio::test]
async fn add_then_execute_updates_book_and_publishes_time_and_sale() {
    let registry = Arc::new(SecurityRegistry::new());
    let security = Security::new("TEST", "NSDQ", "US");
    let sink = Arc::new(RegistrySink { registry: registry.clone(), security: security.clone() });

    let client = FeedClient::new();
    let (tx, rx) = tokio::sync::mpsc::channel(8);

    let add = b"000000001B000100TEST  0000001500Y".to_vec();
    tx.send(FeedMessage { msg_type: b'A', timestamp: chrono::Utc::now(), data: add }).await.unwrap();

    let exec = b"000000001000100000000001000000002".to_vec();
    tx.send(FeedMessage { msg_type: b'E', timestamp: chrono::Utc::now(), data: exec }).await.unwrap();
    drop(tx);

    client.run(config(), rx, sink).await.unwrap();

    let snapshot = registry.load_snapshot(&security).expect("security published to");
    assert!(snapshot.bids.is_empty(), "the full 100 shares were executed away");
    let print = snapshot.last_time_and_sale.expect("execution imputed a time-and-sale print");
    assert_eq!(print.price, Money::from_scaled(1500, 4));
    assert_eq!(print.size, 100);
    assert_eq!(print.condition, "@");
}

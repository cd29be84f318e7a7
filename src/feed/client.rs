//! Feed read loop: drains a channel of raw protocol messages, decodes them
//! and dispatches the resulting domain events to a sink (typically the
//! security registry). Mirrors the source system's `Dispatch`/`ReadLoop`.

use super::codec::{FeedCodec, FeedEvent, FeedSourceConfig};
use super::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A single raw message read off the wire transport, timestamped by the
/// transport layer rather than the payload itself.
#[derive(Debug, Clone)]
pub struct FeedMessage {
    pub msg_type: u8,
    pub timestamp: DateTime<Utc>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum OpenState {
    Closed = 0,
    Open = 1,
    Closing = 2,
}

/// Receives decoded feed events; implemented by the security registry in
/// production and by a recording sink in tests.
pub trait FeedSink: Send + Sync {
    fn dispatch(&self, event: FeedEvent);
}

/// Drives a [`FeedCodec`] over a channel of [`FeedMessage`]s until the
/// channel closes or a fatal parse error occurs.
pub struct FeedClient {
    state: AtomicU8,
}

impl Default for FeedClient {
    fn default() -> Self {
        FeedClient { state: AtomicU8::new(OpenState::Closed as u8) }
    }
}

impl FeedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OpenState::Open as u8
    }

    /// Runs the read loop to completion. Returns `Ok(())` on clean stream
    /// end, `Err` on a fatal parse error (the caller is expected to close).
    pub async fn run(
        &self,
        config: FeedSourceConfig,
        mut messages: mpsc::Receiver<FeedMessage>,
        sink: Arc<dyn FeedSink>,
    ) -> FeedResult<()> {
        self.state.store(OpenState::Open as u8, Ordering::Release);
        info!(market = %config.disseminating_market, "feed client opened");
        let mut codec = FeedCodec::new(config);
        let result = self.read_loop(&mut codec, &mut messages, sink.as_ref()).await;
        self.state.store(OpenState::Closed as u8, Ordering::Release);
        match &result {
            Ok(()) => info!("feed client closed cleanly"),
            Err(e) => error!(error = %e, "feed client closed on error"),
        }
        result
    }

    async fn read_loop(
        &self,
        codec: &mut FeedCodec,
        messages: &mut mpsc::Receiver<FeedMessage>,
        sink: &dyn FeedSink,
    ) -> FeedResult<()> {
        loop {
            if self.state.load(Ordering::Acquire) != OpenState::Open as u8 {
                return Ok(());
            }
            let Some(message) = messages.recv().await else {
                return Ok(());
            };
            match codec.decode(message.msg_type, message.timestamp, &message.data) {
                Ok(events) => {
                    for event in events {
                        debug!(?event, "dispatching feed event");
                        sink.dispatch(event);
                    }
                }
                Err(FeedError::StreamEnd) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "feed parse error, closing");
                    return Err(e);
                }
            }
        }
    }

    pub fn close(&self) {
        self.state.store(OpenState::Closing as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CountryCode, MarketCode};
    use std::sync::Mutex;

    struct RecordingSink(Mutex<Vec<FeedEvent>>);

    impl FeedSink for RecordingSink {
        fn dispatch(&self, event: FeedEvent) {
            self.0.lock().unwrap().push(event);
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
            time_and_sale_feed: false,
        }
    }

    #[tokio::test]
    async fn read_loop_ends_cleanly_on_channel_close() {
        let client = FeedClient::new();
        let (tx, rx) = mpsc::channel(8);
        drop(tx);
        let sink = Arc::new(RecordingSink(Mutex::new(vec![])));
        let result = client.run(config(), rx, sink).await;
        assert!(result.is_ok());
        assert!(!client.is_open());
    }

    #[tokio::test]
    async fn dispatches_decoded_events_to_sink() {
        let client = FeedClient::new();
        let (tx, rx) = mpsc::channel(8);
        let sink = Arc::new(RecordingSink(Mutex::new(vec![])));
        let add = b"000000001B000100TEST  0000001500Y".to_vec();
        tx.send(FeedMessage { msg_type: b'A', timestamp: Utc::now(), data: add }).await.unwrap();
        drop(tx);
        client.run(config(), rx, sink.clone()).await.unwrap();
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }
}

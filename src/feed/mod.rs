//! Fixed-record exchange feed parsing and the read loop that drives it.

pub mod client;
pub mod codec;
pub mod error;

pub use client::{FeedClient, FeedMessage, FeedSink};
pub use codec::{FeedCodec, FeedEvent, FeedSourceConfig};
pub use error::{FeedError, FeedResult};

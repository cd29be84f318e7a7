use std::fmt;

/// Errors arising from parsing or dispatching a feed message.
///
/// Mirrors the manual `Display`/`Error` style the crate uses for every
/// subsystem's error type rather than a derive-macro based implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FeedError {
    /// The message buffer was shorter than the field it claims to carry.
    Truncated { expected: usize, actual: usize },
    /// A numeric field contained a non-digit byte.
    InvalidNumeric { field: &'static str },
    /// The leading type byte did not match any recognized message.
    UnknownMessageType(u8),
    /// An execute/cancel message referenced an order-ref this feed never saw.
    UnknownOrderRef(String),
    /// The underlying transport ended before a complete message was read.
    StreamEnd,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Truncated { expected, actual } => {
                write!(f, "truncated feed message: expected {expected} bytes, got {actual}")
            }
            FeedError::InvalidNumeric { field } => write!(f, "invalid numeric field: {field}"),
            FeedError::UnknownMessageType(b) => write!(f, "unknown feed message type: {b:#04x}"),
            FeedError::UnknownOrderRef(r) => write!(f, "unknown order reference: {r}"),
            FeedError::StreamEnd => write!(f, "feed stream ended"),
        }
    }
}

impl std::error::Error for FeedError {}

pub type FeedResult<T> = Result<T, FeedError>;

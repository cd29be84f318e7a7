//! Real-time per-security state: sequencing and merging of BBO, market
//! quotes, book quotes, time-and-sales and order imbalances.

pub mod entry;
pub mod registry;

pub use entry::{BookEntry, SecurityEntry, SecuritySnapshot};
pub use registry::SecurityRegistry;

//! Index price source backed by Redis polling.

pub mod error;
pub mod price_source;

pub use error::{FeedError, FeedResult};
pub use price_source::{IndexTick, RedisPriceSource};

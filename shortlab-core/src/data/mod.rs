//! Market data: the snapshot provider trait and the Bybit implementation.

pub mod bybit;
pub mod provider;

pub use bybit::{BybitProvider, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, MAX_KLINE_LIMIT};
pub use provider::{DataError, MarketDataProvider, DEFAULT_BOOK_DEPTH};

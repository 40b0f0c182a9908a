pub mod client;
pub mod series;

pub use client::{MarketDataClient, MarketDataSource};
pub use series::{DailyBar, SymbolSeries};

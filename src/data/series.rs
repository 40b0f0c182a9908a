use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day's prices and volume for a single instrument.
///
/// Within one symbol's series, dates are unique. The upstream API delivers
/// bars newest-first; [`SymbolSeries::new`] normalizes them to ascending
/// date order before anything is written.
///
/// # Fields
/// * `date`: The calendar date of the bar
/// * `open`, `high`, `low`, `close`: Prices for the day
/// * `volume`: Shares traded during the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// A single symbol's daily series, ordered ascending by date.
///
/// Owned by one ingestion task during a run and immutable once written to
/// storage. Encodes to and decodes from the raw blob wire format: UTF-8
/// CSV with a `date,open,high,low,close,volume` header row.
#[derive(Debug, Clone)]
pub struct SymbolSeries {
    pub symbol: String,
    bars: Vec<DailyBar>,
}

impl SymbolSeries {
    /// Creates a series from bars in any order, normalizing to ascending
    /// date order.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<DailyBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Encodes the series as the raw blob wire format.
    ///
    /// The encoding is deterministic: re-encoding an unchanged series
    /// yields byte-identical output, which is what makes ingestion
    /// overwrites idempotent.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for bar in &self.bars {
            writer.serialize(bar)?;
        }
        writer
            .into_inner()
            .map_err(|e| PipelineError::Storage(e.to_string()))
    }

    /// Decodes a raw blob back into a series.
    ///
    /// # Errors
    /// Returns a `Parse` error when a row is malformed or a field does not
    /// parse as its column's type.
    pub fn from_csv(symbol: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(bytes);
        let mut bars = Vec::new();
        for record in reader.deserialize() {
            let bar: DailyBar = record?;
            bars.push(bar);
        }
        Ok(Self::new(symbol, bars))
    }
}

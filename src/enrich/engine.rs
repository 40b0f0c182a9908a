use crate::data::SymbolSeries;
use crate::error::{PipelineError, Result};
use crate::ingest::raw_blob_key;
use crate::storage::ObjectStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

/// Storage key of the enriched table, under the processed-data prefix.
pub const ENRICHED_TABLE_KEY: &str = "processed/enriched_data.csv";

/// Trailing window width for the rolling close average.
const MOVING_AVG_WINDOW: usize = 7;

/// One row of the enriched multi-symbol table.
///
/// Derived columns are computed per symbol over date-ascending bars;
/// windows never cross symbol boundaries, so the first row of a symbol has
/// no previous close and a one-wide rolling average.
///
/// # Fields
/// * `prev_close`: Previous day's close, `None` on a symbol's first row
/// * `daily_change`: Percent change from `prev_close`, `None` when
///   `prev_close` is absent or zero
/// * `seven_day_avg`: Mean close over the trailing window of up to seven
///   observations; shrinks at the start of a symbol, never `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub prev_close: Option<f64>,
    pub daily_change: Option<f64>,
    #[serde(rename = "7_day_avg")]
    pub seven_day_avg: f64,
}

/// Why a requested symbol contributed no rows to the table.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Terminal artifact of one enrichment run: the full table plus the
/// symbols that were skipped and why. Like ingestion's run summary, this
/// is reported, not persisted; the table itself is what lands in storage.
#[derive(Debug)]
pub struct EnrichmentReport {
    pub table: Vec<EnrichedRow>,
    pub skipped: Vec<SkippedSymbol>,
}

impl EnrichmentReport {
    /// Row counts per symbol, in table order.
    pub fn rows_per_symbol(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for row in &self.table {
            match counts.iter_mut().find(|(symbol, _)| symbol == &row.symbol) {
                Some((_, count)) => *count += 1,
                None => counts.push((row.symbol.clone(), 1)),
            }
        }
        counts
    }
}

/// Rebuilds the enriched table from the raw per-symbol blobs in storage.
///
/// Reads every requested symbol's blob, unions the series into one flat
/// row set ordered by `(date, symbol)`, computes the windowed derived
/// columns per symbol, and overwrites the processed artifact wholesale.
/// There is no incremental update: each run recomputes the full table from
/// whatever blobs currently exist, so the result is deterministic given
/// the same stored inputs. The engine never calls the market-data API;
/// storage is its only input.
pub struct EnrichmentEngine {
    store: Arc<dyn ObjectStore>,
}

impl EnrichmentEngine {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Runs one full enrichment pass over the requested symbols.
    ///
    /// A symbol with no blob, or with a blob that no longer parses, is
    /// skipped with a recorded warning, the same fault isolation rule as
    /// ingestion. Only a storage-level read or write failure aborts the
    /// run, since nothing downstream can succeed without the store.
    ///
    /// # Errors
    /// Returns a `Storage` error when the store itself fails to read or
    /// when the enriched table cannot be written.
    pub async fn enrich(&self, symbols: &[String]) -> Result<EnrichmentReport> {
        let mut table = Vec::new();
        let mut skipped = Vec::new();

        for symbol in symbols {
            let key = raw_blob_key(symbol);
            let bytes = match self.store.get(&key).await? {
                Some(bytes) => bytes,
                None => {
                    let err = PipelineError::MissingBlob(format!("no raw blob at '{}'", key));
                    warn!(symbol = %symbol, error = %err, "symbol skipped");
                    skipped.push(SkippedSymbol {
                        symbol: symbol.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let series = match SymbolSeries::from_csv(symbol.clone(), &bytes) {
                Ok(series) => series,
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "raw blob unreadable; symbol skipped");
                    skipped.push(SkippedSymbol {
                        symbol: symbol.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            if series.is_empty() {
                warn!(symbol = %symbol, "raw blob holds no rows; symbol skipped");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: "raw blob holds no rows".to_string(),
                });
                continue;
            }

            table.extend(enrich_series(&series));
        }

        // Primary ordering of the table. The windows above were computed
        // per symbol, so this flattening cannot change them; dates are
        // unique within a symbol, which makes the order total.
        table.sort_by(|a, b| (a.date, a.symbol.as_str()).cmp(&(b.date, b.symbol.as_str())));

        let report = EnrichmentReport { table, skipped };
        self.write_table(&report.table).await?;

        for (symbol, rows) in report.rows_per_symbol() {
            info!(symbol = %symbol, rows, "symbol enriched");
        }
        info!(
            rows = report.table.len(),
            skipped = report.skipped.len(),
            key = ENRICHED_TABLE_KEY,
            "enriched table written"
        );
        Ok(report)
    }

    async fn write_table(&self, rows: &[EnrichedRow]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        self.store.put(ENRICHED_TABLE_KEY, &bytes).await
    }
}

/// Computes the derived columns for one symbol's date-ascending bars.
fn enrich_series(series: &SymbolSeries) -> Vec<EnrichedRow> {
    let mut rows = Vec::with_capacity(series.len());
    let mut window: VecDeque<f64> = VecDeque::with_capacity(MOVING_AVG_WINDOW);
    let mut prev_close = None;

    for bar in series.bars() {
        window.push_back(bar.close);
        if window.len() > MOVING_AVG_WINDOW {
            window.pop_front();
        }
        let seven_day_avg = window.iter().sum::<f64>() / window.len() as f64;

        let daily_change = match prev_close {
            Some(prev) if prev != 0.0 => Some((bar.close - prev) / prev * 100.0),
            _ => None,
        };

        rows.push(EnrichedRow {
            symbol: series.symbol.clone(),
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            prev_close,
            daily_change,
            seven_day_avg,
        });
        prev_close = Some(bar.close);
    }

    rows
}

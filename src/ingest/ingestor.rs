use crate::data::{MarketDataSource, SymbolSeries};
use crate::error::Result;
use crate::ingest::outcome::{IngestStatus, IngestionOutcome};
use crate::storage::ObjectStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Deterministic blob key for a symbol's raw daily series.
pub fn raw_blob_key(symbol: &str) -> String {
    format!("{}_data.csv", symbol)
}

/// Drives one symbol through fetch → encode → durable write.
///
/// Every failure kind converges to an [`IngestionOutcome`] of the matching
/// status instead of propagating, which is what isolates one symbol's
/// failure from its siblings in a run. On success exactly one blob is
/// written, as an overwrite under the symbol's deterministic key; on any
/// failure nothing is written at all.
///
/// Holds shared handles to the market-data source and the object store;
/// both are long-lived and owned by the scheduler that drives this.
pub struct SymbolIngestor {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn ObjectStore>,
}

impl SymbolIngestor {
    pub fn new(source: Arc<dyn MarketDataSource>, store: Arc<dyn ObjectStore>) -> Self {
        Self { source, store }
    }

    /// Ingests one symbol and reports how it went.
    ///
    /// Re-running for an unchanged upstream response is idempotent: the
    /// series encodes deterministically and the write replaces the prior
    /// blob byte-for-byte, never appends.
    pub async fn ingest(&self, symbol: &str) -> IngestionOutcome {
        let series = match self.source.fetch_daily(symbol).await {
            Ok(series) => series,
            Err(err) => {
                warn!(symbol, error = %err, "fetch failed; nothing written");
                return IngestionOutcome {
                    symbol: symbol.to_string(),
                    status: IngestStatus::from(&err),
                    detail: err.to_string(),
                    bar_count: 0,
                };
            }
        };

        match self.write_series(&series).await {
            Ok(()) => {
                info!(symbol, bars = series.len(), "series written");
                IngestionOutcome {
                    symbol: symbol.to_string(),
                    status: IngestStatus::Success,
                    detail: format!("wrote {} bars", series.len()),
                    bar_count: series.len(),
                }
            }
            Err(err) => {
                warn!(symbol, error = %err, "write failed");
                IngestionOutcome {
                    symbol: symbol.to_string(),
                    status: IngestStatus::from(&err),
                    detail: err.to_string(),
                    bar_count: 0,
                }
            }
        }
    }

    async fn write_series(&self, series: &SymbolSeries) -> Result<()> {
        let bytes = series.to_csv()?;
        self.store.put(&raw_blob_key(&series.symbol), &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DailyBar;
    use crate::error::PipelineError;
    use crate::storage::LocalObjectStore;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// What the fake source should do for a given symbol.
    enum Script {
        Bars(Vec<DailyBar>),
        Network,
        NoData,
    }

    struct ScriptedSource {
        scripts: HashMap<String, Script>,
    }

    #[async_trait]
    impl MarketDataSource for ScriptedSource {
        async fn fetch_daily(&self, symbol: &str) -> crate::error::Result<SymbolSeries> {
            match self.scripts.get(symbol) {
                Some(Script::Bars(bars)) => Ok(SymbolSeries::new(symbol, bars.clone())),
                Some(Script::Network) => Err(PipelineError::Network(format!(
                    "request for {} failed: connection refused",
                    symbol
                ))),
                Some(Script::NoData) => {
                    Err(PipelineError::NoData(format!("{}: daily series is empty", symbol)))
                }
                None => panic!("no script for {}", symbol),
            }
        }
    }

    fn bar(date: &str, close: f64) -> DailyBar {
        DailyBar {
            date: date.parse().unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    async fn ingestor_with(
        scripts: HashMap<String, Script>,
        dir: &tempfile::TempDir,
    ) -> (SymbolIngestor, Arc<LocalObjectStore>) {
        let store = Arc::new(LocalObjectStore::open(dir.path(), "market-data").await.unwrap());
        let source = Arc::new(ScriptedSource { scripts });
        (SymbolIngestor::new(source, store.clone()), store)
    }

    #[tokio::test]
    async fn test_success_writes_one_blob() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = HashMap::from([(
            "AAPL".to_string(),
            Script::Bars(vec![bar("2024-11-20", 100.0), bar("2024-11-21", 102.0)]),
        )]);
        let (ingestor, store) = ingestor_with(scripts, &dir).await;

        let outcome = ingestor.ingest("AAPL").await;
        assert_eq!(outcome.status, IngestStatus::Success);
        assert_eq!(outcome.bar_count, 2);

        let keys = store.list("").await.unwrap();
        assert_eq!(keys, vec!["AAPL_data.csv"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = HashMap::from([("TSLA".to_string(), Script::Network)]);
        let (ingestor, store) = ingestor_with(scripts, &dir).await;

        let outcome = ingestor.ingest("TSLA").await;
        assert_eq!(outcome.status, IngestStatus::NetworkError);
        assert_eq!(outcome.bar_count, 0);

        assert!(store.get("TSLA_data.csv").await.unwrap().is_none());
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_data_maps_to_its_own_status() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = HashMap::from([("MNMD".to_string(), Script::NoData)]);
        let (ingestor, store) = ingestor_with(scripts, &dir).await;

        let outcome = ingestor.ingest("MNMD").await;
        assert_eq!(outcome.status, IngestStatus::NoData);
        assert!(store.get("MNMD_data.csv").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = HashMap::from([(
            "WM".to_string(),
            Script::Bars(vec![bar("2024-11-20", 210.0), bar("2024-11-21", 211.5)]),
        )]);
        let (ingestor, store) = ingestor_with(scripts, &dir).await;

        ingestor.ingest("WM").await;
        let first = store.get("WM_data.csv").await.unwrap().unwrap();

        ingestor.ingest("WM").await;
        let second = store.get("WM_data.csv").await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list("").await.unwrap().len(), 1);
    }
}

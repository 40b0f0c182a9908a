use crate::ingest::ingestor::SymbolIngestor;
use crate::ingest::outcome::RunSummary;
use chrono::{DateTime, NaiveTime, Utc};
use std::time::Duration;
use tracing::info;

/// Drives one ingestion run across the configured symbol set.
///
/// Symbols are processed sequentially, each through [`SymbolIngestor`];
/// because every per-symbol path converges to an outcome value, a failure
/// on one symbol cannot prevent processing of the rest. The summary holds
/// exactly one outcome per requested symbol, in request order. Failed
/// symbols are not retried within a run; the next scheduled invocation
/// picks them up again.
///
/// The recurring trigger itself lives in `main`; this type's unit of work
/// is a single run. Two overlapping runs are not internally locked
/// against each other; the trigger is assumed to serialize invocations.
pub struct IngestionScheduler {
    ingestor: SymbolIngestor,
    symbols: Vec<String>,
}

impl IngestionScheduler {
    pub fn new(ingestor: SymbolIngestor, symbols: Vec<String>) -> Self {
        Self { ingestor, symbols }
    }

    /// Processes every configured symbol once and aggregates the outcomes.
    pub async fn run_once(&self) -> RunSummary {
        let started_at = Utc::now();
        info!(symbols = self.symbols.len(), "ingestion run started");

        let mut outcomes = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            outcomes.push(self.ingestor.ingest(symbol).await);
        }

        let summary = RunSummary {
            started_at,
            outcomes,
        };
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            bars = summary.total_bars(),
            "ingestion run finished"
        );
        summary
    }
}

/// Time to sleep from `now` until the next daily run at `run_at` (UTC).
///
/// If today's run time has already passed (or is exactly now), the next
/// occurrence is tomorrow.
pub fn duration_until_next(now: DateTime<Utc>, run_at: NaiveTime) -> Duration {
    let today_run = now.date_naive().and_time(run_at).and_utc();
    let next = if today_run > now {
        today_run
    } else {
        today_run + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

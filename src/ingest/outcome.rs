use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Terminal status of one symbol's ingestion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IngestStatus {
    Success,
    NoData,
    NetworkError,
    ParseError,
    StorageError,
}

impl IngestStatus {
    pub fn is_success(self) -> bool {
        matches!(self, IngestStatus::Success)
    }
}

impl From<&PipelineError> for IngestStatus {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::Network(_) => IngestStatus::NetworkError,
            PipelineError::Parse(_) => IngestStatus::ParseError,
            PipelineError::NoData(_) => IngestStatus::NoData,
            PipelineError::Storage(_)
            | PipelineError::MissingBlob(_)
            | PipelineError::Config(_) => IngestStatus::StorageError,
        }
    }
}

/// One symbol's result for one run: a first-class value rather than a log
/// side channel, so success and failure reporting is testable.
///
/// # Fields
/// * `symbol`: The ticker this outcome describes
/// * `status`: How the attempt ended
/// * `detail`: Human-readable context (error text or bar count)
/// * `bar_count`: Bars written on success, zero otherwise
#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutcome {
    pub symbol: String,
    pub status: IngestStatus,
    pub detail: String,
    pub bar_count: usize,
}

/// Aggregated outcomes of one ingestion run: exactly one entry per
/// requested symbol, in request order. Reported, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<IngestionOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn total_bars(&self) -> usize {
        self.outcomes.iter().map(|o| o.bar_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(symbol: &str, status: IngestStatus, bar_count: usize) -> IngestionOutcome {
        IngestionOutcome {
            symbol: symbol.to_string(),
            status,
            detail: String::new(),
            bar_count,
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary {
            started_at: Utc::now(),
            outcomes: vec![
                outcome("AAPL", IngestStatus::Success, 3),
                outcome("TSLA", IngestStatus::NetworkError, 0),
                outcome("WM", IngestStatus::Success, 5),
            ],
        };

        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total_bars(), 8);
    }

    #[test]
    fn test_status_maps_from_error_kind() {
        let network = PipelineError::Network("timed out".to_string());
        let parse = PipelineError::Parse("bad field".to_string());
        let no_data = PipelineError::NoData("rate limited".to_string());
        let storage = PipelineError::Storage("disk full".to_string());

        assert_eq!(IngestStatus::from(&network), IngestStatus::NetworkError);
        assert_eq!(IngestStatus::from(&parse), IngestStatus::ParseError);
        assert_eq!(IngestStatus::from(&no_data), IngestStatus::NoData);
        assert_eq!(IngestStatus::from(&storage), IngestStatus::StorageError);
    }
}

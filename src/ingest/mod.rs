pub mod ingestor;
pub mod outcome;
pub mod scheduler;

pub use ingestor::{raw_blob_key, SymbolIngestor};
pub use outcome::{IngestStatus, IngestionOutcome, RunSummary};
pub use scheduler::{duration_until_next, IngestionScheduler};

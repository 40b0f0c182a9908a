pub mod engine;

pub use engine::{EnrichedRow, EnrichmentEngine, EnrichmentReport, ENRICHED_TABLE_KEY};

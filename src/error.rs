use thiserror::Error;

/// Error taxonomy shared by the ingestion and enrichment halves of the
/// pipeline.
///
/// Every per-symbol failure in either half is converted into a recorded
/// outcome or warning rather than terminating a run; the only fatal
/// condition is failing to obtain the storage handle itself (see `main`).
///
/// # Variants
/// * `Network`: transport failure, timeout, or non-success HTTP status
/// * `Parse`: malformed JSON, a missing expected key, or an unparseable
///   numeric/date field
/// * `NoData`: structurally valid response carrying no series, typically
///   rate-limit exhaustion or an empty daily map
/// * `MissingBlob`: enrichment found no raw blob for a requested symbol
/// * `Storage`: a read or write against the object store failed
/// * `Config`: the environment-supplied configuration is unusable
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no data: {0}")]
    NoData(String),

    #[error("missing blob: {0}")]
    MissingBlob(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        // Body-decode failures are parse problems; everything else that
        // reqwest reports (connect, timeout, redirect) is transport.
        if err.is_decode() {
            PipelineError::Parse(err.to_string())
        } else {
            PipelineError::Network(err.to_string())
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Parse(format!("CSV error: {}", err))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

use crate::error::{PipelineError, Result};
use chrono::NaiveTime;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Ticker set ingested when `SYMBOLS` is not set.
pub const DEFAULT_SYMBOLS: &str = "RIVN,COIN,WM,AAPL,BK,TSLA,MNMD";

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const DEFAULT_CONTAINER: &str = "market-data";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the pipeline.
///
/// Built once from the environment in `main` and passed into each component
/// at construction; nothing in the core logic reads the environment or
/// holds hidden global state.
///
/// # Fields
/// * `api_key`: Credential for the upstream market-data API
/// * `api_base_url`: Query endpoint of the upstream API
/// * `symbols`: Ordered set of distinct uppercase tickers to ingest
/// * `storage_root`: Directory the object store lives under
/// * `container`: Container name within the storage root
/// * `run_at`: UTC time-of-day of the scheduled daily run
/// * `run_on_startup`: Whether to run the pipeline once at process start
/// * `request_timeout`: Upper bound on any single network call
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base_url: String,
    pub symbols: Vec<String>,
    pub storage_root: PathBuf,
    pub container: String,
    pub run_at: NaiveTime,
    pub run_on_startup: bool,
    pub request_timeout: Duration,
}

impl Config {
    /// Reads configuration from environment variables.
    ///
    /// `API_KEY` and `STORAGE_ROOT` are required; everything else has a
    /// default. `SYMBOLS` is a comma-separated ticker list, `RUN_AT` is a
    /// `HH:MM` UTC time, `RUN_ON_STARTUP` accepts `1`/`true`.
    ///
    /// # Errors
    /// Returns a `Config` error naming the variable when a required value
    /// is missing or a supplied value does not parse.
    pub fn from_env() -> Result<Self> {
        let api_key = require_var("API_KEY")?;
        let storage_root = PathBuf::from(require_var("STORAGE_ROOT")?);

        let symbols =
            parse_symbols(&env::var("SYMBOLS").unwrap_or_else(|_| DEFAULT_SYMBOLS.to_string()))?;

        let run_at = match env::var("RUN_AT") {
            Ok(raw) => NaiveTime::parse_from_str(&raw, "%H:%M").map_err(|e| {
                PipelineError::Config(format!("RUN_AT '{}' is not a HH:MM time: {}", raw, e))
            })?,
            // Default cadence: once a day at 11:00 UTC.
            Err(_) => NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        };

        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|e| {
                PipelineError::Config(format!(
                    "REQUEST_TIMEOUT_SECS '{}' is not a number: {}",
                    raw, e
                ))
            })?),
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_key,
            api_base_url: env::var("API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            symbols,
            storage_root,
            container: env::var("STORAGE_CONTAINER")
                .unwrap_or_else(|_| DEFAULT_CONTAINER.to_string()),
            run_at,
            run_on_startup: env::var("RUN_ON_STARTUP")
                .map(|raw| matches!(raw.to_lowercase().as_str(), "1" | "true"))
                .unwrap_or(false),
            request_timeout,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| PipelineError::Config(format!("{} must be set", name)))
}

/// Normalizes a comma-separated ticker list: trimmed, uppercased,
/// de-duplicated with the first occurrence's position kept.
fn parse_symbols(raw: &str) -> Result<Vec<String>> {
    let mut symbols: Vec<String> = Vec::new();

    for token in raw.split(',') {
        let symbol = token.trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        if !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(PipelineError::Config(format!(
                "invalid ticker symbol '{}'",
                token.trim()
            )));
        }
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }

    if symbols.is_empty() {
        return Err(PipelineError::Config(
            "SYMBOLS must name at least one ticker".to_string(),
        ));
    }

    Ok(symbols)
}

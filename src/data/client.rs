use crate::config::Config;
use crate::data::series::{DailyBar, SymbolSeries};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

const DAILY_SERIES_KEY: &str = "Time Series (Daily)";

/// Capability to fetch one symbol's validated daily series.
///
/// Implemented by [`MarketDataClient`] against the real API; ingestion is
/// written against this trait so tests drive it with scripted fakes.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_daily(&self, symbol: &str) -> Result<SymbolSeries>;
}

/// Client for the upstream daily time-series endpoint.
///
/// Wraps a single symbol's API call and turns the raw JSON document into a
/// typed, date-ascending [`SymbolSeries`]. One long-lived HTTP client with
/// a request timeout is built at construction and reused for every call.
/// No retry happens at this layer; a failed symbol is simply reported and
/// picked up again on the next scheduled run.
pub struct MarketDataClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl MarketDataClient {
    /// Creates a client from the pipeline configuration.
    ///
    /// # Errors
    /// Returns a `Network` error if the underlying HTTP client cannot be
    /// built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PipelineError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl MarketDataSource for MarketDataClient {
    /// Fetches the daily series for `symbol`.
    ///
    /// # Errors
    /// * `Network`: the transport call fails, times out, or returns a
    ///   non-success status
    /// * `Parse`: the body is not JSON, or the expected daily-series key is
    ///   absent with no rate-limit marker
    /// * `NoData`: the response is valid but carries no bars (rate-limit
    ///   note in place of the series, or an empty series map)
    async fn fetch_daily(&self, symbol: &str) -> Result<SymbolSeries> {
        let url = format!(
            "{}?function=TIME_SERIES_DAILY&symbol={}&apikey={}",
            self.base_url, symbol, self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("request for {} failed: {}", symbol, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Network(format!(
                "request for {} returned status {}",
                symbol, status
            )));
        }

        let document = response.json::<Value>().await.map_err(|e| {
            PipelineError::Parse(format!("response for {} is not valid JSON: {}", symbol, e))
        })?;

        parse_daily_document(symbol, &document)
    }
}

/// Converts an upstream JSON document into a validated series.
///
/// The document maps date strings to objects of numbered OHLCV labels
/// (`"1. open"` through `"5. volume"`); labels are mapped to the canonical
/// bar fields and numeric strings are parsed, so a malformed field becomes
/// a `Parse` error naming the field and date rather than a raw parse
/// panic. Bars come back ascending by date regardless of response order.
pub fn parse_daily_document(symbol: &str, document: &Value) -> Result<SymbolSeries> {
    let series = match document.get(DAILY_SERIES_KEY) {
        Some(series) => series,
        None => {
            // When throttled or out of quota the API substitutes a note for
            // the series map; that is a no-data condition, not a defect in
            // the document.
            for marker in ["Note", "Information"] {
                if let Some(note) = document.get(marker).and_then(Value::as_str) {
                    return Err(PipelineError::NoData(format!("{}: {}", symbol, note)));
                }
            }
            if let Some(message) = document.get("Error Message").and_then(Value::as_str) {
                return Err(PipelineError::Parse(format!(
                    "{}: upstream error: {}",
                    symbol, message
                )));
            }
            return Err(PipelineError::Parse(format!(
                "{}: daily series key missing from response",
                symbol
            )));
        }
    };

    let entries = series.as_object().ok_or_else(|| {
        PipelineError::Parse(format!("{}: daily series is not an object", symbol))
    })?;

    if entries.is_empty() {
        return Err(PipelineError::NoData(format!(
            "{}: daily series is empty",
            symbol
        )));
    }

    let mut bars = Vec::with_capacity(entries.len());
    for (date_str, fields) in entries {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            PipelineError::Parse(format!("{}: invalid date '{}': {}", symbol, date_str, e))
        })?;

        bars.push(DailyBar {
            date,
            open: price_field(symbol, date_str, fields, "1. open")?,
            high: price_field(symbol, date_str, fields, "2. high")?,
            low: price_field(symbol, date_str, fields, "3. low")?,
            close: price_field(symbol, date_str, fields, "4. close")?,
            volume: volume_field(symbol, date_str, fields, "5. volume")?,
        });
    }

    Ok(SymbolSeries::new(symbol, bars))
}

fn raw_field<'a>(symbol: &str, date: &str, fields: &'a Value, label: &str) -> Result<&'a str> {
    fields.get(label).and_then(Value::as_str).ok_or_else(|| {
        PipelineError::Parse(format!("{}: field '{}' missing for {}", symbol, label, date))
    })
}

fn price_field(symbol: &str, date: &str, fields: &Value, label: &str) -> Result<f64> {
    raw_field(symbol, date, fields, label)?.parse().map_err(|e| {
        PipelineError::Parse(format!(
            "{}: field '{}' for {} is not a number: {}",
            symbol, label, date, e
        ))
    })
}

fn volume_field(symbol: &str, date: &str, fields: &Value, label: &str) -> Result<u64> {
    raw_field(symbol, date, fields, label)?.parse().map_err(|e| {
        PipelineError::Parse(format!(
            "{}: field '{}' for {} is not a volume: {}",
            symbol, label, date, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn daily_document() -> Value {
        json!({
            "Meta Data": { "2. Symbol": "AAPL" },
            "Time Series (Daily)": {
                "2024-11-21": {
                    "1. open": "101.50",
                    "2. high": "103.00",
                    "3. low": "100.75",
                    "4. close": "102.00",
                    "5. volume": "4276431"
                },
                "2024-11-20": {
                    "1. open": "99.00",
                    "2. high": "101.25",
                    "3. low": "98.50",
                    "4. close": "100.00",
                    "5. volume": "3981202"
                }
            }
        })
    }

    #[test]
    fn test_parse_maps_labels_and_sorts_ascending() {
        let series = parse_daily_document("AAPL", &daily_document()).unwrap();
        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.len(), 2);

        let first = &series.bars()[0];
        assert_eq!(first.date.to_string(), "2024-11-20");
        assert_eq!(first.open, 99.0);
        assert_eq!(first.close, 100.0);
        assert_eq!(first.volume, 3_981_202);

        assert_eq!(series.bars()[1].date.to_string(), "2024-11-21");
    }

    #[test]
    fn test_missing_series_key_is_parse_error() {
        let document = json!({ "Meta Data": {} });
        let result = parse_daily_document("AAPL", &document);
        assert!(matches!(result, Err(PipelineError::Parse(_))));
    }

    #[test]
    fn test_rate_limit_note_is_no_data() {
        let document = json!({
            "Note": "Thank you for using our API. Our standard API call frequency is 25 requests per day."
        });
        let result = parse_daily_document("AAPL", &document);
        assert!(matches!(result, Err(PipelineError::NoData(_))));
    }

    #[test]
    fn test_empty_series_is_no_data() {
        let document = json!({ "Time Series (Daily)": {} });
        let result = parse_daily_document("AAPL", &document);
        assert!(matches!(result, Err(PipelineError::NoData(_))));
    }

    #[test]
    fn test_malformed_close_is_parse_error() {
        let document = json!({
            "Time Series (Daily)": {
                "2024-11-20": {
                    "1. open": "99.00",
                    "2. high": "101.25",
                    "3. low": "98.50",
                    "4. close": "n/a",
                    "5. volume": "3981202"
                }
            }
        });
        let result = parse_daily_document("AAPL", &document);
        match result {
            Err(PipelineError::Parse(detail)) => {
                assert!(detail.contains("4. close"));
                assert!(detail.contains("2024-11-20"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_symbol_message_is_parse_error() {
        let document = json!({ "Error Message": "Invalid API call." });
        let result = parse_daily_document("XXXX", &document);
        assert!(matches!(result, Err(PipelineError::Parse(_))));
    }
}

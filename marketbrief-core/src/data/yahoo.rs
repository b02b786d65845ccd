//! Yahoo Finance quote provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API. Indices (`^NSEI`),
//! futures (`GC=F`), currency pairs (`USDINR=X`), crypto (`BTC-USD`) and NSE
//! equities (`RELIANCE.NS`) all come through the same endpoint.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; parse failures surface as [`ProviderError::ResponseFormatChanged`].

use super::http::{build_client, check_status};
use super::provider::{FetchWindow, ProviderError, QuoteProvider};
use crate::domain::ClosePoint;
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://query2.finance.yahoo.com";

    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the provider at another host (a mirror or a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(&self, symbol: &str, window: FetchWindow) -> String {
        let start_ts = window.start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = window
            .end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(start_ts);
        format!(
            "{}/v8/finance/chart/{}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.base_url,
            encode_symbol(symbol)
        )
    }

    /// Parse the chart API response into date-ascending closes.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<ClosePoint>, ProviderError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    ProviderError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    ProviderError::ResponseFormatChanged(format!(
                        "{}: {}",
                        err.code, err.description
                    ))
                }
            } else {
                ProviderError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("result array is empty".into()))?;

        // Yahoo omits `timestamp` entirely when the range holds no sessions
        let timestamps = data.timestamp.unwrap_or_default();

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("no quote data".into()))?;

        let mut closes = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            // Holidays and the in-progress session come back as null
            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            if !close.is_finite() {
                continue;
            }

            // Intraday refreshes can repeat the last session's date
            match closes.last_mut() {
                Some(ClosePoint { date: last, close: c }) if *last == date => *c = close,
                _ => closes.push(ClosePoint { date, close }),
            }
        }

        closes.sort_by_key(|p| p.date);
        Ok(closes)
    }
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_closes(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Vec<ClosePoint>, ProviderError> {
        let url = self.chart_url(symbol, window);
        log::debug!("yahoo: GET chart for {symbol} ({} to {})", window.start, window.end);

        let resp = check_status(self.client.get(&url).send()?, symbol)?;
        let chart: ChartResponse = resp.json().map_err(|e| {
            ProviderError::ResponseFormatChanged(format!(
                "failed to parse response for {symbol}: {}",
                e.without_url()
            ))
        })?;
        Self::parse_response(symbol, chart)
    }
}

/// Percent-encode the characters Yahoo symbols use that are not path-safe.
fn encode_symbol(symbol: &str) -> String {
    let mut out = String::with_capacity(symbol.len() + 4);
    for ch in symbol.trim().chars() {
        match ch {
            '^' => out.push_str("%5E"),
            '=' => out.push_str("%3D"),
            '&' => out.push_str("%26"),
            ' ' => out.push_str("%20"),
            '/' => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    out
}

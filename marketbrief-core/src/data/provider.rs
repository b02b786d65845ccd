//! Provider traits and structured error types.
//!
//! One trait per data domain (quotes, news, institutional flows, market mood)
//! so each source can be swapped out, and faked in tests, independently.
//! Providers know nothing about snapshots or files: the fetch stage decides
//! what a failure means for its section.

use chrono::{Days, NaiveDate};
use thiserror::Error;

use crate::config::{Instrument, NewsConfig};
use crate::domain::{ClosePoint, FiiDiiActivity, Headline, MoodReading, Quote};

/// Structured error types for provider calls.
///
/// Messages never contain request URLs or credentials, so they are safe to
/// persist as a section's unavailable reason.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("not enough data for {symbol}: {points} close(s)")]
    InsufficientData { symbol: String, points: usize },

    #[error("provider error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_connect() || e.is_timeout() {
            ProviderError::NetworkUnreachable(e.to_string())
        } else if e.is_decode() {
            ProviderError::ResponseFormatChanged(e.to_string())
        } else {
            ProviderError::Other(e.to_string())
        }
    }
}

/// Calendar range a quote request covers, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    /// A window ending on `end` wide enough to hold `trading_days` sessions
    /// across weekends and holidays.
    pub fn ending_on(end: NaiveDate, trading_days: usize) -> Self {
        let span = (trading_days as u64) * 7 / 5 + 10;
        let start = end.checked_sub_days(Days::new(span)).unwrap_or(end);
        Self { start, end }
    }
}

/// Daily closes for exchange-traded instruments.
pub trait QuoteProvider {
    fn name(&self) -> &str;

    /// Daily closes for `symbol` inside `window`, ascending by date, with
    /// non-trading days dropped.
    fn fetch_closes(&self, symbol: &str, window: FetchWindow)
        -> Result<Vec<ClosePoint>, ProviderError>;

    /// Latest and previous close for `instrument`, with up to `history_len`
    /// trailing closes kept when the instrument is charted.
    fn fetch_quote(
        &self,
        instrument: &Instrument,
        window: FetchWindow,
        history_len: usize,
    ) -> Result<Quote, ProviderError> {
        let closes = self.fetch_closes(&instrument.symbol, window)?;
        if closes.len() < 2 {
            return Err(ProviderError::InsufficientData {
                symbol: instrument.symbol.clone(),
                points: closes.len(),
            });
        }
        let keep = if instrument.chart { history_len } else { 0 };
        Ok(Quote::from_closes(instrument, &closes, keep))
    }
}

/// Market news headlines.
pub trait NewsProvider {
    fn name(&self) -> &str;

    /// Most recent headlines matching `query`, published on or before `until`.
    fn fetch_headlines(
        &self,
        query: &NewsConfig,
        until: NaiveDate,
    ) -> Result<Vec<Headline>, ProviderError>;
}

/// Foreign/domestic institutional investor activity.
pub trait FlowProvider {
    fn name(&self) -> &str;

    /// The latest published FII/DII figures.
    fn fetch_activity(&self) -> Result<FiiDiiActivity, ProviderError>;
}

/// Market Mood Index.
pub trait MoodProvider {
    fn name(&self) -> &str;

    fn fetch_mood(&self, window: FetchWindow) -> Result<MoodReading, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_weekends() {
        let end = NaiveDate::from_ymd_opt(2024, 10, 16).unwrap();
        let w = FetchWindow::ending_on(end, 22);
        assert_eq!(w.end, end);
        // 22 sessions need at least 30 calendar days
        assert!((w.end - w.start).num_days() >= 30);
    }

    struct Fixed(Vec<ClosePoint>);

    impl QuoteProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_closes(&self, _: &str, _: FetchWindow) -> Result<Vec<ClosePoint>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn point(day: u32, close: f64) -> ClosePoint {
        ClosePoint {
            date: NaiveDate::from_ymd_opt(2024, 10, day).unwrap(),
            close,
        }
    }

    #[test]
    fn fetch_quote_keeps_history_only_when_charted() {
        let p = Fixed(vec![point(14, 1.0), point(15, 2.0), point(16, 3.0)]);
        let w = FetchWindow::ending_on(NaiveDate::from_ymd_opt(2024, 10, 16).unwrap(), 22);

        let plain = p.fetch_quote(&Instrument::new("GC=F"), w, 22).unwrap();
        assert!(plain.history.is_empty());
        assert_eq!(plain.close, Some(3.0));

        let charted = p.fetch_quote(&Instrument::new("GC=F").charted(), w, 22).unwrap();
        assert_eq!(charted.history.len(), 3);
    }

    #[test]
    fn fetch_quote_needs_two_closes() {
        let p = Fixed(vec![point(16, 3.0)]);
        let w = FetchWindow::ending_on(NaiveDate::from_ymd_opt(2024, 10, 16).unwrap(), 22);
        let err = p.fetch_quote(&Instrument::new("GC=F"), w, 22).unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientData { points: 1, .. }));
    }

    #[test]
    fn provider_errors_are_displayable() {
        let e = ProviderError::InsufficientData {
            symbol: "^NSEI".into(),
            points: 1,
        };
        assert_eq!(e.to_string(), "not enough data for ^NSEI: 1 close(s)");
    }
}

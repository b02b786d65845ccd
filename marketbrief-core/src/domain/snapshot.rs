//! Snapshot: one day's raw fetched market data bundle.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::section::Section;
use crate::config::Instrument;

/// Current on-disk layout of `markets_<date>.json`.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Latest close and previous close for one instrument.
///
/// When the provider could not deliver two closes, `close` and `prev_close`
/// are `None` and `error` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub as_of: Option<NaiveDate>,
    pub close: Option<f64>,
    pub prev_close: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ClosePoint>,
}

impl Quote {
    /// Build a quote from a date-ascending close series.
    ///
    /// The last two points give `close` and `prev_close`. `history_len` trailing
    /// points are kept for charting (zero keeps none).
    pub fn from_closes(instrument: &Instrument, closes: &[ClosePoint], history_len: usize) -> Self {
        let mut quote = match closes {
            [.., prev, last] => Quote {
                symbol: instrument.symbol.clone(),
                name: instrument.display_name(),
                as_of: Some(last.date),
                close: Some(last.close),
                prev_close: Some(prev.close),
                error: None,
                history: Vec::new(),
            },
            _ => return Quote::unavailable(instrument, "No recent data"),
        };
        if history_len > 0 {
            let skip = closes.len().saturating_sub(history_len);
            quote.history = closes[skip..].to_vec();
        }
        quote
    }

    /// A placeholder row for an instrument the provider could not deliver.
    pub fn unavailable(instrument: &Instrument, error: impl Into<String>) -> Self {
        Quote {
            symbol: instrument.symbol.clone(),
            name: instrument.display_name(),
            as_of: None,
            close: None,
            prev_close: None,
            error: Some(error.into()),
            history: Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.close.is_some() && self.prev_close.is_some()
    }
}

/// A news headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Market Mood Index reading, derived from a volatility index close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodReading {
    /// Gauge value on a 0..=100 scale.
    pub value: f64,
    pub source_symbol: String,
    pub vix_close: f64,
    pub vix_prev_close: f64,
    pub as_of: NaiveDate,
}

/// Where an FII/DII record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOrigin {
    Live,
    /// Last successfully fetched record, reused after a failed fetch.
    Cache,
}

/// Net cash-market activity of foreign and domestic institutional investors,
/// in crores of rupees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiiDiiActivity {
    pub as_of: NaiveDate,
    pub fii_net: f64,
    pub dii_net: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fii_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fii_sell: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dii_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dii_sell: Option<f64>,
    pub origin: FlowOrigin,
}

/// The quote-list sections of a snapshot, in fetch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuoteSection {
    IndianIndices,
    InternationalIndices,
    Currencies,
    Commodities,
    Crypto,
    Movers,
}

impl QuoteSection {
    pub const ALL: [QuoteSection; 6] = [
        QuoteSection::IndianIndices,
        QuoteSection::InternationalIndices,
        QuoteSection::Currencies,
        QuoteSection::Commodities,
        QuoteSection::Crypto,
        QuoteSection::Movers,
    ];

    /// Key used in JSON and for CSV file names.
    pub fn key(self) -> &'static str {
        match self {
            QuoteSection::IndianIndices => "indian_indices",
            QuoteSection::InternationalIndices => "international_indices",
            QuoteSection::Currencies => "currencies",
            QuoteSection::Commodities => "commodities",
            QuoteSection::Crypto => "crypto",
            QuoteSection::Movers => "movers",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            QuoteSection::IndianIndices => "Indian Indices",
            QuoteSection::InternationalIndices => "International Indices",
            QuoteSection::Currencies => "Currencies",
            QuoteSection::Commodities => "Commodities",
            QuoteSection::Crypto => "Cryptocurrencies",
            QuoteSection::Movers => "Movers",
        }
    }
}

/// All sections of a snapshot.
///
/// Every key is required on load: a provider outage is written as an
/// unavailable section, so a missing key means the file is malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sections {
    pub indian_indices: Section<Vec<Quote>>,
    pub international_indices: Section<Vec<Quote>>,
    pub currencies: Section<Vec<Quote>>,
    pub commodities: Section<Vec<Quote>>,
    pub crypto: Section<Vec<Quote>>,
    pub movers: Section<Vec<Quote>>,
    pub news: Section<Vec<Headline>>,
    pub mmi: Section<MoodReading>,
    pub fii_dii: Section<FiiDiiActivity>,
}

impl Sections {
    pub fn quotes(&self, section: QuoteSection) -> &Section<Vec<Quote>> {
        match section {
            QuoteSection::IndianIndices => &self.indian_indices,
            QuoteSection::InternationalIndices => &self.international_indices,
            QuoteSection::Currencies => &self.currencies,
            QuoteSection::Commodities => &self.commodities,
            QuoteSection::Crypto => &self.crypto,
            QuoteSection::Movers => &self.movers,
        }
    }
}

/// One day's raw market data bundle, as written by the fetch stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub date: NaiveDate,
    pub generated_at: NaiveDateTime,
    pub sections: Sections,
}

impl Snapshot {
    /// File name the snapshot is stored under: `markets_<YYYY-MM-DD>.json`.
    pub fn file_name(date: NaiveDate) -> String {
        format!("markets_{}.json", date.format("%Y-%m-%d"))
    }

    /// Parse the date out of a `markets_<YYYY-MM-DD>.json` file name.
    pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
        let stem = name.strip_prefix("markets_")?.strip_suffix(".json")?;
        NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    fn series() -> Vec<ClosePoint> {
        vec![
            ClosePoint { date: d(14), close: 100.0 },
            ClosePoint { date: d(15), close: 102.0 },
            ClosePoint { date: d(16), close: 101.0 },
        ]
    }

    #[test]
    fn quote_uses_last_two_closes() {
        let inst = Instrument::named("^NSEI", "NIFTY 50");
        let q = Quote::from_closes(&inst, &series(), 0);
        assert_eq!(q.close, Some(101.0));
        assert_eq!(q.prev_close, Some(102.0));
        assert_eq!(q.as_of, Some(d(16)));
        assert_eq!(q.name, "NIFTY 50");
        assert!(q.history.is_empty());
        assert!(q.is_available());
    }

    #[test]
    fn quote_keeps_trailing_history() {
        let inst = Instrument::new("GC=F");
        let q = Quote::from_closes(&inst, &series(), 2);
        assert_eq!(q.history.len(), 2);
        assert_eq!(q.history[0].date, d(15));
    }

    #[test]
    fn single_close_is_unavailable() {
        let inst = Instrument::new("BTC-USD");
        let q = Quote::from_closes(&inst, &series()[..1], 5);
        assert!(!q.is_available());
        assert_eq!(q.error.as_deref(), Some("No recent data"));
    }

    #[test]
    fn file_name_round_trips_date() {
        let name = Snapshot::file_name(d(16));
        assert_eq!(name, "markets_2024-10-16.json");
        assert_eq!(Snapshot::date_from_file_name(&name), Some(d(16)));
        assert_eq!(Snapshot::date_from_file_name("fii_dii_cache.json"), None);
        assert_eq!(Snapshot::date_from_file_name("markets_latest.json"), None);
    }
}

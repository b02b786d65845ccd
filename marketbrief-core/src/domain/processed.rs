//! Processed dataset: a snapshot cleaned and enriched for rendering.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::mood::MoodZone;
use super::section::Section;
use super::snapshot::{ClosePoint, FlowOrigin, Headline, QuoteSection};

/// Current on-disk layout of `processed_<date>.json`.
pub const PROCESSED_SCHEMA_VERSION: u32 = 1;

/// Identifies the raw snapshot a dataset was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub file: String,
    pub date: NaiveDate,
    /// BLAKE3 hex digest of the raw snapshot bytes.
    pub blake3: String,
}

/// A quote with derived change columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    pub symbol: String,
    pub display_symbol: String,
    pub name: String,
    pub as_of: Option<NaiveDate>,
    pub close: Option<f64>,
    pub prev_close: Option<f64>,
    pub net_change: Option<f64>,
    pub pct_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ClosePoint>,
}

/// Descriptive aggregates over one quote table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub count: usize,
    pub advancers: usize,
    pub decliners: usize,
    pub unchanged: usize,
    /// Rows without a percent change (fetch failed).
    pub missing: usize,
    pub mean_pct_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTable {
    pub rows: Vec<QuoteRow>,
    pub summary: SectionSummary,
}

/// A gainer or loser with its 1-based rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMover {
    pub rank: usize,
    pub symbol: String,
    pub display_symbol: String,
    pub name: String,
    pub close: f64,
    pub net_change: f64,
    pub pct_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movers {
    pub top_n: usize,
    pub gainers: Vec<RankedMover>,
    pub losers: Vec<RankedMover>,
    pub summary: SectionSummary,
}

/// MMI reading with its gauge zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSummary {
    pub value: f64,
    pub zone: MoodZone,
    pub source_symbol: String,
    pub vix_close: f64,
    pub vix_pct_change: Option<f64>,
    pub as_of: NaiveDate,
}

/// Which side of the market an institution was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStance {
    Buyers,
    Sellers,
    Flat,
}

impl FlowStance {
    pub fn from_net(net: f64) -> Self {
        if net > 0.0 {
            FlowStance::Buyers
        } else if net < 0.0 {
            FlowStance::Sellers
        } else {
            FlowStance::Flat
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlowStance::Buyers => "buyers",
            FlowStance::Sellers => "sellers",
            FlowStance::Flat => "flat",
        }
    }
}

/// FII/DII figures with derived totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub as_of: NaiveDate,
    pub fii_net: f64,
    pub dii_net: f64,
    pub combined_net: f64,
    pub fii_stance: FlowStance,
    pub dii_stance: FlowStance,
    /// The figures are older than the snapshot date (the exchange publishes
    /// them after the close, so a morning run usually sees yesterday's).
    pub stale: bool,
    pub origin: FlowOrigin,
}

/// Everything the report stage renders, derived from exactly one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDataset {
    pub schema_version: u32,
    pub date: NaiveDate,
    /// Copied from the snapshot so the dataset stays reproducible.
    pub generated_at: NaiveDateTime,
    pub source: SourceRef,
    pub indian_indices: Section<QuoteTable>,
    pub international_indices: Section<QuoteTable>,
    pub currencies: Section<QuoteTable>,
    pub commodities: Section<QuoteTable>,
    pub crypto: Section<QuoteTable>,
    pub movers: Section<Movers>,
    /// `None` when the snapshot recorded the MMI section as unavailable.
    pub mood: Option<MoodSummary>,
    pub fii_dii: Section<FlowSummary>,
    pub news: Section<Vec<Headline>>,
}

impl ProcessedDataset {
    /// File name the dataset is stored under: `processed_<YYYY-MM-DD>.json`.
    pub fn file_name(date: NaiveDate) -> String {
        format!("processed_{}.json", date.format("%Y-%m-%d"))
    }

    pub fn date_from_file_name(name: &str) -> Option<NaiveDate> {
        let stem = name.strip_prefix("processed_")?.strip_suffix(".json")?;
        NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
    }

    /// Quote table for one of the plain quote sections.
    ///
    /// Returns `None` for [`QuoteSection::Movers`], which is ranked instead.
    pub fn table(&self, section: QuoteSection) -> Option<&Section<QuoteTable>> {
        match section {
            QuoteSection::IndianIndices => Some(&self.indian_indices),
            QuoteSection::InternationalIndices => Some(&self.international_indices),
            QuoteSection::Currencies => Some(&self.currencies),
            QuoteSection::Commodities => Some(&self.commodities),
            QuoteSection::Crypto => Some(&self.crypto),
            QuoteSection::Movers => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stance_from_net() {
        assert_eq!(FlowStance::from_net(421.0), FlowStance::Buyers);
        assert_eq!(FlowStance::from_net(-532.0), FlowStance::Sellers);
        assert_eq!(FlowStance::from_net(0.0), FlowStance::Flat);
    }

    #[test]
    fn processed_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 16).unwrap();
        let name = ProcessedDataset::file_name(date);
        assert_eq!(name, "processed_2024-10-16.json");
        assert_eq!(ProcessedDataset::date_from_file_name(&name), Some(date));
    }
}

//! Flat CSV export of a processed dataset.
//!
//! One row per quote, ranked mover, mood reading, flow figure and headline.
//! Sections recorded as unavailable contribute no rows.

use anyhow::{Context, Result};
use marketbrief_core::domain::{ProcessedDataset, QuoteSection};

pub const CSV_COLUMNS: [&str; 9] = [
    "section",
    "symbol",
    "name",
    "value",
    "prev_value",
    "net_change",
    "pct_change",
    "rank",
    "as_of",
];

fn num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Export the dataset as CSV with the columns in [`CSV_COLUMNS`].
pub fn export_csv(dataset: &ProcessedDataset) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_COLUMNS)?;

    for section in QuoteSection::ALL {
        let Some(table) = dataset.table(section).and_then(|t| t.data()) else {
            continue;
        };
        for row in &table.rows {
            wtr.write_record([
                section.key(),
                row.symbol.as_str(),
                row.name.as_str(),
                &num(row.close),
                &num(row.prev_close),
                &num(row.net_change),
                &num(row.pct_change),
                "",
                &row.as_of.map(|d| d.to_string()).unwrap_or_default(),
            ])?;
        }
    }

    if let Some(movers) = dataset.movers.data() {
        for (key, ranked) in [("top_gainers", &movers.gainers), ("top_losers", &movers.losers)] {
            for m in ranked {
                wtr.write_record([
                    key,
                    m.symbol.as_str(),
                    m.name.as_str(),
                    &m.close.to_string(),
                    "",
                    &m.net_change.to_string(),
                    &m.pct_change.to_string(),
                    &m.rank.to_string(),
                    "",
                ])?;
            }
        }
    }

    if let Some(mood) = &dataset.mood {
        let as_of = mood.as_of.to_string();
        wtr.write_record([
            "mmi",
            "MMI",
            mood.zone.label(),
            &mood.value.to_string(),
            "",
            "",
            "",
            "",
            as_of.as_str(),
        ])?;
        wtr.write_record([
            "mmi",
            mood.source_symbol.as_str(),
            "volatility index",
            &mood.vix_close.to_string(),
            "",
            "",
            &num(mood.vix_pct_change),
            "",
            as_of.as_str(),
        ])?;
    }

    if let Some(f) = dataset.fii_dii.data() {
        let as_of = f.as_of.to_string();
        for (symbol, name, value) in [
            ("FII", "Foreign institutional net", f.fii_net),
            ("DII", "Domestic institutional net", f.dii_net),
            ("COMBINED", "Combined net", f.combined_net),
        ] {
            wtr.write_record([
                "fii_dii",
                symbol,
                name,
                &value.to_string(),
                "",
                "",
                "",
                "",
                as_of.as_str(),
            ])?;
        }
    }

    if let Some(headlines) = dataset.news.data() {
        for h in headlines {
            wtr.write_record([
                "news",
                h.source.as_str(),
                h.title.as_str(),
                "",
                "",
                "",
                "",
                "",
                &h.published_at
                    .map(|t| t.date_naive().to_string())
                    .unwrap_or_default(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

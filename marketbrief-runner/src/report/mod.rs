//! Report stage: render one processed dataset to PDF and CSV.
//!
//! Provides:
//! - **PDF**: fixed section order, tables with repeating headers, vector
//!   charts, page-capped by `report.max_pages`
//! - **CSV**: the same figures as one flat table
//!
//! Both outputs are functions of the dataset and the report config only; the
//! date printed is the dataset date.

pub mod charts;
pub mod export;
pub mod layout;
pub mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use marketbrief_core::config::PipelineConfig;
use marketbrief_core::domain::{ProcessedDataset, PROCESSED_SCHEMA_VERSION};
use thiserror::Error;

use crate::artifacts::{ArtifactKind, LocateError};

pub use export::{export_csv, CSV_COLUMNS};
pub use layout::RenderedReport;
pub use render::render_pdf;

/// Processed datasets, `processed_<date>.json`.
pub const PROCESSED_DATASET: ArtifactKind = ArtifactKind {
    label: "processed dataset",
    file_name: ProcessedDataset::file_name,
    date_from_file_name: ProcessedDataset::date_from_file_name,
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed processed dataset {}: {reason}", path.display())]
    MalformedDataset { path: PathBuf, reason: String },
}

/// `Financial_Report_<YYYY-MM-DD>`, shared by the PDF and CSV outputs.
pub fn report_stem(date: NaiveDate) -> String {
    format!("Financial_Report_{}", date.format("%Y-%m-%d"))
}

/// A validated dataset and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub path: PathBuf,
    pub dataset: ProcessedDataset,
}

/// Load the processed dataset for `date`, or the newest one.
pub fn load_processed(
    processed_dir: &Path,
    date: Option<NaiveDate>,
) -> Result<LoadedDataset, ReportError> {
    let path = PROCESSED_DATASET.locate(processed_dir, date)?;
    let bytes = std::fs::read(&path).map_err(|source| ReportError::Read {
        path: path.clone(),
        source,
    })?;
    let malformed = |reason: String| ReportError::MalformedDataset {
        path: path.clone(),
        reason,
    };

    let dataset: ProcessedDataset =
        serde_json::from_slice(&bytes).map_err(|e| malformed(e.to_string()))?;
    if dataset.schema_version != PROCESSED_SCHEMA_VERSION {
        return Err(malformed(format!(
            "unsupported schema version {} (expected {PROCESSED_SCHEMA_VERSION})",
            dataset.schema_version
        )));
    }
    let named = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(ProcessedDataset::date_from_file_name);
    if named.is_some_and(|d| d != dataset.date) {
        return Err(malformed(format!(
            "file name does not match dataset date {}",
            dataset.date
        )));
    }
    if dataset.source.date != dataset.date {
        return Err(malformed(format!(
            "dataset date {} differs from its source snapshot date {}",
            dataset.date, dataset.source.date
        )));
    }
    Ok(LoadedDataset { path, dataset })
}

/// Paths and stats of one generate run.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub dataset_path: PathBuf,
    pub pdf_path: PathBuf,
    pub csv_path: PathBuf,
    pub page_count: usize,
    pub truncated: bool,
}

/// Render both report files for one processed dataset.
pub fn write_report(
    dataset: &ProcessedDataset,
    config: &PipelineConfig,
) -> Result<(PathBuf, PathBuf, RenderedReport)> {
    let reports_dir = &config.paths.reports_dir;
    std::fs::create_dir_all(reports_dir)
        .with_context(|| format!("failed to create reports dir: {}", reports_dir.display()))?;

    let stem = report_stem(dataset.date);
    let rendered = render_pdf(dataset, &config.report);
    let pdf_path = reports_dir.join(format!("{stem}.pdf"));
    std::fs::write(&pdf_path, &rendered.bytes)
        .with_context(|| format!("failed to write {}", pdf_path.display()))?;

    let csv = export_csv(dataset)?;
    let csv_path = reports_dir.join(format!("{stem}.csv"));
    std::fs::write(&csv_path, csv)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    Ok((pdf_path, csv_path, rendered))
}

/// Locate, load and render.
pub fn run_generate(config: &PipelineConfig, date: Option<NaiveDate>) -> Result<GenerateOutcome> {
    let loaded = load_processed(&config.paths.processed_dir, date)?;
    log::info!("rendering report from {}", loaded.path.display());

    let (pdf_path, csv_path, rendered) = write_report(&loaded.dataset, config)?;
    if rendered.truncated {
        log::warn!(
            "report truncated at the {}-page limit",
            config.report.max_pages
        );
    }
    log::info!(
        "wrote {} ({} pages) and {}",
        pdf_path.display(),
        rendered.page_count,
        csv_path.display()
    );

    Ok(GenerateOutcome {
        dataset_path: loaded.path,
        pdf_path,
        csv_path,
        page_count: rendered.page_count,
        truncated: rendered.truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketbrief_core::config::ReportConfig;
    use marketbrief_core::domain::{
        FlowOrigin, FlowStance, FlowSummary, Headline, MoodSummary, MoodZone, Movers, QuoteRow,
        QuoteTable, RankedMover, Section, SectionSummary, SourceRef,
    };

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    fn row(symbol: &str, close: f64, prev: f64) -> QuoteRow {
        let net = ((close - prev) * 100.0).round() / 100.0;
        QuoteRow {
            symbol: symbol.into(),
            display_symbol: symbol.trim_end_matches(".NS").into(),
            name: format!("{symbol} name"),
            as_of: Some(d(16)),
            close: Some(close),
            prev_close: Some(prev),
            net_change: Some(net),
            pct_change: Some(((net / prev * 100.0) * 100.0).round() / 100.0),
            error: None,
            history: Vec::new(),
        }
    }

    fn table(rows: Vec<QuoteRow>) -> Section<QuoteTable> {
        Section::available(QuoteTable {
            rows,
            summary: SectionSummary::default(),
        })
    }

    fn sample() -> ProcessedDataset {
        ProcessedDataset {
            schema_version: PROCESSED_SCHEMA_VERSION,
            date: d(16),
            generated_at: d(16).and_hms_opt(8, 30, 0).unwrap(),
            source: SourceRef {
                file: "markets_2024-10-16.json".into(),
                date: d(16),
                blake3: "ab".repeat(32),
            },
            indian_indices: table(vec![row("^NSEI", 24971.3, 25127.95)]),
            international_indices: Section::unavailable("network unreachable: timed out"),
            currencies: table(vec![row("USDINR=X", 84.05, 84.0)]),
            commodities: table(vec![]),
            crypto: table(vec![row("BTC-USD", 67000.0, 66000.0)]),
            movers: Section::available(Movers {
                top_n: 1,
                gainers: vec![RankedMover {
                    rank: 1,
                    symbol: "TCS.NS".into(),
                    display_symbol: "TCS".into(),
                    name: "TCS".into(),
                    close: 4100.0,
                    net_change: 50.0,
                    pct_change: 1.23,
                }],
                losers: vec![],
                summary: SectionSummary::default(),
            }),
            mood: Some(MoodSummary {
                value: 70.0,
                zone: MoodZone::Greed,
                source_symbol: "^INDIAVIX".into(),
                vix_close: 14.2,
                vix_pct_change: Some(8.4),
                as_of: d(16),
            }),
            fii_dii: Section::available(FlowSummary {
                as_of: d(15),
                fii_net: -1748.72,
                dii_net: 3081.96,
                combined_net: 1333.24,
                fii_stance: FlowStance::Sellers,
                dii_stance: FlowStance::Buyers,
                stale: true,
                origin: FlowOrigin::Live,
            }),
            news: Section::available(vec![Headline {
                title: "Sensex, Nifty end lower, \"cautious\" trade".into(),
                source: "Mint".into(),
                url: None,
                published_at: None,
            }]),
        }
    }

    #[test]
    fn csv_has_fixed_columns_and_skips_unavailable() {
        let csv = export_csv(&sample()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS.join(","));

        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert!(records.iter().all(|r| r.len() == CSV_COLUMNS.len()));
        assert!(!records.iter().any(|r| &r[0] == "international_indices"));

        let gainer = records.iter().find(|r| &r[0] == "top_gainers").unwrap();
        assert_eq!(&gainer[1], "TCS.NS");
        assert_eq!(&gainer[7], "1");

        let fii = records.iter().find(|r| &r[0] == "fii_dii" && &r[1] == "FII").unwrap();
        assert_eq!(&fii[3], "-1748.72");
        assert_eq!(&fii[8], "2024-10-15");

        let news = records.iter().find(|r| &r[0] == "news").unwrap();
        assert_eq!(&news[2], "Sensex, Nifty end lower, \"cautious\" trade");
    }

    #[test]
    fn render_is_deterministic_and_capped() {
        let ds = sample();
        let config = ReportConfig::default();
        let a = render_pdf(&ds, &config);
        let b = render_pdf(&ds, &config);
        assert_eq!(a.bytes, b.bytes);
        assert!(a.page_count <= config.max_pages);
        assert!(a.bytes.starts_with(b"%PDF-"));

        let tight = ReportConfig {
            max_pages: 2,
            ..ReportConfig::default()
        };
        let capped = render_pdf(&ds, &tight);
        assert_eq!(capped.page_count, 2);
        assert!(capped.truncated);
    }

    #[test]
    fn load_rejects_mismatched_file_date() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::to_string(&sample()).unwrap();
        std::fs::write(dir.path().join("processed_2024-10-17.json"), json).unwrap();

        let err = load_processed(dir.path(), None).unwrap_err();
        assert!(matches!(err, ReportError::MalformedDataset { .. }));
    }

    #[test]
    fn load_rejects_missing_section() {
        let dir = tempfile::tempdir().unwrap();
        let mut value = serde_json::to_value(sample()).unwrap();
        value.as_object_mut().unwrap().remove("fii_dii");
        std::fs::write(
            dir.path().join("processed_2024-10-16.json"),
            serde_json::to_string(&value).unwrap(),
        )
        .unwrap();

        let err = load_processed(dir.path(), Some(d(16))).unwrap_err();
        assert!(err.to_string().contains("fii_dii"));
    }

    #[test]
    fn report_file_names() {
        assert_eq!(report_stem(d(16)), "Financial_Report_2024-10-16");
    }
}

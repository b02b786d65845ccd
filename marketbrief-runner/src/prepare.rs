//! Prepare stage: validate one raw snapshot and derive the processed dataset.
//!
//! Loading is strict: a snapshot missing a section key, carrying a wrong
//! type, an unknown schema version or a date that disagrees with its file
//! name is rejected as malformed. Nothing is repaired.
//!
//! The derivation is a pure function of the snapshot bytes, so running the
//! stage twice over the same input writes byte-identical output.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use marketbrief_core::config::PipelineConfig;
use marketbrief_core::domain::symbols;
use marketbrief_core::domain::{
    FiiDiiActivity, FlowOrigin, FlowStance, FlowSummary, Headline, MoodReading, MoodSummary,
    MoodZone, Movers, ProcessedDataset, Quote, QuoteRow, QuoteSection, QuoteTable, RankedMover,
    Section, SectionSummary, Snapshot, SourceRef, PROCESSED_SCHEMA_VERSION,
    SNAPSHOT_SCHEMA_VERSION,
};
use thiserror::Error;

use crate::artifacts::{ArtifactKind, LocateError};

/// Raw snapshots, `markets_<date>.json`.
pub const RAW_SNAPSHOT: ArtifactKind = ArtifactKind {
    label: "raw snapshot",
    file_name: Snapshot::file_name,
    date_from_file_name: Snapshot::date_from_file_name,
};

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed snapshot {}: {reason}", path.display())]
    MalformedSnapshot { path: PathBuf, reason: String },
}

/// Find the raw snapshot for `date`, or the newest one.
pub fn locate_snapshot(raw_dir: &Path, date: Option<NaiveDate>) -> Result<PathBuf, PrepareError> {
    Ok(RAW_SNAPSHOT.locate(raw_dir, date)?)
}

/// A validated snapshot plus the reference the dataset will carry.
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub snapshot: Snapshot,
    pub source: SourceRef,
}

/// Read and validate a raw snapshot.
pub fn load_snapshot(path: &Path) -> Result<LoadedSnapshot, PrepareError> {
    let bytes = std::fs::read(path).map_err(|source| PrepareError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |reason: String| PrepareError::MalformedSnapshot {
        path: path.to_path_buf(),
        reason,
    };

    let snapshot: Snapshot =
        serde_json::from_slice(&bytes).map_err(|e| malformed(e.to_string()))?;

    if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
        return Err(malformed(format!(
            "unsupported schema version {} (expected {SNAPSHOT_SCHEMA_VERSION})",
            snapshot.schema_version
        )));
    }

    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    if let Some(named) = Snapshot::date_from_file_name(&file) {
        if named != snapshot.date {
            return Err(malformed(format!(
                "file name says {named} but snapshot date is {}",
                snapshot.date
            )));
        }
    }

    let source = SourceRef {
        file,
        date: snapshot.date,
        blake3: blake3::hash(&bytes).to_hex().to_string(),
    };
    Ok(LoadedSnapshot { snapshot, source })
}

// ─── Derivation ─────────────────────────────────────────────────────

/// Round to 2 dp; a result of zero is always `+0.0`.
fn round2(x: f64) -> f64 {
    let r = (x * 100.0).round() / 100.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Percent change from `prev` to `close`; absent when `prev` is zero.
pub fn pct_change(close: f64, prev: f64) -> Option<f64> {
    if prev == 0.0 || !prev.is_finite() || !close.is_finite() {
        return None;
    }
    Some(round2((close - prev) / prev * 100.0))
}

fn quote_row(q: &Quote) -> QuoteRow {
    let (net_change, pct) = match (q.close, q.prev_close) {
        (Some(close), Some(prev)) => (Some(round2(close - prev)), pct_change(close, prev)),
        _ => (None, None),
    };
    // Older snapshots stored the bare symbol as the name
    let name = if q.name.trim().is_empty() || q.name == q.symbol {
        symbols::display_name(&q.symbol)
            .map(str::to_string)
            .unwrap_or_else(|| q.symbol.clone())
    } else {
        q.name.trim().to_string()
    };
    QuoteRow {
        symbol: q.symbol.clone(),
        display_symbol: symbols::display_symbol(&q.symbol),
        name,
        as_of: q.as_of,
        close: q.close,
        prev_close: q.prev_close,
        net_change,
        pct_change: pct,
        error: q.error.clone(),
        history: q.history.clone(),
    }
}

/// Advancers, decliners and mean percent change over a set of rows.
pub fn summarize(rows: &[QuoteRow]) -> SectionSummary {
    let mut summary = SectionSummary {
        count: rows.len(),
        ..SectionSummary::default()
    };
    let mut total = 0.0;
    let mut with_value = 0usize;
    for row in rows {
        match row.pct_change {
            Some(p) if p > 0.0 => summary.advancers += 1,
            Some(p) if p < 0.0 => summary.decliners += 1,
            Some(_) => summary.unchanged += 1,
            None => summary.missing += 1,
        }
        if let Some(p) = row.pct_change {
            total += p;
            with_value += 1;
        }
    }
    if with_value > 0 {
        summary.mean_pct_change = Some(round2(total / with_value as f64));
    }
    summary
}

fn quote_table(quotes: &[Quote]) -> QuoteTable {
    let rows: Vec<QuoteRow> = quotes.iter().map(quote_row).collect();
    let summary = summarize(&rows);
    QuoteTable { rows, summary }
}

/// Top `top_n` gainers and losers.
///
/// Gainers are ordered by percent change descending, losers ascending; equal
/// changes are ordered by display symbol. Rows without a change are skipped.
pub fn rank_movers(rows: &[QuoteRow], top_n: usize) -> (Vec<RankedMover>, Vec<RankedMover>) {
    let mut ranked: Vec<(&QuoteRow, f64, f64, f64)> = rows
        .iter()
        .filter_map(|r| Some((r, r.close?, r.net_change?, r.pct_change?)))
        .collect();

    let to_mover = |(i, (row, close, net, pct)): (usize, &(&QuoteRow, f64, f64, f64))| RankedMover {
        rank: i + 1,
        symbol: row.symbol.clone(),
        display_symbol: row.display_symbol.clone(),
        name: row.name.clone(),
        close: *close,
        net_change: *net,
        pct_change: *pct,
    };

    ranked.sort_by(|a, b| {
        b.3.total_cmp(&a.3)
            .then_with(|| a.0.display_symbol.cmp(&b.0.display_symbol))
    });
    let gainers = ranked.iter().take(top_n).enumerate().map(to_mover).collect();

    ranked.sort_by(|a, b| {
        a.3.total_cmp(&b.3)
            .then_with(|| a.0.display_symbol.cmp(&b.0.display_symbol))
    });
    let losers = ranked.iter().take(top_n).enumerate().map(to_mover).collect();

    (gainers, losers)
}

fn movers(quotes: &[Quote], top_n: usize) -> Movers {
    let rows: Vec<QuoteRow> = quotes.iter().map(quote_row).collect();
    let (gainers, losers) = rank_movers(&rows, top_n);
    Movers {
        top_n,
        gainers,
        losers,
        summary: summarize(&rows),
    }
}

fn mood(reading: &MoodReading) -> MoodSummary {
    MoodSummary {
        value: reading.value,
        zone: MoodZone::from_value(reading.value),
        source_symbol: reading.source_symbol.clone(),
        vix_close: reading.vix_close,
        vix_pct_change: pct_change(reading.vix_close, reading.vix_prev_close),
        as_of: reading.as_of,
    }
}

fn flows(activity: &FiiDiiActivity, snapshot_date: NaiveDate) -> FlowSummary {
    FlowSummary {
        as_of: activity.as_of,
        fii_net: round2(activity.fii_net),
        dii_net: round2(activity.dii_net),
        combined_net: round2(activity.fii_net + activity.dii_net),
        fii_stance: FlowStance::from_net(activity.fii_net),
        dii_stance: FlowStance::from_net(activity.dii_net),
        stale: activity.as_of < snapshot_date,
        origin: activity.origin,
    }
}

/// Collapse whitespace in titles and drop case-insensitive duplicates,
/// keeping first occurrences in order.
pub fn clean_headlines(headlines: &[Headline]) -> Vec<Headline> {
    let mut seen = HashSet::new();
    headlines
        .iter()
        .filter_map(|h| {
            let title = h.title.split_whitespace().collect::<Vec<_>>().join(" ");
            if title.is_empty() || !seen.insert(title.to_lowercase()) {
                return None;
            }
            Some(Headline {
                title,
                source: h.source.split_whitespace().collect::<Vec<_>>().join(" "),
                url: h.url.clone(),
                published_at: h.published_at,
            })
        })
        .collect()
}

/// Derive the processed dataset from one snapshot.
pub fn prepare(snapshot: &Snapshot, source: SourceRef, top_n: usize) -> ProcessedDataset {
    let s = &snapshot.sections;
    let table = |section: QuoteSection| s.quotes(section).as_ref().map(|q| quote_table(q));

    ProcessedDataset {
        schema_version: PROCESSED_SCHEMA_VERSION,
        date: snapshot.date,
        generated_at: snapshot.generated_at,
        source,
        indian_indices: table(QuoteSection::IndianIndices),
        international_indices: table(QuoteSection::InternationalIndices),
        currencies: table(QuoteSection::Currencies),
        commodities: table(QuoteSection::Commodities),
        crypto: table(QuoteSection::Crypto),
        movers: s.movers.as_ref().map(|q| movers(q, top_n)),
        mood: s.mmi.data().map(mood),
        fii_dii: s.fii_dii.as_ref().map(|a| flows(a, snapshot.date)),
        news: s.news.as_ref().map(|h| clean_headlines(h)),
    }
}

/// Write `processed_<date>.json` under `processed_dir`.
pub fn write_processed(dataset: &ProcessedDataset, processed_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(processed_dir).with_context(|| {
        format!("failed to create processed dir: {}", processed_dir.display())
    })?;
    let path = processed_dir.join(ProcessedDataset::file_name(dataset.date));
    let mut json =
        serde_json::to_string_pretty(dataset).context("failed to serialize processed dataset")?;
    json.push('\n');
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ─── Tabular output ─────────────────────────────────────────────────

fn num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn table_csv(header: &[&str], rows: &[Vec<String>]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn quote_rows(table: &QuoteTable) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|r| {
            vec![
                r.symbol.clone(),
                r.display_symbol.clone(),
                r.name.clone(),
                r.as_of.map(|d| d.to_string()).unwrap_or_default(),
                num(r.close),
                num(r.prev_close),
                num(r.net_change),
                num(r.pct_change),
            ]
        })
        .collect()
}

fn mover_rows(ranked: &[RankedMover]) -> Vec<Vec<String>> {
    ranked
        .iter()
        .map(|m| {
            vec![
                m.rank.to_string(),
                m.symbol.clone(),
                m.display_symbol.clone(),
                m.name.clone(),
                m.close.to_string(),
                m.net_change.to_string(),
                m.pct_change.to_string(),
            ]
        })
        .collect()
}

/// Per-section tables of the processed dataset, `(file stem, CSV body)`.
/// Unavailable sections produce no table.
pub fn processed_tables(dataset: &ProcessedDataset) -> Result<Vec<(&'static str, String)>> {
    let mut tables = Vec::new();

    for section in QuoteSection::ALL {
        if let Some(table) = dataset.table(section).and_then(|t| t.data()) {
            let header = [
                "symbol",
                "display_symbol",
                "name",
                "as_of",
                "close",
                "prev_close",
                "net_change",
                "pct_change",
            ];
            tables.push((section.key(), table_csv(&header, &quote_rows(table))?));
        }
    }

    if let Some(movers) = dataset.movers.data() {
        let header = [
            "rank",
            "symbol",
            "display_symbol",
            "name",
            "close",
            "net_change",
            "pct_change",
        ];
        tables.push(("top_gainers", table_csv(&header, &mover_rows(&movers.gainers))?));
        tables.push(("top_losers", table_csv(&header, &mover_rows(&movers.losers))?));
    }

    if let Some(m) = &dataset.mood {
        let header = ["value", "zone", "source_symbol", "vix_close", "vix_pct_change", "as_of"];
        let row = vec![
            m.value.to_string(),
            m.zone.label().to_string(),
            m.source_symbol.clone(),
            m.vix_close.to_string(),
            num(m.vix_pct_change),
            m.as_of.to_string(),
        ];
        tables.push(("mmi", table_csv(&header, &[row])?));
    }

    if let Some(f) = dataset.fii_dii.data() {
        let header = [
            "as_of",
            "fii_net",
            "dii_net",
            "combined_net",
            "fii_stance",
            "dii_stance",
            "stale",
            "origin",
        ];
        let origin = match f.origin {
            FlowOrigin::Live => "live",
            FlowOrigin::Cache => "cache",
        };
        let row = vec![
            f.as_of.to_string(),
            f.fii_net.to_string(),
            f.dii_net.to_string(),
            f.combined_net.to_string(),
            f.fii_stance.label().to_string(),
            f.dii_stance.label().to_string(),
            f.stale.to_string(),
            origin.to_string(),
        ];
        tables.push(("fii_dii", table_csv(&header, &[row])?));
    }

    if let Some(headlines) = dataset.news.data() {
        let rows: Vec<Vec<String>> = headlines
            .iter()
            .map(|h| {
                vec![
                    h.title.clone(),
                    h.source.clone(),
                    h.url.clone().unwrap_or_default(),
                    h.published_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                ]
            })
            .collect();
        tables.push(("news", table_csv(&["title", "source", "url", "published_at"], &rows)?));
    }

    Ok(tables)
}

/// Write one CSV per available section under `processed_dir/csv_<date>/`.
///
/// The directory is recreated on every run so it only ever holds the tables
/// of the latest dataset for that date.
pub fn write_processed_tables(
    dataset: &ProcessedDataset,
    processed_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let dir = processed_dir.join(format!("csv_{}", dataset.date.format("%Y-%m-%d")));
    if dir.exists() {
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("failed to clear {}", dir.display()))?;
    }
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut files = Vec::new();
    for (name, body) in processed_tables(dataset)? {
        let path = dir.join(format!("{name}.csv"));
        std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        files.push(path);
    }
    Ok(files)
}

// ─── Stage entry point ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PrepareOutcome {
    pub snapshot_path: PathBuf,
    pub processed_path: PathBuf,
    /// Per-section CSV tables written next to the dataset.
    pub table_files: Vec<PathBuf>,
    pub dataset: ProcessedDataset,
}

/// Locate, load, derive and write.
pub fn run_prepare(config: &PipelineConfig, date: Option<NaiveDate>) -> Result<PrepareOutcome> {
    let snapshot_path = locate_snapshot(&config.paths.raw_dir, date)?;
    log::info!("preparing {}", snapshot_path.display());

    let loaded = load_snapshot(&snapshot_path)?;
    let dataset = prepare(&loaded.snapshot, loaded.source, config.movers.top_n);
    for section in QuoteSection::ALL {
        if let Some(Section::Unavailable { reason }) = dataset.table(section) {
            log::warn!("{}: unavailable in snapshot ({reason})", section.key());
        }
    }
    if dataset.mood.is_none() {
        log::warn!("mmi: unavailable in snapshot, mood left empty");
    }

    let processed_path = write_processed(&dataset, &config.paths.processed_dir)?;
    let table_files = write_processed_tables(&dataset, &config.paths.processed_dir)?;
    log::info!(
        "wrote {} and {} section tables",
        processed_path.display(),
        table_files.len()
    );
    Ok(PrepareOutcome {
        snapshot_path,
        processed_path,
        table_files,
        dataset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketbrief_core::domain::Sections;
    use proptest::prelude::*;

    fn row(symbol: &str, close: Option<f64>, prev: Option<f64>) -> QuoteRow {
        quote_row(&Quote {
            symbol: symbol.into(),
            name: symbol.into(),
            as_of: None,
            close,
            prev_close: prev,
            error: None,
            history: Vec::new(),
        })
    }

    #[test]
    fn derives_change_columns() {
        let r = row("RELIANCE.NS", Some(2750.55), Some(2700.0));
        assert_eq!(r.display_symbol, "RELIANCE");
        assert_eq!(r.net_change, Some(50.55));
        assert_eq!(r.pct_change, Some(1.87));
    }

    #[test]
    fn zero_prev_close_has_no_pct() {
        let r = row("X", Some(5.0), Some(0.0));
        assert_eq!(r.net_change, Some(5.0));
        assert_eq!(r.pct_change, None);
        let r = row("Y", None, None);
        assert_eq!(r.net_change, None);
    }

    #[test]
    fn name_falls_back_to_builtin_map() {
        let r = row("^NSEI", Some(1.0), Some(1.0));
        assert_eq!(r.name, "NIFTY 50");
    }

    #[test]
    fn summary_counts() {
        let rows = vec![
            row("A", Some(11.0), Some(10.0)),
            row("B", Some(9.0), Some(10.0)),
            row("C", Some(10.0), Some(10.0)),
            row("D", None, None),
        ];
        let s = summarize(&rows);
        assert_eq!((s.count, s.advancers, s.decliners, s.unchanged, s.missing), (4, 1, 1, 1, 1));
        assert_eq!(s.mean_pct_change, Some(0.0));
    }

    #[test]
    fn ties_break_alphabetically() {
        let rows = vec![
            row("TCS.NS", Some(102.0), Some(100.0)),
            row("INFY.NS", Some(102.0), Some(100.0)),
            row("SBIN.NS", Some(95.0), Some(100.0)),
            row("ITC.NS", Some(95.0), Some(100.0)),
            row("WIPRO.NS", None, None),
        ];
        let (gainers, losers) = rank_movers(&rows, 3);
        let g: Vec<&str> = gainers.iter().map(|m| m.display_symbol.as_str()).collect();
        let l: Vec<&str> = losers.iter().map(|m| m.display_symbol.as_str()).collect();
        assert_eq!(g, vec!["INFY", "TCS", "ITC"]);
        assert_eq!(l, vec!["ITC", "SBIN", "INFY"]);
        assert_eq!(gainers[0].rank, 1);
        assert_eq!(losers[2].rank, 3);
    }

    #[test]
    fn rounded_zero_changes_tie_alphabetically() {
        let rows = vec![
            row("B.NS", Some(100.0), Some(100.0)),
            row("A.NS", Some(99999.999), Some(100000.0)),
        ];
        let a = &rows[1];
        assert_eq!(a.pct_change, Some(0.0));
        assert!(a.pct_change.unwrap().is_sign_positive());
        assert!(a.net_change.unwrap().is_sign_positive());

        let (gainers, losers) = rank_movers(&rows, 2);
        let g: Vec<&str> = gainers.iter().map(|m| m.display_symbol.as_str()).collect();
        let l: Vec<&str> = losers.iter().map(|m| m.display_symbol.as_str()).collect();
        assert_eq!(g, vec!["A", "B"]);
        assert_eq!(l, vec!["A", "B"]);
    }

    fn snapshot() -> Snapshot {
        let day = NaiveDate::from_ymd_opt(2024, 10, 16).unwrap();
        let quote = |symbol: &str, close: f64, prev: f64| Quote {
            symbol: symbol.into(),
            name: symbol.into(),
            as_of: Some(day),
            close: Some(close),
            prev_close: Some(prev),
            error: None,
            history: Vec::new(),
        };
        Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            date: day,
            generated_at: day.and_hms_opt(8, 30, 0).unwrap(),
            sections: Sections {
                indian_indices: Section::available(vec![quote("^NSEI", 24971.3, 25127.95)]),
                international_indices: Section::unavailable("network unreachable: timed out"),
                currencies: Section::available(vec![]),
                commodities: Section::available(vec![quote("GC=F", 2680.0, 2660.0)]),
                crypto: Section::available(vec![quote("BTC-USD", 67000.0, 66000.0)]),
                movers: Section::available(vec![
                    quote("TCS.NS", 4100.0, 4050.0),
                    quote("ITC.NS", 490.0, 500.0),
                ]),
                news: Section::unavailable("authentication required: no API key"),
                mmi: Section::unavailable("symbol not found: ^INDIAVIX"),
                fii_dii: Section::available(FiiDiiActivity {
                    as_of: NaiveDate::from_ymd_opt(2024, 10, 15).unwrap(),
                    fii_net: -1748.72,
                    dii_net: 3081.96,
                    fii_buy: None,
                    fii_sell: None,
                    dii_buy: None,
                    dii_sell: None,
                    origin: FlowOrigin::Cache,
                }),
            },
        }
    }

    fn source() -> SourceRef {
        SourceRef {
            file: "markets_2024-10-16.json".into(),
            date: NaiveDate::from_ymd_opt(2024, 10, 16).unwrap(),
            blake3: "00".repeat(32),
        }
    }

    #[test]
    fn tables_cover_available_sections_only() {
        let ds = prepare(&snapshot(), source(), 1);
        let tables = processed_tables(&ds).unwrap();
        let names: Vec<&str> = tables.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "indian_indices",
                "currencies",
                "commodities",
                "crypto",
                "top_gainers",
                "top_losers",
                "fii_dii"
            ]
        );

        let (_, gainers) = tables.iter().find(|(n, _)| *n == "top_gainers").unwrap();
        let mut lines = gainers.lines();
        assert_eq!(
            lines.next().unwrap(),
            "rank,symbol,display_symbol,name,close,net_change,pct_change"
        );
        assert_eq!(lines.next().unwrap(), "1,TCS.NS,TCS,TCS.NS,4100,50,1.23");
        assert!(lines.next().is_none());

        let (_, flows) = tables.iter().find(|(n, _)| *n == "fii_dii").unwrap();
        assert!(flows.contains("2024-10-15,-1748.72,3081.96,1333.24,sellers,buyers,true,cache"));
    }

    #[test]
    fn table_dir_is_rebuilt_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut snap = snapshot();
        let first = write_processed_tables(&prepare(&snap, source(), 1), dir.path()).unwrap();
        assert!(first.iter().any(|p| p.ends_with("csv_2024-10-16/fii_dii.csv")));

        snap.sections.fii_dii = Section::unavailable("response format changed: html page");
        let second = write_processed_tables(&prepare(&snap, source(), 1), dir.path()).unwrap();
        assert_eq!(second.len(), first.len() - 1);
        assert!(!dir.path().join("csv_2024-10-16").join("fii_dii.csv").exists());
    }

    #[test]
    fn headlines_deduplicated_in_order() {
        let h = |t: &str| Headline {
            title: t.into(),
            source: "Mint".into(),
            url: None,
            published_at: None,
        };
        let cleaned = clean_headlines(&[
            h("Sensex  climbs\n500 points"),
            h("Rupee steady"),
            h("SENSEX CLIMBS 500 POINTS"),
            h("   "),
        ]);
        let titles: Vec<&str> = cleaned.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Sensex climbs 500 points", "Rupee steady"]);
    }

    #[test]
    fn lagging_flows_are_stale() {
        let a = FiiDiiActivity {
            as_of: NaiveDate::from_ymd_opt(2024, 10, 15).unwrap(),
            fii_net: -1748.72,
            dii_net: 3081.96,
            fii_buy: None,
            fii_sell: None,
            dii_buy: None,
            dii_sell: None,
            origin: marketbrief_core::domain::FlowOrigin::Live,
        };
        let f = flows(&a, NaiveDate::from_ymd_opt(2024, 10, 16).unwrap());
        assert!(f.stale);
        assert_eq!(f.combined_net, 1333.24);
        assert_eq!(f.fii_stance, FlowStance::Sellers);
        assert!(!flows(&a, a.as_of).stale);
    }

    fn arb_rows() -> impl Strategy<Value = Vec<QuoteRow>> {
        prop::collection::vec(
            ("[A-E]{1,2}", prop::option::of(-50i32..50)),
            0..20,
        )
        .prop_map(|items| {
            items
                .into_iter()
                .map(|(sym, delta)| {
                    row(&sym, delta.map(|d| 100.0 + d as f64), delta.map(|_| 100.0))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn ranking_is_ordered_and_capped(rows in arb_rows(), top_n in 1usize..8) {
            let (gainers, losers) = rank_movers(&rows, top_n);
            let eligible = rows.iter().filter(|r| r.pct_change.is_some()).count();
            prop_assert_eq!(gainers.len(), eligible.min(top_n));
            prop_assert_eq!(losers.len(), eligible.min(top_n));

            for pair in gainers.windows(2) {
                prop_assert!(pair[0].pct_change >= pair[1].pct_change);
                if pair[0].pct_change == pair[1].pct_change {
                    prop_assert!(pair[0].display_symbol <= pair[1].display_symbol);
                }
            }
            for pair in losers.windows(2) {
                prop_assert!(pair[0].pct_change <= pair[1].pct_change);
                if pair[0].pct_change == pair[1].pct_change {
                    prop_assert!(pair[0].display_symbol <= pair[1].display_symbol);
                }
            }
            for (i, m) in gainers.iter().enumerate() {
                prop_assert_eq!(m.rank, i + 1);
            }
        }
    }
}

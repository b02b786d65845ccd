//! Fetch stage: query every provider and write one raw snapshot.
//!
//! Providers are queried strictly in sequence. A failing provider never
//! aborts the run: its section is written as unavailable with the error
//! message as the reason, and every other section is kept.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use marketbrief_core::config::{Instrument, PipelineConfig};
use marketbrief_core::data::{
    FetchWindow, FlowProvider, MoodProvider, NewsProvider, ProviderError, QuoteProvider,
};
use marketbrief_core::domain::{
    FiiDiiActivity, FlowOrigin, Headline, Quote, QuoteSection, Section, Sections, Snapshot,
    SNAPSHOT_SCHEMA_VERSION,
};

/// File the last successful FII/DII record is kept in, under the raw dir.
pub const FLOW_CACHE_FILE: &str = "fii_dii_cache.json";

/// The provider set one fetch run uses.
pub struct Providers<'a> {
    pub quotes: &'a dyn QuoteProvider,
    pub news: &'a dyn NewsProvider,
    pub flows: &'a dyn FlowProvider,
    pub mood: &'a dyn MoodProvider,
}

/// Query every configured source and assemble the snapshot for `date`.
///
/// `generated_at` is recorded as-is; the caller supplies the clock.
pub fn fetch_snapshot(
    config: &PipelineConfig,
    providers: &Providers<'_>,
    date: NaiveDate,
    generated_at: NaiveDateTime,
) -> Snapshot {
    let window = FetchWindow::ending_on(date, config.quotes.history_days);
    let history_len = config.quotes.history_days;

    let quotes = |section: QuoteSection| {
        let instruments = instruments_for(config, section);
        fetch_quote_section(providers.quotes, section, instruments, window, history_len)
    };
    let indian_indices = quotes(QuoteSection::IndianIndices);
    let international_indices = quotes(QuoteSection::InternationalIndices);
    let currencies = quotes(QuoteSection::Currencies);
    let commodities = quotes(QuoteSection::Commodities);
    let crypto = quotes(QuoteSection::Crypto);
    let movers = quotes(QuoteSection::Movers);

    let news = section_from(
        "news",
        providers.news.name(),
        providers.news.fetch_headlines(&config.news, date),
    );
    let mmi = section_from("mmi", providers.mood.name(), providers.mood.fetch_mood(window));
    let fii_dii = section_from(
        "fii_dii",
        providers.flows.name(),
        providers.flows.fetch_activity(),
    );

    Snapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        date,
        generated_at,
        sections: Sections {
            indian_indices,
            international_indices,
            currencies,
            commodities,
            crypto,
            movers,
            news,
            mmi,
            fii_dii,
        },
    }
}

fn instruments_for(config: &PipelineConfig, section: QuoteSection) -> &[Instrument] {
    match section {
        QuoteSection::IndianIndices => &config.indian_indices,
        QuoteSection::InternationalIndices => &config.international_indices,
        QuoteSection::Currencies => &config.currencies,
        QuoteSection::Commodities => &config.commodities,
        QuoteSection::Crypto => &config.crypto,
        QuoteSection::Movers => &config.movers.universe,
    }
}

/// Fetch one quote list. Individual failures become placeholder rows; the
/// section is unavailable only when every instrument failed.
fn fetch_quote_section(
    provider: &dyn QuoteProvider,
    section: QuoteSection,
    instruments: &[Instrument],
    window: FetchWindow,
    history_len: usize,
) -> Section<Vec<Quote>> {
    let mut quotes = Vec::with_capacity(instruments.len());
    let mut first_error: Option<String> = None;

    for instrument in instruments {
        match provider.fetch_quote(instrument, window, history_len) {
            Ok(quote) => quotes.push(quote),
            Err(e) => {
                log::warn!("{}: {} failed: {e}", section.key(), instrument.symbol);
                let reason = e.to_string();
                first_error.get_or_insert_with(|| reason.clone());
                quotes.push(Quote::unavailable(instrument, reason));
            }
        }
    }

    let ok = quotes.iter().filter(|q| q.is_available()).count();
    if !instruments.is_empty() && ok == 0 {
        let reason = first_error.unwrap_or_else(|| "no instrument returned data".into());
        log::warn!("{}: section unavailable ({reason})", section.key());
        return Section::unavailable(reason);
    }
    log::info!("{}: {ok}/{} instruments", section.key(), instruments.len());
    Section::available(quotes)
}

fn section_from<T>(key: &str, provider: &str, result: Result<T, ProviderError>) -> Section<T> {
    match result {
        Ok(data) => {
            log::info!("{key}: fetched from {provider}");
            Section::available(data)
        }
        Err(e) => {
            log::warn!("{key}: {provider} unavailable: {e}");
            Section::unavailable(e.to_string())
        }
    }
}

// ─── FII/DII fallback cache ─────────────────────────────────────────

/// Wraps a flow provider with a last-known-good record on disk.
///
/// A successful fetch refreshes the cache. A failed fetch returns the cached
/// record tagged [`FlowOrigin::Cache`]; with no cache the original error is
/// returned.
pub struct CachedFlowProvider<'a> {
    inner: &'a dyn FlowProvider,
    path: PathBuf,
}

impl<'a> CachedFlowProvider<'a> {
    pub fn new(inner: &'a dyn FlowProvider, raw_dir: &Path) -> Self {
        Self {
            inner,
            path: raw_dir.join(FLOW_CACHE_FILE),
        }
    }

    fn load(&self) -> Option<FiiDiiActivity> {
        let bytes = std::fs::read(&self.path).ok()?;
        match serde_json::from_slice::<FiiDiiActivity>(&bytes) {
            Ok(activity) => Some(activity),
            Err(e) => {
                log::warn!("ignoring unreadable {}: {e}", self.path.display());
                None
            }
        }
    }

    fn store(&self, activity: &FiiDiiActivity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(activity)
            .context("failed to serialize FII/DII cache record")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl FlowProvider for CachedFlowProvider<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch_activity(&self) -> Result<FiiDiiActivity, ProviderError> {
        match self.inner.fetch_activity() {
            Ok(activity) => {
                if let Err(e) = self.store(&activity) {
                    log::warn!("FII/DII cache not updated: {e:#}");
                }
                Ok(activity)
            }
            Err(e) => match self.load() {
                Some(mut cached) => {
                    log::warn!(
                        "fii_dii: {e}; using cached record from {}",
                        cached.as_of
                    );
                    cached.origin = FlowOrigin::Cache;
                    Ok(cached)
                }
                None => Err(e),
            },
        }
    }
}

// ─── Writing ────────────────────────────────────────────────────────

/// Paths written by [`write_snapshot`].
#[derive(Debug, Clone)]
pub struct WrittenSnapshot {
    pub json_path: PathBuf,
    pub csv_dir: PathBuf,
    pub csv_files: Vec<PathBuf>,
}

/// Write `markets_<date>.json` and one CSV per available tabular section
/// under `csv_<date>/`.
pub fn write_snapshot(snapshot: &Snapshot, raw_dir: &Path) -> Result<WrittenSnapshot> {
    std::fs::create_dir_all(raw_dir)
        .with_context(|| format!("failed to create raw dir: {}", raw_dir.display()))?;

    let json_path = raw_dir.join(Snapshot::file_name(snapshot.date));
    let json = serde_json::to_string_pretty(snapshot).context("failed to serialize snapshot")?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    // The CSV set traces to exactly one snapshot: drop tables from an earlier
    // fetch of the same date
    let csv_dir = raw_dir.join(format!("csv_{}", snapshot.date.format("%Y-%m-%d")));
    if csv_dir.exists() {
        std::fs::remove_dir_all(&csv_dir)
            .with_context(|| format!("failed to clear {}", csv_dir.display()))?;
    }
    std::fs::create_dir_all(&csv_dir)
        .with_context(|| format!("failed to create {}", csv_dir.display()))?;

    let mut tables: Vec<(&str, String)> = Vec::new();
    for section in QuoteSection::ALL {
        if let Some(quotes) = snapshot.sections.quotes(section).data() {
            tables.push((section.key(), quotes_csv(quotes)?));
        }
    }
    if let Some(headlines) = snapshot.sections.news.data() {
        tables.push(("news", news_csv(headlines)?));
    }
    if let Some(activity) = snapshot.sections.fii_dii.data() {
        tables.push(("fii_dii", flows_csv(activity)?));
    }

    let mut csv_files = Vec::with_capacity(tables.len());
    for (name, body) in tables {
        let path = csv_dir.join(format!("{name}.csv"));
        std::fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        csv_files.push(path);
    }

    Ok(WrittenSnapshot {
        json_path,
        csv_dir,
        csv_files,
    })
}

fn opt_num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn quotes_csv(quotes: &[Quote]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["symbol", "name", "as_of", "close", "prev_close", "error"])?;
    for q in quotes {
        wtr.write_record([
            q.symbol.as_str(),
            q.name.as_str(),
            &q.as_of.map(|d| d.to_string()).unwrap_or_default(),
            &opt_num(q.close),
            &opt_num(q.prev_close),
            q.error.as_deref().unwrap_or(""),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn news_csv(headlines: &[Headline]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["title", "source", "url", "published_at"])?;
    for h in headlines {
        wtr.write_record([
            h.title.as_str(),
            h.source.as_str(),
            h.url.as_deref().unwrap_or(""),
            &h.published_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn flows_csv(a: &FiiDiiActivity) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["as_of", "category", "buy", "sell", "net", "origin"])?;
    let origin = match a.origin {
        FlowOrigin::Live => "live",
        FlowOrigin::Cache => "cache",
    };
    let as_of = a.as_of.to_string();
    wtr.write_record([
        as_of.as_str(),
        "FII/FPI",
        &opt_num(a.fii_buy),
        &opt_num(a.fii_sell),
        &a.fii_net.to_string(),
        origin,
    ])?;
    wtr.write_record([
        as_of.as_str(),
        "DII",
        &opt_num(a.dii_buy),
        &opt_num(a.dii_sell),
        &a.dii_net.to_string(),
        origin,
    ])?;
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Stage entry point ──────────────────────────────────────────────

/// Result of a fetch run, for the CLI summary.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub date: NaiveDate,
    pub written: WrittenSnapshot,
    /// `(section, reason)` for every section written as unavailable.
    pub unavailable: Vec<(&'static str, String)>,
}

/// Fetch, then write the snapshot under `config.paths.raw_dir`.
///
/// The FII/DII provider is wrapped with the on-disk fallback cache.
pub fn run_fetch(
    config: &PipelineConfig,
    providers: &Providers<'_>,
    date: NaiveDate,
    generated_at: NaiveDateTime,
) -> Result<FetchOutcome> {
    let raw_dir = &config.paths.raw_dir;
    log::info!(
        "fetching {} instruments for {date} into {}",
        config.instrument_count(),
        raw_dir.display()
    );

    let flows = CachedFlowProvider::new(providers.flows, raw_dir);
    let cached = Providers {
        quotes: providers.quotes,
        news: providers.news,
        flows: &flows,
        mood: providers.mood,
    };
    let snapshot = fetch_snapshot(config, &cached, date, generated_at);
    let written = write_snapshot(&snapshot, raw_dir)?;
    log::info!("wrote {}", written.json_path.display());

    Ok(FetchOutcome {
        date,
        written,
        unavailable: unavailable_sections(&snapshot.sections),
    })
}

/// Sections recorded as unavailable, with their reasons.
pub fn unavailable_sections(sections: &Sections) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    for section in QuoteSection::ALL {
        if let Some(reason) = sections.quotes(section).reason() {
            out.push((section.key(), reason.to_string()));
        }
    }
    let others = [
        ("news", sections.news.reason()),
        ("mmi", sections.mmi.reason()),
        ("fii_dii", sections.fii_dii.reason()),
    ];
    for (key, reason) in others {
        if let Some(reason) = reason {
            out.push((key, reason.to_string()));
        }
    }
    out
}

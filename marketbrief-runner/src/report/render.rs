//! Report layout: which sections go where, in what order.

use marketbrief_core::config::ReportConfig;
use marketbrief_core::domain::{
    ClosePoint, FlowOrigin, FlowSummary, Headline, MoodSummary, Movers, ProcessedDataset,
    QuoteSection, QuoteTable, RankedMover, Section, SectionSummary,
};

use super::charts;
use super::layout::{
    Align, Cell, Column, Font, Layout, RenderedReport, BLACK, CONTENT_WIDTH, GREY, MARGIN,
    ROW_HEIGHT, TITLE_BLUE,
};

const QUOTE_COLUMNS: [Column; 6] = [
    Column::left("Symbol", 80.0),
    Column::left("Name", 150.0),
    Column::right("Close", 80.0),
    Column::right("Prev Close", 80.0),
    Column::right("Change", 60.0),
    Column::right("% Change", 61.0),
];

const MOVER_COLUMNS: [Column; 6] = [
    Column::right("#", 30.0),
    Column::left("Symbol", 90.0),
    Column::left("Name", 201.0),
    Column::right("Close", 80.0),
    Column::right("Change", 55.0),
    Column::right("% Change", 55.0),
];

const DESCRIPTION: &str = "A daily overview of key financial markets: Indian and international \
    indices, currencies, commodities, cryptocurrencies, top movers, market mood and \
    institutional investor activity.";

/// How one quote section is drawn beyond its table.
#[derive(Debug, Clone, Copy)]
struct Extras {
    bar_chart: bool,
    history: bool,
}

const WITH_CHARTS: Extras = Extras {
    bar_chart: true,
    history: true,
};

const TABLE_ONLY: Extras = Extras {
    bar_chart: false,
    history: false,
};

/// Lay out the whole report. Deterministic for a given dataset and config.
pub fn render_pdf(dataset: &ProcessedDataset, config: &ReportConfig) -> RenderedReport {
    let mut r = Renderer {
        layout: Layout::new(config.max_pages),
        config,
    };

    r.title_page(dataset);

    r.layout.page_break();
    r.quote_section(
        QuoteSection::IndianIndices,
        &dataset.indian_indices,
        WITH_CHARTS,
    );

    r.layout.page_break();
    r.quote_section(
        QuoteSection::InternationalIndices,
        &dataset.international_indices,
        WITH_CHARTS,
    );

    r.layout.page_break();
    r.quote_section(QuoteSection::Currencies, &dataset.currencies, TABLE_ONLY);
    r.layout.space(10.0);
    r.quote_section(QuoteSection::Commodities, &dataset.commodities, WITH_CHARTS);

    r.layout.page_break();
    r.quote_section(QuoteSection::Crypto, &dataset.crypto, TABLE_ONLY);
    r.layout.space(10.0);
    r.movers(&dataset.movers);

    r.layout.page_break();
    r.mood(dataset.mood.as_ref());

    r.layout.page_break();
    r.news(&dataset.news);
    r.layout.space(10.0);
    r.flows(&dataset.fii_dii);

    let footer = format!("{} - {}", config.title, dataset.date.format("%d %b %Y"));
    let title = format!("{} {}", config.title, dataset.date.format("%Y-%m-%d"));
    r.layout.finish(&title, &footer)
}

struct Renderer<'a> {
    layout: Layout,
    config: &'a ReportConfig,
}

impl Renderer<'_> {
    fn title_page(&mut self, dataset: &ProcessedDataset) {
        let l = &mut self.layout;
        l.space(150.0);
        if let Some(top) = l.reserve(40.0) {
            l.text_in(
                MARGIN,
                CONTENT_WIDTH,
                top - 28.0,
                26.0,
                Font::Bold,
                TITLE_BLUE,
                Align::Center,
                &self.config.title,
            );
        }
        l.space(8.0);
        l.paragraph_at(
            MARGIN,
            CONTENT_WIDTH,
            &format!("Market date: {}", dataset.date.format("%A, %d %B %Y")),
            12.0,
            Font::Bold,
            BLACK,
            Align::Center,
        );
        l.paragraph_at(
            MARGIN,
            CONTENT_WIDTH,
            &format!(
                "Data fetched at: {}",
                dataset.generated_at.format("%Y-%m-%d %H:%M:%S")
            ),
            10.0,
            Font::Regular,
            BLACK,
            Align::Center,
        );
        l.space(16.0);
        l.paragraph_at(
            MARGIN + 40.0,
            CONTENT_WIDTH - 80.0,
            DESCRIPTION,
            11.0,
            Font::Regular,
            GREY,
            Align::Center,
        );
        l.space(30.0);

        let status = section_status(dataset);
        let style = &self.config.style;
        let rows: Vec<Vec<Cell>> = status
            .into_iter()
            .map(|(name, reason)| match reason {
                None => vec![
                    Cell::plain(name),
                    Cell::colored("Available", style.positive),
                ],
                Some(reason) => vec![
                    Cell::plain(name),
                    Cell::colored(format!("Unavailable: {reason}"), style.negative),
                ],
            })
            .collect();
        let columns = [
            Column::left("Section", 160.0),
            Column::left("Status", CONTENT_WIDTH - 160.0),
        ];
        l.table(&columns, &rows, style.header, style.grid);
        l.space(12.0);
        let short_hash: String = dataset.source.blake3.chars().take(16).collect();
        l.paragraph(
            &format!("Source snapshot: {} (blake3 {short_hash})", dataset.source.file),
            8.0,
            Font::Regular,
            GREY,
        );
    }

    fn unavailable(&mut self, reason: &str) {
        self.layout.paragraph(&format!("Data unavailable: {reason}"), 10.0, Font::Regular, GREY);
    }

    fn quote_section(
        &mut self,
        section: QuoteSection,
        table: &Section<QuoteTable>,
        extras: Extras,
    ) {
        self.layout.heading(section.title(), ROW_HEIGHT * 2.0);
        let table = match table {
            Section::Available { data } => data,
            Section::Unavailable { reason } => return self.unavailable(reason),
        };
        if table.rows.is_empty() {
            self.layout.paragraph("No instruments configured.", 10.0, Font::Regular, GREY);
            return;
        }

        let style = &self.config.style;
        let rows: Vec<Vec<Cell>> = table
            .rows
            .iter()
            .map(|row| {
                let tone = change_color(row.pct_change, style.positive, style.negative);
                let pct = row
                    .pct_change
                    .map(|p| format!("{p:+.2}%"))
                    .unwrap_or_else(|| "n/a".into());
                vec![
                    Cell::plain(&row.display_symbol),
                    Cell::plain(&row.name),
                    Cell::plain(opt_amount(row.close)),
                    Cell::plain(opt_amount(row.prev_close)),
                    Cell {
                        text: opt_signed(row.net_change),
                        color: tone,
                    },
                    Cell {
                        text: pct,
                        color: tone,
                    },
                ]
            })
            .collect();
        self.layout.table(&QUOTE_COLUMNS, &rows, style.header, style.grid);
        self.layout.paragraph(&summary_line(&table.summary), 8.5, Font::Regular, GREY);

        if extras.bar_chart {
            let bars: Vec<(String, f64)> = table
                .rows
                .iter()
                .filter_map(|r| Some((r.display_symbol.clone(), r.pct_change?)))
                .collect();
            self.layout.space(6.0);
            let title = format!("{} - % change", section.title());
            charts::pct_bar_chart(&mut self.layout, &title, &bars, style);
        }
        if extras.history {
            let histories: Vec<(String, &[ClosePoint])> = table
                .rows
                .iter()
                .filter(|r| !r.history.is_empty())
                .map(|r| (format!("{} - closing prices", r.name), r.history.as_slice()))
                .collect();
            if !histories.is_empty() {
                self.layout.space(6.0);
                charts::history_grid(&mut self.layout, &histories, style);
            }
        }
    }

    fn movers(&mut self, movers: &Section<Movers>) {
        let movers = match movers {
            Section::Available { data } => data,
            Section::Unavailable { reason } => {
                self.layout.heading("Top Gainers / Losers", ROW_HEIGHT);
                return self.unavailable(reason);
            }
        };
        self.layout.heading(&format!("Top {} Gainers", movers.top_n), ROW_HEIGHT * 2.0);
        self.mover_table(&movers.gainers);
        self.layout.space(8.0);
        self.layout.heading(&format!("Top {} Losers", movers.top_n), ROW_HEIGHT * 2.0);
        self.mover_table(&movers.losers);
        self.layout.paragraph(
            &format!("Universe: {}", summary_line(&movers.summary)),
            8.5,
            Font::Regular,
            GREY,
        );
    }

    fn mover_table(&mut self, ranked: &[RankedMover]) {
        if ranked.is_empty() {
            self.layout.paragraph("No ranked instruments.", 10.0, Font::Regular, GREY);
            return;
        }
        let style = &self.config.style;
        let rows: Vec<Vec<Cell>> = ranked
            .iter()
            .map(|m| {
                let tone = change_color(Some(m.pct_change), style.positive, style.negative);
                vec![
                    Cell::plain(m.rank.to_string()),
                    Cell::plain(&m.display_symbol),
                    Cell::plain(&m.name),
                    Cell::plain(amount(m.close)),
                    Cell {
                        text: signed(m.net_change),
                        color: tone,
                    },
                    Cell {
                        text: format!("{:+.2}%", m.pct_change),
                        color: tone,
                    },
                ]
            })
            .collect();
        self.layout.table(&MOVER_COLUMNS, &rows, style.header, style.grid);
    }

    fn mood(&mut self, mood: Option<&MoodSummary>) {
        self.layout.heading("Market Mood Index", 200.0);
        let Some(mood) = mood else {
            self.layout.paragraph(
                "Market mood unavailable: no volatility index reading for this date.",
                10.0,
                Font::Regular,
                GREY,
            );
            return;
        };
        charts::mood_gauge(&mut self.layout, mood);
        let change = mood
            .vix_pct_change
            .map(|p| format!(" ({p:+.2}%)"))
            .unwrap_or_default();
        self.layout.paragraph_at(
            MARGIN,
            CONTENT_WIDTH,
            &format!(
                "{}: {:.2}{change}, as of {}",
                mood.source_symbol,
                mood.vix_close,
                mood.as_of.format("%d-%b-%Y")
            ),
            10.0,
            Font::Regular,
            BLACK,
            Align::Center,
        );
        self.layout.space(10.0);
        charts::mood_legend(&mut self.layout);
    }

    fn news(&mut self, news: &Section<Vec<Headline>>) {
        self.layout.heading("Market News", 30.0);
        let headlines = match news {
            Section::Available { data } => data,
            Section::Unavailable { reason } => return self.unavailable(reason),
        };
        if headlines.is_empty() {
            self.layout.paragraph("No headlines for this date.", 10.0, Font::Regular, GREY);
            return;
        }
        for h in headlines {
            let published = h
                .published_at
                .map(|t| format!(", {}", t.format("%Y-%m-%d")))
                .unwrap_or_default();
            self.layout.paragraph(
                &format!("- {} ({}{published})", h.title, h.source),
                10.0,
                Font::Regular,
                BLACK,
            );
            self.layout.space(4.0);
        }
    }

    fn flows(&mut self, flows: &Section<FlowSummary>) {
        self.layout.heading("FII/DII Activity", 60.0);
        let f = match flows {
            Section::Available { data } => data,
            Section::Unavailable { reason } => return self.unavailable(reason),
        };
        let mut header = format!("Last available data ({}):", f.as_of.format("%d-%b-%Y"));
        if f.stale {
            header.push_str(" published before the report date.");
        }
        if f.origin == FlowOrigin::Cache {
            header.push_str(" Live fetch failed; showing the last cached figures.");
        }
        self.layout.paragraph(&header, 10.0, Font::Regular, BLACK);
        let style = &self.config.style;
        let investors = [
            ("FII", f.fii_net, f.fii_stance),
            ("DII", f.dii_net, f.dii_stance),
        ];
        for (who, net, stance) in investors {
            let color = change_color(Some(net), style.positive, style.negative).unwrap_or(BLACK);
            self.layout.paragraph(
                &format!(
                    "{who} were net {} of Rs {} Cr.",
                    stance.label(),
                    grouped(net.abs(), 0)
                ),
                10.0,
                Font::Regular,
                color,
            );
        }
        self.layout.paragraph(
            &format!("Combined net flow: Rs {} Cr.", signed_grouped(f.combined_net, 0)),
            10.0,
            Font::Bold,
            BLACK,
        );
    }
}

/// `(section title, unavailable reason)` for every section, in report order.
fn section_status(d: &ProcessedDataset) -> Vec<(&'static str, Option<String>)> {
    let mut out: Vec<(&'static str, Option<String>)> = QuoteSection::ALL
        .iter()
        .filter_map(|&s| d.table(s).map(|t| (s.title(), t.reason().map(str::to_string))))
        .collect();
    out.push(("Top Gainers / Losers", d.movers.reason().map(str::to_string)));
    out.push((
        "Market Mood Index",
        d.mood.is_none().then(|| "no volatility index reading".to_string()),
    ));
    out.push(("Market News", d.news.reason().map(str::to_string)));
    out.push(("FII/DII Activity", d.fii_dii.reason().map(str::to_string)));
    out
}

fn summary_line(s: &SectionSummary) -> String {
    let mut line = format!(
        "{} up, {} down, {} unchanged",
        s.advancers, s.decliners, s.unchanged
    );
    if s.missing > 0 {
        line.push_str(&format!(", {} without data", s.missing));
    }
    if let Some(mean) = s.mean_pct_change {
        line.push_str(&format!(". Mean change {mean:+.2}%"));
    }
    line
}

fn change_color(change: Option<f64>, positive: [u8; 3], negative: [u8; 3]) -> Option<[u8; 3]> {
    match change {
        Some(c) if c > 0.0 => Some(positive),
        Some(c) if c < 0.0 => Some(negative),
        _ => None,
    }
}

/// Fixed-point with thousands separators: `24971.3` -> `24,971.30`.
pub fn grouped(v: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, v.abs());
    let (int, frac) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let mut out = String::with_capacity(fixed.len() + int.len() / 3 + 1);
    if v < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn signed_grouped(v: f64, decimals: usize) -> String {
    if v > 0.0 {
        format!("+{}", grouped(v, decimals))
    } else {
        grouped(v, decimals)
    }
}

fn amount(v: f64) -> String {
    grouped(v, 2)
}

fn signed(v: f64) -> String {
    signed_grouped(v, 2)
}

fn opt_amount(v: Option<f64>) -> String {
    v.map(amount).unwrap_or_else(|| "n/a".into())
}

fn opt_signed(v: Option<f64>) -> String {
    v.map(signed).unwrap_or_else(|| "n/a".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(grouped(24971.3, 2), "24,971.30");
        assert_eq!(grouped(-1748.72, 0), "-1,749");
        assert_eq!(grouped(999.0, 0), "999");
        assert_eq!(grouped(1_234_567.891, 1), "1,234,567.9");
        assert_eq!(grouped(-0.001, 2), "0.00");
        assert_eq!(signed_grouped(1333.24, 0), "+1,333");
    }

    #[test]
    fn summary_mentions_missing_rows() {
        let s = SectionSummary {
            count: 4,
            advancers: 2,
            decliners: 1,
            unchanged: 0,
            missing: 1,
            mean_pct_change: Some(0.42),
        };
        assert_eq!(
            summary_line(&s),
            "2 up, 1 down, 0 unchanged, 1 without data. Mean change +0.42%"
        );
    }
}

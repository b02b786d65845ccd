//! Page layout on top of `pdf-writer`.
//!
//! A [`Layout`] owns one content stream per page and a vertical cursor.
//! Callers reserve space before drawing; when the current page is full a new
//! one is started, unless the page cap has been reached, in which case the
//! layout is marked truncated and every later draw becomes a no-op.

use marketbrief_core::config::Rgb;
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

/// A4 portrait in points.
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 42.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Band at the bottom of every page kept free for the footer.
const FOOTER_BAND: f32 = 28.0;
pub const ROW_HEIGHT: f32 = 15.0;

const REGULAR: Name<'static> = Name(b"F1");
const BOLD: Name<'static> = Name(b"F2");

pub const BLACK: Rgb = [0, 0, 0];
pub const GREY: Rgb = [110, 110, 110];
pub const TITLE_BLUE: Rgb = [0, 51, 102];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn name(self) -> Name<'static> {
        match self {
            Font::Regular => REGULAR,
            Font::Bold => BOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

/// A table column: header text, width in points and alignment.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub title: &'static str,
    pub width: f32,
    pub align: Align,
}

impl Column {
    pub const fn left(title: &'static str, width: f32) -> Self {
        Column {
            title,
            width,
            align: Align::Left,
        }
    }

    pub const fn right(title: &'static str, width: f32) -> Self {
        Column {
            title,
            width,
            align: Align::Right,
        }
    }
}

/// One table cell with an optional text colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub color: Option<Rgb>,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Cell {
            text: text.into(),
            color: None,
        }
    }

    pub fn colored(text: impl Into<String>, color: Rgb) -> Self {
        Cell {
            text: text.into(),
            color: Some(color),
        }
    }
}

/// The finished document.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Content was dropped to stay within the page cap.
    pub truncated: bool,
}

pub struct Layout {
    pages: Vec<Content>,
    /// Whether anything has been drawn on the last page.
    dirty: bool,
    y: f32,
    max_pages: usize,
    truncated: bool,
}

impl Layout {
    pub fn new(max_pages: usize) -> Self {
        Self {
            pages: vec![Content::new()],
            dirty: false,
            y: Self::top(),
            max_pages: max_pages.max(1),
            truncated: false,
        }
    }

    pub fn top() -> f32 {
        PAGE_HEIGHT - MARGIN
    }

    pub fn bottom() -> f32 {
        MARGIN + FOOTER_BAND
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= Self::bottom()
    }

    /// Start a new page. Returns `false` (and marks the layout truncated)
    /// when the cap is reached.
    pub fn new_page(&mut self) -> bool {
        if self.truncated {
            return false;
        }
        if self.pages.len() >= self.max_pages {
            self.truncated = true;
            return false;
        }
        self.pages.push(Content::new());
        self.y = Self::top();
        self.dirty = false;
        true
    }

    /// Move to a fresh page unless the current one is still empty.
    pub fn page_break(&mut self) {
        if self.dirty {
            self.new_page();
        }
    }

    /// Make sure `height` fits on the current page, breaking if needed.
    pub fn ensure(&mut self, height: f32) -> bool {
        if self.truncated {
            return false;
        }
        if self.fits(height) || !self.dirty {
            return true;
        }
        self.new_page()
    }

    /// Reserve a block of `height` and return the y of its top edge.
    pub fn reserve(&mut self, height: f32) -> Option<f32> {
        if !self.ensure(height) {
            return None;
        }
        let top = self.y;
        self.y -= height;
        self.dirty = true;
        Some(top)
    }

    /// Vertical gap; never breaks a page on its own.
    pub fn space(&mut self, height: f32) {
        self.y = (self.y - height).max(Self::bottom());
    }

    fn content(&mut self) -> &mut Content {
        // `pages` starts with one page and only ever grows
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    // ─── Primitives ─────────────────────────────────────────────────

    pub fn text(&mut self, x: f32, y: f32, size: f32, font: Font, color: Rgb, text: &str) {
        let clean = sanitize(text);
        let c = self.content();
        set_fill(c, color);
        c.begin_text();
        c.set_font(font.name(), size);
        c.next_line(x, y);
        c.show(Str(clean.as_bytes()));
        c.end_text();
    }

    /// Text aligned inside the span `[x, x + width]`.
    #[allow(clippy::too_many_arguments)]
    pub fn text_in(
        &mut self,
        x: f32,
        width: f32,
        y: f32,
        size: f32,
        font: Font,
        color: Rgb,
        align: Align,
        text: &str,
    ) {
        let fitted = fit_to_width(text, size, font, width);
        let w = text_width(&fitted, size, font);
        let tx = match align {
            Align::Left => x,
            Align::Right => x + width - w,
            Align::Center => x + (width - w) / 2.0,
        };
        self.text(tx, y, size, font, color, &fitted);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let c = self.content();
        set_fill(c, color);
        c.rect(x, y, w, h);
        c.fill_nonzero();
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb, width: f32) {
        let c = self.content();
        set_stroke(c, color);
        c.set_line_width(width);
        c.rect(x, y, w, h);
        c.stroke();
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32) {
        self.polyline(&[from, to], color, width);
    }

    pub fn polyline(&mut self, points: &[(f32, f32)], color: Rgb, width: f32) {
        let Some((&(x0, y0), rest)) = points.split_first() else {
            return;
        };
        let c = self.content();
        set_stroke(c, color);
        c.set_line_width(width);
        c.move_to(x0, y0);
        for &(x, y) in rest {
            c.line_to(x, y);
        }
        c.stroke();
    }

    /// Closed, filled polygon.
    pub fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgb) {
        let Some((&(x0, y0), rest)) = points.split_first() else {
            return;
        };
        let c = self.content();
        set_fill(c, color);
        c.move_to(x0, y0);
        for &(x, y) in rest {
            c.line_to(x, y);
        }
        c.close_path();
        c.fill_nonzero();
    }

    // ─── Flow elements ──────────────────────────────────────────────

    /// A section heading, kept on the same page as the next `keep` points.
    pub fn heading(&mut self, text: &str, keep: f32) {
        if !self.ensure(24.0 + keep) {
            return;
        }
        if let Some(top) = self.reserve(24.0) {
            self.text(MARGIN, top - 16.0, 14.0, Font::Bold, TITLE_BLUE, text);
        }
    }

    /// Word-wrapped text across the content width.
    pub fn paragraph(&mut self, text: &str, size: f32, font: Font, color: Rgb) {
        self.paragraph_at(MARGIN, CONTENT_WIDTH, text, size, font, color, Align::Left);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn paragraph_at(
        &mut self,
        x: f32,
        width: f32,
        text: &str,
        size: f32,
        font: Font,
        color: Rgb,
        align: Align,
    ) {
        let leading = size * 1.35;
        for line in wrap(text, size, font, width) {
            let Some(top) = self.reserve(leading) else {
                return;
            };
            self.text_in(x, width, top - size, size, font, color, align, &line);
        }
    }

    /// A bordered table whose header row repeats on continuation pages.
    pub fn table(&mut self, columns: &[Column], rows: &[Vec<Cell>], header_fill: Rgb, grid: Rgb) {
        if !self.ensure(ROW_HEIGHT * 2.0) {
            return;
        }
        let width: f32 = columns.iter().map(|c| c.width).sum();
        self.table_header(columns, width, header_fill, grid);

        for row in rows {
            if !self.fits(ROW_HEIGHT) {
                if !self.new_page() {
                    return;
                }
                self.table_header(columns, width, header_fill, grid);
            }
            let Some(top) = self.reserve(ROW_HEIGHT) else {
                return;
            };
            self.stroke_rect(MARGIN, top - ROW_HEIGHT, width, ROW_HEIGHT, grid, 0.4);
            let mut x = MARGIN;
            for (col, cell) in columns.iter().zip(row) {
                let color = cell.color.unwrap_or(BLACK);
                self.text_in(
                    x + 4.0,
                    col.width - 8.0,
                    top - 10.5,
                    8.5,
                    Font::Regular,
                    color,
                    col.align,
                    &cell.text,
                );
                x += col.width;
            }
        }
    }

    fn table_header(&mut self, columns: &[Column], width: f32, fill: Rgb, grid: Rgb) {
        let Some(top) = self.reserve(ROW_HEIGHT) else {
            return;
        };
        self.fill_rect(MARGIN, top - ROW_HEIGHT, width, ROW_HEIGHT, fill);
        self.stroke_rect(MARGIN, top - ROW_HEIGHT, width, ROW_HEIGHT, grid, 0.4);
        let mut x = MARGIN;
        for col in columns {
            self.text_in(
                x + 4.0,
                col.width - 8.0,
                top - 10.5,
                8.5,
                Font::Bold,
                BLACK,
                col.align,
                col.title,
            );
            x += col.width;
        }
    }

    // ─── Output ─────────────────────────────────────────────────────

    /// Stamp footers (and the truncation note) and serialize the document.
    pub fn finish(mut self, title: &str, footer: &str) -> RenderedReport {
        let total = self.pages.len();
        let truncated = self.truncated;
        let max_pages = self.max_pages;

        for (i, page) in self.pages.iter_mut().enumerate() {
            let label = format!("{footer}   |   Page {} of {total}", i + 1);
            draw_text(page, MARGIN, MARGIN - 14.0, 7.5, Font::Regular, GREY, &label);
        }
        if truncated {
            let note = format!(
                "Report truncated: the {max_pages}-page limit was reached and remaining sections were omitted."
            );
            if let Some(last) = self.pages.last_mut() {
                draw_text(last, MARGIN, MARGIN + 6.0, 8.0, Font::Bold, [160, 0, 0], &note);
            }
        }

        RenderedReport {
            bytes: write_pdf(self.pages, title),
            page_count: total,
            truncated,
        }
    }
}

fn set_fill(c: &mut Content, [r, g, b]: Rgb) {
    c.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

fn set_stroke(c: &mut Content, [r, g, b]: Rgb) {
    c.set_stroke_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
}

fn draw_text(c: &mut Content, x: f32, y: f32, size: f32, font: Font, color: Rgb, text: &str) {
    let clean = sanitize(text);
    set_fill(c, color);
    c.begin_text();
    c.set_font(font.name(), size);
    c.next_line(x, y);
    c.show(Str(clean.as_bytes()));
    c.end_text();
}

fn write_pdf(pages: Vec<Content>, title: &str) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let regular_id = Ref::new(3);
    let bold_id = Ref::new(4);
    let info_id = Ref::new(5);
    let page_ids: Vec<(Ref, Ref)> = (0..pages.len() as i32)
        .map(|i| (Ref::new(6 + 2 * i), Ref::new(7 + 2 * i)))
        .collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().map(|(page, _)| *page))
        .count(page_ids.len() as i32);

    for ((page_id, content_id), content) in page_ids.iter().zip(pages) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(tree_id);
        page.contents(*content_id);
        page.resources()
            .fonts()
            .pair(REGULAR, regular_id)
            .pair(BOLD, bold_id);
        page.finish();
        pdf.stream(*content_id, &content.finish());
    }

    pdf.type1_font(regular_id).base_font(Name(b"Helvetica"));
    pdf.type1_font(bold_id).base_font(Name(b"Helvetica-Bold"));
    let clean_title = sanitize(title);
    pdf.document_info(info_id).title(TextStr(&clean_title));
    pdf.finish()
}

// ─── Text metrics ───────────────────────────────────────────────────

/// Reduce text to printable ASCII so it renders with the standard fonts.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            ' '..='~' => out.push(ch),
            '\t' | '\n' | '\r' => out.push(' '),
            '\u{20B9}' => out.push_str("Rs "),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            c if c.is_control() => {}
            _ => out.push('?'),
        }
    }
    out
}

/// Approximate Helvetica advance width in thousandths of the font size.
fn glyph_width(ch: char) -> f32 {
    match ch {
        '0'..='9' => 556.0,
        ' ' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' | 'i' | 'j' | 'l' | 'I' => 278.0,
        '-' | '(' | ')' | '[' | ']' | '/' | 'f' | 'r' | 't' => 333.0,
        '%' => 889.0,
        '+' | '=' | '<' | '>' => 584.0,
        'm' | 'M' => 833.0,
        'W' => 944.0,
        'w' => 722.0,
        'A'..='Z' => 667.0,
        _ => 556.0,
    }
}

pub fn text_width(text: &str, size: f32, font: Font) -> f32 {
    let base: f32 = text.chars().map(glyph_width).sum::<f32>() * size / 1000.0;
    match font {
        Font::Regular => base,
        Font::Bold => base * 1.06,
    }
}

/// Shorten `text` with a trailing ellipsis until it fits `width`.
pub fn fit_to_width(text: &str, size: f32, font: Font, width: f32) -> String {
    let clean = sanitize(text);
    if text_width(&clean, size, font) <= width {
        return clean;
    }
    let mut chars: Vec<char> = clean.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if text_width(&candidate, size, font) <= width {
            return candidate;
        }
    }
    String::new()
}

/// Greedy word wrap.
pub fn wrap(text: &str, size: f32, font: Font, width: f32) -> Vec<String> {
    let clean = sanitize(text);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in clean.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, size, font) <= width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_maps_typography_to_ascii() {
        assert_eq!(sanitize("Rupee \u{20B9}83 \u{2013} steady\u{2026}"), "Rupee Rs 83 - steady...");
        assert_eq!(sanitize("caf\u{e9}"), "caf?");
    }

    #[test]
    fn fit_adds_ellipsis() {
        let long = "Reliance Industries Limited Consolidated";
        let fitted = fit_to_width(long, 8.5, Font::Regular, 60.0);
        assert!(fitted.ends_with("..."));
        assert!(text_width(&fitted, 8.5, Font::Regular) <= 60.0);
        assert_eq!(fit_to_width("TCS", 8.5, Font::Regular, 60.0), "TCS");
    }

    #[test]
    fn wrap_respects_width() {
        let text = "Sensex climbs 500 points as banks rally on strong quarterly earnings and foreign inflows";
        let lines = wrap(text, 10.0, Font::Regular, 150.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 10.0, Font::Regular) <= 150.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn page_cap_truncates() {
        let mut layout = Layout::new(2);
        let mut placed = 0;
        while layout.reserve(300.0).is_some() {
            placed += 1;
            assert!(placed < 100);
        }
        assert_eq!(layout.page_count(), 2);
        assert!(layout.is_truncated());
        assert!(layout.reserve(1.0).is_none());
    }

    #[test]
    fn page_break_skips_empty_page() {
        let mut layout = Layout::new(5);
        layout.page_break();
        assert_eq!(layout.page_count(), 1);
        layout.reserve(10.0);
        layout.page_break();
        assert_eq!(layout.page_count(), 2);
    }

    #[test]
    fn table_repeats_header_and_stays_capped() {
        let mut layout = Layout::new(3);
        let columns = [Column::left("Symbol", 100.0), Column::right("Close", 80.0)];
        let rows: Vec<Vec<Cell>> = (0..200)
            .map(|i| vec![Cell::plain(format!("SYM{i}")), Cell::plain("1.00")])
            .collect();
        layout.table(&columns, &rows, [211, 211, 211], [150, 150, 150]);
        assert_eq!(layout.page_count(), 3);
        assert!(layout.is_truncated());

        let report = layout.finish("Report", "2024-10-16");
        assert_eq!(report.page_count, 3);
        assert!(report.bytes.starts_with(b"%PDF-"));
    }
}

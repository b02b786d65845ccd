//! Vector charts drawn straight into the page content.

use marketbrief_core::config::{ChartStyle, Rgb};
use marketbrief_core::domain::{ClosePoint, MoodSummary, MoodZone};

use super::layout::{Align, Font, Layout, BLACK, CONTENT_WIDTH, GREY, MARGIN};

const BAR_CHART_HEIGHT: f32 = 170.0;
const LINE_CHART_HEIGHT: f32 = 125.0;
const GAUGE_HEIGHT: f32 = 190.0;

/// Vertical bars of percent change, one per labelled value, around a zero
/// axis.
pub fn pct_bar_chart(
    layout: &mut Layout,
    title: &str,
    bars: &[(String, f64)],
    style: &ChartStyle,
) {
    if bars.is_empty() {
        return;
    }
    let Some(top) = layout.reserve(BAR_CHART_HEIGHT) else {
        return;
    };
    layout.text(MARGIN, top - 12.0, 9.5, Font::Bold, BLACK, title);

    let plot_top = top - 30.0;
    let plot_bottom = top - BAR_CHART_HEIGHT + 26.0;
    let left = MARGIN + 30.0;
    let width = CONTENT_WIDTH - 30.0;

    let max_abs = bars
        .iter()
        .map(|(_, v)| v.abs())
        .fold(0.0_f64, f64::max)
        .max(0.5);
    let has_neg = bars.iter().any(|(_, v)| *v < 0.0);
    let has_pos = bars.iter().any(|(_, v)| *v > 0.0);
    let (lo, hi) = match (has_pos, has_neg) {
        (true, false) => (0.0, max_abs),
        (false, true) => (-max_abs, 0.0),
        _ => (-max_abs, max_abs),
    };
    let scale = |v: f64| plot_bottom + ((v - lo) / (hi - lo)) as f32 * (plot_top - plot_bottom);
    let zero_y = scale(0.0);

    layout.line((left, zero_y), (left + width, zero_y), style.grid, 0.6);
    layout.text_in(
        MARGIN,
        26.0,
        scale(hi) - 3.0,
        6.5,
        Font::Regular,
        GREY,
        Align::Right,
        &format!("{hi:+.1}%"),
    );
    layout.text_in(
        MARGIN,
        26.0,
        scale(lo) - 3.0,
        6.5,
        Font::Regular,
        GREY,
        Align::Right,
        &format!("{lo:+.1}%"),
    );

    let slot = width / bars.len() as f32;
    let bar_w = (slot * 0.6).min(36.0);
    for (i, (label, value)) in bars.iter().enumerate() {
        let x = left + slot * i as f32 + (slot - bar_w) / 2.0;
        let y = scale(*value);
        let color = if *value >= 0.0 {
            style.positive
        } else {
            style.negative
        };
        let (y0, h) = if y >= zero_y {
            (zero_y, y - zero_y)
        } else {
            (y, zero_y - y)
        };
        layout.fill_rect(x, y0, bar_w, h.max(0.5), color);

        let value_y = if *value >= 0.0 { y + 3.0 } else { y - 8.0 };
        layout.text_in(
            x - 6.0,
            bar_w + 12.0,
            value_y,
            6.0,
            Font::Regular,
            BLACK,
            Align::Center,
            &format!("{value:+.2}"),
        );
        layout.text_in(
            left + slot * i as f32,
            slot,
            plot_bottom - 14.0,
            6.0,
            Font::Regular,
            GREY,
            Align::Center,
            label,
        );
    }
}

/// Closing-price line charts laid out two per row.
pub fn history_grid(
    layout: &mut Layout,
    charts: &[(String, &[ClosePoint])],
    style: &ChartStyle,
) {
    let charts: Vec<&(String, &[ClosePoint])> =
        charts.iter().filter(|(_, points)| points.len() >= 2).collect();
    let col_w = (CONTENT_WIDTH - 14.0) / 2.0;
    for pair in charts.chunks(2) {
        let Some(top) = layout.reserve(LINE_CHART_HEIGHT) else {
            return;
        };
        for (i, (title, points)) in pair.iter().map(|c| (&c.0, c.1)).enumerate() {
            let x = MARGIN + i as f32 * (col_w + 14.0);
            line_chart(layout, x, top, col_w, title, points, style);
        }
    }
}

fn line_chart(
    layout: &mut Layout,
    x: f32,
    top: f32,
    width: f32,
    title: &str,
    points: &[ClosePoint],
    style: &ChartStyle,
) {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return;
    };
    layout.text_in(x, width, top - 11.0, 8.5, Font::Bold, BLACK, Align::Left, title);

    let plot_left = x + 40.0;
    let plot_w = width - 44.0;
    let plot_top = top - 20.0;
    let plot_bottom = top - LINE_CHART_HEIGHT + 22.0;
    layout.stroke_rect(
        plot_left,
        plot_bottom,
        plot_w,
        plot_top - plot_bottom,
        style.grid,
        0.4,
    );

    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.close), hi.max(p.close))
        });
    let span = if max > min { max - min } else { 1.0 };
    let n = points.len() - 1;
    let path: Vec<(f32, f32)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let px = plot_left + plot_w * i as f32 / n as f32;
            let py = plot_bottom + ((p.close - min) / span) as f32 * (plot_top - plot_bottom);
            (px, py)
        })
        .collect();
    let color: Rgb = if last.close >= first.close {
        style.line
    } else {
        style.negative
    };
    layout.polyline(&path, color, 1.1);

    layout.text_in(
        x,
        38.0,
        plot_top - 6.0,
        6.0,
        Font::Regular,
        GREY,
        Align::Right,
        &compact(max),
    );
    layout.text_in(
        x,
        38.0,
        plot_bottom,
        6.0,
        Font::Regular,
        GREY,
        Align::Right,
        &compact(min),
    );
    let date_y = plot_bottom - 9.0;
    layout.text(
        plot_left,
        date_y,
        6.0,
        Font::Regular,
        GREY,
        &first.date.format("%d %b").to_string(),
    );
    layout.text_in(
        plot_left,
        plot_w,
        date_y,
        6.0,
        Font::Regular,
        GREY,
        Align::Right,
        &last.date.format("%d %b").to_string(),
    );
}

fn compact(v: f64) -> String {
    if v.abs() >= 10_000.0 {
        format!("{:.0}", v)
    } else if v.abs() >= 100.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.2}", v)
    }
}

pub fn zone_color(zone: MoodZone) -> Rgb {
    match zone {
        MoodZone::ExtremeFear => [200, 40, 40],
        MoodZone::Fear => [240, 150, 40],
        MoodZone::Greed => [150, 200, 60],
        MoodZone::ExtremeGreed => [27, 138, 58],
    }
}

/// Point on the gauge arc for a 0..=100 value; 0 sits on the left.
fn arc_point(cx: f32, cy: f32, r: f32, value: f64) -> (f32, f32) {
    let theta = std::f64::consts::PI * (1.0 - value.clamp(0.0, 100.0) / 100.0);
    (cx + r * theta.cos() as f32, cy + r * theta.sin() as f32)
}

/// Half-circle gauge with one band per mood zone, a needle at the reading
/// and a legend underneath.
pub fn mood_gauge(layout: &mut Layout, mood: &MoodSummary) {
    let Some(top) = layout.reserve(GAUGE_HEIGHT) else {
        return;
    };
    let cx = MARGIN + CONTENT_WIDTH / 2.0;
    let cy = top - 130.0;
    let (outer, inner) = (110.0, 70.0);

    for zone in MoodZone::ALL {
        let (from, to) = zone.span();
        let steps = ((to - from) / 2.0).ceil().max(1.0) as usize;
        let mut band = Vec::with_capacity(2 * steps + 2);
        for s in 0..=steps {
            band.push(arc_point(cx, cy, outer, from + (to - from) * s as f64 / steps as f64));
        }
        for s in (0..=steps).rev() {
            band.push(arc_point(cx, cy, inner, from + (to - from) * s as f64 / steps as f64));
        }
        layout.fill_polygon(&band, zone_color(zone));
    }

    let tip = arc_point(cx, cy, outer - 4.0, mood.value);
    layout.line((cx, cy), tip, BLACK, 2.5);
    layout.fill_rect(cx - 3.0, cy - 3.0, 6.0, 6.0, BLACK);

    layout.text_in(
        cx - 60.0,
        120.0,
        cy - 24.0,
        20.0,
        Font::Bold,
        BLACK,
        Align::Center,
        &format!("{:.0}", mood.value),
    );
    layout.text_in(
        cx - 80.0,
        160.0,
        cy - 40.0,
        10.0,
        Font::Bold,
        zone_color(mood.zone),
        Align::Center,
        mood.zone.label(),
    );
    for (v, label) in [(0.0, "0"), (100.0, "100")] {
        let (lx, ly) = arc_point(cx, cy, outer + 6.0, v);
        layout.text_in(
            lx - 15.0,
            30.0,
            ly - 10.0,
            7.0,
            Font::Regular,
            GREY,
            Align::Center,
            label,
        );
    }
}

/// Colour swatches with zone names and ranges, two per row.
pub fn mood_legend(layout: &mut Layout) {
    let col_w = CONTENT_WIDTH / 2.0;
    for pair in MoodZone::ALL.chunks(2) {
        let Some(top) = layout.reserve(16.0) else {
            return;
        };
        for (i, zone) in pair.iter().enumerate() {
            let x = MARGIN + 60.0 + i as f32 * col_w;
            layout.fill_rect(x, top - 11.0, 10.0, 10.0, zone_color(*zone));
            layout.text(
                x + 16.0,
                top - 10.0,
                9.0,
                Font::Regular,
                BLACK,
                &format!("{}: {}", zone.label(), zone.range_label()),
            );
        }
    }
}

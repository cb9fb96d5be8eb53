//! Standalone SVG price chart for a passing instrument.
//!
//! Layout: title, a price panel (candles, or a close line when the bars lack
//! open/high/low) with every computed moving average, and a volume panel.

use crate::domain::code_data::CodeData;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::PriceBar;
use std::fmt::{self, Write};

const WIDTH: f64 = 900.0;
const PADDING: f64 = 50.0;
const TITLE_HEIGHT: f64 = 30.0;
const PRICE_HEIGHT: f64 = 340.0;
const GAP: f64 = 20.0;
const VOLUME_HEIGHT: f64 = 110.0;
const HEIGHT: f64 = TITLE_HEIGHT + PRICE_HEIGHT + GAP + VOLUME_HEIGHT + 2.0 * PADDING;

const MA_COLOURS: [&str; 6] = ["#f39c12", "#8e44ad", "#16a085", "#2980b9", "#7f8c8d", "#c0392b"];

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn has_ohlc(bar: &PriceBar) -> bool {
    [bar.open, bar.high, bar.low]
        .iter()
        .all(|v| v.is_some_and(|x| x.is_finite()))
}

struct Scale {
    min: f64,
    max: f64,
    top: f64,
    height: f64,
}

impl Scale {
    fn new(values: impl Iterator<Item = f64>, top: f64, height: f64) -> Self {
        let (mut min, mut max) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() {
            min = 0.0;
            max = 1.0;
        } else if max <= min {
            min -= 1.0;
            max += 1.0;
        }
        Self {
            min,
            max,
            top,
            height,
        }
    }

    fn y(&self, value: f64) -> f64 {
        self.top + self.height - (value - self.min) / (self.max - self.min) * self.height
    }
}

/// Horizontal placement shared by every panel.
struct Columns {
    step: f64,
    body_width: f64,
}

impl Columns {
    fn new(n: usize) -> Self {
        let plot_width = WIDTH - 2.0 * PADDING;
        let step = if n > 0 { plot_width / n as f64 } else { plot_width };
        Self {
            step,
            body_width: (step * 0.6).max(1.0),
        }
    }

    fn x(&self, i: usize) -> f64 {
        PADDING + (i as f64 + 0.5) * self.step
    }
}

/// Render `data` as an SVG document. A series without bars renders the frame
/// and title only.
pub fn render_chart(data: &CodeData) -> Result<String, fmt::Error> {
    let mut svg = String::new();
    write_chart(&mut svg, data)?;
    Ok(svg)
}

fn write_chart(svg: &mut String, data: &CodeData) -> fmt::Result {
    let bars = &data.bars;
    let cols = Columns::new(bars.len());
    let price_top = PADDING + TITLE_HEIGHT;
    let volume_top = price_top + PRICE_HEIGHT + GAP;

    let averages = data.price_averages();
    let price_values = bars
        .iter()
        .flat_map(|b| [b.low, b.high, b.close])
        .flatten()
        .chain(
            averages
                .iter()
                .flat_map(|s| s.values.iter().filter(|p| p.valid).map(|p| p.value)),
        );
    let price_scale = Scale::new(price_values, price_top, PRICE_HEIGHT);
    let volume_scale = Scale::new(
        std::iter::once(0.0).chain(bars.iter().filter_map(|b| b.volume)),
        volume_top,
        VOLUME_HEIGHT,
    );

    write_frame(svg, data, &price_scale, volume_top)?;
    if !bars.is_empty() && bars.iter().all(has_ohlc) {
        write_candles(svg, bars, &cols, &price_scale)?;
    } else {
        write_close_line(svg, bars, &cols, &price_scale)?;
    }
    write_averages(svg, &averages, &cols, &price_scale)?;
    write_volume(svg, bars, &cols, &volume_scale)?;
    if let Some((first, last)) = data.date_range() {
        let label_y = volume_top + VOLUME_HEIGHT + 16.0;
        writeln!(
            svg,
            r#"<text x="{PADDING:.0}" y="{label_y:.0}" font-size="11">{first}</text>"#
        )?;
        writeln!(
            svg,
            r#"<text x="{:.0}" y="{label_y:.0}" font-size="11" text-anchor="end">{last}</text>"#,
            WIDTH - PADDING
        )?;
    }
    svg.push_str("</svg>\n");
    Ok(())
}

fn write_frame(svg: &mut String, data: &CodeData, price: &Scale, volume_top: f64) -> fmt::Result {
    let plot_width = WIDTH - 2.0 * PADDING;
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}" font-family="sans-serif">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text x="{PADDING:.0}" y="{:.0}" font-size="18" font-weight="bold">{} {}</text>"#,
        PADDING + 10.0,
        escape_xml(&data.code),
        escape_xml(&data.name)
    )?;
    for (top, height) in [(price.top, PRICE_HEIGHT), (volume_top, VOLUME_HEIGHT)] {
        writeln!(
            svg,
            r##"<rect x="{PADDING:.0}" y="{top:.0}" width="{plot_width:.0}" height="{height:.0}" fill="none" stroke="#cccccc"/>"##
        )?;
    }
    for (y, value) in [(price.top + 10.0, price.max), (price.top + PRICE_HEIGHT, price.min)] {
        writeln!(
            svg,
            r#"<text x="{:.0}" y="{y:.1}" font-size="11" text-anchor="end">{value:.2}</text>"#,
            PADDING - 4.0
        )?;
    }
    Ok(())
}

fn write_candles(svg: &mut String, bars: &[PriceBar], cols: &Columns, price: &Scale) -> fmt::Result {
    for (i, bar) in bars.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) =
            (bar.open, bar.high, bar.low, bar.close)
        else {
            continue;
        };
        let colour = if close >= open { "#d62728" } else { "#2ca02c" };
        let x = cols.x(i);
        let top = price.y(open.max(close));
        let bottom = price.y(open.min(close));
        writeln!(
            svg,
            r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{colour}"/>"#,
            price.y(high),
            price.y(low)
        )?;
        writeln!(
            svg,
            r#"<rect x="{:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="{colour}"/>"#,
            x - cols.body_width / 2.0,
            cols.body_width,
            (bottom - top).max(1.0)
        )?;
    }
    Ok(())
}

fn write_close_line(svg: &mut String, bars: &[PriceBar], cols: &Columns, price: &Scale) -> fmt::Result {
    let points: Vec<String> = bars
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.close.map(|c| format!("{:.1},{:.1}", cols.x(i), price.y(c))))
        .collect();
    if points.is_empty() {
        return Ok(());
    }
    writeln!(
        svg,
        r##"<polyline class="close" fill="none" stroke="#333333" stroke-width="1.5" points="{}"/>"##,
        points.join(" ")
    )
}

fn write_averages(
    svg: &mut String,
    averages: &[&IndicatorSeries],
    cols: &Columns,
    price: &Scale,
) -> fmt::Result {
    for (k, series) in averages.iter().enumerate() {
        let points: Vec<String> = series
            .values
            .iter()
            .enumerate()
            .filter(|(_, p)| p.valid)
            .map(|(i, p)| format!("{:.1},{:.1}", cols.x(i), price.y(p.value)))
            .collect();
        if points.is_empty() {
            continue;
        }
        let colour = MA_COLOURS[k % MA_COLOURS.len()];
        writeln!(
            svg,
            r#"<polyline class="ma" data-label="{}" fill="none" stroke="{colour}" stroke-width="1" points="{}"/>"#,
            series.indicator_type,
            points.join(" ")
        )?;
        writeln!(
            svg,
            r#"<text x="{:.0}" y="{:.0}" font-size="11" fill="{colour}">{}</text>"#,
            PADDING + 5.0 + 50.0 * k as f64,
            price.top + 14.0,
            series.indicator_type
        )?;
    }
    Ok(())
}

fn write_volume(svg: &mut String, bars: &[PriceBar], cols: &Columns, volume: &Scale) -> fmt::Result {
    let baseline = volume.y(0.0);
    for (i, bar) in bars.iter().enumerate() {
        let Some(v) = bar.volume.filter(|v| v.is_finite()) else {
            continue;
        };
        let top = volume.y(v);
        writeln!(
            svg,
            r##"<rect class="vol" x="{:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="#95a5a6"/>"##,
            cols.x(i) - cols.body_width / 2.0,
            cols.body_width,
            (baseline - top).max(0.0)
        )?;
    }
    Ok(())
}

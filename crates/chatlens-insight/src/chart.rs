//! Raster chart primitives.
//!
//! Draws bar, pie and line charts into a region of an `RgbImage`. All
//! drawing is clipped to the image, and every chart renders something
//! sensible for empty input.

use std::f64::consts::PI;

use image::{Rgb, RgbImage};

use crate::font::{glyph, text_width, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([33, 33, 33]);
pub const GRID: Rgb<u8> = Rgb([220, 220, 220]);
pub const MUTED: Rgb<u8> = Rgb([150, 150, 150]);
pub const BLUE: Rgb<u8> = Rgb([100, 149, 237]);
pub const GREEN: Rgb<u8> = Rgb([102, 187, 106]);
pub const PURPLE: Rgb<u8> = Rgb([126, 87, 194]);
pub const ORANGE: Rgb<u8> = Rgb([255, 167, 38]);

pub const PASTEL: [Rgb<u8>; 8] = [
    Rgb([174, 198, 232]),
    Rgb([255, 187, 120]),
    Rgb([152, 223, 138]),
    Rgb([255, 152, 150]),
    Rgb([197, 176, 213]),
    Rgb([196, 156, 148]),
    Rgb([247, 182, 210]),
    Rgb([219, 219, 141]),
];

const TITLE_SCALE: u32 = 3;
const LABEL_SCALE: u32 = 2;
const PADDING: i64 = 16;

/// A rectangular region of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Shrink on all sides by `by` pixels.
    pub fn inset(&self, by: i64) -> Rect {
        Rect::new(
            self.x + by,
            self.y + by,
            (self.w - 2 * by).max(0),
            (self.h - 2 * by).max(0),
        )
    }

    fn right(&self) -> i64 {
        self.x + self.w
    }

    fn bottom(&self) -> i64 {
        self.y + self.h
    }
}

// =============================================================================
// Primitives
// =============================================================================

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u64) < img.width() as u64 && (y as u64) < img.height() as u64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

pub fn fill_rect(img: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            put(img, x, y, color);
        }
    }
}

pub fn stroke_rect(img: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    draw_line(img, (rect.x, rect.y), (rect.right() - 1, rect.y), 1, color);
    draw_line(img, (rect.x, rect.bottom() - 1), (rect.right() - 1, rect.bottom() - 1), 1, color);
    draw_line(img, (rect.x, rect.y), (rect.x, rect.bottom() - 1), 1, color);
    draw_line(img, (rect.right() - 1, rect.y), (rect.right() - 1, rect.bottom() - 1), 1, color);
}

/// Bresenham line, stamped with a square brush of `thickness` pixels.
pub fn draw_line(
    img: &mut RgbImage,
    from: (i64, i64),
    to: (i64, i64),
    thickness: i64,
    color: Rgb<u8>,
) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let half = thickness.max(1) / 2;

    loop {
        for oy in -half..=half {
            for ox in -half..=half {
                put(img, x0 + ox, y0 + oy, color);
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub fn fill_circle(img: &mut RgbImage, cx: i64, cy: i64, r: i64, color: Rgb<u8>) {
    for y in -r..=r {
        for x in -r..=r {
            if x * x + y * y <= r * r {
                put(img, cx + x, cy + y, color);
            }
        }
    }
}

pub fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1) as i64;
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) as i64 * scale;
    for (i, c) in text.chars().enumerate() {
        let rows = glyph(c);
        let gx = x + i as i64 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH as i64 {
                if bits & (1 << (GLYPH_WIDTH as i64 - 1 - col)) != 0 {
                    fill_rect(
                        img,
                        Rect::new(gx + col * scale, y + row as i64 * scale, scale, scale),
                        color,
                    );
                }
            }
        }
    }
}

fn draw_text_centered(img: &mut RgbImage, cx: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
    let w = text_width(text, scale) as i64;
    draw_text(img, cx - w / 2, y, text, scale, color);
}

/// Truncate `text` so it renders within `max_width` pixels.
fn fit(text: &str, max_width: i64, scale: u32) -> String {
    let mut out: String = text.to_string();
    while !out.is_empty() && text_width(&out, scale) as i64 > max_width {
        out.pop();
    }
    out
}

fn text_height(scale: u32) -> i64 {
    (GLYPH_HEIGHT * scale) as i64
}

/// Draws the panel frame and title; returns the area left for the plot.
fn panel(img: &mut RgbImage, rect: Rect, title: &str) -> Rect {
    fill_rect(img, rect, WHITE);
    stroke_rect(img, rect, GRID);
    let title = fit(title, rect.w - 2 * PADDING, TITLE_SCALE);
    draw_text_centered(img, rect.x + rect.w / 2, rect.y + PADDING, &title, TITLE_SCALE, BLACK);

    let top = PADDING * 2 + text_height(TITLE_SCALE);
    Rect::new(
        rect.x + PADDING,
        rect.y + top,
        (rect.w - 2 * PADDING).max(0),
        (rect.h - top - PADDING).max(0),
    )
}

fn no_data(img: &mut RgbImage, area: Rect) {
    draw_text_centered(
        img,
        area.x + area.w / 2,
        area.y + area.h / 2 - text_height(LABEL_SCALE) / 2,
        "NO DATA",
        LABEL_SCALE,
        MUTED,
    );
}

// =============================================================================
// Charts
// =============================================================================

/// One bar: label, value and fill color.
#[derive(Debug, Clone)]
pub struct Bar {
    pub label: String,
    pub value: u64,
    pub color: Rgb<u8>,
}

pub fn bar_chart(img: &mut RgbImage, rect: Rect, title: &str, bars: &[Bar]) {
    let area = panel(img, rect, title);
    let label_h = text_height(LABEL_SCALE) + 8;
    let plot = Rect::new(area.x, area.y + label_h, area.w, (area.h - 2 * label_h).max(0));

    // Baseline.
    draw_line(img, (plot.x, plot.bottom()), (plot.right(), plot.bottom()), 2, BLACK);

    if bars.is_empty() {
        no_data(img, plot);
        return;
    }

    let max = bars.iter().map(|b| b.value).max().unwrap_or(0).max(1);
    let slot = plot.w / bars.len() as i64;
    let bar_w = (slot * 3 / 5).max(1);

    for (i, bar) in bars.iter().enumerate() {
        let cx = plot.x + slot * i as i64 + slot / 2;
        let bar_h = (plot.h as f64 * bar.value as f64 / max as f64).round() as i64;
        let top = plot.bottom() - bar_h;
        fill_rect(img, Rect::new(cx - bar_w / 2, top, bar_w, bar_h), bar.color);

        let value = bar.value.to_string();
        draw_text_centered(img, cx, top - label_h + 4, &value, LABEL_SCALE, BLACK);

        let label = fit(&bar.label, slot - 4, LABEL_SCALE);
        draw_text_centered(img, cx, plot.bottom() + 8, &label, LABEL_SCALE, BLACK);
    }
}

/// Pie with one slice per non-zero entry and a legend on the right.
pub fn pie_chart(img: &mut RgbImage, rect: Rect, title: &str, slices: &[(String, u64)]) {
    let area = panel(img, rect, title);
    let legend_w = area.w * 2 / 5;
    let pie_area = Rect::new(area.x, area.y, area.w - legend_w, area.h);
    let r = (pie_area.w.min(pie_area.h) / 2 - 4).max(1);
    let (cx, cy) = (pie_area.x + pie_area.w / 2, pie_area.y + pie_area.h / 2);

    let total: u64 = slices.iter().map(|(_, n)| *n).sum();
    if total == 0 {
        for angle in 0..360 {
            let a = angle as f64 * PI / 180.0;
            let x = cx + (r as f64 * a.cos()).round() as i64;
            let y = cy + (r as f64 * a.sin()).round() as i64;
            fill_rect(img, Rect::new(x, y, 2, 2), GRID);
        }
        no_data(img, pie_area);
        return;
    }

    // Cumulative fraction at which each slice ends.
    let mut bounds = Vec::with_capacity(slices.len());
    let mut acc = 0u64;
    for (_, n) in slices {
        acc += n;
        bounds.push(acc as f64 / total as f64);
    }

    for y in -r..=r {
        for x in -r..=r {
            if x * x + y * y > r * r {
                continue;
            }
            // Clockwise from twelve o'clock.
            let mut angle = (x as f64).atan2(-(y as f64));
            if angle < 0.0 {
                angle += 2.0 * PI;
            }
            let frac = angle / (2.0 * PI);
            let idx = bounds.iter().position(|b| frac < *b).unwrap_or(slices.len() - 1);
            put(img, cx + x, cy + y, PASTEL[idx % PASTEL.len()]);
        }
    }

    // Legend.
    let row_h = text_height(LABEL_SCALE) + 10;
    let lx = pie_area.right() + 8;
    let mut ly = area.y + (area.h - row_h * slices.len() as i64).max(0) / 2;
    for (i, (label, n)) in slices.iter().enumerate() {
        fill_rect(
            img,
            Rect::new(lx, ly, text_height(LABEL_SCALE), text_height(LABEL_SCALE)),
            PASTEL[i % PASTEL.len()],
        );
        let pct = (*n as f64 * 100.0 / total as f64).round() as u64;
        let text = fit(
            &format!("{} {} ({}%)", label, n, pct),
            legend_w - text_height(LABEL_SCALE) - 16,
            LABEL_SCALE,
        );
        draw_text(img, lx + text_height(LABEL_SCALE) + 8, ly, &text, LABEL_SCALE, BLACK);
        ly += row_h;
    }
}

/// Line chart with point markers. `points` are (x label, value) in order.
pub fn line_chart(
    img: &mut RgbImage,
    rect: Rect,
    title: &str,
    points: &[(String, u64)],
    color: Rgb<u8>,
) {
    let area = panel(img, rect, title);
    let label_h = text_height(LABEL_SCALE) + 8;
    let axis_w = text_width("0000", LABEL_SCALE) as i64 + 8;
    let plot = Rect::new(
        area.x + axis_w,
        area.y + 8,
        (area.w - axis_w - 8).max(0),
        (area.h - label_h - 8).max(0),
    );

    draw_line(img, (plot.x, plot.y), (plot.x, plot.bottom()), 2, BLACK);
    draw_line(img, (plot.x, plot.bottom()), (plot.right(), plot.bottom()), 2, BLACK);

    if points.is_empty() {
        no_data(img, plot);
        return;
    }

    let max = points.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);
    draw_text(img, area.x, plot.y, &fit(&max.to_string(), axis_w - 8, LABEL_SCALE), LABEL_SCALE, BLACK);
    draw_text(img, area.x, plot.bottom() - text_height(LABEL_SCALE), "0", LABEL_SCALE, BLACK);
    draw_line(img, (plot.x, plot.y), (plot.right(), plot.y), 1, GRID);

    let inner = plot.inset(12);
    let coords: Vec<(i64, i64)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, v))| {
            let x = if points.len() == 1 {
                inner.x + inner.w / 2
            } else {
                inner.x + inner.w * i as i64 / (points.len() as i64 - 1)
            };
            let y = plot.bottom() - (plot.h as f64 * *v as f64 / max as f64).round() as i64;
            (x, y)
        })
        .collect();

    for pair in coords.windows(2) {
        draw_line(img, pair[0], pair[1], 3, color);
    }
    for (x, y) in &coords {
        fill_circle(img, *x, *y, 5, color);
        fill_circle(img, *x, *y, 2, WHITE);
    }

    // Label at most six evenly spaced points, always including both ends.
    let step = points.len().div_ceil(6).max(1);
    let slot = (inner.w / points.len().min(6) as i64).max(1);
    for (i, (label, _)) in points.iter().enumerate() {
        if i % step != 0 && i != points.len() - 1 {
            continue;
        }
        let label = fit(label, slot, LABEL_SCALE);
        draw_text_centered(img, coords[i].0, plot.bottom() + 8, &label, LABEL_SCALE, BLACK);
    }
}

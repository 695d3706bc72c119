//! Composite dashboard rendering.
//!
//! Lays out four panels in a 2x2 grid: totals, sentiment distribution,
//! daily message volume and the most active conversations. The PNG is
//! written to a temporary file next to the target and renamed over it, so
//! readers never observe a half-written image.

use std::io::BufWriter;
use std::path::Path;

use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::chart::{self, Bar, Rect};
use crate::error::InsightError;
use crate::types::DashboardStats;

const GUTTER: i64 = 12;

/// Draw the dashboard for `stats` onto a fresh canvas.
pub fn render(stats: &DashboardStats, width: u32, height: u32) -> Result<RgbImage, InsightError> {
    if width == 0 || height == 0 {
        return Err(InsightError::Render(format!(
            "invalid dashboard size {}x{}",
            width, height
        )));
    }

    let mut img = RgbImage::from_pixel(width, height, image::Rgb([245, 245, 245]));

    let (w, h) = (width as i64, height as i64);
    let cell_w = (w - 3 * GUTTER) / 2;
    let cell_h = (h - 3 * GUTTER) / 2;
    let cell = |col: i64, row: i64| {
        Rect::new(
            GUTTER + col * (cell_w + GUTTER),
            GUTTER + row * (cell_h + GUTTER),
            cell_w.max(0),
            cell_h.max(0),
        )
    };

    let totals = [
        Bar {
            label: "USERS".into(),
            value: stats.totals.users,
            color: chart::BLUE,
        },
        Bar {
            label: "MESSAGES".into(),
            value: stats.totals.messages,
            color: chart::GREEN,
        },
        Bar {
            label: "FILES".into(),
            value: stats.totals.attachments,
            color: chart::ORANGE,
        },
    ];
    chart::bar_chart(&mut img, cell(0, 0), "TOTALS", &totals);

    chart::pie_chart(&mut img, cell(1, 0), "SENTIMENT", &stats.breakdown);

    let daily: Vec<(String, u64)> = stats
        .daily_volume
        .iter()
        .map(|(date, n)| (date.format("%m-%d").to_string(), *n))
        .collect();
    chart::line_chart(&mut img, cell(0, 1), "MESSAGES PER DAY", &daily, chart::PURPLE);

    let top: Vec<Bar> = stats
        .top_conversations
        .iter()
        .map(|(key, n)| Bar {
            label: key.to_string(),
            value: *n,
            color: chart::ORANGE,
        })
        .collect();
    let title = format!("TOP {} CONVERSATIONS", stats.top_conversations.len());
    chart::bar_chart(&mut img, cell(1, 1), &title, &top);

    Ok(img)
}

/// Encode `img` as PNG and atomically replace `path`.
pub fn write_png(img: &RgbImage, path: &Path) -> Result<(), InsightError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| InsightError::Render(format!("invalid output path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let result = (|| {
        let file = std::fs::File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        img.write_to(&mut writer, ImageFormat::Png)?;
        let file = writer
            .into_inner()
            .map_err(|e| InsightError::Io(e.into_error()))?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)?;
        Ok::<(), InsightError>(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result?;

    debug!(path = %path.display(), "Dashboard written");
    Ok(())
}

//! Report output
//!
//! Renders a [`ReportTree`] in several formats:
//!
//! - **Text**: indented terminal tree, collapsed nodes show a summary
//! - **HTML**: themed page with collapsible sections and a download link
//! - **JSON**: the backend's reply shape, so it can be loaded again
//!
//! # Usage
//!
//! ```ignore
//! use lotview::report;
//!
//! // Picks the format from the extension
//! report::generate("report.html", &tree, &options)?;  // HTML
//! report::generate("report.json", &tree, &options)?;  // JSON
//! report::generate("report.txt", &tree, &options)?;   // Text
//! ```

pub mod html;
pub mod json;
pub mod text;

use crate::prefs::Theme;
use crate::tree::ReportTree;
use crate::value::ReportValue;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Rendering knobs shared by the formatters.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub theme: Theme,
    /// Absolute URL of the processed video, when known.
    pub download_url: Option<String>,
    /// ANSI colours in text output.
    pub color: bool,
}

/// Write a report in the format its extension asks for.
pub fn generate<P: AsRef<Path>>(path: P, tree: &ReportTree, options: &RenderOptions) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, tree, options, html::Mode::Snapshot),
        "json" => json::write(&mut file, tree.result()),
        _ => text::write(&mut file, tree, &RenderOptions { color: false, ..options.clone() }),
    }
}

/// Parking occupancy derived from `total_spots` / `available_spots`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub total: u64,
    pub available: u64,
    pub occupied: u64,
    /// Whole percent, 0 when there are no spots.
    pub rate: u64,
}

impl Occupancy {
    /// `None` unless both counts are present and numeric-like.
    pub fn from_report(report: &ReportValue) -> Option<Self> {
        let total = count(report.get("total_spots")?)?;
        let available = count(report.get("available_spots")?)?;
        let occupied = total.saturating_sub(available);
        let rate = if total > 0 {
            ((occupied as f64 / total as f64) * 100.0).round() as u64
        } else {
            0
        };

        Some(Self {
            total,
            available,
            occupied,
            rate,
        })
    }
}

fn count(value: &ReportValue) -> Option<u64> {
    value
        .as_f64()
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
}

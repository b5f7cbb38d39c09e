//! Terminal rendering of the report tree

use crate::format::Category;
use crate::report::{Occupancy, RenderOptions};
use crate::tree::{ReportTree, Row};
use std::io::{self, Write};

const RESET: &str = "\x1b[0m";

fn color_for(category: Category) -> &'static str {
    match category {
        Category::Null => "\x1b[90m",        // Gray
        Category::NumericLike => "\x1b[1;34m", // Bold blue
        Category::Boolean => "\x1b[35m",     // Magenta
        Category::Text => "\x1b[32m",        // Green
        Category::Array | Category::Object => "\x1b[90;3m",
    }
}

pub fn write<W: Write>(writer: &mut W, tree: &ReportTree, options: &RenderOptions) -> io::Result<()> {
    if let Some(o) = Occupancy::from_report(tree.root()) {
        writeln!(
            writer,
            "Spots: {} total, {} available, {} occupied ({}% occupancy)",
            o.total, o.available, o.occupied, o.rate
        )?;
        writeln!(writer, "{}", "─".repeat(60))?;
    }

    for row in tree.visible_rows() {
        writeln!(writer, "{}", line(&row, options.color))?;
    }

    if let Some(ref url) = options.download_url {
        writeln!(writer, "{}", "─".repeat(60))?;
        writeln!(writer, "Processed video: {}", url)?;
    }
    Ok(())
}

/// One row: indent, expand marker, label, value or summary.
pub fn line(row: &Row<'_>, color: bool) -> String {
    let indent = "  ".repeat(row.depth);
    let marker = match (row.expandable, row.expanded) {
        (true, true) => "▼ ",
        (true, false) => "► ",
        (false, _) => "  ",
    };
    let label = row.label();
    let head = if label.is_empty() {
        String::new()
    } else {
        format!("{}: ", label)
    };

    // Open containers show their children instead of a summary
    let value = if row.expanded { String::new() } else { row.summary() };

    if color && !value.is_empty() {
        format!("{}{}{}{}{}{}", indent, marker, head, color_for(row.category), value, RESET)
    } else {
        format!("{}{}{}{}", indent, marker, head, value).trim_end().to_string()
    }
}

//! HTML report viewer
//!
//! Two flavours of the same tree:
//!
//! - [`Mode::Snapshot`]: a standalone file. Containers are `<details>`
//!   elements, open where the tree was expanded, and the browser handles
//!   further toggling.
//! - [`Mode::Live`]: served by `lotview serve`. Every expandable label is a link
//!   to `/toggle?path=..`, so the expansion state stays on the server.

use crate::format::{classify, display_value};
use crate::prefs::Theme;
use crate::report::{Occupancy, RenderOptions};
use crate::tree::{child_path, children, is_expandable, NodeKey, ReportTree, ROOT_PATH};
use crate::value::ReportValue;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Snapshot,
    Live,
}

fn palette(theme: Theme) -> &'static str {
    match theme {
        Theme::Dark => {
            "--bg: #0f172a; --card: #1e293b; --border: #334155; --text: #e2e8f0; \
             --dim: #94a3b8; --key: #7dd3fc; --num: #34d399; --str: #fbbf24; \
             --bool: #c084fc; --accent: #10b981;"
        }
        Theme::Light => {
            "--bg: #f8fafc; --card: #ffffff; --border: #e2e8f0; --text: #0f172a; \
             --dim: #64748b; --key: #1e40af; --num: #2563eb; --str: #16a34a; \
             --bool: #9333ea; --accent: #059669;"
        }
    }
}

pub fn write<W: Write>(
    writer: &mut W,
    tree: &ReportTree,
    options: &RenderOptions,
    mode: Mode,
) -> io::Result<()> {
    let body = if is_expandable(tree.root()) {
        let mut body = String::new();
        render_children(&mut body, tree, tree.root(), ROOT_PATH, mode);
        body
    } else {
        value_html(tree.root())
    };

    let occupancy = Occupancy::from_report(tree.root())
        .map(|o| {
            format!(
                r#"<div class="stats">
        <div class="stat"><div class="stat-value">{}</div><div class="stat-label">Total Spots</div></div>
        <div class="stat"><div class="stat-value">{}</div><div class="stat-label">Available</div></div>
        <div class="stat"><div class="stat-value">{}</div><div class="stat-label">Occupied</div></div>
        <div class="stat"><div class="stat-value">{}%</div><div class="stat-label">Occupancy</div></div>
    </div>"#,
                o.total, o.available, o.occupied, o.rate
            )
        })
        .unwrap_or_default();

    let download = options
        .download_url
        .as_ref()
        .map(|url| {
            format!(
                r#"<a class="download" href="{}" download>Download Processed Video</a>"#,
                html_escape(url)
            )
        })
        .unwrap_or_default();

    let controls = match mode {
        Mode::Live => {
            r#"<div class="controls"><a href="/expand-all">Expand all</a> · <a href="/collapse-all">Collapse all</a> · <a href="/theme">Toggle theme</a></div>"#
        }
        Mode::Snapshot => "",
    };

    write!(
        writer,
        r#"<!DOCTYPE html>
<html lang="en" class="{theme}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Analysis Results</title>
    <style>
        :root {{ {palette} }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1000px; margin: 0 auto; padding: 2rem; }}
        h1 {{ font-size: 2.25rem; font-weight: 800; color: var(--accent); margin-bottom: 1.5rem; }}
        h2 {{ font-size: 1.4rem; margin-bottom: 1rem; }}
        .card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            margin-bottom: 2rem;
        }}
        .stats {{ display: grid; grid-template-columns: repeat(4, 1fr); gap: 1rem; margin-bottom: 2rem; }}
        .stat {{ background: var(--card); border: 1px solid var(--border); border-radius: 12px; padding: 1.25rem; text-align: center; }}
        .stat-value {{ font-size: 2.5rem; font-weight: 700; line-height: 1; }}
        .stat-label {{ color: var(--dim); font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }}
        .download {{ display: inline-block; background: var(--accent); color: white; padding: 0.6rem 1.2rem; border-radius: 8px; text-decoration: none; font-weight: 600; }}
        .controls {{ margin-bottom: 1rem; color: var(--dim); }}
        .controls a {{ color: var(--key); }}
        .tree {{ font-family: ui-monospace, SFMono-Regular, Menlo, monospace; font-size: 0.9rem; }}
        .node {{ padding-left: 1rem; border-left: 2px solid var(--border); margin: 0.2rem 0; }}
        .key {{ color: var(--key); font-weight: 600; margin-right: 0.5rem; }}
        a.key {{ text-decoration: none; }}
        summary {{ cursor: pointer; }}
        .numeric {{ color: var(--num); font-size: 1.4rem; font-weight: 700; }}
        .text {{ color: var(--str); }}
        .boolean {{ color: var(--bool); }}
        .null, .array, .object {{ color: var(--dim); font-style: italic; }}
    </style>
</head>
<body>
<div class="container">
    <h1>Analysis Results</h1>
    {occupancy}
    <div class="card">
        <h2>Processed Video</h2>
        {download}
    </div>
    <div class="card">
        <h2>Analysis Report</h2>
        {controls}
        <div class="tree">
{body}
        </div>
    </div>
</div>
</body>
</html>
"#,
        theme = options.theme,
        palette = palette(options.theme),
        occupancy = occupancy,
        download = download,
        controls = controls,
        body = body,
    )
}

fn render_children(out: &mut String, tree: &ReportTree, value: &ReportValue, path: &str, mode: Mode) {
    for (key, child) in children(value) {
        let path = child_path(path, key);
        render_node(out, tree, key, child, &path, mode);
    }
}

fn render_node(
    out: &mut String,
    tree: &ReportTree,
    key: NodeKey<'_>,
    value: &ReportValue,
    path: &str,
    mode: Mode,
) {
    let label = html_escape(&key.label());
    let expandable = is_expandable(value);
    let expanded = expandable && tree.is_expanded(path);

    out.push_str(r#"<div class="node">"#);
    match (expandable, mode) {
        (false, _) => {
            out.push_str(&format!(r#"<span class="key">{}:</span>{}"#, label, value_html(value)));
        }
        (true, Mode::Snapshot) => {
            out.push_str(if expanded { "<details open>" } else { "<details>" });
            out.push_str(&format!(
                r#"<summary><span class="key">{}:</span>{}</summary>"#,
                label,
                value_html(value)
            ));
            render_children(out, tree, value, path, mode);
            out.push_str("</details>");
        }
        (true, Mode::Live) => {
            let marker = if expanded { "▼" } else { "►" };
            out.push_str(&format!(
                r#"<a class="key" href="/toggle?{}">{} {}:</a>"#,
                toggle_query(path),
                marker,
                label
            ));
            if expanded {
                render_children(out, tree, value, path, mode);
            } else {
                out.push_str(&value_html(value));
            }
        }
    }
    out.push_str("</div>\n");
}

fn value_html(value: &ReportValue) -> String {
    format!(
        r#"<span class="{}">{}</span>"#,
        classify(value).as_str(),
        html_escape(&display_value(value))
    )
}

fn toggle_query(path: &str) -> String {
    serde_urlencoded::to_string([("path", path)]).unwrap_or_default()
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

//! Lazily expandable view over a published report
//!
//! The tree never copies or mutates the report. It keeps one extra piece of
//! state: which node paths are expanded.
//!
//! # Node paths
//!
//! The root has the empty path. A mapping member appends `.<key>`, a sequence
//! element appends `.<index>`:
//!
//! ```text
//! {"detections": [{"box": [..]}]}
//!
//! ""                    root (always open)
//! ".detections"         the array
//! ".detections.0"       first element
//! ".detections.0.box"   its member
//! ```
//!
//! Only non-empty mappings and sequences are expandable. Everything else
//! renders inline and ignores [`ReportTree::toggle`].

use crate::format::{classify, display_value, format_key, Category};
use crate::session::AnalysisResult;
use crate::value::ReportValue;
use std::collections::HashMap;
use std::sync::Arc;

pub const ROOT_PATH: &str = "";

/// How a node hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKey<'a> {
    Root,
    Member(&'a str),
    Index(usize),
}

impl NodeKey<'_> {
    /// `"Total Spots"` for members, `"0"` for indices, empty for the root.
    pub fn label(&self) -> String {
        match self {
            NodeKey::Root => String::new(),
            NodeKey::Member(k) => format_key(k),
            NodeKey::Index(i) => i.to_string(),
        }
    }

    /// Key as the backend wrote it.
    pub fn raw(&self) -> String {
        match self {
            NodeKey::Root => String::new(),
            NodeKey::Member(k) => (*k).to_string(),
            NodeKey::Index(i) => i.to_string(),
        }
    }
}

/// One visible line of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    pub path: String,
    pub key: NodeKey<'a>,
    /// 0 for the root's direct children.
    pub depth: usize,
    pub value: &'a ReportValue,
    pub category: Category,
    pub expandable: bool,
    pub expanded: bool,
}

impl Row<'_> {
    pub fn label(&self) -> String {
        self.key.label()
    }

    /// Inline text: the scalar itself, or the collapsed summary.
    pub fn summary(&self) -> String {
        display_value(self.value)
    }
}

pub fn is_expandable(value: &ReportValue) -> bool {
    match value {
        ReportValue::Sequence(items) => !items.is_empty(),
        ReportValue::Mapping(entries) => !entries.is_empty(),
        ReportValue::Null
        | ReportValue::Bool(_)
        | ReportValue::Number(_)
        | ReportValue::Text(_) => false,
    }
}

pub fn child_path(parent: &str, key: NodeKey<'_>) -> String {
    match key {
        NodeKey::Root => parent.to_string(),
        NodeKey::Member(k) => format!("{}.{}", parent, k),
        NodeKey::Index(i) => format!("{}.{}", parent, i),
    }
}

/// Accept the forms a person types: `detections.0`, `.detections.0`,
/// `root.detections.0`, `root`.
pub fn normalize_path(input: &str) -> String {
    let trimmed = input.trim();
    let rest = trimmed
        .strip_prefix("root")
        .filter(|r| r.is_empty() || r.starts_with('.'))
        .unwrap_or(trimmed);
    if rest.is_empty() || rest.starts_with('.') {
        rest.to_string()
    } else {
        format!(".{}", rest)
    }
}

/// Direct children of a value in traversal order: insertion order for
/// mappings, index order for sequences.
pub fn children(value: &ReportValue) -> Vec<(NodeKey<'_>, &ReportValue)> {
    match value {
        ReportValue::Mapping(entries) => entries
            .iter()
            .map(|(k, v)| (NodeKey::Member(k.as_str()), v))
            .collect(),
        ReportValue::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (NodeKey::Index(i), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Expansion state for one published result.
///
/// State is keyed by path string. A member key containing a dot can produce
/// the same path as a nested member (`{"a.b": ..}` and `{"a": {"b": ..}}`
/// are both `.a.b`); such nodes open and close together.
pub struct ReportTree {
    result: Arc<AnalysisResult>,
    expanded: HashMap<String, bool>,
}

impl ReportTree {
    pub fn new(result: Arc<AnalysisResult>) -> Self {
        Self {
            result,
            expanded: HashMap::new(),
        }
    }

    pub fn result(&self) -> &Arc<AnalysisResult> {
        &self.result
    }

    pub fn root(&self) -> &ReportValue {
        &self.result.report
    }

    /// Swap in a new result. Expansion state is dropped, never merged.
    pub fn replace(&mut self, result: Arc<AnalysisResult>) {
        self.result = result;
        self.expanded.clear();
    }

    /// Find the node a path addresses.
    ///
    /// Keys may themselves contain dots, so each step tries every child whose
    /// path is a prefix of what is left.
    pub fn node(&self, path: &str) -> Option<&ReportValue> {
        find(self.root(), ROOT_PATH, path)
    }

    /// Flip a node open or closed. Returns the new state, or `None` (and
    /// changes nothing) when the path is not an expandable node.
    pub fn toggle(&mut self, path: &str) -> Option<bool> {
        if !self.node(path).map(is_expandable).unwrap_or(false) {
            return None;
        }
        let entry = self.expanded.entry(path.to_string()).or_insert(false);
        *entry = !*entry;
        Some(*entry)
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.get(path).copied().unwrap_or(false)
    }

    /// Open or close one node without flipping.
    pub fn set_expanded(&mut self, path: &str, open: bool) -> bool {
        if !self.node(path).map(is_expandable).unwrap_or(false) {
            return false;
        }
        self.expanded.insert(path.to_string(), open);
        true
    }

    pub fn expand_all(&mut self) {
        let mut paths = Vec::new();
        collect_expandable(self.root(), ROOT_PATH, &mut paths);
        for path in paths {
            self.expanded.insert(path, true);
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Paths that have been toggled at least once.
    pub fn tracked_paths(&self) -> usize {
        self.expanded.len()
    }

    /// Depth-first rows a viewer should draw right now. The root is always
    /// open; a collapsed node contributes its own row but not its children.
    pub fn visible_rows(&self) -> Vec<Row<'_>> {
        let root = self.root();
        let mut rows = Vec::new();
        if is_expandable(root) {
            self.push_children(root, ROOT_PATH, 0, &mut rows);
        } else {
            rows.push(self.row(NodeKey::Root, ROOT_PATH.to_string(), 0, root));
        }
        rows
    }

    fn push_children<'a>(
        &'a self,
        value: &'a ReportValue,
        path: &str,
        depth: usize,
        rows: &mut Vec<Row<'a>>,
    ) {
        for (key, child) in children(value) {
            let child_path = child_path(path, key);
            let row = self.row(key, child_path.clone(), depth, child);
            let open = row.expanded;
            rows.push(row);
            if open {
                self.push_children(child, &child_path, depth + 1, rows);
            }
        }
    }

    fn row<'a>(&self, key: NodeKey<'a>, path: String, depth: usize, value: &'a ReportValue) -> Row<'a> {
        let expandable = is_expandable(value);
        let expanded = expandable && self.is_expanded(&path);
        Row {
            path,
            key,
            depth,
            value,
            category: classify(value),
            expandable,
            expanded,
        }
    }
}

fn find<'a>(value: &'a ReportValue, here: &str, target: &str) -> Option<&'a ReportValue> {
    if here == target {
        return Some(value);
    }
    for (key, child) in children(value) {
        let path = child_path(here, key);
        let on_route = target == path
            || (target.starts_with(path.as_str()) && target[path.len()..].starts_with('.'));
        if on_route {
            if let Some(found) = find(child, &path, target) {
                return Some(found);
            }
        }
    }
    None
}

fn collect_expandable(value: &ReportValue, path: &str, out: &mut Vec<String>) {
    for (key, child) in children(value) {
        if is_expandable(child) {
            let child_path = child_path(path, key);
            collect_expandable(child, &child_path, out);
            out.push(child_path);
        }
    }
}

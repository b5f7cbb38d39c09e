//! JSON round-trip of an analysis result
//!
//! Written in the backend's reply shape so a saved report loads back the same
//! way a fresh upload does.

use crate::error::{LotviewError, Result};
use crate::session::AnalysisResult;
use crate::transport::{parse_reply, HttpReply};
use crate::value::{from_json_slice, ReportValue};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Serialize)]
struct SavedReport<'a> {
    json_report: &'a ReportValue,
    video_download_url: &'a str,
}

pub fn write<W: Write>(writer: &mut W, result: &AnalysisResult) -> io::Result<()> {
    let saved = SavedReport {
        json_report: &result.report,
        video_download_url: &result.media_ref,
    };
    serde_json::to_writer_pretty(&mut *writer, &saved)?;
    writeln!(writer)
}

/// Read a saved report.
///
/// A file in reply shape yields its report and media locator. Any other JSON
/// document is taken as a bare report with `media_ref` (possibly empty).
pub fn load<P: AsRef<Path>>(path: P, media_ref: Option<&str>) -> Result<AnalysisResult> {
    let body = std::fs::read(path.as_ref())?;

    let reply = HttpReply { status: 200, body };
    match parse_reply(&reply) {
        Ok(mut result) => {
            if let Some(media_ref) = media_ref {
                result.media_ref = media_ref.to_string();
            }
            Ok(result)
        }
        Err(_) => {
            let report: ReportValue = from_json_slice(&reply.body).map_err(LotviewError::Json)?;
            Ok(AnalysisResult::new(report, media_ref.unwrap_or_default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");
        let result = AnalysisResult::new(
            ReportValue::from(json!({"zone": "B", "total_spots": 12})),
            "/files/b.mp4",
        );

        let mut file = std::fs::File::create(&path).unwrap();
        write(&mut file, &result).unwrap();
        drop(file);

        assert_eq!(load(&path, None).unwrap(), result);
    }

    #[test]
    fn test_load_bare_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.json");
        std::fs::write(&path, r#"{"total_spots": 3}"#).unwrap();

        let result = load(&path, None).unwrap();
        assert_eq!(result.media_ref, "");
        assert!(!result.is_viewable());

        let result = load(&path, Some("/files/x.mp4")).unwrap();
        assert!(result.is_viewable());
    }

    #[test]
    fn test_load_deep_bare_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.json");
        let depth = 200;
        std::fs::write(&path, format!("{}true{}", "[".repeat(depth), "]".repeat(depth))).unwrap();

        let result = load(&path, Some("/files/deep.mp4")).unwrap();
        let mut node = &result.report;
        let mut levels = 0;
        while let Some(child) = node.index(0) {
            node = child;
            levels += 1;
        }
        assert_eq!(levels, depth);
        assert_eq!(*node, ReportValue::from(true));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(load(&path, None), Err(LotviewError::Json(_))));
    }
}

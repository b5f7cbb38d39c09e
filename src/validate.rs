//! Input gate for candidate uploads
//!
//! A candidate is judged only on what it declares: its media type and its
//! byte size. The media type is derived from the file extension, the same way
//! a browser file picker fills in `File.type`.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upload ceiling: 100 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

// Extension → declared media type
const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("3gp", "video/3gpp"),
    ("ogv", "video/ogg"),
];

const OTHER_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("csv", "text/csv"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("zip", "application/zip"),
];

/// Why a candidate was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum Rejection {
    #[error("Please upload a video file")]
    NotAVideo,
    #[error("File size exceeds 100MB limit")]
    TooLarge,
}

/// A file the user has picked or dropped. Immutable once selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFile {
    pub declared_media_type: String,
    pub byte_size: u64,
    pub display_name: String,
    /// Where the bytes come from when the file is sent.
    #[serde(skip)]
    pub path: PathBuf,
}

impl CandidateFile {
    pub fn new(
        declared_media_type: impl Into<String>,
        byte_size: u64,
        display_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            declared_media_type: declared_media_type.into(),
            byte_size,
            display_name: display_name.into(),
            path: path.into(),
        }
    }

    /// Stage a file from disk, reading its size from metadata.
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            declared_media_type: media_type_for(path).to_string(),
            byte_size: metadata.len(),
            display_name,
            path: path.to_path_buf(),
        })
    }

    /// `"clip.mp4 (10.00 MB)"`
    pub fn describe(&self) -> String {
        format!("{} ({})", self.display_name, human_size(self.byte_size))
    }
}

/// Media type a picker would declare for this path.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    VIDEO_TYPES
        .iter()
        .chain(OTHER_TYPES.iter())
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}

/// Type first, then size: a non-video is always `NotAVideo`, whatever its size.
pub fn validate(file: &CandidateFile) -> Result<(), Rejection> {
    if !file.declared_media_type.starts_with("video/") {
        return Err(Rejection::NotAVideo);
    }
    if file.byte_size > MAX_UPLOAD_BYTES {
        return Err(Rejection::TooLarge);
    }
    Ok(())
}

/// Megabytes with two decimals, MiB-based.
pub fn human_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

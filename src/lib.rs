//! Lotview - Upload parking lot footage, browse the analysis
//!
//! Lotview is the client half of a parking spot detector. It sends a video
//! to an analysis backend, shows upload progress while the backend works,
//! and presents the returned report as a collapsible tree together with a
//! link to the processed video.
//!
//! # Overview
//!
//! A submission goes through four steps:
//!
//! 1. **Validation**: only `video/*` files up to 100 MiB leave the machine.
//! 2. **Upload**: one multipart `POST` to `<backend>/upload-video`.
//! 3. **Progress**: a synthetic ticker and real transfer progress are merged
//!    into one number that never decreases and stays at or below 90 until
//!    the backend has answered.
//! 4. **Presentation**: the report is a tree of arbitrary JSON. Keys are
//!    humanized (`total_spots` → "Total Spots"), containers start collapsed.
//!
//! # Quick Start
//!
//! ```no_run
//! use lotview::transport::HttpTransport;
//! use lotview::{ClientConfig, ReportTree, SessionStore, UploadSession};
//!
//! let config = ClientConfig::from_env();
//! let mut store = SessionStore::new();
//! store.select_path("lot-camera.mp4")?;
//!
//! let transport = HttpTransport::new(&config)?;
//! let session = UploadSession::new(config);
//! let result = session.submit(&mut store, &transport, |update| {
//!     println!("{}%", update.percent);
//! })?;
//!
//! let tree = ReportTree::new(result);
//! for row in tree.visible_rows() {
//!     println!("{}: {}", row.label(), row.summary());
//! }
//! # Ok::<(), lotview::LotviewError>(())
//! ```
//!
//! # Modules
//!
//! - [`validate`]: accept or reject a file before upload
//! - [`progress`]: the merged progress indicator
//! - [`session`]: upload lifecycle and the shared result store
//! - [`transport`]: HTTP upload, reply parsing, video download
//! - [`tree`] and [`format`]: expansion state, key and value display
//! - [`report`]: text, HTML and JSON output
//! - [`serve`]: the interactive browser view

pub mod config;
pub mod error;
pub mod format;
pub mod prefs;
pub mod progress;
pub mod report;
pub mod serve;
pub mod session;
pub mod transport;
pub mod tree;
pub mod validate;
pub mod value;

pub use config::ClientConfig;
pub use error::{LotviewError, Result, TransportError};
pub use format::{classify, format_key, Category};
pub use prefs::Theme;
pub use progress::{Phase, ProgressController};
pub use session::{AnalysisResult, ProgressUpdate, SessionStore, UploadSession, UploadState};
pub use tree::ReportTree;
pub use validate::{validate, CandidateFile, Rejection};
pub use value::ReportValue;

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is correct and documented.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _config = ClientConfig::new();
        let _store = SessionStore::new();
        let _: Category = classify(&ReportValue::Null);
        assert_eq!(format_key("total_spots"), "Total Spots");
    }

    #[test]
    fn test_validate_accessible() {
        let file = CandidateFile::new("video/mp4", 1024, "a.mp4", "a.mp4");
        assert!(validate(&file).is_ok());
    }

    #[test]
    fn test_state_variants() {
        let _ = UploadState::Idle;
        let _ = UploadState::Validating;
        let _ = UploadState::InFlight { displayed_progress: 0 };
        let _ = UploadState::Failed { reason: String::new() };
        let _ = Theme::Dark;
    }
}

//! Talking to the analysis backend
//!
//! - `POST <base>/upload-video`: multipart form, one field `video` carrying the
//!   file bytes. Success body: `{"json_report": .., "video_download_url": ".."}`.
//!   Error body: optionally `{"message": ".."}`.
//! - `GET <base><video_download_url>`: the processed video, no custom headers.

use crate::config::ClientConfig;
use crate::error::{LotviewError, TransportError};
use crate::session::AnalysisResult;
use crate::validate::CandidateFile;
use crate::value::{from_json_slice, ReportValue};
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the single multipart field.
pub const UPLOAD_FIELD: &str = "video";

/// Receives the fraction of the file sent so far, in `[0, 1]`.
pub type ProgressSink = Box<dyn FnMut(f64) + Send>;

/// Status and body of whatever the server answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One network submission of a staged file.
///
/// `Err` means no reply arrived at all; an HTTP error status is still an
/// `Ok(HttpReply)` and is judged by [`parse_reply`].
pub trait Transport: Send + Sync {
    fn send(&self, file: &CandidateFile, progress: ProgressSink) -> Result<HttpReply, TransportError>;
}

pub struct HttpTransport {
    client: Client,
    upload_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                warn!("could not build http client: {}", e);
                TransportError::Network { message: None }
            })?;

        Ok(Self {
            client,
            upload_url: config.upload_url(),
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, file: &CandidateFile, progress: ProgressSink) -> Result<HttpReply, TransportError> {
        let source = File::open(&file.path).map_err(|e| {
            warn!(path = %file.path.display(), "cannot open upload source: {}", e);
            TransportError::Network {
                message: Some(format!("Cannot read {}: {}", file.display_name, e)),
            }
        })?;

        let reader = ProgressReader::new(source, file.byte_size, progress);
        let part = multipart::Part::reader_with_length(reader, file.byte_size)
            .file_name(file.display_name.clone())
            .mime_str(&file.declared_media_type)
            .map_err(network_error)?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        info!(url = %self.upload_url, bytes = file.byte_size, "uploading {}", file.display_name);
        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(network_error)?.to_vec();
        debug!(status, body_len = body.len(), "backend replied");

        Ok(HttpReply { status, body })
    }
}

fn network_error(e: reqwest::Error) -> TransportError {
    warn!("upload transport error: {}", e);
    TransportError::Network { message: None }
}

/// Wraps the upload source and reports how much of it has been read.
pub struct ProgressReader<R> {
    inner: R,
    total: u64,
    read: u64,
    sink: ProgressSink,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, total: u64, sink: ProgressSink) -> Self {
        Self {
            inner,
            total,
            read: 0,
            sink,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.read += n as u64;
            let ratio = if self.total == 0 {
                1.0
            } else {
                (self.read as f64 / self.total as f64).min(1.0)
            };
            (self.sink)(ratio);
        }
        Ok(n)
    }
}

#[derive(Deserialize)]
struct SuccessBody {
    json_report: Option<ReportValue>,
    video_download_url: Option<String>,
}

/// Turn a server reply into a result, or into the failure to show.
pub fn parse_reply(reply: &HttpReply) -> Result<AnalysisResult, TransportError> {
    if !reply.is_success() {
        let message = from_json_slice::<serde_json::Value>(&reply.body)
            .ok()
            .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .filter(|m| !m.trim().is_empty());
        return Err(TransportError::Status {
            code: reply.status,
            message,
        });
    }

    let body: SuccessBody = from_json_slice(&reply.body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

    let report = body
        .json_report
        .ok_or_else(|| TransportError::MalformedResponse("missing json_report".to_string()))?;
    let media_ref = body
        .video_download_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| TransportError::MalformedResponse("missing video_download_url".to_string()))?;

    Ok(AnalysisResult::new(report, media_ref))
}

/// Fetch the processed video to `dest`. Returns the number of bytes written.
pub fn download<P: AsRef<Path>>(
    config: &ClientConfig,
    media_ref: &str,
    dest: P,
) -> Result<u64, LotviewError> {
    let url = config.resolve(media_ref);
    let client = Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(network_error)?;

    info!(%url, "downloading processed video");
    let mut response = client.get(&url).send().map_err(network_error)?;
    if !response.status().is_success() {
        return Err(TransportError::Status {
            code: response.status().as_u16(),
            message: None,
        }
        .into());
    }

    let mut file = File::create(dest.as_ref())?;
    let written = response.copy_to(&mut file).map_err(network_error)?;
    Ok(written)
}

//! Upload, browse and download against a local mock backend.

use lotview::error::GENERIC_SERVER_ERROR;
use lotview::serve::ReportServer;
use lotview::transport::{self, HttpTransport};
use lotview::{
    Category, ClientConfig, LotviewError, Rejection, ReportTree, SessionStore, TransportError,
    UploadSession, UploadState,
};
use serde_json::json;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

struct MockBackend {
    server: Arc<Server>,
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MockBackend {
    /// Answers every upload with `status` and `body`; serves a fixed video.
    fn start(status: u16, body: serde_json::Value) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (srv, log) = (Arc::clone(&server), Arc::clone(&seen));
        thread::spawn(move || {
            for mut request in srv.incoming_requests() {
                let mut payload = Vec::new();
                request.as_reader().read_to_end(&mut payload).unwrap();
                let url = request.url().to_string();
                log.lock().unwrap().push((url.clone(), payload));

                let response = if url == "/files/out.mp4" {
                    Response::from_data(b"processed-video-bytes".to_vec())
                } else {
                    let json = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                    Response::from_string(body.to_string())
                        .with_status_code(status)
                        .with_header(json)
                };
                let _ = request.respond(response);
            }
        });

        Self { server, addr, seen }
    }

    fn config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_backend_base(format!("http://{}", self.addr))
            .with_tick_interval(Duration::from_millis(5))
            .with_finalize_delay(Duration::ZERO)
    }

    fn requests(&self) -> Vec<(String, Vec<u8>)> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

fn analysis_body() -> serde_json::Value {
    json!({
        "json_report": {
            "total_spots": 20,
            "available_spots": "5",
            "zones": [{"zone_name": "North", "free": true}]
        },
        "video_download_url": "/files/out.mp4"
    })
}

fn staged_file(dir: &tempfile::TempDir, name: &str, size: u64) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(size).unwrap();
    path
}

#[test]
fn test_video_upload_reaches_result() {
    let backend = MockBackend::start(200, analysis_body());
    let dir = tempfile::tempdir().unwrap();
    let path = staged_file(&dir, "lot.mp4", 10 * 1024 * 1024);

    let config = backend.config();
    let transport = HttpTransport::new(&config).unwrap();
    let session = UploadSession::new(config).with_seed(11);
    let mut store = SessionStore::new();
    store.select_path(&path).unwrap();

    let mut seen = Vec::new();
    let result = session
        .submit(&mut store, &transport, |update| seen.push(update.percent))
        .unwrap();

    // Never decreases, capped until the reply, then exactly 100
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
    assert_eq!(seen.last(), Some(&100));
    assert!(seen[..seen.len() - 1].iter().all(|p| *p <= 90));

    assert!(matches!(store.state(), UploadState::Succeeded { .. }));
    assert!(store.staged().is_none());
    assert_eq!(result.media_ref, "/files/out.mp4");
    assert_eq!(result.report.get("total_spots").and_then(|v| v.as_f64()), Some(20.0));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/upload-video");
    let body = String::from_utf8_lossy(&requests[0].1);
    assert!(body.contains(r#"name="video"; filename="lot.mp4""#));
    assert!(requests[0].1.len() > 10 * 1024 * 1024);

    let tree = ReportTree::new(result);
    let rows = tree.visible_rows();
    let total = rows.iter().find(|r| r.label() == "Total Spots").unwrap();
    assert_eq!(total.category, Category::NumericLike);
    assert_eq!(total.summary(), "20");
    let available = rows.iter().find(|r| r.label() == "Available Spots").unwrap();
    assert_eq!(available.category, Category::NumericLike);
    let zones = rows.iter().find(|r| r.label() == "Zones").unwrap();
    assert!(zones.expandable && !zones.expanded);
}

#[test]
fn test_non_video_never_leaves_the_machine() {
    let backend = MockBackend::start(200, analysis_body());
    let dir = tempfile::tempdir().unwrap();
    let path = staged_file(&dir, "notes.txt", 512);

    let config = backend.config();
    let transport = HttpTransport::new(&config).unwrap();
    let mut store = SessionStore::new();
    store.select_path(&path).unwrap();

    let mut updates = 0;
    let err = UploadSession::new(config)
        .submit(&mut store, &transport, |_| updates += 1)
        .unwrap_err();

    assert!(matches!(err, LotviewError::InputRejected(Rejection::NotAVideo)));
    assert_eq!(err.to_string(), "Please upload a video file");
    assert_eq!(updates, 0);
    assert_eq!(*store.state(), UploadState::Idle);
    assert!(store.result().is_none());
    assert!(backend.requests().is_empty());
}

#[test]
fn test_server_error_message_is_surfaced() {
    let backend = MockBackend::start(500, json!({"message": "Model unavailable"}));
    let dir = tempfile::tempdir().unwrap();
    let path = staged_file(&dir, "lot.mov", 2048);

    let config = backend.config();
    let transport = HttpTransport::new(&config).unwrap();
    let mut store = SessionStore::new();
    store.select_path(&path).unwrap();

    let err = UploadSession::new(config)
        .submit(&mut store, &transport, |_| {})
        .unwrap_err();

    match err {
        LotviewError::TransportFailure(TransportError::Status { code, ref message }) => {
            assert_eq!(code, 500);
            assert_eq!(message.as_deref(), Some("Model unavailable"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        *store.state(),
        UploadState::Failed {
            reason: "Model unavailable".to_string()
        }
    );
    assert!(store.require_result().is_err());
}

#[test]
fn test_server_error_without_message_is_generic() {
    let backend = MockBackend::start(502, json!({"detail": "bad gateway"}));
    let dir = tempfile::tempdir().unwrap();
    let path = staged_file(&dir, "lot.webm", 2048);

    let config = backend.config();
    let transport = HttpTransport::new(&config).unwrap();
    let mut store = SessionStore::new();
    store.select_path(&path).unwrap();

    let err = UploadSession::new(config)
        .submit(&mut store, &transport, |_| {})
        .unwrap_err();
    assert_eq!(err.to_string(), GENERIC_SERVER_ERROR);
}

#[test]
fn test_unreachable_backend_is_generic() {
    // Bind then drop to get a port nothing listens on
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = staged_file(&dir, "lot.mp4", 2048);

    let config = ClientConfig::new()
        .with_backend_base(format!("http://{}", addr))
        .with_finalize_delay(Duration::ZERO);
    let transport = HttpTransport::new(&config).unwrap();
    let mut store = SessionStore::new();
    store.select_path(&path).unwrap();

    let err = UploadSession::new(config)
        .submit(&mut store, &transport, |_| {})
        .unwrap_err();
    assert!(matches!(err, LotviewError::TransportFailure(TransportError::Network { .. })));
    assert_eq!(err.to_string(), GENERIC_SERVER_ERROR);
}

#[test]
fn test_download_processed_video() {
    let backend = MockBackend::start(200, analysis_body());
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.mp4");

    let written = transport::download(&backend.config(), "/files/out.mp4", &dest).unwrap();
    assert_eq!(written, b"processed-video-bytes".len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), b"processed-video-bytes");
}

fn start_viewer(store: SessionStore, config: ClientConfig) -> (Arc<Server>, SocketAddr, tempfile::TempDir) {
    let prefs = tempfile::tempdir().unwrap();
    let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
    let addr = server.server_addr().to_ip().unwrap();

    let mut viewer = ReportServer::new(config, store).with_prefs_path(prefs.path().join("prefs.json"));
    let srv = Arc::clone(&server);
    thread::spawn(move || viewer.run(&srv));
    (server, addr, prefs)
}

fn no_redirect_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[test]
fn test_viewer_without_result_redirects_to_entry() {
    let (server, addr, _prefs) = start_viewer(SessionStore::new(), ClientConfig::new());
    let client = no_redirect_client();

    let response = client.get(format!("http://{}/results", addr)).send().unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(
        response.headers().get("location").and_then(|v| v.to_str().ok()),
        Some("/")
    );
    assert!(!response.text().unwrap().contains("Total Spots"));

    let entry = client.get(format!("http://{}/", addr)).send().unwrap();
    assert_eq!(entry.status().as_u16(), 200);
    assert!(entry.text().unwrap().contains("No analysis yet"));

    server.unblock();
}

#[test]
fn test_viewer_after_upload() {
    let backend = MockBackend::start(200, analysis_body());
    let dir = tempfile::tempdir().unwrap();
    let path = staged_file(&dir, "lot.mp4", 4096);

    let config = backend.config();
    let transport = HttpTransport::new(&config).unwrap();
    let mut store = SessionStore::new();
    store.select_path(&path).unwrap();
    UploadSession::new(config.clone())
        .submit(&mut store, &transport, |_| {})
        .unwrap();

    let (server, addr, _prefs) = start_viewer(store, config.clone());
    let client = no_redirect_client();

    let page = client.get(format!("http://{}/results", addr)).send().unwrap();
    assert_eq!(page.status().as_u16(), 200);
    let html = page.text().unwrap();
    assert!(html.contains("Total Spots:"));
    assert!(html.contains("► Zones:"));
    assert!(!html.contains("North"));

    let toggle = client
        .get(format!("http://{}/toggle?path=zones", addr))
        .send()
        .unwrap();
    assert_eq!(toggle.status().as_u16(), 303);

    let html = client
        .get(format!("http://{}/results", addr))
        .send()
        .unwrap()
        .text()
        .unwrap();
    assert!(html.contains("▼ Zones:"));

    let download = client.get(format!("http://{}/download", addr)).send().unwrap();
    assert_eq!(
        download.headers().get("location").and_then(|v| v.to_str().ok()),
        Some(config.resolve("/files/out.mp4").as_str())
    );

    server.unblock();
}

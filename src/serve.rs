//! HTTP server for the interactive report view
//!
//! `lotview serve report.json` → starts server, opens browser, shows the tree
//!
//! The server owns the session store and the tree's expansion state; the
//! browser only follows links. Asking for `/results` before a result has been
//! published answers `303 See Other` back to `/`, the submission entry point.

use crate::config::ClientConfig;
use crate::error::LotviewError;
use crate::prefs::{self, Theme};
use crate::report::html::{self, Mode};
use crate::report::{Occupancy, RenderOptions};
use crate::session::SessionStore;
use crate::tree::{normalize_path, ReportTree};
use crate::value::ReportValue;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, warn};

const ENTRY_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Parking Spot Detector</title></head>
<body style="font-family: sans-serif; max-width: 640px; margin: 4rem auto;">
    <h1>Parking Spot Detector</h1>
    <p>Upload video footage to detect and analyze available parking spots.</p>
    <p>{{STATUS}}</p>
</body>
</html>
"#;

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }

    fn failure(error: String) -> Self {
        Self { ok: false, data: None, error: Some(error) }
    }
}

#[derive(Serialize)]
struct ReportPayload<'a> {
    report: &'a ReportValue,
    media_ref: &'a str,
    download_url: String,
    occupancy: Option<Occupancy>,
    expanded_paths: usize,
}

#[derive(Deserialize, Debug)]
struct ToggleParams {
    path: String,
}

/// What a route produced, before it becomes a tiny_http response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub location: Option<String>,
}

impl Reply {
    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body, location: None }
    }

    fn json(body: String) -> Self {
        Self { status: 200, content_type: "application/json", body, location: None }
    }

    fn redirect(to: impl Into<String>) -> Self {
        Self { status: 303, content_type: "text/plain", body: String::new(), location: Some(to.into()) }
    }

    fn not_found() -> Self {
        Self { status: 404, content_type: "text/plain", body: "Not found".to_string(), location: None }
    }
}

pub struct ReportServer {
    config: ClientConfig,
    store: SessionStore,
    tree: Option<ReportTree>,
    theme: Theme,
    prefs_path: PathBuf,
}

impl ReportServer {
    pub fn new(config: ClientConfig, store: SessionStore) -> Self {
        let tree = store.require_result().ok().map(ReportTree::new);
        let prefs_path = prefs::default_path();
        Self {
            config,
            store,
            tree,
            theme: prefs::load_theme(&prefs_path),
            prefs_path,
        }
    }

    /// Keep the theme preference somewhere other than the working directory.
    pub fn with_prefs_path(mut self, path: PathBuf) -> Self {
        self.theme = prefs::load_theme(&path);
        self.prefs_path = path;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Serve until the server is unblocked.
    pub fn run(&mut self, server: &Server) {
        for request in server.incoming_requests() {
            if let Err(e) = self.handle(request) {
                warn!("request failed: {}", e);
            }
        }
    }

    fn handle(&mut self, request: Request) -> std::io::Result<()> {
        let reply = self.route(request.method(), request.url());
        debug!(method = %request.method(), url = request.url(), status = reply.status, "served");

        let mut response = Response::from_string(reply.body).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            response = response.with_header(header);
        }
        if let Some(location) = reply.location {
            if let Ok(header) = Header::from_bytes(&b"Location"[..], location.as_bytes()) {
                response = response.with_header(header);
            }
        }
        request.respond(response)
    }

    pub fn route(&mut self, method: &Method, url: &str) -> Reply {
        let path = url.split('?').next().unwrap_or("/");
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");

        if *method != Method::Get {
            return Reply::not_found();
        }

        match path {
            "/" => self.entry_page(),
            "/results" => self.results_page(),
            "/toggle" => {
                let Some(tree) = self.tree.as_mut() else {
                    return Reply::redirect("/");
                };
                if let Ok(params) = serde_urlencoded::from_str::<ToggleParams>(query) {
                    let path = normalize_path(&params.path);
                    if tree.toggle(&path).is_none() {
                        debug!(%path, "toggle ignored: not an expandable node");
                    }
                }
                Reply::redirect("/results")
            }
            "/expand-all" | "/collapse-all" => {
                let Some(tree) = self.tree.as_mut() else {
                    return Reply::redirect("/");
                };
                if path == "/expand-all" {
                    tree.expand_all();
                } else {
                    tree.collapse_all();
                }
                Reply::redirect("/results")
            }
            "/theme" => {
                self.theme = self.theme.toggled();
                if let Err(e) = prefs::save_theme(&self.prefs_path, self.theme) {
                    warn!("could not save theme: {}", e);
                }
                Reply::redirect("/results")
            }
            "/download" => match self.store.require_result() {
                Ok(result) => Reply::redirect(self.config.resolve(&result.media_ref)),
                Err(_) => Reply::redirect("/"),
            },
            "/api/report" => self.api_report(),
            _ => Reply::not_found(),
        }
    }

    fn entry_page(&self) -> Reply {
        let status = if self.tree.is_some() {
            r#"An analysis is ready: <a href="/results">view results</a>."#.to_string()
        } else {
            "No analysis yet. Run <code>lotview upload &lt;video&gt;</code> to submit footage.".to_string()
        };
        Reply::html(ENTRY_HTML.replace("{{STATUS}}", &status))
    }

    fn results_page(&self) -> Reply {
        let (Some(tree), Ok(result)) = (self.tree.as_ref(), self.store.require_result()) else {
            info!("{}", LotviewError::NoResult);
            return Reply::redirect("/");
        };

        let options = RenderOptions {
            theme: self.theme,
            download_url: Some(self.config.resolve(&result.media_ref)),
            color: false,
        };
        let mut out = Vec::new();
        match html::write(&mut out, tree, &options, Mode::Live) {
            Ok(()) => Reply::html(String::from_utf8_lossy(&out).into_owned()),
            Err(e) => Reply {
                status: 500,
                content_type: "text/plain",
                body: e.to_string(),
                location: None,
            },
        }
    }

    fn api_report(&self) -> Reply {
        let body = match (self.tree.as_ref(), self.store.require_result()) {
            (Some(tree), Ok(result)) => serde_json::to_string(&ApiResponse::success(ReportPayload {
                report: &result.report,
                media_ref: &result.media_ref,
                download_url: self.config.resolve(&result.media_ref),
                occupancy: Occupancy::from_report(&result.report),
                expanded_paths: tree.tracked_paths(),
            })),
            _ => serde_json::to_string(&ApiResponse::<()>::failure(LotviewError::NoResult.to_string())),
        };
        Reply::json(body.unwrap_or_else(|e| format!(r#"{{"ok":false,"error":"{}"}}"#, e)))
    }
}

/// Start server, open browser, serve the report view
pub fn start(port: u16, config: ClientConfig, store: SessionStore) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let url = format!("http://localhost:{}/results", port);
    eprintln!("\n\x1b[1;32mlotview\x1b[0m");
    eprintln!("   {}\n", url);

    // Open browser
    let _ = open::that(&url);

    let mut state = ReportServer::new(config, store);
    state.run(&server);
    Ok(())
}

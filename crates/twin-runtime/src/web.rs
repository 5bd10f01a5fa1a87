//! IDE server: editor UI, resource folders and document generation.

#![allow(missing_docs)]

use std::thread;

use serde_json::json;
use tiny_http::{Method, Server};
use tracing::{debug, info, warn};

use crate::error::TwinError;
use crate::generate::{self, GenerateRequest};
use crate::http::{self, Reply};
use crate::resources::{ResourceKind, ResourceStore};

const INDEX_HTML: &str = include_str!("web/ui/index.html");
const APP_JS: &str = include_str!("web/ui/app.js");
const APP_CSS: &str = include_str!("web/ui/styles.css");

pub struct WebServer {
    handle: thread::JoinHandle<()>,
    pub listen: String,
    pub url: String,
}

impl WebServer {
    /// Block until the server thread exits.
    pub fn wait(self) {
        let _ = self.handle.join();
    }
}

fn error_reply(err: &TwinError) -> Reply {
    let status = match err {
        TwinError::NotFound(_) => 404,
        TwinError::Io(_) => 500,
        _ => 400,
    };
    http::text(status, &format!("error: {err}"))
}

fn content_type(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map_or("", |(_, ext)| ext);
    match extension.to_ascii_lowercase().as_str() {
        "svg" => "image/svg+xml",
        "js" => "application/javascript",
        "html" => "text/html; charset=utf-8",
        "json" => "application/json",
        _ => "text/plain; charset=utf-8",
    }
}

/// `/prefix/<type>/<file>` split into the decoded type and file name.
fn typed_segments(rest: &str) -> Option<(String, String)> {
    let (kind, name) = rest.split_once('/')?;
    Some((http::decode(kind), http::decode(name)))
}

pub fn start_web_server(listen: &str, store: ResourceStore) -> Result<WebServer, TwinError> {
    store.ensure_dirs()?;
    let server = Server::http(listen)
        .map_err(|err| TwinError::Server(format!("web bind {listen}: {err}").into()))?;
    let url = http::format_url(listen);
    info!(%url, "IDE server listening");
    let handle = thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let method = request.method().clone();
            let raw_url = request.url().to_string();
            let (path, query) = http::split_url(&raw_url);
            debug!(%method, path, "ide request");
            let body = if method == Method::Post {
                http::read_body(&mut request)
            } else {
                None
            };
            let reply = route(&method, path, query, body.as_deref(), &store);
            let _ = request.respond(reply);
        }
    });
    Ok(WebServer {
        handle,
        listen: listen.to_string(),
        url,
    })
}

fn route(method: &Method, path: &str, query: Option<&str>, body: Option<&str>, store: &ResourceStore) -> Reply {
    if *method == Method::Get && (path == "/" || path == "/index.html") {
        return http::content(INDEX_HTML, "text/html; charset=utf-8");
    }
    if *method == Method::Get && path == "/styles.css" {
        return http::content(APP_CSS, "text/css");
    }
    if *method == Method::Get && path == "/app.js" {
        return http::content(APP_JS, "application/javascript");
    }
    if *method == Method::Get && path == "/resources" {
        let listing = serde_json::to_value(store.listing()).unwrap_or_default();
        return http::json(200, &listing);
    }
    if *method == Method::Get {
        if let Some(rest) = path.strip_prefix("/resource/") {
            let Some((kind, name)) = typed_segments(rest) else {
                return http::text(400, "missing file name");
            };
            return match ResourceKind::parse(&kind).and_then(|kind| store.read(kind, &name)) {
                Ok(text) => http::content(text, content_type(&name)),
                Err(err) => error_reply(&err),
            };
        }
    }
    if *method == Method::Post {
        if let Some(kind) = path.strip_prefix("/upload/") {
            let Some(name) = http::query_param(query, "name") else {
                return http::text(400, "missing file name");
            };
            let result = ResourceKind::parse(&http::decode(kind))
                .and_then(|kind| store.upload(kind, &name, body.unwrap_or_default()));
            return match result {
                Ok(_) => http::json(200, &json!({ "success": true, "file": name })),
                Err(err) => error_reply(&err),
            };
        }
    }
    if *method == Method::Post {
        if let Some(rest) = path.strip_prefix("/save/") {
            let Some((kind, name)) = typed_segments(rest) else {
                return http::text(400, "missing file name");
            };
            let Some(content) = body else {
                return http::text(400, "missing content");
            };
            let result = ResourceKind::parse(&kind).and_then(|kind| store.save(kind, &name, content));
            return match result {
                Ok(_) => http::json(200, &json!({ "success": true, "file": name })),
                Err(err) => error_reply(&err),
            };
        }
    }
    if *method == Method::Post && path == "/generate" {
        let request = match body.map(serde_json::from_str::<GenerateRequest>) {
            Some(Ok(request)) => request,
            Some(Err(err)) => return http::text(400, &format!("error: {err}")),
            None => return http::text(400, "missing request body"),
        };
        return match generate::write_document(store, &request) {
            Ok(response) => http::json(200, &serde_json::to_value(response).unwrap_or_default()),
            Err(err) => {
                warn!(%err, "generation failed");
                error_reply(&err)
            }
        };
    }
    if *method == Method::Get {
        if let Some(name) = path.strip_prefix("/download/") {
            let name = http::decode(name);
            return match store.read_output(&name) {
                Ok(text) => http::content(text, "text/html; charset=utf-8").with_header(http::header(
                    "Content-Disposition",
                    &format!("attachment; filename=\"{name}\""),
                )),
                Err(err) => error_reply(&err),
            };
        }
    }
    if *method == Method::Get {
        if let Some(name) = path.strip_prefix("/examples/") {
            let name = http::decode(name);
            return match store.read_example(&name) {
                Ok(text) => http::content(text, content_type(&name)),
                Err(err) => error_reply(&err),
            };
        }
    }
    http::text(404, "not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type("tank.svg"), "image/svg+xml");
        assert_eq!(content_type("tank.JS"), "application/javascript");
        assert_eq!(content_type("notes"), "text/plain; charset=utf-8");
    }

    #[test]
    fn typed_paths_are_decoded() {
        assert_eq!(
            typed_segments("svg/my%20tank.svg"),
            Some(("svg".to_string(), "my tank.svg".to_string()))
        );
        assert_eq!(typed_segments("svg"), None);
    }
}

//! Shared `tiny_http` response and URL helpers.

use std::io::Cursor;

use serde_json::Value;
use tiny_http::{Header, Request, Response, StatusCode};

pub(crate) type Reply = Response<Cursor<Vec<u8>>>;

pub(crate) fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name, value).unwrap()
}

pub(crate) fn with_cors(response: Reply) -> Reply {
    response
        .with_header(header("Access-Control-Allow-Origin", "*"))
        .with_header(header("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .with_header(header("Access-Control-Allow-Headers", "Content-Type"))
}

pub(crate) fn json(status: u16, body: &Value) -> Reply {
    Response::from_string(body.to_string())
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", "application/json"))
}

pub(crate) fn text(status: u16, body: &str) -> Reply {
    Response::from_string(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", "text/plain; charset=utf-8"))
}

pub(crate) fn content(body: impl Into<String>, content_type: &str) -> Reply {
    Response::from_string(body.into()).with_header(header("Content-Type", content_type))
}

pub(crate) fn read_body(request: &mut Request) -> Option<String> {
    let mut body = String::new();
    request.as_reader().read_to_string(&mut body).ok()?;
    Some(body)
}

/// Path without the query string, and the query string if any.
pub(crate) fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

pub(crate) fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == name).then(|| decode(value))
    })
}

/// Percent-decode one path segment or query value; `+` means space.
pub(crate) fn decode(segment: &str) -> String {
    let spaced = segment.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

pub(crate) fn format_url(listen: &str) -> String {
    let host = listen.rsplit_once(':').map_or("localhost", |(host, _)| host);
    let port = listen.rsplit(':').next().unwrap_or("80");
    let host = if host == "0.0.0.0" || host.is_empty() {
        "localhost"
    } else {
        host
    };
    format!("http://{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_are_decoded() {
        let (path, query) = split_url("/upload/svg?name=my%20tank.svg&x=1");
        assert_eq!(path, "/upload/svg");
        assert_eq!(query_param(query, "name").as_deref(), Some("my tank.svg"));
        assert_eq!(query_param(query, "x").as_deref(), Some("1"));
        assert_eq!(query_param(query, "y"), None);
        assert_eq!(query_param(None, "name"), None);
        assert_eq!(decode("a+b%2Bc"), "a b+c");
    }

    #[test]
    fn urls_replace_wildcard_host() {
        assert_eq!(format_url("0.0.0.0:6000"), "http://localhost:6000");
        assert_eq!(format_url("127.0.0.1:5011"), "http://127.0.0.1:5011");
    }
}

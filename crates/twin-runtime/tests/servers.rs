use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use twin_runtime::api::start_api_server;
use twin_runtime::feed::{HttpSource, SnapshotSource};
use twin_runtime::resources::ResourceStore;
use twin_runtime::sensors::SensorPlant;
use twin_runtime::web::start_web_server;

struct Reply {
    status: u16,
    body: String,
    content_type: Option<String>,
    disposition: Option<String>,
    origin: Option<String>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| json!({}))
    }
}

fn reserve_loopback_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

fn wait_for_server(url: &str) {
    for _ in 0..100 {
        if ureq::get(url).call().is_ok() {
            return;
        }
        thread::sleep(Duration::from_millis(25));
    }
    panic!("server did not become reachable at {url}");
}

fn into_reply(response: ureq::Response) -> Reply {
    let status = response.status();
    let content_type = response.header("Content-Type").map(str::to_string);
    let disposition = response.header("Content-Disposition").map(str::to_string);
    let origin = response
        .header("Access-Control-Allow-Origin")
        .map(str::to_string);
    let body = response.into_string().expect("read body");
    Reply {
        status,
        body,
        content_type,
        disposition,
        origin,
    }
}

fn request(method: &str, url: &str, body: Option<&str>) -> Reply {
    let request = match method {
        "GET" => ureq::get(url),
        "POST" => ureq::post(url),
        other => panic!("unsupported method {other}"),
    };
    let result = match body {
        Some(body) => request.send_string(body),
        None => request.call(),
    };
    match result {
        Ok(response) | Err(ureq::Error::Status(_, response)) => into_reply(response),
        Err(err) => panic!("request failed: {err}"),
    }
}

fn make_workspace(name: &str) -> PathBuf {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("twin-runtime-servers-{name}-{stamp}"));
    std::fs::create_dir_all(root.join("examples")).expect("create examples");
    std::fs::write(root.join("examples/demo.svg"), "<svg id=\"demo\"/>").expect("write example");
    root
}

fn start_ide(root: &std::path::Path) -> String {
    let listen = format!("127.0.0.1:{}", reserve_loopback_port());
    let store = ResourceStore::new(root.join("resources"), root.join("output"), root.join("examples"));
    let server = start_web_server(&listen, store).expect("start IDE server");
    wait_for_server(&format!("{}/", server.url));
    server.url
}

fn start_api() -> String {
    let listen = format!("127.0.0.1:{}", reserve_loopback_port());
    let plant = Arc::new(Mutex::new(SensorPlant::new()));
    let server = start_api_server(&listen, plant).expect("start sensor API");
    wait_for_server(&format!("{}/api/data", server.url));
    server.url
}

#[test]
fn ide_serves_editor_and_resources() {
    let root = make_workspace("resources");
    let base = start_ide(&root);

    let index = request("GET", &format!("{base}/"), None);
    assert_eq!(index.status, 200);
    assert!(index.body.contains("Digital Twin Interactions IDE"));
    assert_eq!(request("GET", &format!("{base}/app.js"), None).status, 200);

    let upload = request(
        "POST",
        &format!("{base}/upload/svg?name=tank.svg"),
        Some("<svg id=\"tank\"><rect id=\"tank-body\"/></svg>"),
    );
    assert_eq!(upload.status, 200);
    assert_eq!(upload.json(), json!({ "success": true, "file": "tank.svg" }));

    let listing = request("GET", &format!("{base}/resources"), None).json();
    assert_eq!(listing["svgFiles"], json!(["tank.svg"]));
    assert_eq!(listing["scriptFiles"], json!([]));

    let svg = request("GET", &format!("{base}/resource/svg/tank.svg"), None);
    assert_eq!(svg.status, 200);
    assert_eq!(svg.content_type.as_deref(), Some("image/svg+xml"));
    assert!(svg.body.starts_with("<svg id=\"tank\">"));

    let saved = request(
        "POST",
        &format!("{base}/save/svg/tank.svg"),
        Some("<svg id=\"tank\"/>"),
    );
    assert_eq!(saved.status, 200);
    assert_eq!(
        request("GET", &format!("{base}/resource/svg/tank.svg"), None).body,
        "<svg id=\"tank\"/>"
    );

    let example = request("GET", &format!("{base}/examples/demo.svg"), None);
    assert_eq!(example.status, 200);
    assert_eq!(example.body, "<svg id=\"demo\"/>");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn ide_rejects_bad_resource_requests() {
    let root = make_workspace("errors");
    let base = start_ide(&root);

    let bad_type = request("GET", &format!("{base}/resource/image/tank.svg"), None);
    assert_eq!(bad_type.status, 400);
    assert_eq!(bad_type.body, "error: invalid resource type 'image'");

    let escape = request("GET", &format!("{base}/resource/svg/..%2Fsecret.svg"), None);
    assert_eq!(escape.status, 400);

    let missing = request("POST", &format!("{base}/save/script/none.js"), Some("x"));
    assert_eq!(missing.status, 404);

    let wrong_extension = request("POST", &format!("{base}/upload/script?name=tank.svg"), Some("x"));
    assert_eq!(wrong_extension.status, 400);

    let unnamed = request("POST", &format!("{base}/upload/svg"), Some("<svg/>"));
    assert_eq!(unnamed.status, 400);

    assert_eq!(request("GET", &format!("{base}/nowhere"), None).status, 404);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn ide_generates_and_downloads_documents() {
    let root = make_workspace("generate");
    let base = start_ide(&root);
    request(
        "POST",
        &format!("{base}/upload/svg?name=tank.svg"),
        Some("<svg id=\"tank\"><rect id=\"tank-body\"/></svg>"),
    );

    let empty = request("POST", &format!("{base}/generate"), Some("{}"));
    assert_eq!(empty.status, 400);
    assert_eq!(empty.body, "error: no SVG files selected");

    let malformed = request("POST", &format!("{base}/generate"), Some("{"));
    assert_eq!(malformed.status, 400);

    let payload = json!({
        "svgFiles": ["tank.svg"],
        "title": "Plant",
        "bindings": { "tank-body": { "script": "tank.js", "event": "dblclick" } },
        "metadata": { "tank": { "level": "40" } }
    });
    let generated = request("POST", &format!("{base}/generate"), Some(&payload.to_string()));
    assert_eq!(generated.status, 200);
    let response = generated.json();
    assert_eq!(response["success"], json!(true));
    let download = response["downloadUrl"].as_str().expect("download url");
    let file = response["file"].as_str().expect("file");
    assert_eq!(download, format!("/download/{file}"));

    let document = request("GET", &format!("{base}{download}"), None);
    assert_eq!(document.status, 200);
    assert_eq!(
        document.disposition,
        Some(format!("attachment; filename=\"{file}\""))
    );
    assert!(document.body.contains("<title>Plant</title>"));
    assert!(document.body.contains("data-event=\"dblclick\""));
    assert!(document.body.contains("data-level=\"40\""));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn sensor_api_reports_and_controls_components() {
    let base = start_api();

    let data = request("GET", &format!("{base}/api/data"), None);
    assert_eq!(data.status, 200);
    assert_eq!(data.origin.as_deref(), Some("*"));
    let data = data.json();
    assert_eq!(data["tank1"]["level"].as_f64(), Some(50.0));
    assert_eq!(data["pump1"]["status"], json!("off"));
    assert_eq!(data["system"]["alarms"], json!([]));

    let pump = request("GET", &format!("{base}/api/data/pump1"), None).json();
    assert_eq!(pump["status"], json!("off"));

    let unknown = request("GET", &format!("{base}/api/data/boiler"), None);
    assert_eq!(unknown.status, 404);
    assert_eq!(unknown.json()["error"], json!("Component boiler not found"));

    let valve = request(
        "POST",
        &format!("{base}/api/control/valve1"),
        Some(r#"{"position":"open","lastUpdated":"never"}"#),
    );
    assert_eq!(valve.status, 200);
    let valve = valve.json();
    assert_eq!(valve["position"], json!("open"));
    assert_ne!(valve["lastUpdated"], json!("never"));

    let invalid = request("POST", &format!("{base}/api/control/valve1"), Some("[1]"));
    assert_eq!(invalid.status, 400);
    let missing = request("POST", &format!("{base}/api/control/boiler"), Some("{}"));
    assert_eq!(missing.status, 404);
}

#[test]
fn http_source_reads_the_sensor_api() {
    let base = start_api();
    let mut source = HttpSource::new(&base);
    assert_eq!(source.url(), format!("{base}/api/data"));

    let snapshot = source.fetch_snapshot().expect("snapshot");
    assert_eq!(snapshot.get("pump1.status"), Some("off"));
    assert!(snapshot.get("tank1.level").is_some());
    assert_eq!(snapshot.get("system.alarms"), Some("[]"));

    let mut offline = HttpSource::new(&format!("http://127.0.0.1:{}", reserve_loopback_port()));
    assert!(offline.fetch_snapshot().is_err());
}

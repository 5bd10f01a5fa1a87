//! Mock sensor API.
//!
//! `GET /api/data` and `GET /api/data/:component` advance the plant before
//! answering; `POST /api/control/:component` applies a partial update.
//! Every response allows any origin.

use std::sync::{Arc, Mutex};
use std::thread;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tiny_http::{Method, Server};
use tracing::{debug, info};

use crate::error::TwinError;
use crate::http::{self, Reply};
use crate::sensors::SensorPlant;

pub const DEFAULT_API_LISTEN: &str = "127.0.0.1:5011";

pub struct ApiServer {
    handle: thread::JoinHandle<()>,
    pub listen: String,
    pub url: String,
}

impl ApiServer {
    /// Block until the server thread exits.
    pub fn wait(self) {
        let _ = self.handle.join();
    }
}

pub fn start_api_server(listen: &str, plant: Arc<Mutex<SensorPlant>>) -> Result<ApiServer, TwinError> {
    let server = Server::http(listen)
        .map_err(|err| TwinError::Server(format!("api bind {listen}: {err}").into()))?;
    let url = http::format_url(listen);
    info!(%url, "sensor API listening");
    let handle = thread::spawn(move || {
        let mut rng = StdRng::from_entropy();
        for mut request in server.incoming_requests() {
            let method = request.method().clone();
            let url = request.url().to_string();
            let (path, _) = http::split_url(&url);
            debug!(%method, path, "api request");
            let body = if method == Method::Post {
                http::read_body(&mut request)
            } else {
                None
            };
            let reply = route(&method, path, body.as_deref(), &plant, &mut rng);
            let _ = request.respond(http::with_cors(reply));
        }
    });
    Ok(ApiServer {
        handle,
        listen: listen.to_string(),
        url,
    })
}

fn not_found(component: &str) -> Reply {
    http::json(404, &json!({ "error": format!("Component {component} not found") }))
}

fn route(
    method: &Method,
    path: &str,
    body: Option<&str>,
    plant: &Mutex<SensorPlant>,
    rng: &mut StdRng,
) -> Reply {
    if *method == Method::Options {
        return http::text(204, "");
    }
    if *method == Method::Get && path == "/api/data" {
        let mut plant = plant.lock().expect("sensor plant lock poisoned");
        plant.advance(rng);
        return http::json(200, &plant.snapshot());
    }
    if *method == Method::Get {
        if let Some(component) = path.strip_prefix("/api/data/") {
            let component = http::decode(component);
            let mut plant = plant.lock().expect("sensor plant lock poisoned");
            if plant.component(&component).is_err() {
                return not_found(&component);
            }
            plant.advance(rng);
            return match plant.component(&component) {
                Ok(value) => http::json(200, &value),
                Err(_) => not_found(&component),
            };
        }
    }
    if *method == Method::Post {
        if let Some(component) = path.strip_prefix("/api/control/") {
            let component = http::decode(component);
            let updates = match body.map(serde_json::from_str::<Value>) {
                Some(Ok(Value::Object(map))) => map,
                _ => return http::json(400, &json!({ "error": "expected a JSON object" })),
            };
            let mut plant = plant.lock().expect("sensor plant lock poisoned");
            return match plant.apply_control(&component, &updates) {
                Ok(value) => http::json(200, &value),
                Err(TwinError::UnknownComponent(_)) => not_found(&component),
                Err(err) => http::json(400, &json!({ "error": err.to_string() })),
            };
        }
    }
    http::json(404, &json!({ "error": "not found" }))
}

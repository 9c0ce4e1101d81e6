//! HTTP serving shell around the predictor: one upload endpoint, open CORS,
//! a thread per request sharing the model behind a mutex.

pub mod handlers;
pub mod multipart;

use std::io::Cursor;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{error, info};
use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, Server};

use crate::error::{Error, Result};
use crate::infer::{CascadeDetector, DetectorConfig, Predictor};
use crate::nn::Network;

/// Where to listen and which models to load.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub addr: String,
    pub model_path: PathBuf,
    /// Cascade model for face detection; without one every upload is
    /// classified as a whole frame.
    pub detector_path: Option<PathBuf>,
}

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "*"),
];

fn json_response(status: u16, body: &Value) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_data(body.to_string().into_bytes()).with_status_code(status);
    if let Ok(h) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(h);
    }
    for (field, value) in CORS_HEADERS {
        if let Ok(h) = Header::from_bytes(field.as_bytes(), value.as_bytes()) {
            response.add_header(h);
        }
    }
    response
}

fn preflight_response() -> Response<std::io::Empty> {
    let mut response = Response::empty(204);
    for (field, value) in CORS_HEADERS {
        if let Ok(h) = Header::from_bytes(field.as_bytes(), value.as_bytes()) {
            response.add_header(h);
        }
    }
    response
}

fn handle(mut request: Request, predictor: &Arc<Mutex<Predictor<Network>>>) {
    if *request.method() == Method::Options {
        let _ = request.respond(preflight_response());
        return;
    }

    let url = request.url().to_owned();
    let (status, body) = match (request.method().clone(), url.as_str()) {
        (Method::Get, "/") => (200, handlers::index()),
        (Method::Post, "/predict-emotion") => {
            let content_type = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Content-Type"))
                .map(|h| h.value.as_str().to_owned());
            let mut payload = Vec::new();
            match request.as_reader().read_to_end(&mut payload) {
                Ok(_) => {
                    let mut guard = predictor.lock().unwrap_or_else(|p| p.into_inner());
                    handlers::predict_upload(&mut guard, content_type.as_deref(), &payload)
                }
                Err(e) => (400, json!({ "error": format!("could not read body: {}", e) })),
            }
        }
        _ => (404, json!({ "error": "not found" })),
    };

    if status >= 500 {
        error!("{} {} -> {}: {}", request.method(), url, status, body);
    }
    let _ = request.respond(json_response(status, &body));
}

/// Loads the model (and optionally the face cascade), binds the listener,
/// and serves requests until the process is killed.
pub fn run(config: &ServeConfig) -> Result<()> {
    let mut predictor = Predictor::from_model_file(&config.model_path)?;
    info!("loaded model from {}", config.model_path.display());

    if let Some(path) = &config.detector_path {
        let detector = CascadeDetector::from_model(path, &DetectorConfig::default())?;
        predictor = predictor.with_finder(Box::new(detector));
        info!("face detection enabled via {}", path.display());
    } else {
        info!("no face detector configured, classifying whole frames");
    }

    let predictor = Arc::new(Mutex::new(predictor));
    let server = Server::http(&config.addr).map_err(|e| Error::Server(e.to_string()))?;
    info!("listening on http://{}", config.addr);

    for request in server.incoming_requests() {
        let predictor = Arc::clone(&predictor);
        std::thread::spawn(move || handle(request, &predictor));
    }
    Ok(())
}

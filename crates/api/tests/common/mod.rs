#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path as UrlPath, State};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get as route_get, post};
use axum::{Json, Router};
use comfygen_api::config::ServerConfig;
use comfygen_api::router::build_app_router;
use comfygen_api::state::AppState;
use comfygen_comfyui::ComfyUIConfig;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::watch;
use tower::ServiceExt;

/// Build a test `ServerConfig` rooted in `dir`, talking to ComfyUI at
/// `comfyui_addr`.
///
/// The default workflow template is written to `dir/default.json`.
pub fn test_config(dir: &Path, comfyui_addr: &str) -> ServerConfig {
    let workflow_path = dir.join("default.json");
    std::fs::write(
        &workflow_path,
        json!({
            "74": {"class_type": "CLIPTextEncode", "inputs": {"text": ""}},
            "75": {"class_type": "CLIPTextEncode", "inputs": {"text": ""}},
            "72": {"class_type": "KSampler", "inputs": {"seed": 0, "steps": 20}},
            "9": {"class_type": "SaveImage", "inputs": {"images": ["8", 0]}}
        })
        .to_string(),
    )
    .unwrap();

    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_body_bytes: 1024 * 1024,
        output_folder: dir.join("outputs"),
        default_workflow_path: workflow_path,
        comfyui: ComfyUIConfig {
            server_address: comfyui_addr.to_string(),
            default_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
            http_timeout: Duration::from_secs(5),
        },
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(config: ServerConfig) -> Router {
    build_app_router(AppState::new(config))
}

/// An address nothing listens on.
pub async fn unused_addr() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Fake ComfyUI
// ---------------------------------------------------------------------------

/// A ComfyUI stand-in that completes every prompt as `prompt-1`, with one
/// image per entry of `outputs` (`(node_id, filename)`), each containing
/// the bytes of its filename.
///
/// Completion is announced `completion_delay` after submission.
pub struct FakeComfyUI {
    pub addr: SocketAddr,
    pub submissions: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct FakeState {
    outputs: Arc<Vec<(String, String)>>,
    submissions: Arc<Mutex<Vec<Value>>>,
    submitted: watch::Sender<bool>,
    completion_delay: Duration,
}

const PROMPT_ID: &str = "prompt-1";

impl FakeComfyUI {
    pub async fn start(outputs: &[(&str, &str)]) -> Self {
        Self::start_with_delay(outputs, Duration::ZERO).await
    }

    pub async fn start_with_delay(outputs: &[(&str, &str)], completion_delay: Duration) -> Self {
        let submissions = Arc::new(Mutex::new(Vec::new()));
        let (submitted, _) = watch::channel(false);
        let state = FakeState {
            outputs: Arc::new(
                outputs
                    .iter()
                    .map(|(node, file)| (node.to_string(), file.to_string()))
                    .collect(),
            ),
            submissions: Arc::clone(&submissions),
            submitted,
            completion_delay,
        };

        let app = Router::new()
            .route("/ws", route_get(ws_handler))
            .route("/prompt", post(prompt_handler))
            .route("/history/{prompt_id}", route_get(history_handler))
            .route("/view", route_get(view_handler))
            .route("/queue", route_get(|| async { Json(json!({"queue_running": [], "queue_pending": []})) }))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, submissions }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }
}

async fn ws_handler(State(state): State<FakeState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, state))
}

async fn run_socket(mut socket: WebSocket, state: FakeState) {
    let mut submitted = state.submitted.subscribe();
    if submitted.wait_for(|done| *done).await.is_err() {
        return;
    }
    tokio::time::sleep(state.completion_delay).await;
    let done = json!({"type": "executing", "data": {"node": null, "prompt_id": PROMPT_ID}});
    if socket.send(Message::Text(done.to_string().into())).await.is_err() {
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }
}

async fn prompt_handler(State(state): State<FakeState>, Json(body): Json<Value>) -> Json<Value> {
    state.submissions.lock().unwrap().push(body);
    state.submitted.send_replace(true);
    Json(json!({"prompt_id": PROMPT_ID, "number": 1}))
}

async fn history_handler(
    State(state): State<FakeState>,
    UrlPath(prompt_id): UrlPath<String>,
) -> Json<Value> {
    let mut outputs = serde_json::Map::new();
    for (node, file) in state.outputs.iter() {
        let images = outputs
            .entry(node.clone())
            .or_insert_with(|| json!({"images": []}));
        if let Some(list) = images["images"].as_array_mut() {
            list.push(json!({"filename": file, "subfolder": "", "type": "output"}));
        }
    }
    let mut body = serde_json::Map::new();
    body.insert(prompt_id, json!({ "outputs": outputs }));
    Json(Value::Object(body))
}

async fn view_handler(
    axum::extract::Query(params): axum::extract::Query<std::collections::HashMap<String, String>>,
) -> Response {
    match params.get("filename") {
        Some(name) => name.clone().into_bytes().into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

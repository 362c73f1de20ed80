//! A scripted in-process ComfyUI server for integration tests.
//!
//! Serves `/prompt`, `/history/{id}`, `/view`, `/queue` and `/ws` on an
//! ephemeral port. After a prompt is submitted, every open WebSocket is
//! sent the scripted text frames (preceded by a binary preview frame and
//! a malformed frame, which the client must ignore).

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use comfygen_comfyui::ComfyUIConfig;
use serde_json::{json, Value};
use tokio::sync::watch;

/// Behaviour of the fake server.
#[derive(Clone)]
pub struct FakeScript {
    pub prompt_id: String,
    /// Text frames pushed to the WebSocket after submission.
    pub frames: Vec<String>,
    /// Close the WebSocket right after pushing the frames.
    pub hang_up: bool,
    /// Reject `POST /prompt` with 400.
    pub reject_prompt: bool,
    pub history: Value,
    pub files: HashMap<String, Vec<u8>>,
}

impl FakeScript {
    /// A server that finishes `prompt_id` with one image `f.png` on node 74.
    pub fn scenario_a() -> Self {
        let mut files = HashMap::new();
        files.insert("f.png".to_string(), b"bytes-of-f.png".to_vec());
        Self {
            prompt_id: "abc".into(),
            frames: vec![
                executing(Some("74"), "abc"),
                executing(None, "abc"),
            ],
            hang_up: false,
            reject_prompt: false,
            history: json!({"abc": {"outputs": {"74": {"images": [
                {"filename": "f.png", "subfolder": "", "type": "output"}
            ]}}}}),
            files,
        }
    }
}

pub fn executing(node: Option<&str>, prompt_id: &str) -> String {
    json!({"type": "executing", "data": {"node": node, "prompt_id": prompt_id}}).to_string()
}

/// Observations recorded by the fake server.
#[derive(Default)]
pub struct Recorded {
    pub submissions: Mutex<Vec<Value>>,
    pub ws_client_ids: Mutex<Vec<String>>,
    pub ws_closed: AtomicUsize,
}

#[derive(Clone)]
struct FakeState {
    script: Arc<FakeScript>,
    recorded: Arc<Recorded>,
    submitted: watch::Sender<bool>,
}

pub struct FakeComfyUI {
    pub addr: SocketAddr,
    pub recorded: Arc<Recorded>,
}

impl FakeComfyUI {
    pub async fn start(script: FakeScript) -> Self {
        let recorded = Arc::new(Recorded::default());
        let (submitted, _) = watch::channel(false);
        let state = FakeState {
            script: Arc::new(script),
            recorded: Arc::clone(&recorded),
            submitted,
        };

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/prompt", post(prompt_handler))
            .route("/history/{prompt_id}", get(history_handler))
            .route("/view", get(view_handler))
            .route("/queue", get(queue_handler))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, recorded }
    }

    pub fn config(&self) -> ComfyUIConfig {
        ComfyUIConfig {
            server_address: self.addr.to_string(),
            poll_interval: Duration::from_millis(50),
            http_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Wait (briefly) until the server has received `n` WebSocket close
    /// frames.
    pub async fn wait_for_closes(&self, n: usize) -> usize {
        for _ in 0..100 {
            let closed = self.recorded.ws_closed.load(Ordering::SeqCst);
            if closed >= n {
                return closed;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.recorded.ws_closed.load(Ordering::SeqCst)
    }
}

async fn ws_handler(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let client_id = params.get("clientId").cloned().unwrap_or_default();
    state.recorded.ws_client_ids.lock().unwrap().push(client_id);
    ws.on_upgrade(move |socket| run_socket(socket, state))
}

async fn run_socket(mut socket: WebSocket, state: FakeState) {
    let mut submitted = state.submitted.subscribe();
    tokio::select! {
        res = submitted.wait_for(|done| *done) => {
            if res.is_err() {
                return;
            }
        }
        clean = drain_until_close(&mut socket) => {
            if clean {
                state.recorded.ws_closed.fetch_add(1, Ordering::SeqCst);
            }
            return;
        }
    }

    let _ = socket.send(Message::Binary(vec![0u8; 16].into())).await;
    let _ = socket.send(Message::Text("{not json".to_string().into())).await;
    for frame in &state.script.frames {
        if socket.send(Message::Text(frame.clone().into())).await.is_err() {
            return;
        }
    }

    if state.script.hang_up {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    if drain_until_close(&mut socket).await {
        state.recorded.ws_closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Read until the socket ends. Returns `true` only if the client sent a
/// close frame rather than just dropping the connection.
async fn drain_until_close(socket: &mut WebSocket) -> bool {
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Close(_)) => return true,
            Err(_) => return false,
            Ok(_) => {}
        }
    }
    false
}

async fn prompt_handler(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    if state.script.reject_prompt {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"type": "prompt_no_outputs"}})),
        )
            .into_response();
    }
    state.recorded.submissions.lock().unwrap().push(body);
    state.submitted.send_replace(true);
    Json(json!({"prompt_id": state.script.prompt_id, "number": 7, "node_errors": {}}))
        .into_response()
}

async fn history_handler(
    State(state): State<FakeState>,
    Path(prompt_id): Path<String>,
) -> Json<Value> {
    let mut body = serde_json::Map::new();
    if let Some(entry) = state.script.history.get(&prompt_id) {
        body.insert(prompt_id, entry.clone());
    }
    Json(Value::Object(body))
}

async fn view_handler(
    State(state): State<FakeState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let filename = params.get("filename").cloned().unwrap_or_default();
    match state.script.files.get(&filename) {
        Some(bytes) => bytes.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn queue_handler() -> Json<Value> {
    Json(json!({"queue_running": [], "queue_pending": [[1, "queued"]]}))
}

//! In-process stub of the ledger API for client tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub bearer: Option<String>,
    pub body: Value,
}

/// Records every request; replies with the canned response for the path,
/// or `{"success": true, "message": "ok"}` when none is set.
#[derive(Debug, Clone, Default)]
pub struct StubLedger {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    responses: Arc<Mutex<HashMap<String, (u16, Value)>>>,
}

impl StubLedger {
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }
}

async fn handle(
    State(stub): State<StubLedger>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let path = uri.path().trim_start_matches("/api").to_string();
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);

    stub.calls.lock().unwrap().push(RecordedCall {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        bearer,
        body,
    });

    let (status, reply) = stub
        .responses
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or((200, json!({"success": true, "message": "ok"})));

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(reply),
    )
}

/// Serve `stub` on an ephemeral port; returns the base url (`http://addr/api`).
pub async fn spawn_stub(stub: StubLedger) -> String {
    let app = Router::new().fallback(handle).with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use url::Url;

use pocketledger_gateway::proxy::{self, GatewayState};

/// One request as observed by the stub upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn body_json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

/// In-process stand-in for the backend service: records every request and
/// replies from a scripted queue (200 `{"ok": true}` once the queue is
/// empty).
#[derive(Clone)]
pub struct StubUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<VecDeque<(u16, Value)>>>,
}

impl StubUpstream {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let stub = Self {
            addr,
            requests: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
        };

        let app = Router::new().fallback(record).with_state(stub.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        stub
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub async fn push_response(&self, status: u16, body: Value) {
        self.responses.lock().await.push_back((status, body));
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

async fn record(State(stub): State<StubUpstream>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    stub.requests.lock().await.push(RecordedRequest {
        method: parts.method.to_string(),
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| parts.uri.path().to_string()),
        headers,
        body: bytes.to_vec(),
    });

    let (status, payload) = stub
        .responses
        .lock()
        .await
        .pop_front()
        .unwrap_or((200, json!({ "ok": true })));

    let mut response = axum::Json(payload).into_response();
    *response.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
        .headers_mut()
        .insert("x-upstream", HeaderValue::from_static("stub"));
    response
}

/// Serve the gateway router on an ephemeral port, pointed at the given
/// upstream address.
pub async fn spawn_gateway(upstream: SocketAddr, static_root: PathBuf) -> SocketAddr {
    let state = GatewayState {
        http: reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap(),
        upstream_origin: Url::parse(&format!("http://{}", upstream)).unwrap(),
        upstream_host: upstream.to_string(),
        static_root,
        spa_index: "index.html".to_string(),
        enable_cors: false,
        enable_request_logging: false,
    };

    let app = proxy::router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Fresh per-test scratch directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pocketledger-test-{}-{}",
        std::process::id(),
        name
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A minimal built-frontend directory: an entry point and one asset.
pub fn site_root(name: &str) -> PathBuf {
    let root = temp_dir(name);
    std::fs::write(root.join("index.html"), "<html>pocketledger</html>").unwrap();
    std::fs::write(root.join("app.js"), "console.log('app');").unwrap();
    root
}

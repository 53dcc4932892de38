#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use wires::config::WiresConfig;

/// One request as the fake backend saw it.
#[derive(Clone, Debug, PartialEq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct Backend {
    requests: Vec<Recorded>,
    responses: HashMap<(String, String), (u16, String)>,
    // Each /events request drains whatever is queued, then ends the stream.
    events: VecDeque<(String, String)>,
}

type Shared = Arc<Mutex<Backend>>;

/// In-process stand-in for the device's REST and event-stream surface.
/// Unconfigured routes answer 404.
pub struct FakeBackend {
    pub base_url: String,
    backend: Shared,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

pub fn spawn_backend() -> Result<FakeBackend> {
    let backend: Shared = Arc::default();
    let (addr_tx, addr_rx) = mpsc::channel();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let state = backend.clone();
    let thread = thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(err) => {
                let _ = addr_tx.send(Err(err.to_string()));
                return;
            }
        };
        rt.block_on(async move {
            let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
                Ok(l) => l,
                Err(err) => {
                    let _ = addr_tx.send(Err(err.to_string()));
                    return;
                }
            };
            let addr = listener.local_addr().map_err(|e| e.to_string());
            let _ = addr_tx.send(addr);

            let app = Router::new().fallback(handle).with_state(state);
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
    });

    let addr = addr_rx
        .recv_timeout(Duration::from_secs(5))
        .context("fake backend did not start")?
        .map_err(anyhow::Error::msg)
        .context("bind fake backend")?;

    Ok(FakeBackend {
        base_url: format!("http://{}", addr),
        backend,
        shutdown: Some(shutdown_tx),
        thread: Some(thread),
    })
}

async fn handle(State(backend): State<Shared>, method: Method, uri: Uri, body: String) -> Response {
    let path = uri.path().to_string();
    let mut b = backend.lock().unwrap_or_else(|e| e.into_inner());
    b.requests.push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        body,
    });

    if path == "/events" {
        let mut stream = String::new();
        while let Some((name, data)) = b.events.pop_front() {
            stream.push_str(&format!("event: {}\ndata: {}\n\n", name, data));
        }
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/event-stream")],
            stream,
        )
            .into_response();
    }

    match b.responses.get(&(method.to_string(), path)) {
        Some((status, body)) => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            json!({"error": "not found"}).to_string(),
        )
            .into_response(),
    }
}

impl FakeBackend {
    fn lock(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        self.lock()
            .responses
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
    }

    pub fn ok(&self, method: &str, path: &str, body: Value) {
        self.respond(method, path, 200, body);
    }

    /// Serves a small, healthy dataset on every snapshot route.
    pub fn serve_snapshot(&self) {
        self.ok(
            "GET",
            "/api/packets",
            json!([{"timestamp": 1, "value": 10}, {"timestamp": 2, "value": 20}]),
        );
        self.ok(
            "GET",
            "/api/anomalies",
            json!({"anomalies": [{"timestamp": "2024-05-01T10:00:00", "value": 1}]}),
        );
        self.ok("GET", "/api/packet_backup", json!(["packets_1.txt"]));
        self.ok(
            "GET",
            "/api/anomaly_backup",
            json!({"backups": ["anomalies_1.txt", "anomalies_2.txt"]}),
        );
        self.ok("GET", "/api/system_info", json!({"hostname": "wires-pi", "cpu": 12.5}));
        self.ok("GET", "/api/system_summary", json!({"packets_total": 42}));
    }

    pub fn acknowledge_commands(&self) {
        for (method, path) in [
            ("POST", "/blacklist_edit"),
            ("DELETE", "/blacklist_edit"),
            ("POST", "/whitelist_edit"),
            ("DELETE", "/whitelist_edit"),
            ("POST", "/reboot_sys"),
            ("POST", "/shutdown_sys"),
            ("POST", "/api/clear_data"),
        ] {
            self.ok(method, path, json!({"status": "success"}));
        }
        self.ok(
            "POST",
            "/save_packet_backup",
            json!({"status": "success", "backup_file": "packets_9.txt"}),
        );
        self.ok(
            "POST",
            "/save_anomaly_backup",
            json!({"status": "success", "backup_file": "anomalies_9.txt"}),
        );
    }

    pub fn queue_event(&self, name: &str, data: Value) {
        self.lock()
            .events
            .push_back((name.to_string(), data.to_string()));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    pub fn wait_for_request(&self, path: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.requests_to(path).is_empty() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }

    pub fn config(&self) -> WiresConfig {
        WiresConfig {
            base_url: self.base_url.clone(),
            feed_url: self.base_url.clone(),
            request_timeout_ms: 2_000,
            ..WiresConfig::default()
        }
    }
}

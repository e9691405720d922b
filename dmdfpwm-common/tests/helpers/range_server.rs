//! Minimal HTTP server honouring `Range: bytes=a-b` for tests

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// How the server answers range requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// 206 with the requested span, clamped to the resource length
    Ranged,
    /// 200 with the whole resource, as a server without range support would
    IgnoreRange,
    /// 206 for a span starting one byte past the requested one
    ShiftedRange,
}

#[derive(Clone)]
struct ServerState {
    data: Arc<Vec<u8>>,
    mode: ServeMode,
    requests: Arc<Mutex<Vec<(u64, u64)>>>,
}

pub struct RangeServer {
    pub url: String,
    requests: Arc<Mutex<Vec<(u64, u64)>>>,
    handle: JoinHandle<()>,
}

impl RangeServer {
    pub async fn start(data: Vec<u8>, mode: ServeMode) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            data: Arc::new(data),
            mode,
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/track.dmdfpwm", get(serve))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/track.dmdfpwm", addr),
            requests,
            handle,
        }
    }

    /// Inclusive `(start, end)` of every range request received so far
    pub fn requests(&self) -> Vec<(u64, u64)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for RangeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

async fn serve(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    let len = state.data.len() as u64;

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range);

    let Some((start, end)) = range else {
        return (StatusCode::OK, state.data.as_ref().clone()).into_response();
    };

    state.requests.lock().unwrap().push((start, end));

    if state.mode == ServeMode::IgnoreRange {
        return (StatusCode::OK, state.data.as_ref().clone()).into_response();
    }

    let start = match state.mode {
        ServeMode::ShiftedRange => start + 1,
        _ => start,
    };

    if start >= len {
        return (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", len))],
        )
            .into_response();
    }

    let end = end.min(len - 1);
    let body = state.data[start as usize..=end as usize].to_vec();

    (
        StatusCode::PARTIAL_CONTENT,
        [(header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, len))],
        body,
    )
        .into_response()
}

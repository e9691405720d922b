//! In-process HTTP server serving one resource with `Range` support

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct RangeServer {
    pub url: String,
    handle: JoinHandle<()>,
}

impl RangeServer {
    /// Serve `data` at `/track.dmdfpwm` on an ephemeral local port
    pub async fn start(data: Vec<u8>) -> Self {
        let app = Router::new()
            .route("/track.dmdfpwm", get(serve))
            .with_state(Arc::new(data));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/track.dmdfpwm", addr),
            handle,
        }
    }
}

impl Drop for RangeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(State(data): State<Arc<Vec<u8>>>, headers: HeaderMap) -> Response {
    let len = data.len() as u64;
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.split_once('-'))
        .and_then(|(a, b)| Some((a.parse::<u64>().ok()?, b.parse::<u64>().ok()?)));

    match range {
        None => (StatusCode::OK, data.as_ref().clone()).into_response(),
        Some((start, _)) if start >= len => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", len))],
        )
            .into_response(),
        Some((start, end)) => {
            // Short resources answer with whatever is left
            let end = end.min(len - 1);
            (
                StatusCode::PARTIAL_CONTENT,
                [(header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, len))],
                data[start as usize..=end as usize].to_vec(),
            )
                .into_response()
        }
    }
}

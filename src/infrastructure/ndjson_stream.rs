// Chunked NDJSON streaming of dashboard snapshots
use crate::domain::dashboard::DashboardSnapshot;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Build a chunked response with one JSON document per line
pub fn ndjson_stream<S, T>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize,
{
    let byte_stream = stream.map(|item| encode_line(&item));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize one item and terminate it with a newline
fn encode_line<T: Serialize>(item: &T) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(item).map_err(std::io::Error::other)?;
    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');
    Ok(line.freeze())
}

/// Stream the current snapshot, then every published one until the client goes away.
///
/// A slow client that falls behind skips the snapshots it missed.
pub fn snapshot_stream(
    initial: DashboardSnapshot,
    mut rx: broadcast::Receiver<Arc<DashboardSnapshot>>,
) -> impl IntoResponse {
    let stream = async_stream::stream! {
        yield Arc::new(initial);
        loop {
            match rx.recv().await {
                Ok(snapshot) => yield snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "snapshot stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    match ndjson_stream(stream) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_each_item_is_one_line() {
        let items = futures::stream::iter(vec![json!({"tick": 1}), json!({"tick": 2})]);
        let response = ndjson_stream(items).unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/x-ndjson"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let lines: Vec<Value> = body
            .split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_slice(l).unwrap())
            .collect();
        assert_eq!(lines, vec![json!({"tick": 1}), json!({"tick": 2})]);
        assert!(body.ends_with(b"\n"));
    }
}

// HTTP response utilities for JSON downloads
use async_compression::tokio::bufread::BrotliEncoder;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};
use serde::Serialize;
use tokio::io::AsyncReadExt;

/// Whether the client listed brotli in Accept-Encoding
pub fn accepts_brotli(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|enc| enc.split(';').next().map(str::trim) == Some("br"))
}

async fn brotli(bytes: Vec<u8>) -> std::io::Result<Vec<u8>> {
    let mut encoder = BrotliEncoder::new(std::io::Cursor::new(bytes));
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;
    Ok(compressed)
}

/// Serialize `data` as a pretty-printed JSON attachment, brotli-compressed on request
pub async fn json_attachment<T: Serialize>(
    data: &T,
    file_name: &str,
    compress: bool,
) -> Result<Response<Body>, StatusCode> {
    let json = serde_json::to_vec_pretty(data).map_err(|e| {
        tracing::error!(error = %e, "export serialization failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let (body, content_encoding) = if compress {
        let raw_len = json.len();
        let compressed = brotli(json).await.map_err(|e| {
            tracing::error!(error = %e, "brotli compression failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        tracing::debug!(raw = raw_len, compressed = compressed.len(), "compressed export");
        (compressed, Some("br"))
    } else {
        (json, None)
    };

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, body.len());

    if let Some(encoding) = content_encoding {
        builder = builder.header(header::CONTENT_ENCODING, encoding);
    }

    builder.body(Body::from(body)).map_err(|e| {
        tracing::error!(error = %e, "response build failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

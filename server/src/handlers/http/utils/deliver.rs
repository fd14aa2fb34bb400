use anyhow::{Result, anyhow};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::{Response, StatusCode, header};
use std::convert::Infallible;
use tracing::{debug, error};

/// Delivers a plain text response
pub fn deliver_text<T: Into<Bytes>>(text: T) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let bytes_string: Bytes = text.into();

    debug!(
        "Delivering text response, size: {} bytes",
        bytes_string.len()
    );

    let response: Response<BoxBody<Bytes, Infallible>> = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-store")
        .body(full(bytes_string))
        .map_err(|e: http::Error| {
            error!("Failed to build text response: {}", e);
            anyhow!("Failed to build text response: {}", e)
        })?;

    Ok(response)
}

/// Helper function to create a full body from various types
pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, Infallible> {
    let bytes: Bytes = chunk.into();
    let full_body: Full<Bytes> = Full::new(bytes);
    full_body.boxed()
}

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Response, StatusCode, header};
use serde::Serialize;
use std::convert::Infallible;
use tracing::{debug, error, warn};

use shared::types::ErrorResponse;

use crate::auth::AuthError;
use crate::handlers::http::utils::deliver::full;

/// Serialize any `Serialize` type and deliver it as a JSON response.
pub fn deliver_serialized_json<T: Serialize>(
    data: &T,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let json = serde_json::to_string(data).context("Failed to serialize response")?;

    debug!("Delivering serialized JSON response, size: {} bytes", json.len());

    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(json))
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))?;

    Ok(response)
}

/// Delivers a JSON error response with the specified error code, message, and status.
pub fn deliver_error_json(
    error_code: &str,
    message: &str,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    if status.is_server_error() {
        error!("Delivering error JSON: {} - {} ({})", status.as_u16(), error_code, message);
    } else {
        warn!("Delivering error JSON: {} - {} ({})", status.as_u16(), error_code, message);
    }

    deliver_serialized_json(&ErrorResponse::new(error_code, message), status)
}

/// The single place an `AuthError` becomes an HTTP response.
pub fn deliver_auth_error(err: &AuthError) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_error_json(err.to_code(), &err.to_string(), err.status())
        .context("Failed to deliver auth error response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(res: Response<BoxBody<Bytes, Infallible>>) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn auth_error_becomes_status_and_envelope() {
        let res = deliver_auth_error(&AuthError::Forbidden("Invalid XSRF")).unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let json = body_json(res).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "FORBIDDEN");
        assert_eq!(json["message"], "Invalid XSRF");
    }
}

use hyper::Request;
use tracing::debug;

use crate::handlers::http::utils::headers::header_matches;

/// Returns true only when the request arrived over a secure (HTTPS) connection.
///
/// Checks, in order:
///   1. `X-Forwarded-Proto: https`   — set by most reverse proxies (nginx, Caddy, etc.)
///   2. `X-Forwarded-Ssl: on`        — Apache-style variant
///   3. The request URI scheme is literally "https"
///
/// Falls back to `false` so that plain HTTP dev servers work out of the box.
/// Session cookies only get the `Secure` attribute when this is true.
pub fn is_https<B>(req: &Request<B>) -> bool {
    let headers = req.headers();

    if header_matches(headers, "x-forwarded-proto", "https")
        || header_matches(headers, "x-forwarded-ssl", "on")
    {
        return true;
    }

    debug!("Request URI: {}", req.uri());
    req.uri()
        .scheme()
        .map(|s| s.as_str() == "https")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_request_is_not_https() {
        let req = Request::builder().uri("/api/auth/login").body(()).unwrap();
        assert!(!is_https(&req));
    }

    #[test]
    fn proxy_headers_mark_https() {
        let req = Request::builder()
            .uri("/")
            .header("x-forwarded-proto", "https")
            .body(())
            .unwrap();
        assert!(is_https(&req));

        let req = Request::builder()
            .uri("/")
            .header("x-forwarded-ssl", "on")
            .body(())
            .unwrap();
        assert!(is_https(&req));
    }

    #[test]
    fn absolute_https_uri_is_https() {
        let req = Request::builder()
            .uri("https://example.com/api/auth/test")
            .body(())
            .unwrap();
        assert!(is_https(&req));
    }
}

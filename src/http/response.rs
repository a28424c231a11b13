//! HTTP response building module
//!
//! Provides builders for protocol-level responses (preflight, health probes)
//! that do not go through the book handler.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};

/// Build OPTIONS response (preflight request)
///
/// CORS headers are added afterwards by the router for allowed origins.
pub fn build_options_response(allow: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, allow)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build health probe response
pub fn build_health_response(healthy: bool) -> Response<Full<Bytes>> {
    let (status, body) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(Full::new(Bytes::from(body)))
        })
}

/// Stamp the `Server` header
pub fn set_server_header(response: &mut Response<Full<Bytes>>, server_name: &str) {
    if let Ok(value) = HeaderValue::from_str(server_name) {
        response.headers_mut().insert(SERVER, value);
    }
}

/// Log response build error
pub fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_response() {
        let resp = build_options_response("GET, POST");
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()[ALLOW], "GET, POST");
    }

    #[test]
    fn test_health_response() {
        assert_eq!(build_health_response(true).status(), StatusCode::OK);
        assert_eq!(
            build_health_response(false).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_server_header() {
        let mut resp = build_health_response(true);
        set_server_header(&mut resp, "bookstore/0.1.0");
        assert_eq!(resp.headers()[SERVER], "bookstore/0.1.0");
    }
}

//! services/mock_api/src/web/middleware.rs
//!
//! Permissive CORS for every route.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS";

/// Middleware that adds wildcard CORS headers to every response.
///
/// Requested headers are echoed back. Preflight (`OPTIONS`) requests are
/// answered here with `204 No Content` and never reach a handler.
pub async fn cors(req: Request, next: Next) -> Response {
    // 1. Remember which headers the browser asked for
    let requested_headers = req
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned();

    // 2. Short-circuit preflight, or run the handler
    let mut response = if req.method() == Method::OPTIONS {
        let mut preflight = Response::new(Body::empty());
        *preflight.status_mut() = StatusCode::NO_CONTENT;
        preflight
    } else {
        next.run(req).await
    };

    // 3. Stamp the CORS headers
    apply_cors_headers(response.headers_mut(), requested_headers);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, requested_headers: Option<HeaderValue>) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        requested_headers.unwrap_or_else(|| HeaderValue::from_static("*")),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Range"),
    );
}

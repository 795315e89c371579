use bytes::Bytes;
use http::{HeaderName, HeaderValue, Response, StatusCode, header};
use http_body_util::Full;

/// Body type for every response the proxy writes.
pub type Body = Full<Bytes>;

/// Cache status header set on proxied responses (`HIT` / `MISS`).
pub static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

const SERVER: &str = concat!("stash/", env!("CARGO_PKG_VERSION"));

/// Generic helper: status + raw body, with `Server` and `Content-Length`.
pub fn response(status: StatusCode, body: Bytes) -> Response<Body> {
    let len = body.len();
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;

    let headers = resp.headers_mut();
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    resp
}

/// Helper for plain-text responses.
pub fn text(status: StatusCode, body: impl Into<String>) -> Response<Body> {
    let mut resp = response(status, Bytes::from(body.into()));
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

/// Proxied body with its `X-Cache` marker.
pub fn cached(body: Bytes, cache_status: &'static str) -> Response<Body> {
    let mut resp = response(StatusCode::OK, body);
    resp.headers_mut()
        .insert(X_CACHE.clone(), HeaderValue::from_static(cache_status));
    resp
}

/// Status-only response whose body is the canonical reason phrase.
pub fn status_only(status: StatusCode) -> Response<Body> {
    text(status, status.canonical_reason().unwrap_or_default())
}

pub fn no_content() -> Response<Body> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = StatusCode::NO_CONTENT;
    resp.headers_mut()
        .insert(header::SERVER, HeaderValue::from_static(SERVER));
    resp
}

pub fn internal_error() -> Response<Body> {
    status_only(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn method_not_allowed(allow: &'static str) -> Response<Body> {
    let mut resp = status_only(StatusCode::METHOD_NOT_ALLOWED);
    resp.headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(allow));
    resp
}

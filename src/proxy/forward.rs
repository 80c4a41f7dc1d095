use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use super::GatewayState;
use crate::error::GatewayError;

/// Matches the body limit the upstream framework enforces anyway; anything
/// larger is rejected before we buffer it.
const MAX_FORWARD_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Forward a request under the API prefix to the upstream service.
///
/// Method, path, and query string are preserved bit-exact; the proxy's own
/// origin is substituted with the upstream origin. The upstream response is
/// mirrored back verbatim apart from `transfer-encoding`.
pub async fn forward(State(state): State<GatewayState>, req: Request) -> Response {
    match forward_to_upstream(&state, req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn forward_to_upstream(
    state: &GatewayState,
    req: Request,
) -> Result<Response, GatewayError> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let url = upstream_url(&state.upstream_origin, &path_and_query)
        .map_err(|e| GatewayError::bad_request(format!("invalid request path: {}", e)))?;

    let request_id = Uuid::new_v4();
    tracing::debug!(%request_id, method = %parts.method, url = %url, "forwarding API request");

    let bytes = axum::body::to_bytes(body, MAX_FORWARD_BODY_BYTES)
        .await
        .map_err(|e| GatewayError::bad_request(format!("failed to read request body: {}", e)))?;

    let mut headers = request_headers(&parts.headers, &state.upstream_host);
    let payload = forward_body(&parts.method, &bytes);
    if payload.is_some() {
        // The parsed body is re-serialized as JSON regardless of the original
        // content type; non-JSON payloads reach the upstream unchanged and
        // are its responsibility to reject.
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }

    let mut builder = state
        .http
        .request(parts.method.clone(), url)
        .headers(headers);
    if let Some(payload) = payload {
        builder = builder.body(payload);
    }

    let upstream = builder.send().await.map_err(|err| {
        tracing::error!(%request_id, error = %err, "upstream request failed");
        GatewayError::bad_gateway(format!("upstream request failed: {}", err))
    })?;

    let status = upstream.status();
    let headers = response_headers(upstream.headers());
    let body = upstream.bytes().await.map_err(|err| {
        tracing::error!(%request_id, error = %err, "failed to read upstream response body");
        GatewayError::bad_gateway(format!("failed to read upstream response body: {}", err))
    })?;

    tracing::debug!(%request_id, status = %status, "upstream responded");

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Substitute the gateway's origin with the upstream origin, keeping path and
/// query string bit-exact.
fn upstream_url(origin: &Url, path_and_query: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}{}",
        origin.as_str().trim_end_matches('/'),
        path_and_query
    ))
}

/// Copy request headers for the upstream leg: `content-length` is dropped so
/// the client recomputes it, `host` is rewritten to the upstream host.
fn request_headers(src: &HeaderMap, upstream_host: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in src {
        if name == header::CONTENT_LENGTH || name == header::HOST {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    if let Ok(host) = HeaderValue::from_str(upstream_host) {
        headers.insert(header::HOST, host);
    }
    headers
}

/// Body to send upstream. GET/HEAD carry none; other methods always send a
/// JSON payload: an empty body becomes `{}`, a valid JSON body is parsed and
/// re-serialized, and anything else passes through unaltered.
fn forward_body(method: &Method, bytes: &Bytes) -> Option<Vec<u8>> {
    if method == Method::GET || method == Method::HEAD {
        return None;
    }
    if bytes.is_empty() {
        return Some(b"{}".to_vec());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => Some(serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec())),
        Err(_) => Some(bytes.to_vec()),
    }
}

/// Mirror upstream response headers, dropping `transfer-encoding` which would
/// conflict with the gateway's own response framing.
fn response_headers(src: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in src {
        if name == header::TRANSFER_ENCODING {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://127.0.0.1:8000").unwrap()
    }

    #[test]
    fn upstream_url_keeps_path_and_query() {
        let url = upstream_url(&origin(), "/api/transactions/?year=2026&month=8").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/api/transactions/?year=2026&month=8"
        );
    }

    #[test]
    fn request_headers_rewrite_host_and_drop_length() {
        let mut src = HeaderMap::new();
        src.insert(header::HOST, HeaderValue::from_static("localhost:5000"));
        src.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        src.insert("x-custom", HeaderValue::from_static("kept"));
        src.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer token"),
        );

        let out = request_headers(&src, "127.0.0.1:8000");
        assert_eq!(out.get(header::HOST).unwrap(), "127.0.0.1:8000");
        assert!(out.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(out.get("x-custom").unwrap(), "kept");
        assert_eq!(out.get(header::AUTHORIZATION).unwrap(), "Bearer token");
    }

    #[test]
    fn forward_body_skips_get_and_head() {
        assert!(forward_body(&Method::GET, &Bytes::from_static(b"ignored")).is_none());
        assert!(forward_body(&Method::HEAD, &Bytes::new()).is_none());
    }

    #[test]
    fn forward_body_defaults_empty_post_to_object() {
        let body = forward_body(&Method::POST, &Bytes::new()).unwrap();
        assert_eq!(body, b"{}");
    }

    #[test]
    fn forward_body_reserializes_json() {
        let body =
            forward_body(&Method::POST, &Bytes::from_static(b"{\"amount\": \"12.50\"}")).unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["amount"], "12.50");
    }

    #[test]
    fn forward_body_passes_malformed_payload_through() {
        let body = forward_body(&Method::POST, &Bytes::from_static(b"not json")).unwrap();
        assert_eq!(body, b"not json");
    }

    #[test]
    fn response_headers_drop_transfer_encoding() {
        let mut src = HeaderMap::new();
        src.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("chunked"),
        );
        src.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));

        let out = response_headers(&src);
        assert!(out.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(out.get(header::CONTENT_TYPE).unwrap(), "text/html");
    }
}

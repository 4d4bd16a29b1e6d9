//! Axum middleware applied to the router.
//!
//! Includes the ingress decrypt filter plus the request timeout used by the
//! tower-http layers.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use common::{ServiceError, Value};
use http_body_util::LengthLimitError;
use tracing::debug;

use super::{handlers::error_response, state::AppState};
use crate::transform;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Decrypt every envelope in a JSON request body before routing.
///
/// Identifier and timestamp keys are left alone at every depth. Bodies that
/// are not declared as JSON, or fail to parse, are forwarded unchanged so the
/// handler's extractor can report them. Bodies over the configured limit are
/// refused with `413`.
pub async fn decrypt_request_body(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !is_json(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let bytes = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = if e.into_inner().downcast_ref::<LengthLimitError>().is_some() {
                ServiceError::PayloadTooLarge(format!(
                    "request body exceeds {} bytes",
                    state.max_body_bytes
                ))
            } else {
                ServiceError::BadRequest("failed to read request body".into())
            };
            return error_response(err);
        }
    };

    let json: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(json) => json,
        Err(_) => {
            debug!("request body is not valid JSON; forwarding unchanged");
            return next.run(Request::from_parts(parts, Body::from(bytes))).await;
        }
    };

    let mut value = Value::from(json);
    transform::decrypt_request(&mut value, &state.cipher);
    let decoded = match serde_json::to_vec(&value) {
        Ok(decoded) => decoded,
        Err(e) => return error_response(ServiceError::Internal(e.to_string())),
    };

    // The decoded body is shorter than the envelopes it replaced.
    parts.headers.remove(header::CONTENT_LENGTH);
    next.run(Request::from_parts(parts, Body::from(decoded))).await
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::state::tests::test_state;
    use axum::{
        http::{HeaderValue, StatusCode},
        middleware::from_fn_with_state,
        routing::post,
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;

    /// Echo the body the handler receives, plus whether Content-Length survived.
    async fn echo(headers: HeaderMap, body: String) -> String {
        let has_length = headers.contains_key(header::CONTENT_LENGTH);
        format!("{has_length}|{body}")
    }

    fn app(max_body_bytes: usize) -> Router {
        let state = AppState {
            max_body_bytes,
            ..test_state()
        };
        Router::new()
            .route("/echo", post(echo))
            .layer(from_fn_with_state(state.clone(), decrypt_request_body))
            .with_state(state)
    }

    async fn send(app: Router, content_type: &str, body: String) -> (StatusCode, String) {
        let req = Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn json_bodies_are_decrypted_except_identifiers() {
        let c = test_state().cipher;
        let sealed_id = c.encrypt("1");
        let body = json!({
            "user": {"name": c.encrypt("Juan"), "_id": sealed_id},
            "tags": [c.encrypt("a"), "b"],
        });

        let (status, out) = send(app(1024 * 1024), "application/json", body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        let (has_length, echoed) = out.split_once('|').unwrap();
        assert_eq!(has_length, "false");
        let echoed: serde_json::Value = serde_json::from_str(echoed).unwrap();
        assert_eq!(
            echoed,
            json!({"user": {"name": "Juan", "_id": sealed_id}, "tags": ["a", "b"]})
        );
    }

    #[tokio::test]
    async fn non_json_bodies_pass_through() {
        let sealed = test_state().cipher.encrypt("x");
        let (status, out) = send(app(1024), "text/plain", sealed.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out, format!("true|{sealed}"));
    }

    #[tokio::test]
    async fn malformed_json_passes_through() {
        let (status, out) = send(app(1024), "application/json", "{not json".into()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out, "true|{not json");
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        let body = json!({"note": "x".repeat(200)}).to_string();
        let (status, out) = send(app(64), "application/json", body).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let err: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(err["code"], "payload_too_large");
    }

    #[test]
    fn json_content_types() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        for (ct, expected) in [
            ("application/json", true),
            ("application/json; charset=utf-8", true),
            ("application/merge-patch+json", true),
            ("text/plain", false),
        ] {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
            assert_eq!(is_json(&headers), expected, "{ct}");
        }
    }
}

//! [`JsonTransport`]: an HTTP/1 client service exchanging JSON [`Value`]s.
//!
//! Wrap it in [`EncryptionLayer`](crate::EncryptionLayer) to talk to the
//! server with sensitive fields encrypted on the wire.

use std::task::{Context, Poll};

use bytes::Bytes;
use common::Value;
use futures::future::{BoxFuture, FutureExt};
use http::{header, HeaderValue, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tower::Service;

/// Errors from a [`JsonTransport`] round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request body could not be serialised.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),

    /// The response body is not JSON.
    #[error("response body is not JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

/// JSON-over-HTTP/1 client.
///
/// A `Null` request body sends no body. An empty response body decodes to
/// `Null`.
#[derive(Clone, Debug)]
pub struct JsonTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl JsonTransport {
    /// Create a transport with a fresh connection pool.
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }
}

impl Default for JsonTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Value>> for JsonTransport {
    type Response = Response<Value>;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<Response<Value>, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Value>) -> Self::Future {
        let client = self.client.clone();
        async move {
            let (mut parts, body) = request.into_parts();
            let bytes = if body.is_null() {
                Bytes::new()
            } else {
                parts
                    .headers
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Bytes::from(serde_json::to_vec(&body).map_err(TransportError::Encode)?)
            };

            let response = client
                .request(Request::from_parts(parts, Full::new(bytes)))
                .await?;
            let (parts, incoming) = response.into_parts();
            let bytes = incoming.collect().await?.to_bytes();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice::<serde_json::Value>(&bytes)
                    .map(Value::from)
                    .map_err(TransportError::Decode)?
            };
            Ok(Response::from_parts(parts, value))
        }
        .boxed()
    }
}

//! [`EncryptionLayer`]: tower middleware that encrypts request bodies and
//! decrypts response bodies around any JSON-valued service.

use std::task::{Context, Poll};

use common::Value;
use futures::future::{BoxFuture, FutureExt};
use http::{Request, Response};
use tower::{Layer, Service};

use crate::{
    cipher::ClientCipher,
    transform::{decrypt_response, encrypt_request},
};

/// Wraps a service with [`EncryptionService`].
#[derive(Clone, Debug)]
pub struct EncryptionLayer {
    cipher: ClientCipher,
}

impl EncryptionLayer {
    /// Create a layer using `cipher`.
    pub fn new(cipher: ClientCipher) -> Self {
        Self { cipher }
    }
}

impl<S> Layer<S> for EncryptionLayer {
    type Service = EncryptionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EncryptionService {
            inner,
            cipher: self.cipher.clone(),
        }
    }
}

/// Encrypts outgoing request bodies before `S` sees them, and decrypts the
/// bodies `S` returns.
#[derive(Clone, Debug)]
pub struct EncryptionService<S> {
    inner: S,
    cipher: ClientCipher,
}

impl<S> Service<Request<Value>> for EncryptionService<S>
where
    S: Service<Request<Value>, Response = Response<Value>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response<Value>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response<Value>, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Value>) -> Self::Future {
        encrypt_request(request.body_mut(), &self.cipher);
        let cipher = self.cipher.clone();
        let response = self.inner.call(request);
        async move {
            let (parts, body) = response.await?.into_parts();
            let body = decrypt_response(body, &cipher).await;
            Ok(Response::from_parts(parts, body))
        }
        .boxed()
    }
}

//! Optional HTTPS listener using rustls.
//!
//! Connections are accepted with `tokio-rustls` and served with hyper-util's
//! auto builder, which negotiates HTTP/1.1 or HTTP/2 per connection.

use std::{future::Future, path::Path, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use hyper::{body::Incoming, service::service_fn, Request};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
};
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tracing::{debug, info, warn};

/// Build a [`rustls::ServerConfig`] from PEM-encoded certificate and private key bytes.
///
/// # Errors
///
/// Returns an error if the certificate or key cannot be parsed, or if rustls
/// rejects the configuration.
pub fn build_server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_pem))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS certificate chain")?;
    if certs.is_empty() {
        anyhow::bail!("no certificate found in PEM data");
    }

    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(key_pem))
        .context("failed to read TLS private key")?
        .context("no private key found in PEM data")?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build rustls ServerConfig")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Read the PEM files at `cert_path` and `key_path` and build a server config.
///
/// # Errors
///
/// Returns an error if either file cannot be read or parsed.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    let cert = std::fs::read(cert_path)
        .with_context(|| format!("failed to read {}", cert_path.display()))?;
    let key = std::fs::read(key_path)
        .with_context(|| format!("failed to read {}", key_path.display()))?;
    build_server_config(&cert, &key)
}

/// Accept TLS connections on `listener` until `shutdown` resolves, serving
/// each with `router`.
///
/// Failed handshakes and broken connections are logged and dropped; they
/// never stop the accept loop. Connections already handed off are not drained.
pub async fn serve<F>(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    router: Router,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let acceptor = TlsAcceptor::from(config);
    tokio::pin!(shutdown);
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            () = &mut shutdown => {
                info!("TLS listener stopped");
                return;
            }
        };
        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let router = router.clone();

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "TLS handshake failed");
                    return;
                }
            };
            let service = service_fn(move |req: Request<Incoming>| router.clone().oneshot(req));
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(peer = %peer, error = %e, "connection closed with error");
            }
        });
    }
}

//! `field-crypt` server binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Parse the encryption key and build the cipher.
//! 4. Load the field policy registry.
//! 5. Build the Axum router and serve HTTP or HTTPS until SIGINT/SIGTERM.
//! 6. Flush telemetry.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use tracing::{info, warn};

use server::{
    config::Config,
    crypto::FieldCipher,
    http::{router, tls, AppState},
    persistence::MemoryStore,
    policy::PolicyRegistry,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        tls = cfg.tls_paths().is_some(),
        "field-crypt starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key and cipher
    // -----------------------------------------------------------------------
    let cipher = FieldCipher::new(cfg.encryption_key()?);
    info!(key_fingerprint = %cipher.key_fingerprint(), "encryption key loaded");

    // -----------------------------------------------------------------------
    // 4. Field policy
    // -----------------------------------------------------------------------
    let policies = PolicyRegistry::load(cfg.field_policy_path.as_deref())?;

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(
        cipher,
        Arc::new(MemoryStore::new()),
        policies,
        cfg.max_body_bytes,
    );
    let app = router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening");

    match cfg.tls_paths() {
        Some((cert, key)) => {
            let tls_config = tls::load_server_config(Path::new(cert), Path::new(key))?;
            tls::serve(listener, tls_config, app, shutdown_signal()).await;
        }
        None => {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    // -----------------------------------------------------------------------
    // 6. Shutdown
    // -----------------------------------------------------------------------
    info!("field-crypt stopped");
    telemetry::shutdown_telemetry();
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}

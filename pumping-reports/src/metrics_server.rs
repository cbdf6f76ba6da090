use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the Prometheus recorder and serves `/metrics` on `bind_addr`.
///
/// Must be called from within a tokio runtime.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics bind address {bind_addr:?}: {e}"))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;
    if PROM_HANDLE.set(handle).is_err() {
        anyhow::bail!("metrics recorder already initialized");
    }

    tokio::spawn(async move {
        let app = Router::new().route("/metrics", get(metrics_handler));

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "metrics listener started");
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}

async fn metrics_handler() -> String {
    PROM_HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

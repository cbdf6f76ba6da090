use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use pumping_reports::{
    api, config::AppConfig, metrics_server, observability, service::ReportService,
    sources::QuestDbSnapshotSource,
};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing("info");

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Lazy so the API can start before QuestDB accepts connections.
    let pool = PgPoolOptions::new()
        .max_connections(cfg.questdb.max_connections)
        .connect_lazy(&cfg.questdb.uri)?;

    let service = ReportService::from_config(QuestDbSnapshotSource::new(pool), &cfg)?;
    let app = api::router(Arc::new(service));

    let addr: SocketAddr = cfg
        .server
        .http_bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.http_bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "report API listening");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

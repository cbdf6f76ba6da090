use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    pipeline::SnapshotSource,
    service::{ReportError, ReportKind, ReportRequest, ReportService},
};

/// Query string shared by every report route.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub site_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        match self {
            ReportError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ReportError::NoData(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ReportError::Source(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response(),
        }
    }
}

pub fn router<S>(service: Arc<ReportService<S>>) -> Router
where
    S: SnapshotSource + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/api/report/energyReport", get(readings_report::<S>))
        .route(
            "/api/report/energyConsumptionReport",
            get(energy_consumption_report::<S>),
        )
        .route("/api/report/pumpingReport", get(pumping_report::<S>))
        .route("/api/report/flowReport", get(flow_report::<S>))
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}

async fn readings_report<S: SnapshotSource + 'static>(
    State(service): State<Arc<ReportService<S>>>,
    Query(params): Query<ReportParams>,
) -> Response {
    respond(&service, ReportKind::Readings, params).await
}

async fn energy_consumption_report<S: SnapshotSource + 'static>(
    State(service): State<Arc<ReportService<S>>>,
    Query(params): Query<ReportParams>,
) -> Response {
    respond(&service, ReportKind::EnergyConsumption, params).await
}

async fn pumping_report<S: SnapshotSource + 'static>(
    State(service): State<Arc<ReportService<S>>>,
    Query(params): Query<ReportParams>,
) -> Response {
    respond(&service, ReportKind::Pumping, params).await
}

async fn flow_report<S: SnapshotSource + 'static>(
    State(service): State<Arc<ReportService<S>>>,
    Query(params): Query<ReportParams>,
) -> Response {
    respond(&service, ReportKind::Flow, params).await
}

async fn respond<S: SnapshotSource>(
    service: &ReportService<S>,
    kind: ReportKind,
    params: ReportParams,
) -> Response {
    let req = match ReportRequest::parse(
        params.site_id.as_deref(),
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        service.offset(),
    ) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    match service.run(kind, &req).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => e.into_response(),
    }
}

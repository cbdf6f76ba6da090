//! Request handling shared by the HTTP API and the CLI.
//!
//! A report request fetches every snapshot of the calendar months its window
//! touches, plus one day either side, so monthly totals are complete and
//! runs crossing a month edge are split consistently. Daily rows are then
//! trimmed back to the requested window.

use std::time::Instant;

use serde::Serialize;
use time::UtcOffset;

use crate::{
    config::AppConfig,
    engine::{
        aggregate,
        assemble::{
            energy_consumption_rows, flow_rows, pumping_rows, readings_rows,
            EnergyConsumptionRow, FlowRow, PumpingRow, ReadingsRow,
        },
        window::parse_request_date,
        Aggregation, AggregationOptions, DateRange, Normalizer, Observation, PumpTable,
    },
    pipeline::{collect_snapshots, SnapshotSource, SourceError},
};

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NoData(String),
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Per-snapshot electrical readings of running pumps.
    Readings,
    EnergyConsumption,
    Pumping,
    Flow,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Readings => "readings",
            Self::EnergyConsumption => "energy_consumption",
            Self::Pumping => "pumping",
            Self::Flow => "flow",
        }
    }

    fn no_data_message(&self) -> &'static str {
        match self {
            Self::Readings => "No active pump data available for the selected site.",
            Self::EnergyConsumption => "No energy consumption data found",
            Self::Pumping => "No active pumps found",
            Self::Flow => "No flow data found",
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readings" => Ok(Self::Readings),
            "energy" | "energy_consumption" => Ok(Self::EnergyConsumption),
            "pumping" => Ok(Self::Pumping),
            "flow" => Ok(Self::Flow),
            other => Err(format!("unknown report kind: {other}")),
        }
    }
}

/// A validated report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub site_id: String,
    pub window: DateRange,
}

impl ReportRequest {
    pub fn new(site_id: impl Into<String>, window: DateRange) -> Self {
        Self {
            site_id: site_id.into(),
            window,
        }
    }

    /// Validates raw request parameters; nothing is fetched for a rejected
    /// request.
    pub fn parse(
        site_id: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        offset: UtcOffset,
    ) -> Result<Self, ReportError> {
        let site_id = site_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ReportError::InvalidRequest("Site ID is required.".to_string()))?;

        let (Some(start), Some(end)) = (
            start.filter(|s| !s.trim().is_empty()),
            end.filter(|s| !s.trim().is_empty()),
        ) else {
            return Err(ReportError::InvalidRequest(
                "Start and end dates are required.".to_string(),
            ));
        };

        let invalid = || ReportError::InvalidRequest("Invalid date format".to_string());
        let from = parse_request_date(start, offset).ok_or_else(invalid)?;
        let to = parse_request_date(end, offset).ok_or_else(invalid)?;
        let window = DateRange::new(from, to).ok_or_else(|| {
            ReportError::InvalidRequest("End date must not precede start date.".to_string())
        })?;

        Ok(Self::new(site_id, window))
    }
}

/// Rows of any report, serialized as a bare JSON array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportRows {
    Readings(Vec<ReadingsRow>),
    EnergyConsumption(Vec<EnergyConsumptionRow>),
    Pumping(Vec<PumpingRow>),
    Flow(Vec<FlowRow>),
}

impl ReportRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Readings(r) => r.len(),
            Self::EnergyConsumption(r) => r.len(),
            Self::Pumping(r) => r.len(),
            Self::Flow(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ReportService<S> {
    source: S,
    pumps: PumpTable,
    offset: UtcOffset,
    options: AggregationOptions,
}

impl<S: SnapshotSource> ReportService<S> {
    pub fn new(source: S, pumps: PumpTable, offset: UtcOffset, options: AggregationOptions) -> Self {
        Self {
            source,
            pumps,
            offset,
            options,
        }
    }

    pub fn from_config(source: S, cfg: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            source,
            cfg.schema.pump_table()?,
            cfg.site.offset()?,
            cfg.engine.options(),
        ))
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Runs one report, recording request, outcome and latency metrics.
    #[tracing::instrument(
        skip(self, req),
        fields(
            report = kind.as_str(),
            site_id = %req.site_id,
            from = %req.window.from,
            to = %req.window.to,
        )
    )]
    pub async fn run(&self, kind: ReportKind, req: &ReportRequest) -> Result<ReportRows, ReportError> {
        let report = kind.as_str();
        metrics::counter!("report_requests_total", "report" => report).increment(1);
        let started = Instant::now();

        let result = match kind {
            ReportKind::Readings => self.readings(req).await.map(ReportRows::Readings),
            ReportKind::EnergyConsumption => self
                .energy_consumption(req)
                .await
                .map(ReportRows::EnergyConsumption),
            ReportKind::Pumping => self.pumping(req).await.map(ReportRows::Pumping),
            ReportKind::Flow => self.flow(req).await.map(ReportRows::Flow),
        };

        metrics::histogram!("report_duration_seconds", "report" => report)
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(rows) => tracing::info!(rows = rows.len(), "report assembled"),
            Err(ReportError::NoData(_)) => {
                metrics::counter!("report_no_data_total", "report" => report).increment(1);
                tracing::info!("report has no data");
            }
            Err(ReportError::InvalidRequest(msg)) => {
                tracing::debug!(reason = %msg, "report request rejected");
            }
            Err(ReportError::Source(e)) => {
                metrics::counter!("report_failures_total", "report" => report).increment(1);
                tracing::error!(error = %e, "report failed");
            }
        }
        result
    }

    pub async fn readings(&self, req: &ReportRequest) -> Result<Vec<ReadingsRow>, ReportError> {
        let observations = self.observations(req, req.window).await?;
        let rows = readings_rows(&observations, req.window, &self.pumps);
        non_empty(rows, ReportKind::Readings)
    }

    pub async fn energy_consumption(
        &self,
        req: &ReportRequest,
    ) -> Result<Vec<EnergyConsumptionRow>, ReportError> {
        let agg = self.aggregation(req).await?;
        let rows = energy_consumption_rows(&agg, req.window, &self.pumps);
        non_empty(rows, ReportKind::EnergyConsumption)
    }

    pub async fn pumping(&self, req: &ReportRequest) -> Result<Vec<PumpingRow>, ReportError> {
        let agg = self.aggregation(req).await?;
        let rows = pumping_rows(&agg, req.window, &self.pumps);
        non_empty(rows, ReportKind::Pumping)
    }

    pub async fn flow(&self, req: &ReportRequest) -> Result<Vec<FlowRow>, ReportError> {
        let agg = self.aggregation(req).await?;
        let rows = flow_rows(&agg, req.window, &self.pumps);
        non_empty(rows, ReportKind::Flow)
    }

    /// Neighbour days are fetched only so runs crossing a month edge are cut
    /// the same way whatever window was asked for. They belong to adjacent
    /// months, whose buckets stay partial and are never reported.
    async fn aggregation(&self, req: &ReportRequest) -> Result<Aggregation, ReportError> {
        let dates = req.window.month_span().with_neighbour_days();
        let observations = self.observations(req, dates).await?;
        Ok(aggregate(&observations, &self.pumps, self.options))
    }

    async fn observations(
        &self,
        req: &ReportRequest,
        dates: DateRange,
    ) -> Result<Vec<Observation>, ReportError> {
        let range = dates.to_time_range(self.offset);
        let raws = collect_snapshots(&self.source, &req.site_id, range).await?;
        if raws.is_empty() {
            return Err(ReportError::NoData(
                "No data available for the selected site.".to_string(),
            ));
        }
        tracing::debug!(snapshots = raws.len(), "collected snapshots");
        Ok(Normalizer::new(&self.pumps, self.offset).normalize_all(&raws))
    }
}

fn non_empty<R>(rows: Vec<R>, kind: ReportKind) -> Result<Vec<R>, ReportError> {
    if rows.is_empty() {
        Err(ReportError::NoData(kind.no_data_message().to_string()))
    } else {
        Ok(rows)
    }
}

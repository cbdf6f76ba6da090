//! Pumping-station telemetry reports.
//!
//! Raw gateway snapshots come in through a [`pipeline::SnapshotSource`], the
//! [`engine`] turns them into daily and monthly per-pump figures, and the
//! [`service`] shapes those into report rows for the HTTP [`api`] and the
//! `pump_report` CLI.

pub mod api;
pub mod config;
pub mod engine;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod service;
pub mod sources;

pub use service::{ReportError, ReportKind, ReportRequest, ReportRows, ReportService};

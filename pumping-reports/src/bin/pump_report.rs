use anyhow::{bail, Result};
use pumping_reports::{
    config::AppConfig,
    observability,
    pipeline::SnapshotSource,
    service::{ReportKind, ReportRequest, ReportService},
    sources::{SnapshotDelimitedFileSource, SnapshotNdjsonFileSource},
};
use std::{env, path::Path};

const USAGE: &str =
    "usage: pump_report <energy|pumping|flow|readings> <snapshot_file> <site_id> <start_date> <end_date>";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing("warn");

    let args: Vec<String> = env::args().collect();
    if args.len() < 6 {
        bail!(USAGE);
    }
    let kind: ReportKind = args[1].parse().map_err(|e| anyhow::anyhow!("{e}\n{USAGE}"))?;
    let file_path = Path::new(&args[2]);

    // PUMPING_CONFIG may point at a site-specific schema; defaults otherwise.
    let cfg = AppConfig::load_or_default()?;
    let req = ReportRequest::parse(
        Some(args[3].as_str()),
        Some(args[4].as_str()),
        Some(args[5].as_str()),
        cfg.site.offset()?,
    )?;

    let extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("ndjson") | Some("jsonl") => {
            run(SnapshotNdjsonFileSource::new(file_path), &cfg, kind, &req).await
        }
        Some("dat") => run(SnapshotDelimitedFileSource::dat(file_path), &cfg, kind, &req).await,
        _ => run(SnapshotDelimitedFileSource::csv(file_path), &cfg, kind, &req).await,
    }
}

async fn run<S: SnapshotSource>(
    source: S,
    cfg: &AppConfig,
    kind: ReportKind,
    req: &ReportRequest,
) -> Result<()> {
    let service = ReportService::from_config(source, cfg)?;
    let rows = service.run(kind, req).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

use std::path::PathBuf;

use async_stream::try_stream;
use station_client::domain::RawSnapshot;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use crate::{
    engine::TimeRange,
    pipeline::{in_scope, SnapshotSource, SnapshotStream, SourceError},
};

/// NDJSON export of the snapshot collection.
///
/// Each line is one document shaped like
/// `{"timeStamp": ..., "siteId": ..., "topic": ..., "data": {...}}`.
/// Lines that are not valid documents are skipped and counted.
pub struct SnapshotNdjsonFileSource {
    path: PathBuf,
}

impl SnapshotNdjsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn parse_line(line: &str) -> Result<RawSnapshot, String> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    RawSnapshot::from_json(&value).map_err(|e| e.to_string())
}

#[async_trait::async_trait]
impl SnapshotSource for SnapshotNdjsonFileSource {
    async fn stream(&self, site_id: &str, range: TimeRange) -> SnapshotStream {
        let path = self.path.clone();
        let site_id = site_id.to_string();
        let s = try_stream! {
            let file = File::open(&path).await.map_err(|e| {
                SourceError::Io(format!("failed to open snapshot file {}: {e}", path.display()))
            })?;
            let mut lines = BufReader::new(file).lines();
            let mut line_no = 0usize;

            while let Some(line) = lines.next_line().await.map_err(|e| {
                SourceError::Io(format!("failed to read snapshot line: {e}"))
            })? {
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                let snapshot = match parse_line(&line) {
                    Ok(s) => s,
                    Err(e) => {
                        metrics::counter!("snapshot_ndjson_parse_errors_total").increment(1);
                        tracing::warn!(line = line_no, error = %e, "skipping malformed snapshot line");
                        continue;
                    }
                };
                if in_scope(&snapshot, &site_id, &range) {
                    yield snapshot;
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_document_lines() {
        let snap = parse_line(
            r#"{"timeStamp":"2024-03-01T02:30:00Z","siteId":"S-01","data":{"P1_KWH":4.5}}"#,
        )
        .unwrap();
        assert_eq!(snap.site_id, "S-01");
        assert_eq!(snap.field("P1_KWH").and_then(|v| v.as_f64()), Some(4.5));

        assert!(parse_line("{oops").is_err());
        assert!(parse_line(r#"{"timeStamp":"2024-03-01T02:30:00Z"}"#).is_err());
    }
}

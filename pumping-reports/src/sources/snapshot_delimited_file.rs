use std::{collections::BTreeMap, fs::File, path::PathBuf};

use csv::StringRecord;
use station_client::domain::{FieldValue, RawSnapshot, SnapshotTime};

use crate::{
    engine::TimeRange,
    pipeline::{in_scope, SnapshotSource, SnapshotStream, SourceError},
};

/// Delimited text export of snapshots (CSV, or `|`-separated `.dat`).
///
/// Expected header columns (by name):
/// - ts (or timeStamp)
/// - site_id (or siteId)
/// - topic (optional)
///
/// Every other column is a telemetry field named after its header.
pub struct SnapshotDelimitedFileSource {
    path: PathBuf,
    delimiter: u8,
}

impl SnapshotDelimitedFileSource {
    pub fn csv<P: Into<PathBuf>>(path: P) -> Self {
        Self::with_delimiter(path, b',')
    }

    pub fn dat<P: Into<PathBuf>>(path: P) -> Self {
        Self::with_delimiter(path, b'|')
    }

    pub fn with_delimiter<P: Into<PathBuf>>(path: P, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }
}

const TS_COLUMNS: [&str; 2] = ["ts", "timeStamp"];
const SITE_COLUMNS: [&str; 2] = ["site_id", "siteId"];
const TOPIC_COLUMN: &str = "topic";

fn record_to_snapshot(
    record: &StringRecord,
    headers: &StringRecord,
) -> Result<RawSnapshot, SourceError> {
    let mut timestamp = None;
    let mut site_id = None;
    let mut topic = None;
    let mut fields = BTreeMap::new();

    for (name, cell) in headers.iter().zip(record.iter()) {
        let cell = cell.trim();
        if TS_COLUMNS.contains(&name) {
            timestamp = (!cell.is_empty()).then(|| SnapshotTime::Text(cell.to_string()));
        } else if SITE_COLUMNS.contains(&name) {
            site_id = (!cell.is_empty()).then(|| cell.to_string());
        } else if name == TOPIC_COLUMN {
            topic = (!cell.is_empty()).then(|| cell.to_string());
        } else if let Some(value) = FieldValue::from_text(cell) {
            fields.insert(name.to_string(), value);
        }
    }

    let site_id = site_id
        .ok_or_else(|| SourceError::Parse("missing site_id in delimited record".to_string()))?;

    Ok(RawSnapshot {
        timestamp,
        site_id,
        topic,
        fields,
    })
}

#[async_trait::async_trait]
impl SnapshotSource for SnapshotDelimitedFileSource {
    async fn stream(&self, site_id: &str, range: TimeRange) -> SnapshotStream {
        // Blocking reader inside a single async task; exports are small.
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let site_id = site_id.to_string();
        let s = async_stream::try_stream! {
            let file = File::open(&path).map_err(|e| {
                SourceError::Io(format!("failed to open snapshot file {}: {e}", path.display()))
            })?;
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .flexible(true)
                .from_reader(file);
            let headers = rdr
                .headers()
                .map_err(|e| SourceError::Parse(format!("failed to read headers: {e}")))?
                .clone();

            for result in rdr.records() {
                let record = result
                    .map_err(|e| SourceError::Parse(format!("failed to read record: {e}")))?;

                let snapshot = match record_to_snapshot(&record, &headers) {
                    Ok(s) => s,
                    Err(e) => {
                        metrics::counter!("snapshot_delimited_parse_errors_total").increment(1);
                        tracing::warn!(error = %e, "skipping delimited record");
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
    fn record_columns_map_to_fields() {
        let headers = StringRecord::from(vec!["ts", "site_id", "topic", "P1_ON_FB", "P1_KWH", "NOTE"]);
        let record = StringRecord::from(vec!["2024-03-01 02:30:00", "S-01", "", "true", "12.5", ""]);

        let snap = record_to_snapshot(&record, &headers).unwrap();
        assert_eq!(
            snap.timestamp,
            Some(SnapshotTime::Text("2024-03-01 02:30:00".to_string()))
        );
        assert_eq!(snap.site_id, "S-01");
        assert!(snap.topic.is_none());
        assert_eq!(snap.fields.len(), 2);
        assert!(snap.field("P1_ON_FB").unwrap().as_bool());
    }

    #[test]
    fn record_without_site_is_rejected() {
        let headers = StringRecord::from(vec!["ts", "P1_KWH"]);
        let record = StringRecord::from(vec!["2024-03-01 02:30:00", "1"]);
        assert!(matches!(
            record_to_snapshot(&record, &headers),
            Err(SourceError::Parse(_))
        ));
    }
}

use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::{RawSnapshot, SnapshotTime};

/// Row shape of the `pump_snapshot` table.
///
/// `data` holds the gateway payload as JSON text; QuestDB has no JSON column
/// type, so decoding happens client side.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PumpSnapshotRow {
    pub ts: OffsetDateTime,
    pub site_id: String,
    pub topic: Option<String>,
    pub data: Option<String>,
}

impl From<PumpSnapshotRow> for RawSnapshot {
    fn from(row: PumpSnapshotRow) -> Self {
        // A corrupt payload still yields a snapshot; its fields read as zero.
        let fields = row
            .data
            .as_deref()
            .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
            .map(|v| RawSnapshot::fields_from_json(&v))
            .unwrap_or_default();

        RawSnapshot {
            timestamp: Some(SnapshotTime::Instant(row.ts)),
            site_id: row.site_id,
            topic: row.topic,
            fields,
        }
    }
}

/// Fetch the time-ordered snapshots of one site within `[start, end]`.
pub async fn fetch_snapshots(
    pool: &PgPool,
    site_id: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<RawSnapshot>> {
    let rows = sqlx::query_as::<_, PumpSnapshotRow>(
        r#"
        SELECT
            ts,
            site_id,
            topic,
            data
        FROM pump_snapshot
        WHERE site_id = $1
          AND ts >= $2
          AND ts <= $3
        ORDER BY ts
        "#,
    )
    .bind(site_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(RawSnapshot::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn row_payload_is_decoded_into_fields() {
        let row = PumpSnapshotRow {
            ts: datetime!(2024-03-01 02:30:00 UTC),
            site_id: "S-01".to_string(),
            topic: Some("station/alpha".to_string()),
            data: Some(r#"{"P1_ON_FB":true,"P1_KWH":10.5}"#.to_string()),
        };

        let snap = RawSnapshot::from(row);
        assert_eq!(
            snap.timestamp,
            Some(SnapshotTime::Instant(datetime!(2024-03-01 02:30:00 UTC)))
        );
        assert_eq!(snap.fields.len(), 2);
        assert_eq!(snap.field("P1_KWH").and_then(|v| v.as_f64()), Some(10.5));
    }

    #[test]
    fn corrupt_payload_yields_empty_fields() {
        let row = PumpSnapshotRow {
            ts: datetime!(2024-03-01 02:30:00 UTC),
            site_id: "S-01".to_string(),
            topic: None,
            data: Some("{not json".to_string()),
        };

        let snap = RawSnapshot::from(row);
        assert!(snap.fields.is_empty());
        assert_eq!(snap.site_id, "S-01");
    }
}

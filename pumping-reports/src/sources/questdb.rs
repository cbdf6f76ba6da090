use async_stream::try_stream;
use sqlx::postgres::PgPool;

use crate::{
    engine::TimeRange,
    pipeline::{SnapshotSource, SnapshotStream, SourceError},
};

/// Snapshots stored in QuestDB's `pump_snapshot` table, read over pgwire.
///
/// Filtering by site and window is pushed down into the query.
#[derive(Clone)]
pub struct QuestDbSnapshotSource {
    pool: PgPool,
}

impl QuestDbSnapshotSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for QuestDbSnapshotSource {
    async fn stream(&self, site_id: &str, range: TimeRange) -> SnapshotStream {
        let pool = self.pool.clone();
        let site_id = site_id.to_string();
        let s = try_stream! {
            let rows = station_client::db::fetch_snapshots(&pool, &site_id, range.start, range.end)
                .await
                .map_err(|e| {
                    metrics::counter!("questdb_source_errors_total").increment(1);
                    SourceError::Store(format!("{e:#}"))
                })?;
            tracing::debug!(site_id = %site_id, rows = rows.len(), "fetched snapshots from questdb");
            for snapshot in rows {
                yield snapshot;
            }
        };

        Box::pin(s)
    }
}

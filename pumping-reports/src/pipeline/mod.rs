use std::pin::Pin;

use futures::{Stream, TryStreamExt};
use station_client::domain::RawSnapshot;

use crate::engine::{normalize::parse_timestamp, TimeRange};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<RawSnapshot, SourceError>> + Send>>;

/// Where raw snapshots come from.
///
/// Implementations yield the snapshots of `site_id` within `range`, ideally
/// in time order; the service sorts again before aggregating.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn stream(&self, site_id: &str, range: TimeRange) -> SnapshotStream;
}

/// Drains a source into memory.
pub async fn collect_snapshots<S>(
    source: &S,
    site_id: &str,
    range: TimeRange,
) -> Result<Vec<RawSnapshot>, SourceError>
where
    S: SnapshotSource + ?Sized,
{
    source.stream(site_id, range).await.try_collect().await
}

/// Filter for sources that cannot push the predicate down to storage.
///
/// Snapshots whose timestamp does not parse are let through so the
/// normalizer can drop and count them in one place.
pub fn in_scope(snapshot: &RawSnapshot, site_id: &str, range: &TimeRange) -> bool {
    if snapshot.site_id != site_id {
        return false;
    }
    match snapshot.timestamp.as_ref().and_then(parse_timestamp) {
        Some(ts) => range.contains(ts),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use station_client::domain::SnapshotTime;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    fn snap(site: &str, ts: Option<SnapshotTime>) -> RawSnapshot {
        RawSnapshot {
            timestamp: ts,
            site_id: site.to_string(),
            topic: None,
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn scope_filters_site_and_window() {
        let range = TimeRange {
            start: datetime!(2024-03-01 00:00 UTC),
            end: datetime!(2024-03-01 23:59 UTC),
        };
        let inside = Some(SnapshotTime::Instant(datetime!(2024-03-01 10:00 UTC)));
        let outside = Some(SnapshotTime::Instant(datetime!(2024-03-02 10:00 UTC)));

        assert!(in_scope(&snap("S-01", inside.clone()), "S-01", &range));
        assert!(!in_scope(&snap("S-02", inside), "S-01", &range));
        assert!(!in_scope(&snap("S-01", outside), "S-01", &range));
        assert!(in_scope(&snap("S-01", Some(SnapshotTime::Text("??".into()))), "S-01", &range));
    }
}

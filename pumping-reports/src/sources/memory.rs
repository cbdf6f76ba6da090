use futures::stream;
use station_client::domain::RawSnapshot;

use crate::{
    engine::TimeRange,
    pipeline::{in_scope, SnapshotSource, SnapshotStream},
};

/// Snapshots already held in memory, e.g. replayed from a capture.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotSource {
    snapshots: Vec<RawSnapshot>,
}

impl MemorySnapshotSource {
    pub fn new(snapshots: Vec<RawSnapshot>) -> Self {
        Self { snapshots }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for MemorySnapshotSource {
    async fn stream(&self, site_id: &str, range: TimeRange) -> SnapshotStream {
        let selected: Vec<_> = self
            .snapshots
            .iter()
            .filter(|s| in_scope(s, site_id, &range))
            .cloned()
            .map(Ok)
            .collect();
        Box::pin(stream::iter(selected))
    }
}

pub mod memory;
pub mod questdb;
pub mod snapshot_delimited_file;
pub mod snapshot_ndjson_file;

pub use memory::MemorySnapshotSource;
pub use questdb::QuestDbSnapshotSource;
pub use snapshot_delimited_file::SnapshotDelimitedFileSource;
pub use snapshot_ndjson_file::SnapshotNdjsonFileSource;

pub mod pump_snapshot;

pub use pump_snapshot::{FieldValue, RawSnapshot, SnapshotDecodeError, SnapshotTime};

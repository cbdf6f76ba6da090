//! Time-series aggregation of pump telemetry.
//!
//! raw snapshots → [`normalize`] → [`grouper`] (driving [`runs`] and
//! [`counters`]) → [`assemble`]. Everything here is synchronous and pure; I/O
//! lives in the sources and the service.

pub mod assemble;
pub mod counters;
pub mod grouper;
pub mod normalize;
pub mod observation;
pub mod runs;
pub mod schema;
pub mod window;

pub use counters::FlowAccumulation;
pub use grouper::{aggregate, Aggregation, AggregationOptions, DayBucket, MonthBucket};
pub use normalize::Normalizer;
pub use observation::{CounterKind, Observation, YearMonth};
pub use runs::{RunInterval, RunState};
pub use schema::{PumpChannel, PumpId, PumpTable};
pub use window::{DateRange, TimeRange};

use serde::Deserialize;
use time::OffsetDateTime;

/// A counter value sampled while its pump was running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterReading {
    pub at: OffsetDateTime,
    pub value: f64,
}

/// First and last counter values of a bucket and the delta attributed to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterDelta {
    pub first: f64,
    pub last: f64,
    /// `last - first`, clamped at zero when the counter went backwards.
    pub delta: f64,
}

impl CounterDelta {
    /// The counter was reset or glitched inside the bucket.
    pub fn is_anomaly(&self) -> bool {
        self.last < self.first
    }
}

/// Delta between the chronologically first and last readings.
///
/// Readings are sorted in place by time first; upstream inserts can arrive
/// out of order. `None` when there are no readings.
pub fn counter_delta(readings: &mut [CounterReading]) -> Option<CounterDelta> {
    readings.sort_by_key(|r| r.at);
    let first = readings.first()?.value;
    let last = readings.last()?.value;
    Some(CounterDelta {
        first,
        last,
        delta: (last - first).max(0.0),
    })
}

/// How a day's flow figure is derived from its active flow readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAccumulation {
    /// Flow is a cumulative totalizer: last minus first.
    #[default]
    CounterDelta,
    /// Each reading is a volume in its own right: summed.
    Sum,
}

impl FlowAccumulation {
    /// Readings must already exclude non-positive values.
    pub fn accumulate(&self, readings: &mut [CounterReading]) -> f64 {
        match self {
            Self::CounterDelta => counter_delta(readings).map_or(0.0, |d| d.delta),
            Self::Sum => readings.iter().map(|r| r.value).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(at: OffsetDateTime, value: f64) -> CounterReading {
        CounterReading { at, value }
    }

    #[test]
    fn delta_uses_chronological_first_and_last() {
        let mut readings = vec![
            reading(datetime!(2024-03-01 12:30 UTC), 145.5),
            reading(datetime!(2024-03-01 02:30 UTC), 100.0),
            reading(datetime!(2024-03-01 06:00 UTC), 120.0),
        ];
        let d = counter_delta(&mut readings).unwrap();
        assert_eq!(d.first, 100.0);
        assert_eq!(d.last, 145.5);
        assert_eq!(d.delta, 45.5);
        assert!(!d.is_anomaly());
    }

    #[test]
    fn backwards_counter_clamps_to_zero() {
        let mut readings = vec![
            reading(datetime!(2024-03-01 02:30 UTC), 900.0),
            reading(datetime!(2024-03-01 12:30 UTC), 5.0),
        ];
        let d = counter_delta(&mut readings).unwrap();
        assert_eq!(d.delta, 0.0);
        assert!(d.is_anomaly());
    }

    #[test]
    fn empty_bucket_has_no_delta() {
        assert!(counter_delta(&mut []).is_none());
        assert_eq!(FlowAccumulation::CounterDelta.accumulate(&mut []), 0.0);
    }

    #[test]
    fn flow_modes() {
        let mut readings = vec![
            reading(datetime!(2024-03-01 02:30 UTC), 10.0),
            reading(datetime!(2024-03-01 04:30 UTC), 25.0),
        ];
        assert_eq!(FlowAccumulation::Sum.accumulate(&mut readings), 35.0);
        assert_eq!(FlowAccumulation::CounterDelta.accumulate(&mut readings), 15.0);
    }
}

//! Single forward pass that cuts observations into day and month buckets.
//!
//! A day closes on the observation whose successor falls on another civil
//! date, or on the last observation. Open runs are flushed with that closing
//! observation's time before the pass moves on. If the successor lands on the
//! very next day and still shows the pump running, the run is instead cut at
//! the day end and reopened at the next midnight.

use std::collections::BTreeMap;

use serde::Deserialize;
use time::{Date, Time};

use super::{
    counters::{counter_delta, CounterDelta, CounterReading, FlowAccumulation},
    observation::{CounterKind, Observation, YearMonth},
    runs::{RunInterval, RunTracker, DAY_END},
    schema::{PumpId, PumpTable},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AggregationOptions {
    #[serde(default)]
    pub flow: FlowAccumulation,
}

/// Finalized figures of one pump for one day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PumpDay {
    pub run_minutes: f64,
    /// Energy counter window over the active readings.
    pub energy: Option<CounterDelta>,
    pub flow: f64,
    /// Observations in which the pump was running.
    pub active_readings: usize,
}

impl PumpDay {
    pub fn energy_kwh(&self) -> f64 {
        self.energy.map_or(0.0, |e| e.delta)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub date: Date,
    /// Only pumps with at least one active reading that day.
    pub pumps: BTreeMap<PumpId, PumpDay>,
    pub intervals: Vec<RunInterval>,
}

impl DayBucket {
    pub fn pump(&self, id: PumpId) -> Option<&PumpDay> {
        self.pumps.get(&id)
    }

    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

/// Sums of one pump's finalized days within a month.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PumpMonth {
    pub run_minutes: f64,
    pub energy_kwh: f64,
    pub flow: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthBucket {
    pub month: YearMonth,
    pub pumps: BTreeMap<PumpId, PumpMonth>,
}

impl MonthBucket {
    /// A pump without activity in the month reads as all zeros.
    pub fn pump(&self, id: PumpId) -> PumpMonth {
        self.pumps.get(&id).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub days: Vec<DayBucket>,
    pub months: Vec<MonthBucket>,
}

impl Aggregation {
    pub fn day(&self, date: Date) -> Option<&DayBucket> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn month(&self, month: YearMonth) -> Option<&MonthBucket> {
        self.months.iter().find(|m| m.month == month)
    }
}

struct PumpDayState {
    label: String,
    tracker: RunTracker,
    run_minutes: f64,
    energy: Vec<CounterReading>,
    flow: Vec<CounterReading>,
    active_readings: usize,
}

struct DayAccumulator {
    date: Date,
    pumps: BTreeMap<PumpId, PumpDayState>,
    intervals: Vec<RunInterval>,
}

impl DayAccumulator {
    fn open(date: Date, table: &PumpTable, carried: &[PumpId]) -> Self {
        let pumps = table
            .channels()
            .iter()
            .map(|ch| {
                let id = ch.id;
                let tracker = if carried.contains(&id) {
                    RunTracker::continuing(id, date)
                } else {
                    RunTracker::new(id, date)
                };
                let state = PumpDayState {
                    label: ch.label.clone(),
                    tracker,
                    run_minutes: 0.0,
                    energy: Vec::new(),
                    flow: Vec::new(),
                    active_readings: 0,
                };
                (id, state)
            })
            .collect();

        Self {
            date,
            pumps,
            intervals: Vec::new(),
        }
    }

    fn observe(&mut self, obs: &Observation) {
        for (id, state) in self.pumps.iter_mut() {
            let reading = obs.pump(*id).copied().unwrap_or_default();

            if let Some(iv) = state.tracker.observe(reading.running, obs.local_time) {
                state.run_minutes += iv.minutes();
                self.intervals.push(iv);
            }

            if reading.running {
                state.active_readings += 1;
                state.energy.push(CounterReading {
                    at: obs.timestamp,
                    value: reading.counter(CounterKind::Energy),
                });
                let flow = reading.counter(CounterKind::Flow);
                if flow > 0.0 {
                    state.flow.push(CounterReading {
                        at: obs.timestamp,
                        value: flow,
                    });
                }
            }
        }
    }

    /// Pumps whose run carries over into `next`, the first observation after
    /// this day.
    fn continuing_into(&self, next: Option<&Observation>) -> Vec<PumpId> {
        let Some(next) = next else {
            return Vec::new();
        };
        if self.date.next_day() != Some(next.local_date) {
            return Vec::new();
        }
        self.pumps
            .iter()
            .filter(|(id, state)| state.tracker.is_running() && next.is_running(**id))
            .map(|(id, _)| *id)
            .collect()
    }

    fn close(
        mut self,
        at: Time,
        continuing: &[PumpId],
        options: AggregationOptions,
    ) -> DayBucket {
        let mut pumps = BTreeMap::new();

        for (id, mut state) in std::mem::take(&mut self.pumps) {
            let stop = if continuing.contains(&id) {
                DAY_END
            } else {
                at
            };
            if let Some(iv) = state.tracker.close(stop) {
                state.run_minutes += iv.minutes();
                self.intervals.push(iv);
            }

            if state.active_readings == 0 {
                continue;
            }

            let energy = counter_delta(&mut state.energy);
            if let Some(d) = energy.filter(CounterDelta::is_anomaly) {
                report_anomaly(self.date, &state.label, CounterKind::Energy, d);
            }

            let flow = options.flow.accumulate(&mut state.flow);

            pumps.insert(
                id,
                PumpDay {
                    run_minutes: state.run_minutes,
                    energy,
                    flow,
                    active_readings: state.active_readings,
                },
            );
        }

        self.intervals.sort_by_key(|iv| (iv.pump, iv.start));

        DayBucket {
            date: self.date,
            pumps,
            intervals: self.intervals,
        }
    }
}

fn report_anomaly(date: Date, pump: &str, kind: CounterKind, delta: CounterDelta) {
    tracing::warn!(
        %date,
        pump,
        counter = kind.as_str(),
        first = delta.first,
        last = delta.last,
        "counter went backwards within a day; contributing zero"
    );
    metrics::counter!("counter_anomalies_total", "counter" => kind.as_str()).increment(1);
}

struct MonthAccumulator {
    month: YearMonth,
    pumps: BTreeMap<PumpId, PumpMonth>,
}

impl MonthAccumulator {
    fn new(month: YearMonth) -> Self {
        Self {
            month,
            pumps: BTreeMap::new(),
        }
    }

    fn add(&mut self, day: &DayBucket) {
        for (id, pd) in &day.pumps {
            let m = self.pumps.entry(*id).or_default();
            m.run_minutes += pd.run_minutes;
            m.energy_kwh += pd.energy_kwh();
            m.flow += pd.flow;
        }
    }

    fn finish(self) -> MonthBucket {
        MonthBucket {
            month: self.month,
            pumps: self.pumps,
        }
    }
}

/// Aggregates a time-ordered observation sequence into day and month buckets.
///
/// Pure and deterministic: the same input always yields the same output.
/// Input must be sorted by timestamp; unsorted input gives unspecified buckets.
pub fn aggregate(
    observations: &[Observation],
    table: &PumpTable,
    options: AggregationOptions,
) -> Aggregation {
    let mut out = Aggregation::default();
    let mut day: Option<DayAccumulator> = None;
    let mut month: Option<MonthAccumulator> = None;
    let mut carried: Vec<PumpId> = Vec::new();

    let mut iter = observations.iter().peekable();
    while let Some(obs) = iter.next() {
        let acc = day.get_or_insert_with(|| DayAccumulator::open(obs.local_date, table, &carried));
        acc.observe(obs);

        let next = iter.peek().copied();
        if next.is_some_and(|n| n.local_date == obs.local_date) {
            continue;
        }

        carried = acc.continuing_into(next);
        let Some(acc) = day.take() else {
            continue;
        };
        let bucket = acc.close(obs.local_time, &carried, options);

        let key = bucket.month();
        if month.as_ref().is_some_and(|m| m.month != key) {
            if let Some(m) = month.take() {
                out.months.push(m.finish());
            }
        }
        month
            .get_or_insert_with(|| MonthAccumulator::new(key))
            .add(&bucket);
        out.days.push(bucket);

        if next.map_or(true, |n| n.year_month() != key) {
            if let Some(m) = month.take() {
                out.months.push(m.finish());
            }
        }
    }

    out
}

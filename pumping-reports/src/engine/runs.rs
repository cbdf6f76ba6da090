//! Edge-triggered reconstruction of pump run intervals.
//!
//! Status is sampled, not continuous: a pump is considered running from the
//! sample where it is first seen ON until the sample where it is first seen
//! OFF. Every interval is clipped to the civil day it started on.

use time::{macros::time, Date, Time};

use super::schema::PumpId;

/// Last representable instant of a civil day for interval clipping.
pub const DAY_END: Time = time!(23:59:59.999);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running { since: Time },
}

/// A continuous ON period of one pump inside one civil day; `stop > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunInterval {
    pub pump: PumpId,
    pub date: Date,
    pub start: Time,
    pub stop: Time,
}

impl RunInterval {
    pub fn minutes(&self) -> f64 {
        (self.stop - self.start).as_seconds_f64() / 60.0
    }
}

/// Clips `[start, stop)` to one day.
///
/// Both ends are bare times of the same day. A stop earlier than the start
/// means the run wrapped past midnight; it is pushed a day forward, which the
/// clip then cuts at [`DAY_END`]. Empty intervals yield `None`.
pub fn clip_to_day(start: Time, stop: Time) -> Option<(Time, Time)> {
    let start = start.min(DAY_END);
    let stop = if stop < start { DAY_END } else { stop.min(DAY_END) };
    (stop > start).then_some((start, stop))
}

/// Run state of one pump within one day bucket.
#[derive(Debug, Clone)]
pub struct RunTracker {
    pump: PumpId,
    date: Date,
    state: RunState,
}

impl RunTracker {
    pub fn new(pump: PumpId, date: Date) -> Self {
        Self {
            pump,
            date,
            state: RunState::Idle,
        }
    }

    /// Tracker for a run that was still going at the previous midnight.
    pub fn continuing(pump: PumpId, date: Date) -> Self {
        Self {
            pump,
            date,
            state: RunState::Running {
                since: Time::MIDNIGHT,
            },
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running { .. })
    }

    /// Feeds one status sample. Returns the interval closed by an ON→OFF edge.
    pub fn observe(&mut self, running: bool, at: Time) -> Option<RunInterval> {
        match (self.state, running) {
            (RunState::Idle, true) => {
                self.state = RunState::Running { since: at };
                None
            }
            (RunState::Running { since }, false) => {
                self.state = RunState::Idle;
                self.interval(since, at)
            }
            _ => None,
        }
    }

    /// Forces a stop at `at` and resets to idle.
    pub fn close(&mut self, at: Time) -> Option<RunInterval> {
        match std::mem::take(&mut self.state) {
            RunState::Running { since } => self.interval(since, at),
            RunState::Idle => None,
        }
    }

    fn interval(&self, since: Time, at: Time) -> Option<RunInterval> {
        clip_to_day(since, at).map(|(start, stop)| RunInterval {
            pump: self.pump,
            date: self.date,
            start,
            stop,
        })
    }
}

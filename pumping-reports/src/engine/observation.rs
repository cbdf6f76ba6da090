use std::{collections::BTreeMap, fmt};

use time::{Date, Month, OffsetDateTime, Time};

use super::schema::PumpId;

/// Cumulative counters sampled with every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Energy,
    Flow,
}

impl CounterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Flow => "flow",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Electrical {
    pub voltage: f64,
    pub frequency: f64,
    pub current: f64,
    pub power_factor: f64,
}

/// One pump's view of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PumpReading {
    pub running: bool,
    pub energy_kwh: f64,
    pub flow: f64,
    pub electrical: Electrical,
}

impl PumpReading {
    pub fn counter(&self, kind: CounterKind) -> f64 {
        match kind {
            CounterKind::Energy => self.energy_kwh,
            CounterKind::Flow => self.flow,
        }
    }
}

/// A normalized snapshot, placed on the site's civil calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Instant of the sample, in UTC.
    pub timestamp: OffsetDateTime,
    pub local_date: Date,
    pub local_time: Time,
    pub site_id: String,
    pub topic: Option<String>,
    pub pumps: BTreeMap<PumpId, PumpReading>,
}

impl Observation {
    pub fn pump(&self, id: PumpId) -> Option<&PumpReading> {
        self.pumps.get(&id)
    }

    pub fn is_running(&self, id: PumpId) -> bool {
        self.pump(id).is_some_and(|p| p.running)
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.local_date)
    }
}

/// Calendar month key of a month bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u8,
}

impl YearMonth {
    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
        }
    }

    pub fn first_day(&self) -> Option<Date> {
        let month = Month::try_from(self.month).ok()?;
        Date::from_calendar_date(self.year, month, 1).ok()
    }

    pub fn last_day(&self) -> Option<Date> {
        let month = Month::try_from(self.month).ok()?;
        let (year, next) = match month {
            Month::December => (self.year.checked_add(1)?, Month::January),
            m => (self.year, m.next()),
        };
        Date::from_calendar_date(year, next, 1).ok()?.previous_day()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// `yyyy-MM-dd`, the date key used in aggregate report rows.
pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month() as u8,
        date.day()
    )
}

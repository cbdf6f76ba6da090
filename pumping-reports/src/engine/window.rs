use time::{
    format_description::well_known::Rfc3339,
    macros::{format_description, time},
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

use super::observation::YearMonth;

/// Inclusive range of civil dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: Date,
    pub to: Date,
}

/// Inclusive range of instants, as handed to snapshot sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeRange {
    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }
}

impl DateRange {
    /// `None` when `to` precedes `from`.
    pub fn new(from: Date, to: Date) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    pub fn contains(&self, date: Date) -> bool {
        date >= self.from && date <= self.to
    }

    /// The whole calendar months touched by this range.
    ///
    /// Monthly totals always cover full months, even when the daily window
    /// is a sub-range of one.
    pub fn month_span(&self) -> Self {
        let from = YearMonth::of(self.from).first_day().unwrap_or(self.from);
        let to = YearMonth::of(self.to).last_day().unwrap_or(self.to);
        Self { from, to }
    }

    /// One more civil day on each side, where the calendar allows.
    ///
    /// Runs crossing the edges of a range need the neighbouring day: the
    /// previous one to carry a run in at midnight, the next one to decide
    /// whether the last day's run continues past it.
    pub fn with_neighbour_days(&self) -> Self {
        Self {
            from: self.from.previous_day().unwrap_or(self.from),
            to: self.to.next_day().unwrap_or(self.to),
        }
    }

    /// Start of `from` to the last instant of `to`, in the site offset.
    pub fn to_time_range(&self, offset: UtcOffset) -> TimeRange {
        let start = PrimitiveDateTime::new(self.from, time!(0:00))
            .assume_offset(offset);
        let end = PrimitiveDateTime::new(self.to, time!(23:59:59.999999999))
            .assume_offset(offset);
        TimeRange { start, end }
    }
}

/// Reads a request date: either `yyyy-MM-dd` or a full timestamp, whose
/// civil date in the site offset is taken.
pub fn parse_request_date(input: &str, offset: UtcOffset) -> Option<Date> {
    let input = input.trim();
    if let Ok(d) = Date::parse(input, format_description!("[year]-[month]-[day]")) {
        return Some(d);
    }
    if let Ok(ts) = OffsetDateTime::parse(input, &Rfc3339) {
        return ts.checked_to_offset(offset).map(|local| local.date());
    }
    PrimitiveDateTime::parse(
        input,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
    .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    #[test]
    fn month_span_widens_to_calendar_months() {
        let days = DateRange::new(date!(2024 - 01 - 20), date!(2024 - 02 - 03)).unwrap();
        let months = days.month_span();
        assert_eq!(months.from, date!(2024 - 01 - 01));
        assert_eq!(months.to, date!(2024 - 02 - 29));
        assert!(months.contains(date!(2024 - 02 - 15)));
        assert!(!days.contains(date!(2024 - 02 - 15)));
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(DateRange::new(date!(2024 - 01 - 02), date!(2024 - 01 - 01)).is_none());
    }

    #[test]
    fn time_range_covers_local_days() {
        let ist = offset!(+5:30);
        let days = DateRange::new(date!(2024 - 03 - 01), date!(2024 - 03 - 01)).unwrap();
        let range = days.to_time_range(ist);
        assert_eq!(range.start, datetime!(2024-02-29 18:30 UTC));
        assert!(range.contains(datetime!(2024-03-01 18:29:59 UTC)));
        assert!(!range.contains(datetime!(2024-03-01 18:30 UTC)));
    }

    #[test]
    fn request_dates_accept_plain_and_timestamp_forms() {
        let ist = offset!(+5:30);
        assert_eq!(parse_request_date("2024-03-01", ist), Some(date!(2024 - 03 - 01)));
        assert_eq!(
            parse_request_date("2024-02-29T20:00:00Z", ist),
            Some(date!(2024 - 03 - 01))
        );
        assert_eq!(
            parse_request_date("2024-03-01T10:00:00", ist),
            Some(date!(2024 - 03 - 01))
        );
        assert_eq!(parse_request_date("01/03/2024", ist), None);
        // Year 10000 in site time is not a date we can report on.
        assert_eq!(parse_request_date("9999-12-31T23:00:00Z", ist), None);
    }

    #[test]
    fn neighbour_days_cross_month_edges() {
        let march = DateRange::new(date!(2024 - 03 - 10), date!(2024 - 03 - 10))
            .unwrap()
            .month_span()
            .with_neighbour_days();
        assert_eq!(march.from, date!(2024 - 02 - 29));
        assert_eq!(march.to, date!(2024 - 04 - 01));

        let max = DateRange::new(Date::MAX, Date::MAX).unwrap().with_neighbour_days();
        assert_eq!(max.to, Date::MAX);
    }
}

use station_client::domain::{RawSnapshot, SnapshotTime};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

use super::{
    observation::{Electrical, Observation, PumpReading},
    schema::PumpTable,
};

/// Resolves a stored timestamp to an instant.
///
/// Text without an explicit offset is taken as UTC, which is how the store
/// writes it.
pub fn parse_timestamp(raw: &SnapshotTime) -> Option<OffsetDateTime> {
    match raw {
        SnapshotTime::Instant(ts) => Some(*ts),
        SnapshotTime::EpochMillis(ms) => {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(*ms) * 1_000_000).ok()
        }
        SnapshotTime::Text(s) => {
            let s = s.trim();
            if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
                return Some(ts);
            }
            PrimitiveDateTime::parse(
                s,
                format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
            )
            .or_else(|_| {
                PrimitiveDateTime::parse(
                    s,
                    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
                )
            })
            .or_else(|_| {
                PrimitiveDateTime::parse(
                    s,
                    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
                )
            })
            .or_else(|_| {
                PrimitiveDateTime::parse(
                    s,
                    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
                )
            })
            .ok()
            .map(PrimitiveDateTime::assume_utc)
        }
    }
}

/// Turns raw snapshots into observations on the site's civil calendar.
pub struct Normalizer<'a> {
    pumps: &'a PumpTable,
    offset: UtcOffset,
}

impl<'a> Normalizer<'a> {
    pub fn new(pumps: &'a PumpTable, offset: UtcOffset) -> Self {
        Self { pumps, offset }
    }

    /// `None` when the snapshot has no usable timestamp, including one whose
    /// local date falls outside the representable calendar.
    pub fn normalize(&self, raw: &RawSnapshot) -> Option<Observation> {
        let timestamp = raw.timestamp.as_ref().and_then(parse_timestamp)?;
        let local = timestamp.checked_to_offset(self.offset)?;
        let timestamp = timestamp.checked_to_offset(UtcOffset::UTC)?;

        let flag = |name: &str| raw.field(name).is_some_and(|v| v.as_bool());
        let number = |name: &str| raw.field(name).and_then(|v| v.as_f64()).unwrap_or(0.0);

        let available = flag(self.pumps.available_flag());
        let pumps = self
            .pumps
            .channels()
            .iter()
            .map(|ch| {
                let reading = PumpReading {
                    running: available && flag(&ch.on_flag),
                    energy_kwh: number(&ch.energy_field),
                    flow: number(&ch.flow_field),
                    electrical: Electrical {
                        voltage: number(&ch.electrical.voltage),
                        frequency: number(&ch.electrical.frequency),
                        current: number(&ch.electrical.current),
                        power_factor: number(&ch.electrical.power_factor),
                    },
                };
                (ch.id, reading)
            })
            .collect();

        Some(Observation {
            timestamp,
            local_date: local.date(),
            local_time: local.time(),
            site_id: raw.site_id.clone(),
            topic: raw.topic.clone(),
            pumps,
        })
    }

    /// Normalizes a batch and orders it by instant.
    ///
    /// The sort is stable, so snapshots sharing a timestamp keep their
    /// delivery order. Records without a usable timestamp are dropped.
    pub fn normalize_all(&self, raws: &[RawSnapshot]) -> Vec<Observation> {
        let mut out = Vec::with_capacity(raws.len());
        let mut dropped = 0u64;
        for raw in raws {
            match self.normalize(raw) {
                Some(obs) => out.push(obs),
                None => {
                    dropped += 1;
                    tracing::debug!(
                        site_id = %raw.site_id,
                        timestamp = ?raw.timestamp,
                        "dropping snapshot with unusable timestamp"
                    );
                }
            }
        }
        if dropped > 0 {
            metrics::counter!("snapshots_dropped_total").increment(dropped);
        }
        out.sort_by_key(|o| o.timestamp);
        out
    }
}

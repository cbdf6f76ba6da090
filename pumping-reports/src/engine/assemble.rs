//! Joins day and month buckets into report rows.
//!
//! Field names on the wire are the ones existing dashboards consume, hence
//! the renames.

use serde::Serialize;

use super::{
    grouper::{Aggregation, DayBucket, PumpDay, PumpMonth},
    observation::{iso_date, Observation},
    schema::PumpTable,
    window::DateRange,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyConsumptionRow {
    #[serde(rename = "Date")]
    pub date: String,
    pub pump: String,
    #[serde(rename = "daily kWh")]
    pub daily_kwh: String,
    #[serde(rename = "monthly kWh")]
    pub monthly_kwh: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PumpingRow {
    #[serde(rename = "Date")]
    pub date: String,
    pub pump: String,
    #[serde(rename = "daily pumping hours")]
    pub daily_hours: String,
    #[serde(rename = "monthly pumping hours")]
    pub monthly_hours: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRow {
    pub date: String,
    pub pump_id: String,
    pub daily_flow: String,
    pub monthly_flow: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PumpReadingRow {
    pub pump: String,
    pub kwh: String,
    pub voltage: String,
    pub frequency: String,
    pub current: String,
    pub powerfactor: String,
}

/// One snapshot with the electrical readings of its running pumps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingsRow {
    pub site: String,
    pub site_id: String,
    pub date: String,
    pub time: String,
    pub pumps: Vec<PumpReadingRow>,
}

/// Two decimals, as every numeric report column is rendered.
pub fn fixed2(value: f64) -> String {
    format!("{value:.2}")
}

/// Minutes as zero-padded `HH:MM`, rounded to the nearest minute and never
/// negative. Hours are not wrapped at 24, so monthly totals read naturally.
pub fn hours_minutes(minutes: f64) -> String {
    let total = if minutes.is_finite() {
        minutes.round().max(0.0) as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Walks the in-window days, in date order, and their pumps in table order,
/// handing each day/pump pair with a day record and its month totals to `f`.
fn join_rows<R>(
    agg: &Aggregation,
    window: DateRange,
    table: &PumpTable,
    mut f: impl FnMut(&DayBucket, &str, &PumpDay, PumpMonth) -> Option<R>,
) -> Vec<R> {
    let mut rows = Vec::new();
    for day in agg.days.iter().filter(|d| window.contains(d.date)) {
        let month = agg.month(day.month());
        for ch in table.channels() {
            let Some(pd) = day.pump(ch.id) else {
                continue;
            };
            let pm = month.map(|m| m.pump(ch.id)).unwrap_or_default();
            if let Some(row) = f(day, &ch.label, pd, pm) {
                rows.push(row);
            }
        }
    }
    rows
}

pub fn energy_consumption_rows(
    agg: &Aggregation,
    window: DateRange,
    table: &PumpTable,
) -> Vec<EnergyConsumptionRow> {
    join_rows(agg, window, table, |day, label, pd, pm| {
        (pd.active_readings > 0).then(|| EnergyConsumptionRow {
            date: iso_date(day.date),
            pump: label.to_string(),
            daily_kwh: fixed2(pd.energy_kwh()),
            monthly_kwh: fixed2(pm.energy_kwh),
        })
    })
}

pub fn pumping_rows(agg: &Aggregation, window: DateRange, table: &PumpTable) -> Vec<PumpingRow> {
    join_rows(agg, window, table, |day, label, pd, pm| {
        (pd.run_minutes > 0.0).then(|| PumpingRow {
            date: iso_date(day.date),
            pump: label.to_string(),
            daily_hours: hours_minutes(pd.run_minutes),
            monthly_hours: hours_minutes(pm.run_minutes),
        })
    })
}

pub fn flow_rows(agg: &Aggregation, window: DateRange, table: &PumpTable) -> Vec<FlowRow> {
    join_rows(agg, window, table, |day, label, pd, pm| {
        (pd.flow > 0.0).then(|| FlowRow {
            date: iso_date(day.date),
            pump_id: label.to_string(),
            daily_flow: fixed2(pd.flow),
            monthly_flow: fixed2(pm.flow),
        })
    })
}

/// Per-snapshot electrical readings of the running pumps.
///
/// Snapshots with no running pump are left out.
pub fn readings_rows(
    observations: &[Observation],
    window: DateRange,
    table: &PumpTable,
) -> Vec<ReadingsRow> {
    observations
        .iter()
        .filter(|o| window.contains(o.local_date))
        .filter_map(|o| {
            let pumps: Vec<PumpReadingRow> = table
                .channels()
                .iter()
                .filter_map(|ch| {
                    let r = o.pump(ch.id).filter(|r| r.running)?;
                    Some(PumpReadingRow {
                        pump: ch.label.clone(),
                        kwh: fixed2(r.energy_kwh),
                        voltage: fixed2(r.electrical.voltage),
                        frequency: fixed2(r.electrical.frequency),
                        current: fixed2(r.electrical.current),
                        powerfactor: fixed2(r.electrical.power_factor),
                    })
                })
                .collect();
            if pumps.is_empty() {
                return None;
            }
            let d = o.local_date;
            Some(ReadingsRow {
                site: o.topic.clone().unwrap_or_else(|| "Unknown".to_string()),
                site_id: o.site_id.clone(),
                date: format!("{:02}-{:02}-{:04}", d.day(), d.month() as u8, d.year()),
                time: format!("{:02}:{:02}", o.local_time.hour(), o.local_time.minute()),
                pumps,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::PumpId;
    use crate::engine::{
        grouper::{aggregate, AggregationOptions},
        observation::{Electrical, PumpReading},
    };
    use time::{
        macros::{date, offset, time},
        Date, PrimitiveDateTime, Time, UtcOffset,
    };

    fn obs(date: Date, at: Time, p1: Option<f64>, p2: Option<f64>) -> Observation {
        let reading = |kwh: Option<f64>| PumpReading {
            running: kwh.is_some(),
            energy_kwh: kwh.unwrap_or(0.0),
            flow: 0.0,
            electrical: Electrical {
                voltage: 415.0,
                frequency: 50.0,
                current: 12.346,
                power_factor: 0.9,
            },
        };
        let local = PrimitiveDateTime::new(date, at).assume_offset(offset!(+5:30));
        Observation {
            timestamp: local.to_offset(UtcOffset::UTC),
            local_date: date,
            local_time: at,
            site_id: "S-01".to_string(),
            topic: Some("Alpha".to_string()),
            pumps: [(PumpId(1), reading(p1)), (PumpId(2), reading(p2))]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn hours_format() {
        assert_eq!(hours_minutes(480.0), "08:00");
        assert_eq!(hours_minutes(59.6), "01:00");
        assert_eq!(hours_minutes(-3.0), "00:00");
        assert_eq!(hours_minutes(6000.0), "100:00");
        assert_eq!(fixed2(45.5), "45.50");
    }

    #[test]
    fn energy_rows_skip_idle_pumps_and_join_month() {
        let table = PumpTable::standard();
        let d1 = date!(2024 - 03 - 01);
        let d2 = date!(2024 - 03 - 02);
        let seq = vec![
            obs(d1, time!(8:00), Some(100.0), None),
            obs(d1, time!(18:00), Some(145.5), None),
            obs(d1, time!(19:00), None, None),
            obs(d2, time!(8:00), Some(150.0), Some(10.0)),
            obs(d2, time!(9:00), Some(160.0), Some(12.0)),
        ];
        let agg = aggregate(&seq, &table, AggregationOptions::default());

        let window = DateRange::new(d1, d1).unwrap();
        let rows = energy_consumption_rows(&agg, window, &table);
        assert_eq!(
            rows,
            vec![EnergyConsumptionRow {
                date: "2024-03-01".to_string(),
                pump: "PUMP 1".to_string(),
                daily_kwh: "45.50".to_string(),
                monthly_kwh: "55.50".to_string(),
            }]
        );

        let window = DateRange::new(d1, d2).unwrap();
        let rows = energy_consumption_rows(&agg, window, &table);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].pump, "PUMP 2");
        assert_eq!(rows[2].daily_kwh, "2.00");
    }

    #[test]
    fn pumping_rows_render_hours() {
        let table = PumpTable::standard();
        let d = date!(2024 - 03 - 01);
        let seq = vec![
            obs(d, time!(8:00), Some(1.0), None),
            obs(d, time!(12:00), None, None),
            obs(d, time!(14:00), Some(1.0), None),
            obs(d, time!(18:00), None, None),
        ];
        let agg = aggregate(&seq, &table, AggregationOptions::default());
        let rows = pumping_rows(&agg, DateRange::new(d, d).unwrap(), &table);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].daily_hours, "08:00");
        assert_eq!(rows[0].monthly_hours, "08:00");
    }

    #[test]
    fn pump_seen_running_once_has_energy_row_but_no_pumping_row() {
        let table = PumpTable::standard();
        let d = date!(2024 - 03 - 01);
        let seq = vec![obs(d, time!(23:50), Some(7.0), None)];
        let agg = aggregate(&seq, &table, AggregationOptions::default());
        let window = DateRange::new(d, d).unwrap();
        assert_eq!(energy_consumption_rows(&agg, window, &table).len(), 1);
        assert!(pumping_rows(&agg, window, &table).is_empty());
        assert!(flow_rows(&agg, window, &table).is_empty());
    }

    #[test]
    fn readings_list_only_running_pumps() {
        let table = PumpTable::standard();
        let d = date!(2024 - 03 - 01);
        let seq = vec![
            obs(d, time!(8:05), Some(100.0), None),
            obs(d, time!(9:00), None, None),
        ];
        let rows = readings_rows(&seq, DateRange::new(d, d).unwrap(), &table);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, "01-03-2024");
        assert_eq!(rows[0].time, "08:05");
        assert_eq!(rows[0].site, "Alpha");
        assert_eq!(rows[0].pumps.len(), 1);
        assert_eq!(rows[0].pumps[0].current, "12.35");
        assert_eq!(rows[0].pumps[0].kwh, "100.00");
    }

    #[test]
    fn row_keys_match_dashboard_contract() {
        let row = PumpingRow {
            date: "2024-03-01".to_string(),
            pump: "PUMP 1".to_string(),
            daily_hours: "08:00".to_string(),
            monthly_hours: "10:30".to_string(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["daily pumping hours"], "08:00");
        assert_eq!(json["Date"], "2024-03-01");

        let flow = FlowRow {
            date: "2024-03-01".to_string(),
            pump_id: "PUMP 2".to_string(),
            daily_flow: "1.00".to_string(),
            monthly_flow: "2.00".to_string(),
        };
        let json = serde_json::to_value(&flow).unwrap();
        assert_eq!(json["pumpId"], "PUMP 2");
        assert_eq!(json["monthlyFlow"], "2.00");
    }
}

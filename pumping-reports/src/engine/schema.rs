/// Ordinal identifier of a pump within a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PumpId(pub u16);

/// Snapshot field names carrying a pump's electrical measurements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectricalFields {
    pub voltage: String,
    pub frequency: String,
    pub current: String,
    pub power_factor: String,
}

/// Where a pump's values live in a raw snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpChannel {
    pub id: PumpId,
    /// Name shown in report rows, e.g. `PUMP 1`.
    pub label: String,
    pub on_flag: String,
    pub energy_field: String,
    pub flow_field: String,
    pub electrical: ElectricalFields,
}

impl PumpChannel {
    /// Channel following the gateway's `P<n>_*` naming convention.
    pub fn numbered(n: u16) -> Self {
        Self {
            id: PumpId(n),
            label: format!("PUMP {n}"),
            on_flag: format!("P{n}_ON_FB"),
            energy_field: format!("P{n}_KWH"),
            flow_field: "DAILY_FLOW".to_string(),
            electrical: ElectricalFields {
                voltage: format!("P{n}_VOLT_AVG_LL"),
                frequency: format!("P{n}_FREQ"),
                current: format!("P{n}_CURR_AVG"),
                power_factor: format!("P{n}_PF"),
            },
        }
    }
}

/// Static per-site field mapping, resolved once and shared by every stage.
///
/// A pump reads as running only when its own feedback flag and the shared
/// `available_flag` (the common contactor) are both asserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpTable {
    available_flag: String,
    channels: Vec<PumpChannel>,
}

impl PumpTable {
    pub fn new(available_flag: impl Into<String>, channels: Vec<PumpChannel>) -> Self {
        Self {
            available_flag: available_flag.into(),
            channels,
        }
    }

    /// The two-pump layout used by the deployed stations.
    pub fn standard() -> Self {
        Self::new(
            "P1_P2_ON_FB",
            vec![PumpChannel::numbered(1), PumpChannel::numbered(2)],
        )
    }

    pub fn available_flag(&self) -> &str {
        &self.available_flag
    }

    pub fn channels(&self) -> &[PumpChannel] {
        &self.channels
    }

    pub fn ids(&self) -> impl Iterator<Item = PumpId> + '_ {
        self.channels.iter().map(|c| c.id)
    }

    pub fn label(&self, id: PumpId) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.label.as_str())
    }
}

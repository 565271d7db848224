//! Output channels and the ntuple row layout
//!
//! Histogram ids follow the array size `N`:
//! - 1..=N: one smeared spectrum per crystal
//! - N+1..=N+6: the aggregate spectra (see [`Aggregate::offset`])
//! - N+2+i: shield block i
//!
//! Shield ids share numbers with the aggregates. Channels are addressed by
//! value, not by id, so the two never mix in a sink.

/// Spectra summed over a set of crystals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aggregate {
    Total,
    TotalRaw,
    Primary,
    PrimaryRaw,
    Secondary,
    SecondaryRaw,
}

impl Aggregate {
    pub const ALL: [Aggregate; 6] = [
        Aggregate::Total,
        Aggregate::TotalRaw,
        Aggregate::Primary,
        Aggregate::PrimaryRaw,
        Aggregate::Secondary,
        Aggregate::SecondaryRaw,
    ];

    /// Histogram id offset past the last crystal
    pub fn offset(self) -> u32 {
        match self {
            Aggregate::Total => 1,
            Aggregate::TotalRaw => 2,
            Aggregate::Primary => 3,
            Aggregate::PrimaryRaw => 4,
            Aggregate::Secondary => 5,
            Aggregate::SecondaryRaw => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Aggregate::Total => "total",
            Aggregate::TotalRaw => "total_raw",
            Aggregate::Primary => "primary",
            Aggregate::PrimaryRaw => "primary_raw",
            Aggregate::Secondary => "secondary",
            Aggregate::SecondaryRaw => "secondary_raw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Smeared energy of one crystal (copy number)
    Crystal(u32),
    /// Raw energy of one crystal
    CrystalRaw(u32),
    Aggregate(Aggregate),
    /// Smeared energy of shield block `copy - 100`
    Shield(u32),
}

impl Channel {
    /// Histogram id in an array of `total` crystals
    ///
    /// Raw per-crystal spectra have no numbered histogram.
    pub fn histogram_id(self, total: u32) -> Option<u32> {
        match self {
            Channel::Crystal(copy) => Some(copy),
            Channel::CrystalRaw(_) => None,
            Channel::Aggregate(a) => Some(total + a.offset()),
            Channel::Shield(index) => Some(total + 2 + index),
        }
    }
}

/// Shield columns of an ntuple row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldColumns {
    pub copy_number: u32,
    pub energy: f64,
    pub raw_energy: f64,
}

/// One row per fired crystal
#[derive(Debug, Clone, PartialEq)]
pub struct NtupleRow {
    pub event_id: u64,
    pub copy_number: u32,
    pub energy: f64,
    pub raw_energy: f64,
    /// (smeared, raw) when the crystal is in the primary group
    pub primary: Option<(f64, f64)>,
    pub secondary: Option<(f64, f64)>,
    /// Hottest shield block of the event, when shields are scored
    pub shield: Option<ShieldColumns>,
}

const BASE_COLUMNS: [&str; 8] = [
    "eventId",
    "crystNb",
    "E",
    "E_raw",
    "E_primary",
    "E_primary_raw",
    "E_secondary",
    "E_secondary_raw",
];
const SHIELD_COLUMNS: [&str; 3] = ["ComptSuppNb", "E_ComptSupp", "E_ComptSupp_raw"];

impl NtupleRow {
    /// Column names, with the shield block when `shield` is set
    pub fn column_names(shield: bool) -> Vec<&'static str> {
        let mut names = BASE_COLUMNS.to_vec();
        if shield {
            names.extend(SHIELD_COLUMNS);
        }
        names
    }

    /// Values in column order; groups the crystal is not in read 0
    pub fn values(&self, shield: bool) -> Vec<f64> {
        let (primary, primary_raw) = self.primary.unwrap_or_default();
        let (secondary, secondary_raw) = self.secondary.unwrap_or_default();
        let mut values = vec![
            self.event_id as f64,
            self.copy_number as f64,
            self.energy,
            self.raw_energy,
            primary,
            primary_raw,
            secondary,
            secondary_raw,
        ];
        if shield {
            let s = self.shield.unwrap_or(ShieldColumns {
                copy_number: 0,
                energy: 0.0,
                raw_energy: 0.0,
            });
            values.extend([s.copy_number as f64, s.energy, s.raw_energy]);
        }
        values
    }
}

//! Output sinks for scored events

use std::collections::BTreeMap;

use super::channel::{Channel, NtupleRow};

/// Receives histogram fills and ntuple rows
///
/// Fills are order-insensitive; a sink may be shared by many events or
/// owned by one worker and merged afterwards.
pub trait AnalysisSink {
    fn fill(&mut self, channel: Channel, value: f64);
    fn add_row(&mut self, row: NtupleRow);
}

impl<S: AnalysisSink + ?Sized> AnalysisSink for &mut S {
    fn fill(&mut self, channel: Channel, value: f64) {
        (**self).fill(channel, value);
    }

    fn add_row(&mut self, row: NtupleRow) {
        (**self).add_row(row);
    }
}

/// Keeps every fill and row in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSink {
    fills: BTreeMap<Channel, Vec<f64>>,
    rows: Vec<NtupleRow>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self, channel: Channel) -> &[f64] {
        self.fills.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, channel: Channel) -> usize {
        self.values(channel).len()
    }

    /// Channels with at least one fill
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.fills.keys().copied()
    }

    pub fn rows(&self) -> &[NtupleRow] {
        &self.rows
    }

    /// Append everything recorded by another sink
    pub fn merge(&mut self, other: RecordingSink) {
        for (channel, values) in other.fills {
            self.fills.entry(channel).or_default().extend(values);
        }
        self.rows.extend(other.rows);
    }
}

impl AnalysisSink for RecordingSink {
    fn fill(&mut self, channel: Channel, value: f64) {
        self.fills.entry(channel).or_default().push(value);
    }

    fn add_row(&mut self, row: NtupleRow) {
        self.rows.push(row);
    }
}
